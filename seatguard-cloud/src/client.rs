//! PostgREST-style license store over HTTPS.

use crate::config::RestStoreConfig;
use crate::error::{classify_send_error, classify_status, CloudError, CloudResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use seatguard_license::{DeviceBinding, License, RemoteStore, StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Insert payload for a new device binding.
#[derive(Debug, Serialize)]
struct NewBinding<'a> {
    hwid: &'a str,
    license_key: &'a str,
    device_name: &'a str,
    active: bool,
}

/// [`RemoteStore`] backed by a REST document store.
pub struct RestLicenseStore {
    config: RestStoreConfig,
    client: Client,
}

impl RestLicenseStore {
    /// Builds a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::Config`] for a missing or non-HTTP URL, a
    /// missing key, or an HTTP client that cannot be built.
    pub fn new(config: RestStoreConfig) -> CloudResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(CloudError::Config("store URL is empty".to_string()));
        }
        let url = Url::parse(config.base_url.trim())
            .map_err(|e| CloudError::Config(format!("store URL {:?}: {e}", config.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CloudError::Config(format!(
                "store URL must be http(s), got {}",
                url.scheme()
            )));
        }
        if config.api_key.trim().is_empty() {
            return Err(CloudError::Config("store API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CloudError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RestStoreConfig {
        &self.config
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim().trim_end_matches('/'),
            table
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status.as_u16(), body))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> StoreResult<Vec<T>> {
        let mut query: Vec<(&str, String)> = filters.to_vec();
        query.push(("select", "*".to_string()));

        let response = self
            .send(self.client.get(self.table_url(table)).query(&query))
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    let bytes = response.bytes().await.map_err(classify_send_error)?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed(e.to_string()))
}

#[async_trait]
impl RemoteStore for RestLicenseStore {
    async fn get_license(&self, license_key: &str) -> StoreResult<Option<License>> {
        debug!("fetching license");
        let rows: Vec<License> = self
            .select(
                &self.config.licenses_table,
                &[("license_key", format!("eq.{license_key}"))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn get_binding(&self, hwid: &str) -> StoreResult<Option<DeviceBinding>> {
        let rows: Vec<DeviceBinding> = self
            .select(&self.config.bindings_table, &[("hwid", format!("eq.{hwid}"))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn get_active_bindings_for_license(
        &self,
        license_key: &str,
    ) -> StoreResult<Vec<DeviceBinding>> {
        self.select(
            &self.config.bindings_table,
            &[
                ("license_key", format!("eq.{license_key}")),
                ("active", "is.true".to_string()),
            ],
        )
        .await
    }

    async fn create_binding(
        &self,
        hwid: &str,
        license_key: &str,
        device_name: &str,
    ) -> StoreResult<DeviceBinding> {
        let body = [NewBinding {
            hwid,
            license_key,
            device_name,
            active: true,
        }];

        let response = self
            .send(
                self.client
                    .post(self.table_url(&self.config.bindings_table))
                    .header("Prefer", "return=representation")
                    .json(&body),
            )
            .await?;

        let rows: Vec<DeviceBinding> = decode(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("insert returned no rows".to_string()))
    }
}
