//! Client for the external supplier inventory service.

use std::time::Duration;

use anyhow::Context;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::SupplierConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierStock {
    pub sku: String,
    pub stock_quantity: i32,
    pub expected_shipping: String,
    #[serde(rename = "supplier")]
    pub supplier_name: String,
}

#[derive(Debug, Error)]
pub enum SupplierError {
    #[error("supplier request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("supplier responded with {0}")]
    Status(StatusCode),

    #[error("supplier returned an unreadable body: {0}")]
    Decode(reqwest::Error),

    #[error("supplier base url cannot carry a path")]
    InvalidBaseUrl,
}

impl SupplierError {
    /// Network failures, 5xx and 408 are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            SupplierError::Transport(_) => true,
            SupplierError::Status(status) => {
                status.is_server_error() || *status == StatusCode::REQUEST_TIMEOUT
            }
            SupplierError::Decode(_) | SupplierError::InvalidBaseUrl => false,
        }
    }
}

#[derive(Clone)]
pub struct SupplierGateway {
    client: reqwest::Client,
    base_url: Url,
    max_attempts: u32,
    retry_delay: Duration,
}

impl SupplierGateway {
    pub fn new(config: &SupplierConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid SUPPLIER_BASE_URL {}", config.base_url))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build supplier http client")?;

        Ok(Self {
            client,
            base_url,
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay,
        })
    }

    pub async fn fetch_stock(&self, sku: &str) -> Result<SupplierStock, SupplierError> {
        let mut attempt = 1;
        loop {
            match self.request_stock(sku).await {
                Ok(stock) => return Ok(stock),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        sku,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = self.retry_delay.as_millis() as u64,
                        error = %err,
                        "supplier request failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn request_stock(&self, sku: &str) -> Result<SupplierStock, SupplierError> {
        let url = self.inventory_url(sku)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SupplierError::Status(status));
        }

        response.json::<SupplierStock>().await.map_err(|err| {
            if err.is_decode() {
                SupplierError::Decode(err)
            } else {
                SupplierError::Transport(err)
            }
        })
    }

    fn inventory_url(&self, sku: &str) -> Result<Url, SupplierError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SupplierError::InvalidBaseUrl)?
            .pop_if_empty()
            .push("inventory")
            .push(sku);
        Ok(url)
    }
}
