use crate::core::{CatalogEntry, CatalogLookup, ConfigProvider, ProductId, StockLookup, StockRecord};
use crate::domain::model::StockLookupMode;
use crate::utils::error::{CartError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Client for the storefront REST API.
///
/// Serves both lookups: `GET products/:id` for catalog entries and either
/// `GET stock/:id` or `GET stock` for stock ceilings, relative to the base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    stock_mode: StockLookupMode,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, stock_mode: StockLookupMode) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Without a trailing slash `join` would replace the last path segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            stock_mode,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.api_base_url(),
            config.request_timeout(),
            config.stock_lookup_mode(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn stock_mode(&self) -> StockLookupMode {
        self.stock_mode
    }

    /// `Ok(None)` on 404; other non-success statuses are errors.
    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self.base_url.join(path)?;

        tracing::debug!("Making API request to: {}", url);
        let response = self.client.get(url).send().await?;
        tracing::debug!("API response status: {}", response.status());

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.error_for_status()?.json::<T>().await?;
        Ok(Some(body))
    }
}

#[async_trait]
impl CatalogLookup for ApiClient {
    async fn product(&self, id: ProductId) -> Result<CatalogEntry> {
        self.fetch(&format!("products/{}", id))
            .await?
            .ok_or_else(|| CartError::not_found("product", id))
    }
}

#[async_trait]
impl StockLookup for ApiClient {
    async fn stock(&self, id: ProductId) -> Result<StockRecord> {
        match self.stock_mode {
            StockLookupMode::PerProduct => self
                .fetch(&format!("stock/{}", id))
                .await?
                .ok_or_else(|| CartError::not_found("stock", id)),
            StockLookupMode::FullList => {
                let records: Vec<StockRecord> = self.fetch("stock").await?.unwrap_or_default();
                tracing::debug!("Stock list holds {} record(s)", records.len());
                records
                    .into_iter()
                    .find(|record| record.id == id)
                    .ok_or_else(|| CartError::not_found("stock", id))
            }
        }
    }
}
