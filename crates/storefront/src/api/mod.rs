//! PartsHub remote API client.
//!
//! # Architecture
//!
//! - Plain REST JSON over `reqwest`; the only non-JSON payload is the
//!   multipart payment submission (binary proof-of-payment attachment)
//! - The remote API is the source of truth - no local sync, direct calls
//! - In-memory caching via `moka` for catalog, payment methods, and
//!   carriers (5 minute TTL) and the exchange rate (10 minute TTL)
//!
//! The [`PartsBackend`] trait is the seam between the checkout workflow and
//! the network: production code uses [`ApiClient`], tests use scripted mocks.

mod cache;
pub mod types;

pub use types::*;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use partshub_core::{OrderId, ProductId};

use crate::config::PartsApiConfig;
use cache::{CacheKey, CacheValue};

/// Errors that can occur when talking to the parts API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (transport-level).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Client could not be constructed from configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Collaborator contract for everything checkout and the cart need from the
/// remote API.
///
/// Methods return `impl Future + Send` rather than plain `async fn` so the
/// workflow stays spawnable from multi-threaded handlers.
pub trait PartsBackend: Send + Sync {
    /// Fetch the full catalog.
    fn get_catalog(&self) -> impl Future<Output = Result<Vec<CatalogProduct>, ApiError>> + Send;

    /// Fetch the authoritative current stock for one product. Never cached.
    fn get_product_stock(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<StockLevel, ApiError>> + Send;

    /// Fetch the current local-currency exchange rate.
    fn get_exchange_rate(
        &self,
    ) -> impl Future<Output = Result<ExchangeRateQuote, ApiError>> + Send;

    /// Create an order from a header and its lines; returns the new order id.
    fn create_order(
        &self,
        header: &OrderHeader,
        lines: &[OrderLineInput],
    ) -> impl Future<Output = Result<OrderId, ApiError>> + Send;

    /// Write back a reduced on-hand quantity after an order commits.
    fn update_product_stock(
        &self,
        product_id: ProductId,
        new_stock: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Submit payment details (multipart) against an order.
    fn create_payment(
        &self,
        order_id: OrderId,
        payment: PaymentSubmission,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Create the shipping record for an order.
    fn create_shipment(
        &self,
        shipment: &ShipmentRequest,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// List accepted payment methods.
    fn get_payment_methods(
        &self,
    ) -> impl Future<Output = Result<Vec<PaymentMethod>, ApiError>> + Send;

    /// List national shipping carriers.
    fn get_shipping_companies(&self) -> impl Future<Output = Result<Vec<Carrier>, ApiError>> + Send;
}

// =============================================================================
// ApiClient
// =============================================================================

/// Production client for the PartsHub parts API.
///
/// Cheaply cloneable via `Arc`. Read-side responses are cached; stock reads
/// and all writes go straight to the network.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
    rate_cache: Cache<(), ExchangeRateQuote>,
}

impl ApiClient {
    /// Create a new parts API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the bearer token cannot be used as a
    /// header value, or `ApiError::Http` if the HTTP client fails to build.
    pub fn new(config: &PartsApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.token.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| ApiError::Config(format!("invalid API token: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(100)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        let rate_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(600)) // 10 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
                rate_cache,
            }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Decode a response, mapping non-success statuses to `ApiError::Api`.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(ApiError::Parse)
    }

    /// Check a write response for success, discarding the body.
    async fn check(response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(ApiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.inner.client.get(self.url(path)?).send().await?;
        Self::decode(response).await
    }
}

impl PartsBackend for ApiClient {
    #[instrument(skip(self))]
    async fn get_catalog(&self) -> Result<Vec<CatalogProduct>, ApiError> {
        if let Some(CacheValue::Catalog(products)) = self.inner.cache.get(&CacheKey::Catalog).await
        {
            return Ok(products);
        }

        let products: Vec<CatalogProduct> = self.get_json("products").await?;
        self.inner
            .cache
            .insert(CacheKey::Catalog, CacheValue::Catalog(products.clone()))
            .await;
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn get_product_stock(&self, product_id: ProductId) -> Result<StockLevel, ApiError> {
        self.get_json(&format!("products/{product_id}/stock")).await
    }

    #[instrument(skip(self))]
    async fn get_exchange_rate(&self) -> Result<ExchangeRateQuote, ApiError> {
        if let Some(quote) = self.inner.rate_cache.get(&()).await {
            return Ok(quote);
        }

        let quote: ExchangeRateQuote = self.get_json("exchange-rate").await?;
        self.inner.rate_cache.insert((), quote).await;
        Ok(quote)
    }

    #[instrument(skip(self, header, lines))]
    async fn create_order(
        &self,
        header: &OrderHeader,
        lines: &[OrderLineInput],
    ) -> Result<OrderId, ApiError> {
        let body = serde_json::json!({
            "header": header,
            "lines": lines,
        });

        let response = self
            .inner
            .client
            .post(self.url("orders")?)
            .json(&body)
            .send()
            .await?;
        let created: CreatedOrder = Self::decode(response).await?;
        Ok(created.order_id)
    }

    #[instrument(skip(self))]
    async fn update_product_stock(
        &self,
        product_id: ProductId,
        new_stock: u32,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({ "stock": new_stock });
        let response = self
            .inner
            .client
            .put(self.url(&format!("products/{product_id}/stock"))?)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }

    #[instrument(skip(self, payment))]
    async fn create_payment(
        &self,
        order_id: OrderId,
        payment: PaymentSubmission,
    ) -> Result<(), ApiError> {
        let mut form = Form::new()
            .text("payment_method_id", payment.method_id.to_string())
            .text("amount", payment.amount.rounded().to_string());

        // Reference number is omitted entirely for cash payments
        if let Some(reference) = payment.reference {
            form = form.text("reference", reference);
        }

        if let Some(proof) = payment.proof {
            let part = Part::bytes(proof.bytes)
                .file_name(proof.file_name)
                .mime_str(&proof.content_type)?;
            form = form.part("proof", part);
        }

        let response = self
            .inner
            .client
            .post(self.url(&format!("orders/{order_id}/payments"))?)
            .multipart(form)
            .send()
            .await?;
        Self::check(response).await
    }

    #[instrument(skip(self, shipment))]
    async fn create_shipment(&self, shipment: &ShipmentRequest) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .post(self.url("shipments")?)
            .json(shipment)
            .send()
            .await?;
        Self::check(response).await
    }

    #[instrument(skip(self))]
    async fn get_payment_methods(&self) -> Result<Vec<PaymentMethod>, ApiError> {
        if let Some(CacheValue::PaymentMethods(methods)) =
            self.inner.cache.get(&CacheKey::PaymentMethods).await
        {
            return Ok(methods);
        }

        let methods: Vec<PaymentMethod> = self.get_json("payment-methods").await?;
        self.inner
            .cache
            .insert(
                CacheKey::PaymentMethods,
                CacheValue::PaymentMethods(methods.clone()),
            )
            .await;
        Ok(methods)
    }

    #[instrument(skip(self))]
    async fn get_shipping_companies(&self) -> Result<Vec<Carrier>, ApiError> {
        if let Some(CacheValue::Carriers(carriers)) = self.inner.cache.get(&CacheKey::Carriers).await
        {
            return Ok(carriers);
        }

        let carriers: Vec<Carrier> = self.get_json("shipping-companies").await?;
        self.inner
            .cache
            .insert(CacheKey::Carriers, CacheValue::Carriers(carriers.clone()))
            .await;
        Ok(carriers)
    }
}
