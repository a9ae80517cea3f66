//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError, PartsBackend};
use crate::cart::CartStore;
use crate::checkout::CheckoutOrchestrator;
use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// parts API client, the cart store, and the checkout orchestrator.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    cart: CartStore,
    checkout: CheckoutOrchestrator<ApiClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the parts API client cannot be constructed from
    /// the configuration.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.parts_api)?;
        let cart = CartStore::new();
        let checkout = CheckoutOrchestrator::new(
            api.clone(),
            cart.clone(),
            config.pickup_address.as_str(),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                cart,
                checkout,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the parts API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the checkout orchestrator.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutOrchestrator<ApiClient> {
        &self.inner.checkout
    }

    /// Load the catalog and exchange rate into the cart store.
    ///
    /// Called on startup and available for on-demand refresh. A catalog
    /// failure puts the store into its explicit error state but never
    /// clears existing lines; a rate failure leaves local-currency figures
    /// omitted until the next refresh.
    pub async fn bootstrap(&self) {
        match self.inner.api.get_catalog().await {
            Ok(products) => {
                tracing::info!(count = products.len(), "catalog loaded");
                self.inner.cart.set_catalog(products);
            }
            Err(e) => {
                tracing::error!(error = %e, "catalog fetch failed");
                self.inner.cart.mark_catalog_failed(e.to_string());
            }
        }

        match self.inner.api.get_exchange_rate().await {
            Ok(quote) => {
                let rate = quote.rate();
                if rate.is_none() {
                    tracing::warn!("exchange rate service returned a non-positive rate");
                }
                self.inner.cart.set_exchange_rate(rate);
            }
            Err(e) => {
                tracing::warn!(error = %e, "exchange rate fetch failed");
                self.inner.cart.set_exchange_rate(None);
            }
        }
    }
}
