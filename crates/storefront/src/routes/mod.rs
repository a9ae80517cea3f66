//! Route definitions for the storefront JSON API.
//!
//! These handlers do no business logic; they translate between HTTP and the
//! cart store / checkout orchestrator and render `AppError` consistently.

pub mod cart;
pub mod checkout;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Build the storefront route tree.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show))
        .route("/cart/items", post(cart::add))
        .route(
            "/cart/items/{product_id}",
            put(cart::update).delete(cart::remove),
        )
        .route("/cart/clear", post(cart::clear))
        .route("/cart/totals", get(cart::totals))
        .route("/checkout", post(checkout::submit))
        .route("/checkout/status", get(checkout::status))
        .route("/checkout/payment-methods", get(checkout::payment_methods))
        .route("/checkout/carriers", get(checkout::carriers))
}
