//! Cart route handlers.
//!
//! All monetary figures cross the HTTP boundary as display strings rounded
//! to cents; the store itself keeps unrounded decimals. Local-currency
//! fields are omitted from the JSON (not rendered as zero) while no
//! exchange rate has loaded.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use partshub_core::ProductId;

use crate::cart::CartStore;
use crate::error::Result;
use crate::state::AppState;

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    /// Discounted unit price.
    pub unit_price: String,
    pub line_total: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_total_local: Option<String>,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub subtotal: String,
    /// Pre-discount amount, shown struck through at checkout.
    pub original_subtotal: String,
    pub savings: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal_local: Option<String>,
}

impl CartView {
    fn from_store(store: &CartStore) -> Self {
        let rate = store.exchange_rate();
        let totals = store.totals();
        let items = store
            .lines()
            .iter()
            .map(|line| CartItemView {
                product_id: line.product_id,
                name: line.snapshot.name.clone(),
                quantity: line.quantity,
                unit_price: line
                    .snapshot
                    .unit_price
                    .with_discount(line.snapshot.discount_percent)
                    .display(),
                line_total: line.total().display(),
                line_total_local: rate.map(|r| line.total().in_local(r).display()),
            })
            .collect();

        Self {
            items,
            item_count: totals.item_count,
            subtotal: totals.total.display(),
            original_subtotal: totals.total_without_discount.display(),
            savings: totals.savings().display(),
            subtotal_local: totals.local_total.map(|l| l.display()),
        }
    }
}

/// Aggregate totals without line detail, for badge/summary widgets.
#[derive(Debug, Clone, Serialize)]
pub struct TotalsView {
    pub item_count: u32,
    pub subtotal: String,
    pub original_subtotal: String,
    pub savings: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal_local: Option<String>,
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityForm {
    pub quantity: u32,
}

/// Display the cart.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Json<CartView> {
    Json(CartView::from_store(state.cart()))
}

/// Add an item to the cart.
///
/// Adding a product already in the cart increments its quantity rather
/// than creating a duplicate line.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    Json(form): Json<AddToCartForm>,
) -> Result<Json<CartView>> {
    state
        .cart()
        .add_item(form.product_id, form.quantity.unwrap_or(1))?;
    Ok(Json(CartView::from_store(state.cart())))
}

/// Set a cart line's quantity.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
    Json(form): Json<UpdateQuantityForm>,
) -> Result<Json<CartView>> {
    state
        .cart()
        .update_quantity(ProductId::new(product_id), form.quantity)?;
    Ok(Json(CartView::from_store(state.cart())))
}

/// Remove a cart line. Removing an absent product is a no-op.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Json<CartView> {
    state.cart().remove_item(ProductId::new(product_id));
    Json(CartView::from_store(state.cart()))
}

/// Empty the cart.
#[instrument(skip(state))]
pub async fn clear(State(state): State<AppState>) -> Json<CartView> {
    state.cart().clear();
    Json(CartView::from_store(state.cart()))
}

/// Aggregate totals for summary widgets.
#[instrument(skip(state))]
pub async fn totals(State(state): State<AppState>) -> Json<TotalsView> {
    let totals = state.cart().totals();
    Json(TotalsView {
        item_count: totals.item_count,
        subtotal: totals.total.display(),
        original_subtotal: totals.total_without_discount.display(),
        savings: totals.savings().display(),
        subtotal_local: totals.local_total.map(|l| l.display()),
    })
}
