//! Cart Pricing Store.
//!
//! The authoritative in-process view of "what is in the cart" and "what it
//! costs", independent of any particular screen. All mutation goes through
//! the methods on [`CartStore`]; nothing else touches the line data, which
//! preserves the single-writer property the derived totals rely on.
//!
//! Pricing rule, applied per line with unit price `p`, discount `d` (0-100)
//! and quantity `q`:
//!
//! ```text
//! effective_unit_price   = d > 0 ? p * (1 - d/100) : p
//! line_total             = effective_unit_price * q
//! line_total_no_discount = p * q
//! ```
//!
//! Sums accumulate unrounded decimals; rounding to cents happens once, in
//! the display formatting.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use partshub_core::{ExchangeRate, LocalAmount, ProductId, Usd};
use rust_decimal::Decimal;

use crate::api::types::CatalogProduct;

/// Errors from cart mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// The product id does not resolve against the loaded catalog.
    #[error("product {0} is not in the catalog")]
    UnknownProduct(ProductId),

    /// The product is not sellable (flagged unavailable or zero stock).
    #[error("product \"{name}\" is not available for sale")]
    ProductUnavailable { product_id: ProductId, name: String },

    /// Requested quantity exceeds the on-hand stock.
    #[error("insufficient stock for \"{name}\": requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },

    /// Quantities below 1 are never stored; a line is removed instead.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// The catalog has not loaded, so the product cannot be resolved.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
}

/// Catalog load state.
///
/// A fetch failure is an explicit error state surfaced to every dependent
/// view; it never clears existing cart lines, which keep pricing from their
/// add-time snapshots.
#[derive(Debug, Clone, Default)]
pub enum CatalogState {
    #[default]
    Loading,
    Ready(HashMap<ProductId, CatalogProduct>),
    Failed(String),
}

/// Denormalized product data captured when a line is added, for display
/// continuity even if the live catalog later changes or becomes unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSnapshot {
    pub name: String,
    pub unit_price: Usd,
    pub discount_percent: Decimal,
}

/// One product-and-quantity entry in the cart.
///
/// Invariants: `quantity >= 1`, and at most one line exists per product id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub snapshot: LineSnapshot,
}

impl CartLine {
    /// Total for this line after discount, unrounded.
    #[must_use]
    pub fn total(&self) -> Usd {
        self.snapshot
            .unit_price
            .with_discount(self.snapshot.discount_percent)
            .times(self.quantity)
    }

    /// Total for this line ignoring the discount, unrounded.
    #[must_use]
    pub fn total_without_discount(&self) -> Usd {
        self.snapshot.unit_price.times(self.quantity)
    }
}

/// Aggregate cart figures for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartTotals {
    /// Sum of discounted line totals.
    pub total: Usd,
    /// Sum of line totals ignoring discounts (the "original" amount).
    pub total_without_discount: Usd,
    /// Total in local currency; `None` until an exchange rate has loaded,
    /// in which case local figures are omitted rather than shown as zero.
    pub local_total: Option<LocalAmount>,
    /// Sum of quantities across lines.
    pub item_count: u32,
}

impl CartTotals {
    /// Amount saved through discounts; always >= 0.
    #[must_use]
    pub fn savings(&self) -> Usd {
        self.total_without_discount - self.total
    }
}

struct CartInner {
    catalog: CatalogState,
    lines: Vec<CartLine>,
    exchange_rate: Option<ExchangeRate>,
}

/// Process-wide cart store, shared by reference across consumers.
///
/// Cheaply cloneable via `Arc`; interior locking keeps reads consistent
/// while funnelling every mutation through the methods below.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<RwLock<CartInner>>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    /// Create an empty store with the catalog still loading.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CartInner {
                catalog: CatalogState::Loading,
                lines: Vec::new(),
                exchange_rate: None,
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CartInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CartInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Catalog & exchange rate
    // =========================================================================

    /// Replace the loaded catalog. Existing lines keep their snapshots.
    pub fn set_catalog(&self, products: Vec<CatalogProduct>) {
        let map = products.into_iter().map(|p| (p.id, p)).collect();
        self.write().catalog = CatalogState::Ready(map);
    }

    /// Record a catalog fetch failure. Lines are left untouched; their
    /// add-time snapshots keep pricing available while the catalog is down.
    pub fn mark_catalog_failed(&self, reason: impl Into<String>) {
        self.write().catalog = CatalogState::Failed(reason.into());
    }

    /// Current catalog state.
    #[must_use]
    pub fn catalog_state(&self) -> CatalogState {
        self.read().catalog.clone()
    }

    /// Look up a product in the loaded catalog.
    #[must_use]
    pub fn catalog_product(&self, product_id: ProductId) -> Option<CatalogProduct> {
        match &self.read().catalog {
            CatalogState::Ready(map) => map.get(&product_id).cloned(),
            CatalogState::Loading | CatalogState::Failed(_) => None,
        }
    }

    /// Attach the current exchange rate, or clear it with `None`.
    pub fn set_exchange_rate(&self, rate: Option<ExchangeRate>) {
        self.write().exchange_rate = rate;
    }

    /// The current exchange rate, if one has loaded.
    #[must_use]
    pub fn exchange_rate(&self) -> Option<ExchangeRate> {
        self.read().exchange_rate
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of a product.
    ///
    /// If the product is already in the cart its quantity is incremented;
    /// a duplicate line is never created.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` if `quantity` is zero
    /// - `CatalogUnavailable` / `UnknownProduct` if the product cannot be
    ///   resolved against the loaded catalog
    /// - `ProductUnavailable` if the product is unsellable or out of stock
    pub fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let mut inner = self.write();
        let product = match &inner.catalog {
            CatalogState::Ready(map) => map
                .get(&product_id)
                .cloned()
                .ok_or(CartError::UnknownProduct(product_id))?,
            CatalogState::Loading => {
                return Err(CartError::CatalogUnavailable("still loading".to_string()));
            }
            CatalogState::Failed(reason) => {
                return Err(CartError::CatalogUnavailable(reason.clone()));
            }
        };

        if !product.sellable() {
            return Err(CartError::ProductUnavailable {
                product_id,
                name: product.name,
            });
        }

        if let Some(line) = inner.lines.iter_mut().find(|l| l.product_id == product_id) {
            // saturate rather than wrap on absurd repeated adds
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            inner.lines.push(CartLine {
                product_id,
                quantity,
                snapshot: LineSnapshot {
                    name: product.name,
                    unit_price: product.price,
                    discount_percent: product.discount_percent,
                },
            });
        }

        Ok(())
    }

    /// Remove a product's line entirely. Removing an absent product is a
    /// no-op.
    pub fn remove_item(&self, product_id: ProductId) {
        self.write().lines.retain(|l| l.product_id != product_id);
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` for zero (a line is removed, never zeroed);
    ///   the prior quantity is left unchanged
    /// - `UnknownProduct` if no line exists for the product
    /// - `InsufficientStock` if the request exceeds the catalog's on-hand
    ///   quantity; the prior quantity is left unchanged
    pub fn update_quantity(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let mut inner = self.write();

        // Stock check only when the live catalog is readable; the pre-flight
        // checkout validation re-checks against the remote API regardless.
        if let CatalogState::Ready(map) = &inner.catalog
            && let Some(product) = map.get(&product_id)
            && quantity > product.stock
        {
            return Err(CartError::InsufficientStock {
                product_id,
                name: product.name.clone(),
                requested: quantity,
                available: product.stock,
            });
        }

        let line = inner
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(CartError::UnknownProduct(product_id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Empty the cart. Used after a successful order placement.
    pub fn clear(&self) {
        self.write().lines.clear();
    }

    // =========================================================================
    // Derived reads
    // =========================================================================

    /// Sum of quantities across lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.read().lines.iter().map(|l| l.quantity).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().lines.is_empty()
    }

    /// Snapshot of the current lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.read().lines.clone()
    }

    /// Cart total after discounts, unrounded.
    #[must_use]
    pub fn cart_total(&self) -> Usd {
        self.read().lines.iter().map(CartLine::total).sum()
    }

    /// Cart total ignoring discounts, unrounded. Used for the "original"
    /// pre-discount amount at checkout and for reporting that excludes
    /// promotional pricing.
    #[must_use]
    pub fn cart_total_without_discount(&self) -> Usd {
        self.read()
            .lines
            .iter()
            .map(CartLine::total_without_discount)
            .sum()
    }

    /// Aggregate figures for display.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        let inner = self.read();
        let total: Usd = inner.lines.iter().map(CartLine::total).sum();
        let total_without_discount: Usd = inner
            .lines
            .iter()
            .map(CartLine::total_without_discount)
            .sum();

        CartTotals {
            total,
            total_without_discount,
            local_total: inner.exchange_rate.map(|rate| total.in_local(rate)),
            item_count: inner.lines.iter().map(|l| l.quantity).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partshub_core::CategoryId;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("valid decimal literal")
    }

    fn product(id: i32, price: i64, discount: &str, stock: u32) -> CatalogProduct {
        CatalogProduct {
            id: ProductId::new(id),
            name: format!("Part {id}"),
            price: Usd::from_dollars(price),
            discount_percent: dec(discount),
            available: true,
            stock,
            category_id: CategoryId::new(1),
        }
    }

    fn loaded_store(products: Vec<CatalogProduct>) -> CartStore {
        let store = CartStore::new();
        store.set_catalog(products);
        store
    }

    #[test]
    fn test_discounted_cart_totals() {
        // $100 at 10% off, qty 2: total $180.00, original $200.00
        let store = loaded_store(vec![product(1, 100, "10", 10)]);
        store.add_item(ProductId::new(1), 2).expect("add");

        let totals = store.totals();
        assert_eq!(totals.total, Usd::from_dollars(180));
        assert_eq!(totals.total_without_discount, Usd::from_dollars(200));
        assert_eq!(totals.savings(), Usd::from_dollars(20));
        assert_eq!(totals.total.display(), "$180.00");
    }

    #[test]
    fn test_savings_never_negative() {
        let store = loaded_store(vec![product(1, 40, "0", 10), product(2, 25, "15", 10)]);
        store.add_item(ProductId::new(1), 1).expect("add");
        store.add_item(ProductId::new(2), 3).expect("add");

        let totals = store.totals();
        assert!(totals.savings() >= Usd::ZERO);
        assert_eq!(
            totals.savings(),
            totals.total_without_discount - totals.total
        );
    }

    #[test]
    fn test_add_same_product_merges_lines() {
        let store = loaded_store(vec![product(1, 10, "0", 10)]);
        store.add_item(ProductId::new(1), 2).expect("add");
        store.add_item(ProductId::new(1), 3).expect("add");

        let lines = store.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.first().map(|l| l.quantity), Some(5));
        assert_eq!(store.count(), 5);
    }

    #[test]
    fn test_add_quantity_saturates_instead_of_wrapping() {
        let store = loaded_store(vec![product(1, 10, "0", 10)]);
        store.add_item(ProductId::new(1), u32::MAX).expect("add");
        store.add_item(ProductId::new(1), 5).expect("add");

        assert_eq!(store.lines().first().map(|l| l.quantity), Some(u32::MAX));
    }

    #[test]
    fn test_add_rejects_zero_quantity() {
        let store = loaded_store(vec![product(1, 10, "0", 10)]);
        assert_eq!(
            store.add_item(ProductId::new(1), 0),
            Err(CartError::InvalidQuantity)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_rejects_unavailable_product() {
        let mut unavailable = product(1, 10, "0", 10);
        unavailable.available = false;
        let out_of_stock = product(2, 10, "0", 0);
        let store = loaded_store(vec![unavailable, out_of_stock]);

        assert!(matches!(
            store.add_item(ProductId::new(1), 1),
            Err(CartError::ProductUnavailable { .. })
        ));
        assert!(matches!(
            store.add_item(ProductId::new(2), 1),
            Err(CartError::ProductUnavailable { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_unknown_product() {
        let store = loaded_store(vec![product(1, 10, "0", 10)]);
        assert_eq!(
            store.add_item(ProductId::new(99), 1),
            Err(CartError::UnknownProduct(ProductId::new(99)))
        );
    }

    #[test]
    fn test_update_quantity_rejects_zero_and_keeps_prior() {
        let store = loaded_store(vec![product(1, 10, "0", 10)]);
        store.add_item(ProductId::new(1), 4).expect("add");

        assert_eq!(
            store.update_quantity(ProductId::new(1), 0),
            Err(CartError::InvalidQuantity)
        );
        assert_eq!(store.count(), 4);
    }

    #[test]
    fn test_update_quantity_rejects_over_stock() {
        let store = loaded_store(vec![product(1, 10, "0", 3)]);
        store.add_item(ProductId::new(1), 2).expect("add");

        let err = store.update_quantity(ProductId::new(1), 5);
        assert_eq!(
            err,
            Err(CartError::InsufficientStock {
                product_id: ProductId::new(1),
                name: "Part 1".to_string(),
                requested: 5,
                available: 3,
            })
        );
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = loaded_store(vec![product(1, 10, "0", 10)]);
        store.add_item(ProductId::new(1), 1).expect("add");

        store.remove_item(ProductId::new(1));
        assert!(store.is_empty());
        // Removing again is a no-op
        store.remove_item(ProductId::new(1));
        assert!(store.is_empty());
    }

    #[test]
    fn test_local_total_omitted_without_rate() {
        let store = loaded_store(vec![product(1, 10, "0", 10)]);
        store.add_item(ProductId::new(1), 1).expect("add");

        assert!(store.totals().local_total.is_none());

        let rate = ExchangeRate::new(dec("36.5")).expect("positive rate");
        store.set_exchange_rate(Some(rate));
        let local = store.totals().local_total.expect("rate is set");
        assert_eq!(local.display(), "Bs 365.00");
    }

    #[test]
    fn test_catalog_failure_keeps_lines_and_snapshot_pricing() {
        let store = loaded_store(vec![product(1, 100, "10", 10)]);
        store.add_item(ProductId::new(1), 2).expect("add");

        store.mark_catalog_failed("connection refused");

        // Lines survive and still price from their snapshots
        assert_eq!(store.count(), 2);
        assert_eq!(store.cart_total(), Usd::from_dollars(180));
        assert!(matches!(store.catalog_state(), CatalogState::Failed(_)));

        // But new adds are rejected until the catalog is back
        assert!(matches!(
            store.add_item(ProductId::new(1), 1),
            Err(CartError::CatalogUnavailable(_))
        ));
    }

    #[test]
    fn test_rounding_once_across_many_lines() {
        // 7 lines of $0.995 after a 0.5% discount on $1.00: each line is
        // unrounded; the displayed total rounds once at the end.
        let store = loaded_store(vec![product(1, 1, "0.5", 100)]);
        store.add_item(ProductId::new(1), 7).expect("add");

        let total = store.cart_total();
        assert_eq!(total.amount(), dec("6.965"));
        assert_eq!(total.display(), "$6.97");
    }
}
