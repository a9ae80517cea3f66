//! Cache types for parts API read-side responses.

use super::types::{Carrier, CatalogProduct, PaymentMethod};

/// Cache key for read-side API responses.
///
/// Stock levels are deliberately never cached: checkout re-validates them
/// pre-flight precisely because cached quantities go stale.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Catalog,
    PaymentMethods,
    Carriers,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Catalog(Vec<CatalogProduct>),
    PaymentMethods(Vec<PaymentMethod>),
    Carriers(Vec<Carrier>),
}
