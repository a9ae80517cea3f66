//! Wire types for the PartsHub remote API.
//!
//! These mirror the JSON payloads of the parts API. Monetary fields use
//! `rust_decimal` via the `serde-with-str` feature, so amounts travel as
//! strings and never touch floating point.

use partshub_core::{
    CarrierId, CategoryId, DeliveryMethod, ExchangeRate, OrderId, OrderStatus, PaymentKind,
    PaymentMethodId, ProductId, UserId, Usd,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product as served by the catalog endpoint.
///
/// Read-only from the storefront's perspective; mutations happen through the
/// back-office, which is a separate surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    /// Base unit price in USD before any discount.
    pub price: Usd,
    /// Percentage discount (0-100) applied multiplicatively to `price`.
    #[serde(default)]
    pub discount_percent: Decimal,
    /// Whether the product may be sold at all.
    pub available: bool,
    /// On-hand quantity at the time the catalog was fetched.
    pub stock: u32,
    pub category_id: CategoryId,
}

impl CatalogProduct {
    /// Unit price after discount, unrounded.
    #[must_use]
    pub fn effective_price(&self) -> Usd {
        self.price.with_discount(self.discount_percent)
    }

    /// Whether the product can currently be added to a cart.
    #[must_use]
    pub const fn sellable(&self) -> bool {
        self.available && self.stock > 0
    }
}

/// Response from the stock endpoint for a single product.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub stock: u32,
}

/// Response from the exchange-rate service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExchangeRateQuote {
    /// Local-currency units per US dollar (BCV average).
    pub average_rate: Decimal,
}

impl ExchangeRateQuote {
    /// The usable rate, or `None` when the service reported a non-positive
    /// value. Callers must omit local-currency figures in that case.
    #[must_use]
    pub fn rate(&self) -> Option<ExchangeRate> {
        ExchangeRate::new(self.average_rate)
    }
}

/// A payment method the store accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub name: String,
    pub kind: PaymentKind,
}

/// A national shipping carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Carrier {
    pub id: CarrierId,
    pub name: String,
}

/// Order header submitted at checkout.
///
/// Prices are deliberately absent: the server recomputes them from its own
/// catalog rather than trusting the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHeader {
    pub delivery: DeliveryMethod,
    pub status: OrderStatus,
    pub paid: bool,
    pub buyer: UserId,
}

/// One order line: product reference and quantity only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Response from order creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: OrderId,
}

/// An uploaded proof-of-payment attachment (image or document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOfPayment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Payment details submitted against a freshly created order.
///
/// Sent as multipart form data because of the optional binary attachment;
/// everything else on this API is plain JSON.
#[derive(Debug, Clone)]
pub struct PaymentSubmission {
    pub method_id: PaymentMethodId,
    pub amount: Usd,
    /// Bank reference number; omitted for cash payments.
    pub reference: Option<String>,
    pub proof: Option<ProofOfPayment>,
}

/// Identity of the person collecting a national shipment when it is not the
/// buyer (pickup by proxy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientIdentity {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub phone: String,
}

/// Shipping record created as the final checkout step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub order_id: OrderId,
    pub delivery: DeliveryMethod,
    /// Resolved address text: fixed label for pickup, free-text for local
    /// delivery, `"{carrier} - {branch}"` for national shipments.
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<RecipientIdentity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn product(available: bool, stock: u32) -> CatalogProduct {
        CatalogProduct {
            id: ProductId::new(1),
            name: "Oil filter".to_string(),
            price: Usd::from_dollars(12),
            discount_percent: Decimal::ZERO,
            available,
            stock,
            category_id: CategoryId::new(3),
        }
    }

    #[test]
    fn test_sellable_requires_availability_and_stock() {
        assert!(product(true, 5).sellable());
        assert!(!product(false, 5).sellable());
        assert!(!product(true, 0).sellable());
    }

    #[test]
    fn test_effective_price_applies_discount() {
        let mut p = product(true, 5);
        p.discount_percent = Decimal::from(25);
        assert_eq!(p.effective_price(), Usd::from_dollars(9));
    }

    #[test]
    fn test_zero_rate_quote_yields_no_rate() {
        let quote = ExchangeRateQuote {
            average_rate: Decimal::ZERO,
        };
        assert!(quote.rate().is_none());

        let quote = ExchangeRateQuote {
            average_rate: Decimal::from_str("36.52").expect("valid decimal"),
        };
        assert!(quote.rate().is_some());
    }
}
