//! Status and delivery enums shared across the storefront.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Wire values match the parts API, which stores them as display phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Initial status for every order placed through checkout.
    #[default]
    #[serde(rename = "pending payment verification")]
    PendingPaymentVerification,
    #[serde(rename = "payment verified")]
    PaymentVerified,
    #[serde(rename = "preparing")]
    Preparing,
    #[serde(rename = "shipped")]
    Shipped,
    #[serde(rename = "delivered")]
    Delivered,
    #[serde(rename = "cancelled")]
    Cancelled,
}

/// How the buyer receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Collected at the store counter.
    Pickup,
    /// Courier delivery within the city.
    LocalShipping,
    /// Carrier shipment to a branch office elsewhere in the country.
    NationalShipping,
}

impl std::fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pickup => write!(f, "pickup"),
            Self::LocalShipping => write!(f, "local_shipping"),
            Self::NationalShipping => write!(f, "national_shipping"),
        }
    }
}

/// Payment method families the store accepts.
///
/// Cash is the only family that needs no reference number at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Cash,
    Transfer,
    MobilePayment,
    Zelle,
}

impl PaymentKind {
    /// Whether checkout must collect a bank reference number.
    #[must_use]
    pub const fn requires_reference(self) -> bool {
        !matches!(self, Self::Cash)
    }
}
