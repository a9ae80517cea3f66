//! Checkout draft and its local validation.
//!
//! The draft is assembled from form state by the presentation layer and
//! consumed exactly once by [`super::CheckoutOrchestrator::submit`]. Every
//! precondition here is enforced before any network call: a validation
//! failure never leaves the process.

use partshub_core::{DeliveryMethod, UserId};

use crate::api::types::{PaymentMethod, ProofOfPayment, RecipientIdentity};

/// A required checkout field that was missing or empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    PaymentMethod,
    ReferenceNumber,
    DeliveryAddress,
    Carrier,
    BranchAddress,
    RecipientFirstName,
    RecipientLastName,
    RecipientNationalId,
    RecipientPhone,
}

impl std::fmt::Display for DraftField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PaymentMethod => "payment method",
            Self::ReferenceNumber => "reference number",
            Self::DeliveryAddress => "delivery address",
            Self::Carrier => "carrier",
            Self::BranchAddress => "branch address",
            Self::RecipientFirstName => "recipient first name",
            Self::RecipientLastName => "recipient last name",
            Self::RecipientNationalId => "recipient national ID",
            Self::RecipientPhone => "recipient phone",
        };
        write!(f, "{name}")
    }
}

/// Transient, not-yet-submitted checkout choices.
///
/// Fields mirror the checkout form, so most are optional at the type level;
/// [`CheckoutDraft::validate`] enforces which are required for the chosen
/// delivery and payment methods.
#[derive(Debug, Clone)]
pub struct CheckoutDraft {
    pub buyer: UserId,
    pub delivery: DeliveryMethod,
    /// Free-text address; required for local shipping.
    pub address: Option<String>,
    /// Carrier name; required for national shipping.
    pub carrier: Option<String>,
    /// Carrier branch office address; required for national shipping.
    pub branch_address: Option<String>,
    /// Set when someone other than the buyer collects a national shipment.
    pub recipient: Option<RecipientIdentity>,
    pub payment_method: Option<PaymentMethod>,
    /// Bank reference number; required for non-cash payment methods.
    pub reference: Option<String>,
    pub proof: Option<ProofOfPayment>,
}

fn filled(value: Option<&String>) -> bool {
    value.is_some_and(|s| !s.trim().is_empty())
}

impl CheckoutDraft {
    /// Check every local precondition, returning the first missing field.
    ///
    /// # Errors
    ///
    /// Returns the offending [`DraftField`]. The caller reports it without
    /// advancing past `Idle`.
    pub fn validate(&self) -> Result<(), DraftField> {
        let Some(method) = &self.payment_method else {
            return Err(DraftField::PaymentMethod);
        };

        if method.kind.requires_reference() && !filled(self.reference.as_ref()) {
            return Err(DraftField::ReferenceNumber);
        }

        match self.delivery {
            DeliveryMethod::Pickup => {}
            DeliveryMethod::LocalShipping => {
                if !filled(self.address.as_ref()) {
                    return Err(DraftField::DeliveryAddress);
                }
            }
            DeliveryMethod::NationalShipping => {
                if !filled(self.carrier.as_ref()) {
                    return Err(DraftField::Carrier);
                }
                if !filled(self.branch_address.as_ref()) {
                    return Err(DraftField::BranchAddress);
                }
                if let Some(recipient) = &self.recipient {
                    if recipient.first_name.trim().is_empty() {
                        return Err(DraftField::RecipientFirstName);
                    }
                    if recipient.last_name.trim().is_empty() {
                        return Err(DraftField::RecipientLastName);
                    }
                    if recipient.national_id.trim().is_empty() {
                        return Err(DraftField::RecipientNationalId);
                    }
                    if recipient.phone.trim().is_empty() {
                        return Err(DraftField::RecipientPhone);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partshub_core::{PaymentKind, PaymentMethodId};

    fn method(kind: PaymentKind) -> PaymentMethod {
        PaymentMethod {
            id: PaymentMethodId::new(1),
            name: "test method".to_string(),
            kind,
        }
    }

    fn pickup_cash_draft() -> CheckoutDraft {
        CheckoutDraft {
            buyer: UserId::new(7),
            delivery: DeliveryMethod::Pickup,
            address: None,
            carrier: None,
            branch_address: None,
            recipient: None,
            payment_method: Some(method(PaymentKind::Cash)),
            reference: None,
            proof: None,
        }
    }

    #[test]
    fn test_cash_pickup_needs_nothing_else() {
        assert_eq!(pickup_cash_draft().validate(), Ok(()));
    }

    #[test]
    fn test_payment_method_is_mandatory() {
        let mut draft = pickup_cash_draft();
        draft.payment_method = None;
        assert_eq!(draft.validate(), Err(DraftField::PaymentMethod));
    }

    #[test]
    fn test_transfer_requires_reference() {
        let mut draft = pickup_cash_draft();
        draft.payment_method = Some(method(PaymentKind::Transfer));
        assert_eq!(draft.validate(), Err(DraftField::ReferenceNumber));

        draft.reference = Some("   ".to_string());
        assert_eq!(draft.validate(), Err(DraftField::ReferenceNumber));

        draft.reference = Some("00012345".to_string());
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn test_local_shipping_requires_address() {
        let mut draft = pickup_cash_draft();
        draft.delivery = DeliveryMethod::LocalShipping;
        assert_eq!(draft.validate(), Err(DraftField::DeliveryAddress));

        draft.address = Some("Av. Principal 123".to_string());
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn test_national_shipping_requires_carrier_and_branch() {
        let mut draft = pickup_cash_draft();
        draft.delivery = DeliveryMethod::NationalShipping;
        assert_eq!(draft.validate(), Err(DraftField::Carrier));

        draft.carrier = Some("MRW".to_string());
        assert_eq!(draft.validate(), Err(DraftField::BranchAddress));

        draft.branch_address = Some("Branch 42, Valencia".to_string());
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn test_proxy_recipient_requires_all_identity_fields() {
        let mut draft = pickup_cash_draft();
        draft.delivery = DeliveryMethod::NationalShipping;
        draft.carrier = Some("MRW".to_string());
        draft.branch_address = Some("Branch 42".to_string());
        draft.recipient = Some(RecipientIdentity {
            first_name: "Ana".to_string(),
            last_name: String::new(),
            national_id: "V-12345678".to_string(),
            phone: "0414-1234567".to_string(),
        });
        assert_eq!(draft.validate(), Err(DraftField::RecipientLastName));

        if let Some(recipient) = draft.recipient.as_mut() {
            recipient.last_name = "Pérez".to_string();
        }
        assert_eq!(draft.validate(), Ok(()));
    }
}
