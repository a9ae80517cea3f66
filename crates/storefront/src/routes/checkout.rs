//! Checkout route handlers.
//!
//! `submit` is the single entry point into the order-placement workflow;
//! `status` exposes the observable state (current step, notices, in-flight
//! flag) that the presentation layer polls for progress and toasts.

use axum::{Json, extract::State};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use partshub_core::{DeliveryMethod, OrderId, PaymentMethodId, UserId};

use crate::api::PartsBackend;
use crate::api::types::{Carrier, PaymentMethod, ProofOfPayment, RecipientIdentity};
use crate::checkout::{CheckoutDraft, CheckoutProgress};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Proof-of-payment upload, carried as a base64 data payload.
///
/// The UI captures the file as a preview data URL; we reconstruct the bytes
/// here before handing them to the multipart payment submission.
#[derive(Debug, Deserialize)]
pub struct ProofUpload {
    pub file_name: String,
    pub content_type: String,
    pub data_base64: String,
}

/// Checkout submission body, mirroring the checkout form.
///
/// Only the payment method's id crosses the boundary; its kind (and with it
/// the reference-number requirement) is resolved against the server-side
/// method list, never trusted from the client.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub buyer: UserId,
    pub delivery: DeliveryMethod,
    pub address: Option<String>,
    pub carrier: Option<String>,
    pub branch_address: Option<String>,
    pub recipient: Option<RecipientIdentity>,
    pub payment_method_id: Option<PaymentMethodId>,
    pub reference: Option<String>,
    pub proof: Option<ProofUpload>,
}

/// Look up the submitted method id in the accepted-method list.
fn resolve_payment_method(
    methods: Vec<PaymentMethod>,
    method_id: PaymentMethodId,
) -> Result<PaymentMethod> {
    methods
        .into_iter()
        .find(|m| m.id == method_id)
        .ok_or_else(|| AppError::BadRequest(format!("unknown payment method {method_id}")))
}

/// Response for a successfully placed order.
#[derive(Debug, Serialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
}

/// Run the checkout workflow for the current cart.
#[instrument(skip(state, form))]
pub async fn submit(
    State(state): State<AppState>,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<OrderPlaced>> {
    let proof = form
        .proof
        .map(|upload| -> Result<ProofOfPayment> {
            let bytes = BASE64
                .decode(upload.data_base64.as_bytes())
                .map_err(|e| AppError::BadRequest(format!("invalid proof payload: {e}")))?;
            Ok(ProofOfPayment {
                file_name: upload.file_name,
                content_type: upload.content_type,
                bytes,
            })
        })
        .transpose()?;

    let payment_method = match form.payment_method_id {
        Some(method_id) => {
            let methods = state.api().get_payment_methods().await?;
            Some(resolve_payment_method(methods, method_id)?)
        }
        // Left for draft validation to report as the missing field
        None => None,
    };

    let draft = CheckoutDraft {
        buyer: form.buyer,
        delivery: form.delivery,
        address: form.address,
        carrier: form.carrier,
        branch_address: form.branch_address,
        recipient: form.recipient,
        payment_method,
        reference: form.reference,
        proof,
    };

    let order_id = state.checkout().submit(draft).await?;
    Ok(Json(OrderPlaced { order_id }))
}

/// Observable workflow state for progress rendering.
#[instrument(skip(state))]
pub async fn status(State(state): State<AppState>) -> Json<CheckoutProgress> {
    Json(state.checkout().progress())
}

/// Payment methods the store accepts.
#[instrument(skip(state))]
pub async fn payment_methods(State(state): State<AppState>) -> Result<Json<Vec<PaymentMethod>>> {
    Ok(Json(state.api().get_payment_methods().await?))
}

/// National shipping carriers.
#[instrument(skip(state))]
pub async fn carriers(State(state): State<AppState>) -> Result<Json<Vec<Carrier>>> {
    Ok(Json(state.api().get_shipping_companies().await?))
}
