//! Checkout Orchestrator.
//!
//! Converts a validated [`CheckoutDraft`] plus the current cart into a
//! persisted order, exactly once. The workflow is a linear state machine:
//!
//! ```text
//! Idle -> ValidatingStock -> CreatingOrder -> DecrementingStock
//!      -> SubmittingPayment -> CreatingShipment -> Completed
//! ```
//!
//! with `Failed(step)` as an absorbing state reachable from every step.
//! There are no automatic retries and no cross-step rollback: each step's
//! success is a precondition for the next, and a failure at step N leaves
//! steps 1..N-1 committed server-side. Which failures abort the run and
//! which merely warn is the severity table on [`CheckoutStep`], not
//! scattered conditionals.

mod draft;

pub use draft::{CheckoutDraft, DraftField};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use partshub_core::{DeliveryMethod, OrderId, OrderStatus, ProductId};

use crate::api::types::{OrderHeader, OrderLineInput, PaymentSubmission, ShipmentRequest};
use crate::api::{ApiError, PartsBackend};
use crate::cart::{CartLine, CartStore};

/// One step of the checkout workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    ValidatingStock,
    CreatingOrder,
    DecrementingStock,
    SubmittingPayment,
    CreatingShipment,
}

impl CheckoutStep {
    /// The failure policy for this step.
    ///
    /// Stock decrement is the only non-fatal step: once the order exists,
    /// its existence is worth more than strict stock accounting, which
    /// support staff can reconcile manually. Everything else aborts the run
    /// (but never retracts steps already committed).
    #[must_use]
    pub const fn severity(self) -> FailureSeverity {
        match self {
            Self::DecrementingStock => FailureSeverity::Warning,
            Self::ValidatingStock
            | Self::CreatingOrder
            | Self::SubmittingPayment
            | Self::CreatingShipment => FailureSeverity::Fatal,
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ValidatingStock => "stock validation",
            Self::CreatingOrder => "order creation",
            Self::DecrementingStock => "stock update",
            Self::SubmittingPayment => "payment submission",
            Self::CreatingShipment => "shipment creation",
        };
        write!(f, "{name}")
    }
}

/// Whether a step failure aborts the workflow or downgrades to a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSeverity {
    Fatal,
    Warning,
}

/// Observable workflow state, polled by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    Running { step: CheckoutStep },
    Completed { order_id: OrderId },
    Failed { step: CheckoutStep, message: String },
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A transient user-facing notification emitted by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Snapshot of the workflow for rendering progress and toasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutProgress {
    pub state: CheckoutState,
    pub notices: Vec<Notice>,
    pub in_flight: bool,
}

/// A cart line whose requested quantity exceeds current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortage {
    pub product_id: ProductId,
    pub name: String,
    pub requested: u32,
    pub available: u32,
}

fn format_shortages(shortages: &[StockShortage]) -> String {
    shortages
        .iter()
        .map(|s| {
            format!(
                "\"{}\" requested {}, available {}",
                s.name, s.requested, s.available
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors terminating a checkout run.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A required field is missing; reported before any network call.
    #[error("missing required field: {0}")]
    Validation(DraftField),

    /// Nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// A run is already in flight for this session.
    #[error("checkout already in progress")]
    AlreadyRunning,

    /// Pre-flight stock validation found at least one short line. No remote
    /// mutation has occurred.
    #[error("insufficient stock: {}", format_shortages(.0))]
    InsufficientStock(Vec<StockShortage>),

    /// A remote call failed at a fatal step.
    #[error("{step} failed: {source}")]
    Remote {
        step: CheckoutStep,
        #[source]
        source: ApiError,
    },
}

/// Clears the in-flight flag when the run ends, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        (!flag.swap(true, Ordering::SeqCst)).then(|| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives the cart-to-order workflow against a [`PartsBackend`].
///
/// Cheaply cloneable; all shared pieces sit behind `Arc`. The in-flight
/// flag is the only concurrency control: a second `submit` while one is
/// running is rejected locally, mirroring a disabled submit button.
#[derive(Clone)]
pub struct CheckoutOrchestrator<B> {
    backend: B,
    cart: CartStore,
    pickup_address: Arc<str>,
    progress: Arc<RwLock<CheckoutProgress>>,
    in_flight: Arc<AtomicBool>,
}

impl<B: PartsBackend> CheckoutOrchestrator<B> {
    /// Create an orchestrator over the given backend and cart store.
    ///
    /// `pickup_address` is the fixed label used as the shipping address for
    /// store-pickup orders.
    #[must_use]
    pub fn new(backend: B, cart: CartStore, pickup_address: impl Into<Arc<str>>) -> Self {
        Self {
            backend,
            cart,
            pickup_address: pickup_address.into(),
            progress: Arc::new(RwLock::new(CheckoutProgress {
                state: CheckoutState::Idle,
                notices: Vec::new(),
                in_flight: false,
            })),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Snapshot of the observable workflow state.
    #[must_use]
    pub fn progress(&self) -> CheckoutProgress {
        let mut progress = self
            .progress
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        progress.in_flight = self.in_flight.load(Ordering::SeqCst);
        progress
    }

    fn set_state(&self, state: CheckoutState) {
        self.progress
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .state = state;
    }

    fn push_notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.progress
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .notices
            .push(Notice {
                level,
                message: message.into(),
            });
    }

    fn reset_progress(&self) {
        let mut progress = self.progress.write().unwrap_or_else(PoisonError::into_inner);
        progress.state = CheckoutState::Idle;
        progress.notices.clear();
    }

    /// Record a fatal step failure: move to `Failed`, surface a toast, and
    /// build the terminating error.
    fn fail(&self, step: CheckoutStep, source: ApiError) -> CheckoutError {
        let message = source.to_string();
        tracing::error!(step = %step, error = %message, "checkout step failed");
        self.set_state(CheckoutState::Failed {
            step,
            message: message.clone(),
        });
        self.push_notice(NoticeLevel::Error, format!("The {step} failed: {message}"));
        CheckoutError::Remote { step, source }
    }

    /// Record a downgraded step failure: warn and let the run continue.
    fn warn(&self, step: CheckoutStep, source: &ApiError) {
        tracing::warn!(step = %step, error = %source, "non-fatal checkout step failed");
        self.push_notice(
            NoticeLevel::Warning,
            format!("Order created, but the {step} failed; it will be reconciled manually"),
        );
    }

    /// Apply the severity table to a failed step.
    ///
    /// # Errors
    ///
    /// Fatal steps terminate the run with `Remote`; warning steps push a
    /// notice and return `Ok(())` so the caller continues.
    fn handle_failure(&self, step: CheckoutStep, source: ApiError) -> Result<(), CheckoutError> {
        match step.severity() {
            FailureSeverity::Fatal => Err(self.fail(step, source)),
            FailureSeverity::Warning => {
                self.warn(step, &source);
                Ok(())
            }
        }
    }

    /// Reject locally without advancing past `Idle`.
    fn reject_local(&self, error: CheckoutError) -> CheckoutError {
        self.push_notice(NoticeLevel::Error, error.to_string());
        error
    }

    /// Run the one-shot cart-to-order workflow.
    ///
    /// # Errors
    ///
    /// Local preconditions (`Validation`, `EmptyCart`, `AlreadyRunning`)
    /// and pre-flight `InsufficientStock` fail before anything is committed
    /// remotely. A `Remote` error at a fatal step leaves earlier steps
    /// committed server-side; nothing is rolled back.
    #[instrument(skip(self, draft), fields(delivery = %draft.delivery))]
    pub async fn submit(&self, draft: CheckoutDraft) -> Result<OrderId, CheckoutError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return Err(CheckoutError::AlreadyRunning);
        };

        self.reset_progress();

        if let Err(field) = draft.validate() {
            return Err(self.reject_local(CheckoutError::Validation(field)));
        }
        // validate() guarantees a method is selected
        let Some(method) = draft.payment_method.clone() else {
            return Err(self.reject_local(CheckoutError::Validation(DraftField::PaymentMethod)));
        };

        let lines = self.cart.lines();
        if lines.is_empty() {
            return Err(self.reject_local(CheckoutError::EmptyCart));
        }
        // Order total is derived before the cart is cleared on success
        let total = self.cart.cart_total();

        // Step 1: re-validate stock against the authoritative source. Cart
        // quantities were chosen against a possibly stale catalog snapshot.
        self.set_state(CheckoutState::Running {
            step: CheckoutStep::ValidatingStock,
        });
        let mut shortages = Vec::new();
        for line in &lines {
            let level = match self.backend.get_product_stock(line.product_id).await {
                Ok(level) => level,
                Err(e) => {
                    self.handle_failure(CheckoutStep::ValidatingStock, e)?;
                    // downgraded: this line cannot be checked locally, so
                    // leave it to the server-side checks at order creation
                    continue;
                }
            };
            if line.quantity > level.stock {
                shortages.push(StockShortage {
                    product_id: line.product_id,
                    name: line.snapshot.name.clone(),
                    requested: line.quantity,
                    available: level.stock,
                });
            }
        }
        if !shortages.is_empty() {
            let error = CheckoutError::InsufficientStock(shortages);
            let message = error.to_string();
            self.set_state(CheckoutState::Failed {
                step: CheckoutStep::ValidatingStock,
                message: message.clone(),
            });
            self.push_notice(NoticeLevel::Error, message);
            return Err(error);
        }

        // Step 2: create the order header and lines. Lines carry product id
        // and quantity only; the server recomputes prices.
        self.set_state(CheckoutState::Running {
            step: CheckoutStep::CreatingOrder,
        });
        let header = OrderHeader {
            delivery: draft.delivery,
            status: OrderStatus::PendingPaymentVerification,
            paid: false,
            buyer: draft.buyer,
        };
        let order_lines: Vec<OrderLineInput> = lines
            .iter()
            .map(|l| OrderLineInput {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect();
        let order_id = match self.backend.create_order(&header, &order_lines).await {
            Ok(order_id) => order_id,
            Err(e) => {
                return Err(match CheckoutStep::CreatingOrder.severity() {
                    // every later step needs the order id, so even a
                    // downgraded failure here ends the run
                    FailureSeverity::Fatal | FailureSeverity::Warning => {
                        self.fail(CheckoutStep::CreatingOrder, e)
                    }
                });
            }
        };
        tracing::info!(order_id = %order_id, "order created");

        // Step 3: stock decrement. The severity table decides whether a
        // failure here aborts the run or downgrades to a warning.
        self.set_state(CheckoutState::Running {
            step: CheckoutStep::DecrementingStock,
        });
        for line in &lines {
            if let Err(e) = self.decrement_line(line).await {
                self.handle_failure(CheckoutStep::DecrementingStock, e)?;
            }
        }

        // Step 4: submit payment against the new order.
        self.set_state(CheckoutState::Running {
            step: CheckoutStep::SubmittingPayment,
        });
        let submission = PaymentSubmission {
            method_id: method.id,
            amount: total,
            reference: if method.kind.requires_reference() {
                draft.reference.clone()
            } else {
                None
            },
            proof: draft.proof.clone(),
        };
        if let Err(e) = self.backend.create_payment(order_id, submission).await {
            self.handle_failure(CheckoutStep::SubmittingPayment, e)?;
        }

        // Step 5: create the shipping record.
        self.set_state(CheckoutState::Running {
            step: CheckoutStep::CreatingShipment,
        });
        let shipment = self.build_shipment(order_id, &draft);
        if let Err(e) = self.backend.create_shipment(&shipment).await {
            self.handle_failure(CheckoutStep::CreatingShipment, e)?;
        }

        // Completed: the cart empties and the user is sent to the order view.
        self.cart.clear();
        self.push_notice(NoticeLevel::Success, format!("Order {order_id} placed"));
        self.set_state(CheckoutState::Completed { order_id });
        Ok(order_id)
    }

    /// Fetch-then-write one line's stock decrement.
    async fn decrement_line(&self, line: &CartLine) -> Result<(), ApiError> {
        let level = self.backend.get_product_stock(line.product_id).await?;
        let new_stock = level.stock.saturating_sub(line.quantity);
        self.backend
            .update_product_stock(line.product_id, new_stock)
            .await
    }

    /// Compose the shipping record for the chosen delivery method.
    fn build_shipment(&self, order_id: OrderId, draft: &CheckoutDraft) -> ShipmentRequest {
        let (address, carrier, recipient) = match draft.delivery {
            DeliveryMethod::Pickup => (self.pickup_address.to_string(), None, None),
            DeliveryMethod::LocalShipping => {
                (draft.address.clone().unwrap_or_default(), None, None)
            }
            DeliveryMethod::NationalShipping => {
                let carrier = draft.carrier.clone().unwrap_or_default();
                let branch = draft.branch_address.clone().unwrap_or_default();
                (
                    format!("{carrier} - {branch}"),
                    Some(carrier),
                    draft.recipient.clone(),
                )
            }
        };

        ShipmentRequest {
            order_id,
            delivery: draft.delivery,
            address,
            carrier,
            recipient,
        }
    }
}
