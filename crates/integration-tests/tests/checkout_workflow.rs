//! End-to-end checkout workflow tests against a scripted backend.
//!
//! Each test drives [`CheckoutOrchestrator::submit`] through a
//! [`MockBackend`] and asserts on the observable state, the toasts, and the
//! exact sequence of backend calls.

use partshub_core::{DeliveryMethod, ProductId, UserId, Usd};
use partshub_storefront::api::types::{OrderLineInput, RecipientIdentity};
use partshub_storefront::cart::CartStore;
use partshub_storefront::checkout::{
    CheckoutError, CheckoutOrchestrator, CheckoutState, CheckoutStep, DraftField, NoticeLevel,
};

use partshub_integration_tests::fixtures::{self, cash, pickup_draft, transfer};
use partshub_integration_tests::{MockBackend, MockCall};

const PICKUP_LABEL: &str = "PartsHub store - pickup counter";

fn orchestrator(backend: MockBackend, cart: CartStore) -> CheckoutOrchestrator<MockBackend> {
    CheckoutOrchestrator::new(backend, cart, PICKUP_LABEL)
}

/// A cart holding 2 units of product 1 ($100 at 10% off), backed by 10 units
/// of remote stock.
fn discounted_cart(backend: &MockBackend) -> CartStore {
    let cart = CartStore::new();
    cart.set_catalog(vec![fixtures::product(1, 100, 10, 10)]);
    cart.add_item(ProductId::new(1), 2).expect("add to cart");
    backend.set_stock(ProductId::new(1), 10);
    cart
}

#[tokio::test]
async fn cash_pickup_order_completes_and_clears_cart() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    let checkout = orchestrator(backend.clone(), cart.clone());

    let order_id = checkout
        .submit(pickup_draft(cash()))
        .await
        .expect("checkout succeeds");

    let progress = checkout.progress();
    assert_eq!(progress.state, CheckoutState::Completed { order_id });
    assert!(!progress.in_flight);
    assert!(
        progress
            .notices
            .iter()
            .any(|n| n.level == NoticeLevel::Success)
    );

    assert!(cart.is_empty());

    assert_eq!(
        backend.calls(),
        vec![
            MockCall::GetStock(ProductId::new(1)),
            MockCall::CreateOrder {
                buyer: UserId::new(7),
                lines: vec![OrderLineInput {
                    product_id: ProductId::new(1),
                    quantity: 2,
                }],
            },
            MockCall::GetStock(ProductId::new(1)),
            MockCall::UpdateStock {
                product_id: ProductId::new(1),
                new_stock: 8,
            },
            MockCall::CreatePayment {
                order_id,
                // $100 at 10% off, qty 2
                amount: Usd::from_dollars(180),
                reference: None,
                has_proof: false,
            },
            MockCall::CreateShipment {
                address: PICKUP_LABEL.to_string(),
                carrier: None,
                has_recipient: false,
            },
        ]
    );
}

#[tokio::test]
async fn short_stock_aborts_before_any_mutation() {
    let backend = MockBackend::new();
    let cart = CartStore::new();
    cart.set_catalog(vec![fixtures::product(1, 100, 0, 5)]);
    cart.add_item(ProductId::new(1), 5).expect("add to cart");
    // The remote quantity dropped after the cart was filled
    backend.set_stock(ProductId::new(1), 3);
    let checkout = orchestrator(backend.clone(), cart.clone());

    let err = checkout
        .submit(pickup_draft(cash()))
        .await
        .expect_err("stock validation fails");

    let CheckoutError::InsufficientStock(shortages) = err else {
        panic!("expected InsufficientStock, got {err}");
    };
    assert_eq!(shortages.len(), 1);
    assert_eq!(shortages[0].requested, 5);
    assert_eq!(shortages[0].available, 3);

    assert!(matches!(
        checkout.progress().state,
        CheckoutState::Failed {
            step: CheckoutStep::ValidatingStock,
            ..
        }
    ));

    // No order was created and the cart is untouched
    assert!(!backend.order_created());
    assert_eq!(backend.calls(), vec![MockCall::GetStock(ProductId::new(1))]);
    assert_eq!(cart.count(), 5);
}

#[tokio::test]
async fn stock_fetch_failure_is_fatal() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    backend.fail_stock_fetch();
    let checkout = orchestrator(backend.clone(), cart.clone());

    let err = checkout
        .submit(pickup_draft(cash()))
        .await
        .expect_err("validation step fails");

    assert!(matches!(
        err,
        CheckoutError::Remote {
            step: CheckoutStep::ValidatingStock,
            ..
        }
    ));
    assert!(!backend.order_created());
    assert_eq!(cart.count(), 2);
}

#[tokio::test]
async fn stock_decrement_failure_downgrades_to_warning() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    backend.fail_update_stock();
    let checkout = orchestrator(backend.clone(), cart.clone());

    let order_id = checkout
        .submit(pickup_draft(cash()))
        .await
        .expect("order still completes");

    let progress = checkout.progress();
    assert_eq!(progress.state, CheckoutState::Completed { order_id });
    assert!(
        progress
            .notices
            .iter()
            .any(|n| n.level == NoticeLevel::Warning)
    );

    // Payment and shipment still ran after the failed decrement
    let calls = backend.calls();
    assert!(
        calls
            .iter()
            .any(|c| matches!(c, MockCall::CreatePayment { .. }))
    );
    assert!(
        calls
            .iter()
            .any(|c| matches!(c, MockCall::CreateShipment { .. }))
    );
    assert!(cart.is_empty());
}

#[tokio::test]
async fn transfer_without_reference_is_rejected_locally() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    let checkout = orchestrator(backend.clone(), cart.clone());

    let err = checkout
        .submit(pickup_draft(transfer()))
        .await
        .expect_err("missing reference");

    assert!(matches!(
        err,
        CheckoutError::Validation(DraftField::ReferenceNumber)
    ));

    // Rejected before any network call; the run never left Idle
    assert!(backend.calls().is_empty());
    assert_eq!(checkout.progress().state, CheckoutState::Idle);
    assert_eq!(cart.count(), 2);
}

#[tokio::test]
async fn transfer_reference_is_forwarded_to_payment() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    let checkout = orchestrator(backend.clone(), cart);

    let mut draft = pickup_draft(transfer());
    draft.reference = Some("00012345".to_string());
    checkout.submit(draft).await.expect("checkout succeeds");

    let reference = backend.calls().into_iter().find_map(|c| match c {
        MockCall::CreatePayment { reference, .. } => Some(reference),
        _ => None,
    });
    assert_eq!(reference, Some(Some("00012345".to_string())));
}

#[tokio::test]
async fn order_creation_failure_stops_the_run() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    backend.fail_create_order();
    let checkout = orchestrator(backend.clone(), cart.clone());

    let err = checkout
        .submit(pickup_draft(cash()))
        .await
        .expect_err("order creation fails");

    assert!(matches!(
        err,
        CheckoutError::Remote {
            step: CheckoutStep::CreatingOrder,
            ..
        }
    ));

    // Nothing past the order step ran
    let calls = backend.calls();
    assert!(
        !calls
            .iter()
            .any(|c| matches!(c, MockCall::UpdateStock { .. }))
    );
    assert!(
        !calls
            .iter()
            .any(|c| matches!(c, MockCall::CreatePayment { .. }))
    );
    assert_eq!(cart.count(), 2);
}

#[tokio::test]
async fn payment_failure_leaves_order_committed_and_cart_intact() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    backend.fail_create_payment();
    let checkout = orchestrator(backend.clone(), cart.clone());

    let err = checkout
        .submit(pickup_draft(cash()))
        .await
        .expect_err("payment fails");

    assert!(matches!(
        err,
        CheckoutError::Remote {
            step: CheckoutStep::SubmittingPayment,
            ..
        }
    ));
    assert!(matches!(
        checkout.progress().state,
        CheckoutState::Failed {
            step: CheckoutStep::SubmittingPayment,
            ..
        }
    ));

    // The order exists server-side; there is no rollback
    assert!(backend.order_created());
    // And the cart is kept so the user can retry
    assert_eq!(cart.count(), 2);
}

#[tokio::test]
async fn shipment_failure_is_fatal() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    backend.fail_create_shipment();
    let checkout = orchestrator(backend.clone(), cart.clone());

    let err = checkout
        .submit(pickup_draft(cash()))
        .await
        .expect_err("shipment fails");

    assert!(matches!(
        err,
        CheckoutError::Remote {
            step: CheckoutStep::CreatingShipment,
            ..
        }
    ));
    assert!(backend.order_created());
    assert_eq!(cart.count(), 2);
}

#[tokio::test]
async fn national_shipment_carries_carrier_branch_and_recipient() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    let checkout = orchestrator(backend.clone(), cart);

    let mut draft = pickup_draft(cash());
    draft.delivery = DeliveryMethod::NationalShipping;
    draft.carrier = Some("MRW".to_string());
    draft.branch_address = Some("Branch 42, Valencia".to_string());
    draft.recipient = Some(RecipientIdentity {
        first_name: "Ana".to_string(),
        last_name: "Pérez".to_string(),
        national_id: "V-12345678".to_string(),
        phone: "0414-1234567".to_string(),
    });

    checkout.submit(draft).await.expect("checkout succeeds");

    let shipment = backend.calls().into_iter().find_map(|c| match c {
        MockCall::CreateShipment {
            address,
            carrier,
            has_recipient,
        } => Some((address, carrier, has_recipient)),
        _ => None,
    });
    assert_eq!(
        shipment,
        Some((
            "MRW - Branch 42, Valencia".to_string(),
            Some("MRW".to_string()),
            true,
        ))
    );
}

#[tokio::test]
async fn local_shipment_uses_the_given_address() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    let checkout = orchestrator(backend.clone(), cart);

    let mut draft = pickup_draft(cash());
    draft.delivery = DeliveryMethod::LocalShipping;
    draft.address = Some("Av. Principal 123".to_string());

    checkout.submit(draft).await.expect("checkout succeeds");

    let address = backend.calls().into_iter().find_map(|c| match c {
        MockCall::CreateShipment { address, .. } => Some(address),
        _ => None,
    });
    assert_eq!(address, Some("Av. Principal 123".to_string()));
}

#[tokio::test]
async fn second_submit_is_rejected_while_one_is_in_flight() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    backend.gate_stock_fetch();
    let checkout = orchestrator(backend.clone(), cart);

    // First submit parks inside the backend's stock fetch
    let first = {
        let checkout = checkout.clone();
        tokio::spawn(async move { checkout.submit(pickup_draft(cash())).await })
    };
    while backend.calls().is_empty() {
        tokio::task::yield_now().await;
    }
    assert!(checkout.progress().in_flight);

    let err = checkout
        .submit(pickup_draft(cash()))
        .await
        .expect_err("a run is already in flight");
    assert!(matches!(err, CheckoutError::AlreadyRunning));

    // The rejected submit did not disturb the running one
    backend.release_stock_fetch();
    let order_id = first
        .await
        .expect("task completes")
        .expect("first submit succeeds");
    let progress = checkout.progress();
    assert_eq!(progress.state, CheckoutState::Completed { order_id });
    assert!(!progress.in_flight);
}

#[tokio::test]
async fn in_flight_flag_clears_after_a_failed_run() {
    let backend = MockBackend::new();
    let cart = discounted_cart(&backend);
    backend.fail_create_order();
    let checkout = orchestrator(backend.clone(), cart);

    let err = checkout
        .submit(pickup_draft(cash()))
        .await
        .expect_err("order creation fails");
    assert!(matches!(
        err,
        CheckoutError::Remote {
            step: CheckoutStep::CreatingOrder,
            ..
        }
    ));
    assert!(!checkout.progress().in_flight);

    // A retry is admitted rather than rejected as already running
    let err = checkout
        .submit(pickup_draft(cash()))
        .await
        .expect_err("backend still failing");
    assert!(matches!(
        err,
        CheckoutError::Remote {
            step: CheckoutStep::CreatingOrder,
            ..
        }
    ));
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let backend = MockBackend::new();
    let checkout = orchestrator(backend.clone(), CartStore::new());

    let err = checkout
        .submit(pickup_draft(cash()))
        .await
        .expect_err("empty cart");

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert!(backend.calls().is_empty());
}
