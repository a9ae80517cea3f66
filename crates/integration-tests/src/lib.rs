//! Integration test support for PartsHub.
//!
//! Provides [`MockBackend`], a scripted in-memory implementation of
//! [`PartsBackend`] that records every call it receives, plus fixture
//! helpers for catalog products, payment methods, and checkout drafts.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p partshub-integration-tests
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;
use tokio::sync::Notify;

use partshub_core::{
    CategoryId, DeliveryMethod, OrderId, PaymentKind, PaymentMethodId, ProductId, UserId, Usd,
};
use partshub_storefront::api::types::{
    Carrier, CatalogProduct, ExchangeRateQuote, OrderHeader, OrderLineInput, PaymentMethod,
    PaymentSubmission, ShipmentRequest, StockLevel,
};
use partshub_storefront::api::{ApiError, PartsBackend};
use partshub_storefront::checkout::CheckoutDraft;

/// One recorded backend invocation, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    GetStock(ProductId),
    CreateOrder {
        buyer: UserId,
        lines: Vec<OrderLineInput>,
    },
    UpdateStock {
        product_id: ProductId,
        new_stock: u32,
    },
    CreatePayment {
        order_id: OrderId,
        amount: Usd,
        reference: Option<String>,
        has_proof: bool,
    },
    CreateShipment {
        address: String,
        carrier: Option<String>,
        has_recipient: bool,
    },
}

#[derive(Default)]
struct MockState {
    stock: HashMap<ProductId, u32>,
    next_order_id: i32,
    gate_stock_fetch: bool,
    fail_stock_fetch: bool,
    fail_create_order: bool,
    fail_update_stock: bool,
    fail_create_payment: bool,
    fail_create_shipment: bool,
    calls: Vec<MockCall>,
}

fn mock_failure(what: &str) -> ApiError {
    ApiError::Api {
        status: 500,
        message: format!("mock {what} failure"),
    }
}

/// Scripted backend: seeded stock levels, per-endpoint failure switches,
/// and a full call log for asserting what the workflow actually did.
#[derive(Clone)]
pub struct MockBackend {
    inner: Arc<Mutex<MockState>>,
    stock_gate: Arc<Notify>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                next_order_id: 1000,
                ..MockState::default()
            })),
            stock_gate: Arc::new(Notify::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed the authoritative stock level for a product.
    pub fn set_stock(&self, product_id: ProductId, stock: u32) {
        self.lock().stock.insert(product_id, stock);
    }

    pub fn fail_stock_fetch(&self) {
        self.lock().fail_stock_fetch = true;
    }

    /// Park stock fetches until [`Self::release_stock_fetch`] is called.
    /// The call is still recorded before parking, so tests can wait for a
    /// submit to reach the backend and then act while it hangs there.
    pub fn gate_stock_fetch(&self) {
        self.lock().gate_stock_fetch = true;
    }

    /// Lift the stock-fetch gate and wake every parked call.
    pub fn release_stock_fetch(&self) {
        self.lock().gate_stock_fetch = false;
        self.stock_gate.notify_waiters();
    }

    pub fn fail_create_order(&self) {
        self.lock().fail_create_order = true;
    }

    pub fn fail_update_stock(&self) {
        self.lock().fail_update_stock = true;
    }

    pub fn fail_create_payment(&self) {
        self.lock().fail_create_payment = true;
    }

    pub fn fail_create_shipment(&self) {
        self.lock().fail_create_shipment = true;
    }

    /// Everything the workflow called, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Whether `create_order` was ever invoked.
    #[must_use]
    pub fn order_created(&self) -> bool {
        self.lock()
            .calls
            .iter()
            .any(|c| matches!(c, MockCall::CreateOrder { .. }))
    }
}

impl PartsBackend for MockBackend {
    async fn get_catalog(&self) -> Result<Vec<CatalogProduct>, ApiError> {
        Ok(Vec::new())
    }

    async fn get_product_stock(&self, product_id: ProductId) -> Result<StockLevel, ApiError> {
        let gated = {
            let mut state = self.lock();
            state.calls.push(MockCall::GetStock(product_id));
            if state.fail_stock_fetch {
                return Err(mock_failure("stock fetch"));
            }
            state.gate_stock_fetch
        };
        if gated {
            self.stock_gate.notified().await;
        }

        let state = self.lock();
        let stock = state
            .stock
            .get(&product_id)
            .copied()
            .ok_or_else(|| ApiError::NotFound(format!("product {product_id}")))?;
        Ok(StockLevel { product_id, stock })
    }

    async fn get_exchange_rate(&self) -> Result<ExchangeRateQuote, ApiError> {
        Ok(ExchangeRateQuote {
            average_rate: Decimal::from(36),
        })
    }

    async fn create_order(
        &self,
        header: &OrderHeader,
        lines: &[OrderLineInput],
    ) -> Result<OrderId, ApiError> {
        let mut state = self.lock();
        state.calls.push(MockCall::CreateOrder {
            buyer: header.buyer,
            lines: lines.to_vec(),
        });
        if state.fail_create_order {
            return Err(mock_failure("order"));
        }
        state.next_order_id += 1;
        Ok(OrderId::new(state.next_order_id))
    }

    async fn update_product_stock(
        &self,
        product_id: ProductId,
        new_stock: u32,
    ) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push(MockCall::UpdateStock {
            product_id,
            new_stock,
        });
        if state.fail_update_stock {
            return Err(mock_failure("stock update"));
        }
        state.stock.insert(product_id, new_stock);
        Ok(())
    }

    async fn create_payment(
        &self,
        order_id: OrderId,
        payment: PaymentSubmission,
    ) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push(MockCall::CreatePayment {
            order_id,
            amount: payment.amount,
            reference: payment.reference,
            has_proof: payment.proof.is_some(),
        });
        if state.fail_create_payment {
            return Err(mock_failure("payment"));
        }
        Ok(())
    }

    async fn create_shipment(&self, shipment: &ShipmentRequest) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push(MockCall::CreateShipment {
            address: shipment.address.clone(),
            carrier: shipment.carrier.clone(),
            has_recipient: shipment.recipient.is_some(),
        });
        if state.fail_create_shipment {
            return Err(mock_failure("shipment"));
        }
        Ok(())
    }

    async fn get_payment_methods(&self) -> Result<Vec<PaymentMethod>, ApiError> {
        Ok(vec![fixtures::cash(), fixtures::transfer()])
    }

    async fn get_shipping_companies(&self) -> Result<Vec<Carrier>, ApiError> {
        Ok(Vec::new())
    }
}

/// Shared fixtures for workflow tests.
pub mod fixtures {
    use super::{
        CatalogProduct, CategoryId, CheckoutDraft, Decimal, DeliveryMethod, PaymentKind,
        PaymentMethod, PaymentMethodId, ProductId, UserId, Usd,
    };

    /// A sellable catalog product with the given price, discount, and stock.
    #[must_use]
    pub fn product(id: i32, price_dollars: i64, discount_percent: i64, stock: u32) -> CatalogProduct {
        CatalogProduct {
            id: ProductId::new(id),
            name: format!("Part {id}"),
            price: Usd::from_dollars(price_dollars),
            discount_percent: Decimal::from(discount_percent),
            available: true,
            stock,
            category_id: CategoryId::new(1),
        }
    }

    #[must_use]
    pub fn cash() -> PaymentMethod {
        PaymentMethod {
            id: PaymentMethodId::new(1),
            name: "Cash".to_string(),
            kind: PaymentKind::Cash,
        }
    }

    #[must_use]
    pub fn transfer() -> PaymentMethod {
        PaymentMethod {
            id: PaymentMethodId::new(2),
            name: "Bank transfer".to_string(),
            kind: PaymentKind::Transfer,
        }
    }

    /// A store-pickup draft paying with the given method.
    #[must_use]
    pub fn pickup_draft(method: PaymentMethod) -> CheckoutDraft {
        CheckoutDraft {
            buyer: UserId::new(7),
            delivery: DeliveryMethod::Pickup,
            address: None,
            carrier: None,
            branch_address: None,
            recipient: None,
            payment_method: Some(method),
            reference: None,
            proof: None,
        }
    }
}
