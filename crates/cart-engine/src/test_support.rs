//! In-memory service doubles shared by the engine's unit tests.

use async_trait::async_trait;
use cart_core::{
    Cart, CartService, CommerceError, CommerceResult, Currency, DiscountKind, DiscountValidation,
    OperationId, OrderReceipt, OrderRequest, OrderService, OrderStatus, PaymentService,
    PaymentStatus, PaymentVerification, Price, Product,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn product(id: &str, dollars: f64) -> Product {
    Product::new(id, id, Price::new(dollars, Currency::USD))
}

/// Cart service backed by a local `Cart`, with failure injection
pub struct MockCartService {
    server: Mutex<Cart>,
    prices: Mutex<HashMap<String, i64>>,
    discounts: Mutex<HashMap<String, (DiscountKind, i64)>>,
    calls: Mutex<Vec<String>>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl MockCartService {
    pub fn new() -> Self {
        Self {
            server: Mutex::new(Cart::new(Currency::USD)),
            prices: Mutex::new(HashMap::new()),
            discounts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every subsequent call fail with a network error
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Override the price the server charges for a product
    pub fn set_price(&self, product_id: &str, cents: i64) {
        self.prices
            .lock()
            .unwrap()
            .insert(product_id.to_string(), cents);
    }

    pub fn add_discount_code(&self, code: &str, kind: DiscountKind, amount: i64) {
        self.discounts
            .lock()
            .unwrap()
            .insert(code.to_string(), (kind, amount));
    }

    pub fn server_cart(&self) -> Cart {
        self.server.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, call: String) -> CommerceResult<()> {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CommerceError::NetworkError("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CartService for MockCartService {
    async fn get_cart(&self) -> CommerceResult<Cart> {
        self.enter("get".to_string()).await?;
        Ok(self.server_cart())
    }

    async fn add_item(
        &self,
        _op: &OperationId,
        product_id: &str,
        quantity: u32,
    ) -> CommerceResult<Cart> {
        self.enter(format!("add {} {}", product_id, quantity)).await?;
        let cents = self
            .prices
            .lock()
            .unwrap()
            .get(product_id)
            .copied()
            .unwrap_or(500);
        let product = Product::new(product_id, product_id, Price::from_cents(cents, Currency::USD));
        let mut server = self.server.lock().unwrap();
        server.add(&product, quantity);
        Ok(server.clone())
    }

    async fn update_item(
        &self,
        _op: &OperationId,
        product_id: &str,
        quantity: u32,
    ) -> CommerceResult<Cart> {
        self.enter(format!("update {} {}", product_id, quantity)).await?;
        let mut server = self.server.lock().unwrap();
        server.set_quantity(product_id, quantity);
        Ok(server.clone())
    }

    async fn remove_item(&self, _op: &OperationId, product_id: &str) -> CommerceResult<Cart> {
        self.enter(format!("remove {}", product_id)).await?;
        let mut server = self.server.lock().unwrap();
        server.remove(product_id);
        Ok(server.clone())
    }

    async fn clear(&self, _op: &OperationId) -> CommerceResult<()> {
        self.enter("clear".to_string()).await?;
        self.server.lock().unwrap().clear();
        Ok(())
    }

    async fn apply_discount(
        &self,
        _op: &OperationId,
        code: &str,
    ) -> CommerceResult<DiscountValidation> {
        self.enter(format!("discount {}", code)).await?;
        Ok(match self.discounts.lock().unwrap().get(code) {
            Some((kind, amount)) => DiscountValidation::accepted(*kind, *amount),
            None => DiscountValidation::rejected("Unknown discount code"),
        })
    }
}

/// Order service that records submissions and status reports
pub struct MockOrderService {
    requests: Mutex<Vec<OrderRequest>>,
    statuses: Mutex<Vec<(String, OrderStatus)>>,
    failure: Mutex<Option<String>>,
    payment_id: Option<String>,
    delay: Option<Duration>,
}

impl MockOrderService {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            statuses: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            payment_id: Some("pay_test_1".to_string()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Decline every order with `reason` until cleared with `None`
    pub fn decline_with(&self, reason: Option<&str>) {
        *self.failure.lock().unwrap() = reason.map(String::from);
    }

    pub fn requests(&self) -> Vec<OrderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(String, OrderStatus)> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderService for MockOrderService {
    async fn create_order(&self, request: &OrderRequest) -> CommerceResult<OrderReceipt> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(CommerceError::PaymentDeclined { reason });
        }
        let n = self.requests.lock().unwrap().len();
        Ok(OrderReceipt {
            id: format!("ord_{}", n),
            tracking_id: None,
            payment_id: self.payment_id.clone(),
        })
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> CommerceResult<()> {
        self.statuses
            .lock()
            .unwrap()
            .push((order_id.to_string(), status));
        Ok(())
    }
}

/// Payment service replaying a script of verification results.
/// Once the script runs out it keeps answering `pending`.
pub struct MockPaymentService {
    script: Mutex<VecDeque<CommerceResult<PaymentVerification>>>,
    calls: AtomicU32,
}

impl MockPaymentService {
    pub fn new(script: Vec<CommerceResult<PaymentVerification>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn verification(status: PaymentStatus, order_id: Option<&str>) -> CommerceResult<PaymentVerification> {
    Ok(PaymentVerification {
        status,
        order_id: order_id.map(String::from),
    })
}

#[async_trait]
impl PaymentService for MockPaymentService {
    async fn verify_payment(&self, _payment_id: &str) -> CommerceResult<PaymentVerification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| verification(PaymentStatus::Pending, None))
    }
}
