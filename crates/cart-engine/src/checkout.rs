//! # Checkout Orchestrator
//!
//! Forward-only state machine over the cart:
//!
//! ```text
//! shipping ──submit_shipping──▶ payment ──submit_payment──▶ review ──place_order──▶ completed
//!     ▲                            │  ▲                        │
//!     └────────── go_back ─────────┘  └──────── go_back ───────┘
//! ```
//!
//! A failed `place_order` leaves the session at `review` with a user-facing
//! error so the same action can be retried.

use crate::store::CartStore;
use crate::tracker::{PaymentTracker, TrackerConfig};
use cart_core::{
    Address, BillingAddress, CheckoutSession, CheckoutStep, CommerceError, CommerceResult,
    OperationId, OrderReceipt, OrderRequest, PaymentDetails, PriceBreakdown, SharedOrderService,
    SharedPaymentService,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, instrument, warn};

#[derive(Default)]
struct CheckoutState {
    session: CheckoutSession,
    receipt: Option<OrderReceipt>,
}

/// Drives one checkout session from shipping to a placed order
pub struct CheckoutOrchestrator {
    cart: Arc<CartStore>,
    orders: SharedOrderService,
    state: Mutex<CheckoutState>,
}

impl CheckoutOrchestrator {
    /// Open a checkout session. Refuses an empty cart.
    pub fn start(cart: Arc<CartStore>, orders: SharedOrderService) -> CommerceResult<Self> {
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        info!("Checkout started with {} items", cart.item_count());
        Ok(Self {
            cart,
            orders,
            state: Mutex::new(CheckoutState::default()),
        })
    }

    /// Copy of the current session
    pub fn session(&self) -> CheckoutSession {
        self.lock().session.clone()
    }

    pub fn current_step(&self) -> CheckoutStep {
        self.lock().session.current_step
    }

    pub fn is_complete(&self) -> bool {
        self.lock().session.order_complete
    }

    /// Receipt of the placed order, once complete
    pub fn receipt(&self) -> Option<OrderReceipt> {
        self.lock().receipt.clone()
    }

    /// Totals for the review step, derived from the live cart
    pub fn price_breakdown(&self) -> PriceBreakdown {
        self.cart.totals()
    }

    /// Accept the shipping address and move to the payment step.
    ///
    /// Both addresses are validated before anything is stored.
    pub fn submit_shipping(
        &self,
        shipping: Address,
        billing: BillingAddress,
    ) -> CommerceResult<()> {
        let mut state = self.lock();
        expect_step(&state.session, CheckoutStep::Shipping, "submit a shipping address")?;

        shipping.validate()?;
        let billing = match billing {
            BillingAddress::SameAsShipping => shipping.clone(),
            BillingAddress::Separate(address) => {
                address.validate()?;
                address
            }
        };

        let session = &mut state.session;
        session.shipping_address = Some(shipping);
        session.billing_address = Some(billing);
        session.current_step = CheckoutStep::Payment;
        Ok(())
    }

    /// Accept the payment method and move to review. No server round-trip.
    pub fn submit_payment(&self, details: PaymentDetails) -> CommerceResult<()> {
        let mut state = self.lock();
        expect_step(&state.session, CheckoutStep::Payment, "submit payment details")?;

        let session = &mut state.session;
        session.payment_details = Some(details);
        session.current_step = CheckoutStep::Review;
        Ok(())
    }

    /// Re-enter the previous step, keeping everything entered so far
    pub fn go_back(&self) -> CheckoutStep {
        let mut state = self.lock();
        let session = &mut state.session;
        if !session.order_complete && !session.is_processing {
            if let Some(previous) = session.current_step.previous() {
                session.current_step = previous;
            }
        }
        session.current_step
    }

    /// Clear the error banner
    pub fn dismiss_error(&self) {
        self.lock().session.error = None;
    }

    /// Abandon the session and start over at shipping
    pub fn cancel(&self) -> CommerceResult<()> {
        let mut state = self.lock();
        if state.session.is_processing {
            return Err(CommerceError::CheckoutBusy);
        }
        *state = CheckoutState::default();
        info!("Checkout session reset");
        Ok(())
    }

    /// Submit the order.
    ///
    /// On success the session completes, the cart is emptied and the receipt
    /// returned. On failure the session stays at review with `error` set.
    /// `is_processing` is cleared on every exit path, including cancellation
    /// of the returned future.
    #[instrument(skip(self, op), fields(op = %op))]
    pub async fn place_order(&self, op: &OperationId) -> CommerceResult<OrderReceipt> {
        let processing = self.begin_processing()?;

        let result = match self.build_request(op) {
            Ok(request) => {
                info!(
                    "Placing order: {} items, total={}",
                    request.item_count(),
                    request.totals.total.display()
                );
                self.orders.create_order(&request).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(receipt) => {
                {
                    let mut state = self.lock();
                    state.session.order_complete = true;
                    state.session.order_id = Some(receipt.id.clone());
                    state.receipt = Some(receipt.clone());
                }
                self.cart.clear();
                drop(processing);
                info!("Order placed: {}", receipt.id);

                if let Err(e) = self.cart.clear_remote(&OperationId::new()).await {
                    warn!("Order {} placed but remote cart clear failed: {}", receipt.id, e);
                }
                Ok(receipt)
            }
            Err(e) => {
                error!("Order placement failed: {}", e);
                self.lock().session.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Start tracking the placed order's payment, if it has a payment reference
    pub fn track_payment(
        &self,
        payments: SharedPaymentService,
        config: TrackerConfig,
    ) -> Option<PaymentTracker> {
        let payment_id = self.receipt()?.payment_id?;
        Some(PaymentTracker::start(
            payment_id,
            payments,
            self.orders.clone(),
            config,
        ))
    }

    fn begin_processing(&self) -> CommerceResult<ProcessingGuard<'_>> {
        let mut state = self.lock();
        let session = &mut state.session;
        if session.order_complete {
            return Err(CommerceError::InvalidTransition {
                step: "completed".to_string(),
                action: "place another order".to_string(),
            });
        }
        expect_step(session, CheckoutStep::Review, "place the order")?;
        if session.is_processing {
            return Err(CommerceError::CheckoutBusy);
        }
        session.is_processing = true;
        session.error = None;
        Ok(ProcessingGuard { checkout: self })
    }

    fn build_request(&self, op: &OperationId) -> CommerceResult<OrderRequest> {
        let cart = self.cart.snapshot();
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let state = self.lock();
        let session = &state.session;
        let missing = |what: &str| CommerceError::InvalidRequest(format!("{} is missing", what));
        let shipping = session
            .shipping_address
            .clone()
            .ok_or_else(|| missing("Shipping address"))?;
        let billing = session
            .billing_address
            .clone()
            .ok_or_else(|| missing("Billing address"))?;
        let payment = session
            .payment_details
            .as_ref()
            .ok_or_else(|| missing("Payment method"))?
            .summary();

        Ok(OrderRequest::from_cart(
            &cart,
            shipping,
            billing,
            payment,
            op.as_str(),
        ))
    }

    fn lock(&self) -> MutexGuard<'_, CheckoutState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn expect_step(session: &CheckoutSession, step: CheckoutStep, action: &str) -> CommerceResult<()> {
    if session.order_complete || session.current_step != step {
        let current = if session.order_complete {
            "completed".to_string()
        } else {
            session.current_step.to_string()
        };
        return Err(CommerceError::InvalidTransition {
            step: current,
            action: action.to_string(),
        });
    }
    Ok(())
}

/// Resets `is_processing` when the order attempt ends, however it ends
struct ProcessingGuard<'a> {
    checkout: &'a CheckoutOrchestrator,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.checkout.lock().session.is_processing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{product, MockCartService, MockOrderService};
    use cart_core::{CardDetails, Currency, PaymentMethod};
    use std::time::Duration;

    fn address() -> Address {
        Address {
            full_name: "Grace Hopper".into(),
            email: "grace@example.com".into(),
            phone: "+1 555 010 2000".into(),
            street: "1 Compiler Way".into(),
            city: "Arlington".into(),
            state: "VA".into(),
            zip: "22201".into(),
            country: "US".into(),
        }
    }

    fn card() -> PaymentDetails {
        PaymentDetails::Card(CardDetails::new("Grace Hopper", "4242424242424242", "12/30", "123"))
    }

    struct Fixture {
        cart_service: Arc<MockCartService>,
        orders: Arc<MockOrderService>,
        cart: Arc<CartStore>,
    }

    async fn fixture() -> Fixture {
        let cart_service = Arc::new(MockCartService::new());
        cart_service.set_price("X", 6000);
        let cart = Arc::new(CartStore::new(cart_service.clone(), Currency::USD));
        cart.add_item(&OperationId::new(), &product("X", 60.0), 2)
            .await
            .unwrap();
        Fixture {
            cart_service,
            orders: Arc::new(MockOrderService::new()),
            cart,
        }
    }

    fn checkout_at_review(f: &Fixture) -> CheckoutOrchestrator {
        let checkout = CheckoutOrchestrator::start(f.cart.clone(), f.orders.clone()).unwrap();
        checkout
            .submit_shipping(address(), BillingAddress::SameAsShipping)
            .unwrap();
        checkout.submit_payment(card()).unwrap();
        checkout
    }

    #[tokio::test]
    async fn test_empty_cart_cannot_start() {
        let cart = Arc::new(CartStore::new(
            Arc::new(MockCartService::new()),
            Currency::USD,
        ));
        let result = CheckoutOrchestrator::start(cart, Arc::new(MockOrderService::new()));
        assert!(matches!(result, Err(CommerceError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_steps_advance_forward() {
        let f = fixture().await;
        let checkout = CheckoutOrchestrator::start(f.cart.clone(), f.orders.clone()).unwrap();
        assert_eq!(checkout.current_step(), CheckoutStep::Shipping);

        // Payment can't be submitted before shipping
        assert!(matches!(
            checkout.submit_payment(card()),
            Err(CommerceError::InvalidTransition { .. })
        ));

        checkout
            .submit_shipping(address(), BillingAddress::SameAsShipping)
            .unwrap();
        assert_eq!(checkout.current_step(), CheckoutStep::Payment);
        let session = checkout.session();
        assert_eq!(session.billing_address, session.shipping_address);

        checkout.submit_payment(card()).unwrap();
        assert_eq!(checkout.current_step(), CheckoutStep::Review);
        assert!(!checkout.is_complete());
    }

    #[tokio::test]
    async fn test_invalid_address_is_not_a_partial_transition() {
        let f = fixture().await;
        let checkout = CheckoutOrchestrator::start(f.cart.clone(), f.orders.clone()).unwrap();

        let mut billing = address();
        billing.email = "not-an-email".into();
        let result = checkout.submit_shipping(address(), BillingAddress::Separate(billing));

        assert!(matches!(result, Err(CommerceError::InvalidAddress { field: "email", .. })));
        let session = checkout.session();
        assert_eq!(session.current_step, CheckoutStep::Shipping);
        assert!(session.shipping_address.is_none());
    }

    #[tokio::test]
    async fn test_go_back_retains_data() {
        let f = fixture().await;
        let checkout = checkout_at_review(&f);

        assert_eq!(checkout.go_back(), CheckoutStep::Payment);
        assert_eq!(checkout.go_back(), CheckoutStep::Shipping);
        assert_eq!(checkout.go_back(), CheckoutStep::Shipping);
        assert!(checkout.session().payment_details.is_some());
    }

    #[tokio::test]
    async fn test_review_never_completes_without_place_order() {
        let f = fixture().await;
        let checkout = checkout_at_review(&f);

        assert!(checkout.submit_payment(card()).is_err());
        assert!(checkout
            .submit_shipping(address(), BillingAddress::SameAsShipping)
            .is_err());
        assert_eq!(checkout.current_step(), CheckoutStep::Review);
        assert!(!checkout.is_complete());
        assert!(f.orders.requests().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_clears_cart() {
        let f = fixture().await;
        let checkout = checkout_at_review(&f);

        let totals = checkout.price_breakdown();
        assert_eq!(totals.total.amount, 13200);

        let receipt = checkout.place_order(&OperationId::from("op-1")).await.unwrap();

        assert_eq!(receipt.id, "ord_1");
        let session = checkout.session();
        assert!(session.order_complete);
        assert!(!session.is_processing);
        assert_eq!(session.order_id.as_deref(), Some("ord_1"));
        assert!(f.cart.snapshot().items.is_empty());
        assert!(f.cart_service.calls().contains(&"clear".to_string()));

        let request = &f.orders.requests()[0];
        assert_eq!(request.idempotency_key, "op-1");
        assert_eq!(request.totals.total.amount, 13200);
        assert_eq!(request.payment.method, PaymentMethod::Card);
        assert_eq!(request.payment.last_four.as_deref(), Some("4242"));
        assert!(!format!("{:?}", request).contains("4242424242424242"));
    }

    #[tokio::test]
    async fn test_failed_order_stays_at_review() {
        let f = fixture().await;
        let checkout = checkout_at_review(&f);
        f.orders.decline_with(Some("Your card was declined."));

        let result = checkout.place_order(&OperationId::new()).await;

        assert!(matches!(result, Err(CommerceError::PaymentDeclined { .. })));
        let session = checkout.session();
        assert_eq!(session.current_step, CheckoutStep::Review);
        assert!(!session.is_processing);
        assert!(!session.order_complete);
        assert_eq!(session.error.as_deref(), Some("Your card was declined."));
        assert_eq!(f.cart.snapshot().quantity_of("X"), 2);

        // Retry from the same state succeeds and clears the banner
        f.orders.decline_with(None);
        checkout.place_order(&OperationId::new()).await.unwrap();
        assert!(checkout.session().error.is_none());
        assert!(checkout.is_complete());
    }

    #[tokio::test]
    async fn test_completed_checkout_rejects_second_order() {
        let f = fixture().await;
        let checkout = checkout_at_review(&f);
        checkout.place_order(&OperationId::new()).await.unwrap();

        let again = checkout.place_order(&OperationId::new()).await;
        assert!(matches!(again, Err(CommerceError::InvalidTransition { .. })));
        assert_eq!(f.orders.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cart_emptied_mid_checkout_fails_at_review() {
        let f = fixture().await;
        let checkout = checkout_at_review(&f);
        f.cart.clear();

        let result = checkout.place_order(&OperationId::new()).await;

        assert!(matches!(result, Err(CommerceError::EmptyCart)));
        assert!(checkout.session().error.is_some());
        assert!(f.orders.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_is_locked_while_order_in_flight() {
        let mut f = fixture().await;
        f.orders = Arc::new(MockOrderService::new().with_delay(Duration::from_millis(50)));
        let checkout = checkout_at_review(&f);
        let op = OperationId::new();

        let (placed, _) = tokio::join!(checkout.place_order(&op), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(checkout.session().is_processing);

            let second = checkout.place_order(&OperationId::new()).await;
            assert!(matches!(second, Err(CommerceError::CheckoutBusy)));
            assert!(matches!(checkout.cancel(), Err(CommerceError::CheckoutBusy)));
            assert_eq!(checkout.go_back(), CheckoutStep::Review);
            assert!(checkout.session().is_processing);
        });

        placed.unwrap();
        assert!(checkout.is_complete());
        assert!(!checkout.session().is_processing);
        assert_eq!(f.orders.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_resets_session() {
        let f = fixture().await;
        let checkout = checkout_at_review(&f);
        checkout.cancel().unwrap();

        let session = checkout.session();
        assert_eq!(session.current_step, CheckoutStep::Shipping);
        assert!(session.shipping_address.is_none());
        assert!(session.payment_details.is_none());
    }
}
