//! # In-Memory Storefront
//!
//! Carts, orders and payments for the development server. The store is
//! authoritative for prices: every cart line and every submitted order is
//! priced from the catalog, never from the client.

use crate::state::DiscountRule;
use cart_core::{
    is_valid_quantity, Cart, CartItem, CommerceError, CommerceResult, Currency, Discount,
    DiscountValidation, OrderReceipt, OrderRequest, OrderStatus, PaymentMethod, PaymentStatus,
    PaymentVerification, PriceBreakdown, Product, ProductCatalog, MIN_QUANTITY,
};
use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Card number ending the simulated gateway always declines
pub const DECLINED_CARD_LAST_FOUR: &str = "0002";

const DEFAULT_DISCOUNT_REJECTION: &str = "This code is not valid";

/// Idempotency keys remembered per replay cache
const REPLAY_CAPACITY: u64 = 10_000;

/// How long a replayed response stays available
const REPLAY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A placed order
#[derive(Debug, Clone, Serialize)]
pub struct OrderRecord {
    pub id: String,
    pub owner: String,
    pub status: OrderStatus,
    pub payment_id: String,
    pub totals: PriceBreakdown,
    pub item_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PaymentRecord {
    order_id: String,
    status: PaymentStatus,
}

#[derive(Default)]
struct Inner {
    carts: HashMap<String, Cart>,
    orders: HashMap<String, OrderRecord>,
    payments: HashMap<String, PaymentRecord>,
}

/// Storefront backend held in process memory.
///
/// Replay caches are keyed by owner and idempotency key, and are only read
/// or written while `inner` is locked.
pub struct MemoryStore {
    catalog: Arc<ProductCatalog>,
    discounts: HashMap<String, DiscountRule>,
    currency: Currency,
    inner: Mutex<Inner>,
    cart_replays: Cache<String, Cart>,
    order_replays: Cache<String, OrderReceipt>,
}

impl MemoryStore {
    pub fn new(catalog: Arc<ProductCatalog>, discounts: HashMap<String, DiscountRule>) -> Self {
        let currency = catalog
            .products
            .first()
            .map(|p| p.price.currency)
            .unwrap_or_default();
        Self {
            catalog,
            discounts,
            currency,
            inner: Mutex::new(Inner::default()),
            cart_replays: replay_cache(),
            order_replays: replay_cache(),
        }
    }

    /// The owner's cart (empty if they have none yet)
    pub fn cart(&self, owner: &str) -> Cart {
        self.lock()
            .carts
            .get(owner)
            .cloned()
            .unwrap_or_else(|| Cart::new(self.currency))
    }

    /// Add units of a catalog product. Replays the first response when the
    /// same idempotency key is seen again.
    pub fn add_item(
        &self,
        owner: &str,
        idempotency_key: Option<&str>,
        product_id: &str,
        quantity: u32,
    ) -> CommerceResult<Cart> {
        let replay_key = idempotency_key.map(|key| replay_key(owner, key));
        let mut inner = self.lock();
        if let Some(cart) = replay_key.as_ref().and_then(|k| self.cart_replays.get(k)) {
            debug!("Replaying add for {}", product_id);
            return Ok(cart);
        }

        if quantity == 0 {
            return Err(CommerceError::InvalidQuantity {
                product_id: product_id.to_string(),
                quantity,
            });
        }
        let product = self.product(product_id)?;

        let cart = self.cart_mut(&mut inner, owner);
        cart.add(product, quantity);
        let cart = cart.clone();

        if let Some(key) = replay_key {
            self.cart_replays.insert(key, cart.clone());
        }
        Ok(cart)
    }

    pub fn update_item(&self, owner: &str, product_id: &str, quantity: u32) -> CommerceResult<Cart> {
        if !is_valid_quantity(quantity) {
            return Err(CommerceError::InvalidQuantity {
                product_id: product_id.to_string(),
                quantity,
            });
        }
        let mut inner = self.lock();
        let cart = self.cart_mut(&mut inner, owner);
        cart.set_quantity(product_id, quantity)
            .ok_or_else(|| CommerceError::ItemNotInCart {
                product_id: product_id.to_string(),
            })?;
        Ok(cart.clone())
    }

    /// Remove a line. Removing an absent line is not an error.
    pub fn remove_item(&self, owner: &str, product_id: &str) -> Cart {
        let mut inner = self.lock();
        let cart = self.cart_mut(&mut inner, owner);
        cart.remove(product_id);
        cart.clone()
    }

    pub fn clear(&self, owner: &str) {
        self.lock().carts.remove(owner);
    }

    /// Validate a discount code and attach it to the owner's cart
    pub fn apply_discount(&self, owner: &str, code: &str) -> DiscountValidation {
        let code = code.trim();
        let rule = match self.discounts.get(&code.to_uppercase()) {
            Some(rule) if rule.active => rule,
            Some(rule) => {
                return DiscountValidation::rejected(
                    rule.message.as_deref().unwrap_or(DEFAULT_DISCOUNT_REJECTION),
                )
            }
            None => return DiscountValidation::rejected(DEFAULT_DISCOUNT_REJECTION),
        };

        let mut inner = self.lock();
        let cart = self.cart_mut(&mut inner, owner);
        cart.discount = Some(Discount {
            code: code.to_string(),
            kind: rule.kind,
            value: rule.amount,
        });
        info!("Applied discount {} for {}", rule.code, owner);
        DiscountValidation::accepted(rule.kind, rule.amount)
    }

    /// Price, authorize and record an order.
    ///
    /// The submitted totals must match the catalog price of the submitted
    /// lines. The same owner resubmitting with the same idempotency key gets
    /// the original receipt; the store stays locked from that check until the
    /// order is recorded.
    pub fn create_order(&self, owner: &str, request: &OrderRequest) -> CommerceResult<OrderReceipt> {
        let replay_key = replay_key(owner, &request.idempotency_key);
        let mut inner = self.lock();
        if let Some(receipt) = self.order_replays.get(&replay_key) {
            debug!("Replaying order {}", receipt.id);
            return Ok(receipt);
        }

        if request.items.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        request.shipping_address.validate()?;
        request.billing_address.validate()?;

        let priced = self.price_order(request)?;
        let totals = PriceBreakdown::for_cart(&priced);
        if totals != request.totals {
            warn!(
                "Totals mismatch: submitted {}, priced {}",
                request.totals.total.display(),
                totals.total.display()
            );
            return Err(CommerceError::TotalsMismatch {
                message: format!(
                    "Prices changed since you reviewed your order. The new total is {}.",
                    totals.total.display()
                ),
            });
        }

        let payment_status = match request.payment.method {
            PaymentMethod::Card => {
                if request.payment.last_four.as_deref() == Some(DECLINED_CARD_LAST_FOUR) {
                    info!("Declining card ending {}", DECLINED_CARD_LAST_FOUR);
                    return Err(CommerceError::PaymentDeclined {
                        reason: "Your card was declined.".to_string(),
                    });
                }
                PaymentStatus::Succeeded
            }
            PaymentMethod::Redirect => PaymentStatus::Pending,
        };

        let order_id = format!("ord_{}", Uuid::new_v4().simple());
        let payment_id = format!("pay_{}", Uuid::new_v4().simple());
        let receipt = OrderReceipt {
            id: order_id.clone(),
            tracking_id: None,
            payment_id: Some(payment_id.clone()),
        };

        inner.orders.insert(
            order_id.clone(),
            OrderRecord {
                id: order_id.clone(),
                owner: owner.to_string(),
                status: OrderStatus::Pending,
                payment_id: payment_id.clone(),
                totals,
                item_count: request.item_count(),
                created_at: Utc::now(),
            },
        );
        inner.payments.insert(
            payment_id,
            PaymentRecord {
                order_id: order_id.clone(),
                status: payment_status,
            },
        );
        self.order_replays.insert(replay_key, receipt.clone());

        info!(
            "Order {} placed: total={}, payment={}",
            order_id,
            totals.total.display(),
            payment_status
        );
        Ok(receipt)
    }

    pub fn order(&self, order_id: &str) -> Option<OrderRecord> {
        self.lock().orders.get(order_id).cloned()
    }

    /// Record a reported order status. Returns false for unknown orders.
    pub fn update_order_status(&self, order_id: &str, status: OrderStatus) -> bool {
        match self.lock().orders.get_mut(order_id) {
            Some(order) => {
                info!("Order {} is now {}", order_id, status);
                order.status = status;
                true
            }
            None => false,
        }
    }

    pub fn verify_payment(&self, payment_id: &str) -> Option<PaymentVerification> {
        self.lock()
            .payments
            .get(payment_id)
            .map(|record| PaymentVerification {
                status: record.status,
                order_id: Some(record.order_id.clone()),
            })
    }

    /// Move a payment to a new status, as the gateway callback would
    pub fn set_payment_status(
        &self,
        payment_id: &str,
        status: PaymentStatus,
    ) -> Option<PaymentVerification> {
        let mut inner = self.lock();
        let record = inner.payments.get_mut(payment_id)?;
        record.status = status;
        info!("Payment {} moved to {}", payment_id, status);
        Some(PaymentVerification {
            status,
            order_id: Some(record.order_id.clone()),
        })
    }

    /// Rebuild the submitted lines from catalog prices
    fn price_order(&self, request: &OrderRequest) -> CommerceResult<Cart> {
        let mut cart = Cart::new(request.currency);
        for item in &request.items {
            let product = self.product(&item.product_id)?;
            if product.price.currency != request.currency {
                return Err(CommerceError::InvalidRequest(format!(
                    "{} is not sold in {}",
                    product.id, request.currency
                )));
            }
            cart.items
                .push(CartItem::from_product(product, item.quantity.max(MIN_QUANTITY)));
        }

        if let Some(code) = &request.discount_code {
            let rule = self
                .discounts
                .get(&code.to_uppercase())
                .filter(|rule| rule.active)
                .ok_or_else(|| CommerceError::InvalidDiscount {
                    code: code.clone(),
                    message: DEFAULT_DISCOUNT_REJECTION.to_string(),
                })?;
            cart.discount = Some(Discount {
                code: code.clone(),
                kind: rule.kind,
                value: rule.amount,
            });
        }
        Ok(cart)
    }

    fn product(&self, product_id: &str) -> CommerceResult<&Product> {
        self.catalog
            .get(product_id)
            .filter(|p| p.active)
            .ok_or_else(|| CommerceError::ProductNotFound {
                product_id: product_id.to_string(),
            })
    }

    fn cart_mut<'a>(&self, inner: &'a mut Inner, owner: &str) -> &'a mut Cart {
        inner
            .carts
            .entry(owner.to_string())
            .or_insert_with(|| Cart::new(self.currency))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn replay_cache<V: Clone + Send + Sync + 'static>() -> Cache<String, V> {
    Cache::builder()
        .max_capacity(REPLAY_CAPACITY)
        .time_to_live(REPLAY_TTL)
        .build()
}

fn replay_key(owner: &str, idempotency_key: &str) -> String {
    format!("{}:{}", owner, idempotency_key)
}
