//! # Cart Store
//!
//! Single source of truth for the shopper's cart. Mutations are applied
//! locally first and then confirmed with the remote cart service:
//!
//! | Operation         | Local change | Remote failure      |
//! |-------------------|--------------|---------------------|
//! | `add_item`        | immediate    | change kept         |
//! | `update_quantity` | immediate    | rolled back         |
//! | `remove_item`     | immediate    | item not restored   |
//! | `apply_discount`  | after remote | cart untouched      |
//!
//! Operations on the same product are serialized in issue order; operations
//! on different products run concurrently. A remote reply that arrives after
//! [`CartStore::clear`] is not applied to the emptied cart.

use cart_core::{
    is_valid_quantity, Cart, CommerceError, CommerceResult, Currency, Discount, OperationId,
    PriceBreakdown, Product, SharedCartService,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

type ProductLock = Arc<tokio::sync::Mutex<()>>;

/// Local cart kept in step with a remote [`CartService`](cart_core::CartService).
pub struct CartStore {
    service: SharedCartService,
    state: watch::Sender<Cart>,
    product_locks: Mutex<HashMap<String, ProductLock>>,
    /// Bumped by every `clear`
    generation: AtomicU64,
}

impl CartStore {
    /// Create a store holding an empty cart
    pub fn new(service: SharedCartService, currency: Currency) -> Self {
        let (state, _) = watch::channel(Cart::new(currency));
        Self {
            service,
            state,
            product_locks: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Consistent copy of the current cart
    pub fn snapshot(&self) -> Cart {
        self.state.borrow().clone()
    }

    /// Totals of the current cart
    pub fn totals(&self) -> PriceBreakdown {
        PriceBreakdown::for_cart(&self.state.borrow())
    }

    /// Receiver that observes every committed cart change
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.state.subscribe()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }

    /// Units across all lines (badge count)
    pub fn item_count(&self) -> u32 {
        self.state.borrow().item_count()
    }

    /// Replace the local cart with the server's copy
    #[instrument(skip(self))]
    pub async fn sync(&self) -> CommerceResult<Cart> {
        let generation = self.generation();
        let server = self.service.get_cart().await?;
        let replaced = self.state.send_if_modified(|cart| {
            if self.cleared_since(generation) {
                return false;
            }
            *cart = server.clone();
            true
        });
        if !replaced {
            debug!("Cart cleared during sync, discarding server copy");
            return Ok(self.snapshot());
        }
        info!("Synced cart: {} lines", server.items.len());
        Ok(server)
    }

    /// Add `quantity` units of `product`.
    ///
    /// The local line is bumped immediately (capped at 99). If the remote
    /// call fails the optimistic change stays in place and the error is
    /// returned.
    #[instrument(skip(self, op, product), fields(op = %op, product_id = %product.id))]
    pub async fn add_item(
        &self,
        op: &OperationId,
        product: &Product,
        quantity: u32,
    ) -> CommerceResult<Cart> {
        if quantity == 0 {
            return Err(CommerceError::InvalidQuantity {
                product_id: product.id.clone(),
                quantity,
            });
        }
        let currency = self.state.borrow().currency;
        if product.price.currency != currency {
            return Err(CommerceError::InvalidRequest(format!(
                "{} is priced in {}, cart is in {}",
                product.id, product.price.currency, currency
            )));
        }

        let _guard = self.lock_product(&product.id).await;

        let mut generation = 0;
        self.state.send_modify(|cart| {
            generation = self.generation();
            let before = cart.quantity_of(&product.id);
            let after = cart.add(product, quantity);
            let requested = before.saturating_add(quantity);
            if requested > after {
                debug!(
                    "Quantity capped at {}: dropped {} units",
                    after,
                    requested - after
                );
            }
        });

        match self.service.add_item(op, &product.id, quantity).await {
            Ok(server) => {
                self.reconcile(generation, &product.id, &server);
                Ok(self.snapshot())
            }
            Err(e) => {
                warn!("Remote add failed, keeping local change: {}", e);
                Err(e)
            }
        }
    }

    /// Set a line's quantity.
    ///
    /// Quantities outside 1..=99 and products not in the cart are ignored.
    /// If the remote call fails the previous quantity is restored.
    #[instrument(skip(self, op), fields(op = %op))]
    pub async fn update_quantity(
        &self,
        op: &OperationId,
        product_id: &str,
        quantity: u32,
    ) -> CommerceResult<Cart> {
        if !is_valid_quantity(quantity) {
            debug!("Ignoring out-of-range quantity {}", quantity);
            return Ok(self.snapshot());
        }

        let _guard = self.lock_product(product_id).await;

        let mut generation = 0;
        let mut previous = None;
        self.state.send_if_modified(|cart| {
            generation = self.generation();
            previous = cart.set_quantity(product_id, quantity);
            previous.is_some_and(|p| p != quantity)
        });
        let Some(previous) = previous else {
            debug!("Product not in cart, nothing to update");
            return Ok(self.snapshot());
        };

        match self.service.update_item(op, product_id, quantity).await {
            Ok(server) => {
                self.reconcile(generation, product_id, &server);
                Ok(self.snapshot())
            }
            Err(e) => {
                warn!(
                    "Remote update failed, rolling back {} -> {}: {}",
                    quantity, previous, e
                );
                self.state.send_if_modified(|cart| {
                    !self.cleared_since(generation)
                        && cart
                            .set_quantity(product_id, previous)
                            .is_some_and(|p| p != previous)
                });
                Err(e)
            }
        }
    }

    /// Remove a line.
    ///
    /// The line disappears immediately and is not restored if the remote
    /// call fails; callers that need the server's view should [`sync`](Self::sync).
    #[instrument(skip(self, op), fields(op = %op))]
    pub async fn remove_item(&self, op: &OperationId, product_id: &str) -> CommerceResult<Cart> {
        let _guard = self.lock_product(product_id).await;

        let mut generation = 0;
        let mut removed = false;
        self.state.send_if_modified(|cart| {
            generation = self.generation();
            removed = cart.remove(product_id).is_some();
            removed
        });
        if !removed {
            debug!("Product not in cart, nothing to remove");
            return Ok(self.snapshot());
        }

        match self.service.remove_item(op, product_id).await {
            Ok(server) => {
                self.reconcile(generation, product_id, &server);
                Ok(self.snapshot())
            }
            Err(e) => {
                warn!("Remote remove failed, item stays removed locally: {}", e);
                Err(e)
            }
        }
    }

    /// Validate `code` remotely and attach it to the cart.
    ///
    /// A rejected code leaves the cart untouched and comes back as
    /// [`CommerceError::InvalidDiscount`] carrying the server's message.
    #[instrument(skip(self, op), fields(op = %op))]
    pub async fn apply_discount(&self, op: &OperationId, code: &str) -> CommerceResult<Discount> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CommerceError::InvalidRequest(
                "Discount code is empty".to_string(),
            ));
        }

        let generation = self.generation();
        let verdict = self.service.apply_discount(op, code).await?;
        let message = verdict.message.clone();
        match verdict.into_discount(code) {
            Some(discount) => {
                let applied = self.state.send_if_modified(|cart| {
                    if self.cleared_since(generation) {
                        return false;
                    }
                    cart.discount = Some(discount.clone());
                    true
                });
                if applied {
                    info!("Applied discount {} ({:?})", discount.code, discount.kind);
                } else {
                    debug!("Cart cleared while discount was validated");
                }
                Ok(discount)
            }
            None => {
                let message = message.unwrap_or_else(|| "This code is not valid".to_string());
                debug!("Discount rejected: {}", message);
                Err(CommerceError::InvalidDiscount {
                    code: code.to_string(),
                    message,
                })
            }
        }
    }

    /// Drop the applied discount locally
    pub fn remove_discount(&self) -> Option<Discount> {
        let mut removed = None;
        self.state.send_if_modified(|cart| {
            removed = cart.discount.take();
            removed.is_some()
        });
        removed
    }

    /// Empty the cart. Called once an order is confirmed.
    ///
    /// Mutations still awaiting the server when this runs leave the emptied
    /// cart alone.
    pub fn clear(&self) {
        self.state.send_modify(|cart| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            cart.clear();
        });
        info!("Cart cleared");
    }

    /// Empty the server cart
    #[instrument(skip(self, op), fields(op = %op))]
    pub async fn clear_remote(&self, op: &OperationId) -> CommerceResult<()> {
        self.service.clear(op).await
    }

    /// Fold the server's row into the local cart unless the cart was
    /// cleared after `generation` was taken
    fn reconcile(&self, generation: u64, product_id: &str, server: &Cart) {
        self.state.send_if_modified(|cart| {
            if self.cleared_since(generation) {
                debug!("Cart cleared while {} was in flight", product_id);
                return false;
            }
            let before = cart.clone();
            cart.reconcile_item(product_id, server);
            *cart != before
        });
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn cleared_since(&self, generation: u64) -> bool {
        self.generation() != generation
    }

    async fn lock_product(&self, product_id: &str) -> ProductGuard<'_> {
        let lock = {
            let mut locks = self.locks();
            locks.entry(product_id.to_string()).or_default().clone()
        };
        ProductGuard {
            store: self,
            product_id: product_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<String, ProductLock>> {
        self.product_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds a product's lock; drops the map entry once nobody else waits on it
struct ProductGuard<'a> {
    store: &'a CartStore,
    product_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ProductGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.store.locks();
        if locks
            .get(&self.product_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.product_id);
        }
    }
}
