//! # Payment Tracker
//!
//! Polls the payment service for a submitted order until the payment settles.
//!
//! - First poll runs immediately, then one per `poll_interval`
//! - Polls never overlap; a slow response delays the next tick
//! - Terminal status or a failed poll ends polling
//! - `stop()` or dropping the handle aborts the task and freezes the state

use cart_core::{PaymentStatus, PaymentTrackingState, SharedOrderService, SharedPaymentService};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

/// Default delay between two polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Payment tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    /// Give up after this many polls. `None` polls until settled.
    pub max_polls: Option<u32>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: None,
        }
    }
}

impl TrackerConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }
}

/// State shared between the handle and the polling task
struct Shared {
    state: watch::Sender<PaymentTrackingState>,
    stopped: AtomicBool,
}

impl Shared {
    /// Apply `update` unless the tracker was stopped. Returns false once stopped.
    fn publish(&self, update: impl FnOnce(&mut PaymentTrackingState)) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|state| {
            if self.stopped.load(Ordering::SeqCst) {
                return false;
            }
            update(state);
            applied = true;
            true
        });
        applied
    }
}

/// Handle to a running payment poll
pub struct PaymentTracker {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl PaymentTracker {
    /// Spawn the polling task. Must be called inside a tokio runtime.
    pub fn start(
        payment_id: impl Into<String>,
        payments: SharedPaymentService,
        orders: SharedOrderService,
        config: TrackerConfig,
    ) -> Self {
        let payment_id = payment_id.into();
        let (state, _) = watch::channel(PaymentTrackingState::new(payment_id.clone()));
        let shared = Arc::new(Shared {
            state,
            stopped: AtomicBool::new(false),
        });

        info!(
            "Tracking payment {} every {:?}",
            payment_id, config.poll_interval
        );
        let task = tokio::spawn(poll_payment(
            payment_id,
            payments,
            orders,
            config,
            shared.clone(),
        ));

        Self {
            shared,
            task: Some(task),
        }
    }

    /// Current tracking state
    pub fn state(&self) -> PaymentTrackingState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<PaymentTrackingState> {
        self.shared.state.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.shared.state.borrow().is_polling
    }

    pub fn payment_id(&self) -> String {
        self.shared.state.borrow().payment_id.clone()
    }

    /// Cancel polling. Responses still in flight are discarded.
    pub fn stop(&mut self) {
        self.shared.state.send_if_modified(|state| {
            let was_polling = state.is_polling;
            state.is_polling = false;
            was_polling
        });
        self.shared.stopped.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Payment tracker stopped");
        }
    }

    /// Wait for polling to end and return the final state
    pub async fn finished(&mut self) -> PaymentTrackingState {
        if let Some(task) = self.task.as_mut() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Payment tracker task failed: {}", e);
                }
            }
            self.task = None;
        }
        self.state()
    }
}

impl Drop for PaymentTracker {
    fn drop(&mut self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[instrument(skip(payments, orders, config, shared))]
async fn poll_payment(
    payment_id: String,
    payments: SharedPaymentService,
    orders: SharedOrderService,
    config: TrackerConfig,
    shared: Arc<Shared>,
) {
    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut polls = 0u32;
    loop {
        ticker.tick().await;

        let result = payments.verify_payment(&payment_id).await;
        polls += 1;
        let checked_at = Utc::now();

        let verification = match result {
            Ok(verification) => verification,
            Err(e) => {
                warn!("Payment status check failed: {}", e);
                shared.publish(|state| {
                    state.status = PaymentStatus::Unknown;
                    state.error = Some(e.user_message());
                    state.is_polling = false;
                    state.polls = polls;
                    state.last_checked_at = Some(checked_at);
                });
                return;
            }
        };

        let status = verification.status;
        let settled = status.is_terminal();
        let exhausted = !settled && config.max_polls.is_some_and(|max| polls >= max);

        let applied = shared.publish(|state| {
            state.status = status;
            state.polls = polls;
            state.last_checked_at = Some(checked_at);
            if verification.order_id.is_some() {
                state.order_id = verification.order_id.clone();
            }
            if settled {
                state.is_polling = false;
            } else if exhausted {
                state.is_polling = false;
                state.error = Some(format!(
                    "Payment is still {} after {} status checks",
                    status, polls
                ));
            }
        });
        if !applied {
            return;
        }

        if settled {
            info!("Payment {} settled: {}", payment_id, status);
            if let (Some(order_id), Some(order_status)) =
                (verification.order_id.as_deref(), status.order_status())
            {
                if let Err(e) = orders.update_status(order_id, order_status).await {
                    warn!("Failed to report {} for order {}: {}", order_status, order_id, e);
                }
            }
            return;
        }
        if exhausted {
            warn!("Gave up on payment {} after {} checks", payment_id, polls);
            return;
        }
        debug!("Payment {} still {}", payment_id, status);
    }
}
