//! Notification fan-out port.
//!
//! Delivery is fire-and-forget: a failing notifier is logged and the
//! operation that produced the event still succeeds.

use crate::cart::CartTotals;
use crate::identity::{CartIdentity, OrderCustomer};
use crate::order::Order;
use serde::Serialize;
use std::sync::Mutex;
use thiserror::Error;

/// An event the core publishes after a state change has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CommerceEvent {
    /// A cart's contents or attachments changed.
    CartUpdated {
        identity: CartIdentity,
        totals: CartTotals,
    },
    /// An order was placed.
    OrderCreated { order: Box<Order> },
    /// An order moved to a new status.
    OrderStatusChanged {
        customer: OrderCustomer,
        order: Box<Order>,
    },
}

impl CommerceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CommerceEvent::CartUpdated { .. } => "cart_updated",
            CommerceEvent::OrderCreated { .. } => "order_created",
            CommerceEvent::OrderStatusChanged { .. } => "order_status_changed",
        }
    }
}

/// Notification delivery failure.
#[derive(Error, Debug)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Receives commerce events (websocket hub, email queue, ...).
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &CommerceEvent) -> Result<(), NotifyError>;
}

/// Deliver `event`, logging and swallowing any failure.
pub(crate) fn dispatch(notifier: &dyn Notifier, event: CommerceEvent) {
    if let Err(e) = notifier.notify(&event) {
        tracing::warn!(event = event.name(), error = %e, "notification dropped");
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: &CommerceEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Emits each event as a `tracing` info event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &CommerceEvent) -> Result<(), NotifyError> {
        match event {
            CommerceEvent::CartUpdated { identity, totals } => {
                tracing::info!(%identity, total = totals.total.amount, "cart updated");
            }
            CommerceEvent::OrderCreated { order } => {
                tracing::info!(order_number = %order.order_number, total = order.total.amount, "order created");
            }
            CommerceEvent::OrderStatusChanged { order, .. } => {
                tracing::info!(order_number = %order.order_number, status = %order.status(), "order status changed");
            }
        }
        Ok(())
    }
}

/// Keeps every event in memory. Optionally fails after recording, to
/// exercise the swallow path.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<CommerceEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that records each event and then reports failure.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<CommerceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Names of events received so far.
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().iter().map(CommerceEvent::name).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &CommerceEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .map_err(|_| NotifyError("recorder lock poisoned".to_string()))?
            .push(event.clone());
        if self.fail {
            return Err(NotifyError("recorder configured to fail".to_string()));
        }
        Ok(())
    }
}
