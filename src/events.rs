//! Domain events emitted after a transaction commits.
//!
//! Publishing never blocks and never fails the caller: the order is already
//! committed by the time an event exists. A separate task drains the channel
//! and hands each event to a [`Notifier`], retrying delivery on its own.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Clone, Serialize)]
pub struct OrderPlaced {
    pub order_id: i32,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub total_amount: i64,
    pub item_count: usize,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced(OrderPlaced),
}

#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<DomainEvent>,
}

impl EventPublisher {
    pub fn publish(&self, event: DomainEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "event channel full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(?event, "event consumer stopped, dropping event");
            }
        }
    }
}

pub fn channel(buffer: usize) -> (EventPublisher, mpsc::Receiver<DomainEvent>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventPublisher { tx }, rx)
}

/// Delivery side of order notifications (email, SMS, ...).
pub trait Notifier: Send + Sync + 'static {
    fn order_placed(&self, event: &OrderPlaced) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Writes the notification to the log instead of sending it.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn order_placed(&self, event: &OrderPlaced) -> anyhow::Result<()> {
        tracing::info!(
            order_number = %event.order_number,
            to = %event.customer_email,
            total = event.total_amount,
            "order confirmation queued"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Drain events until every publisher is dropped.
pub async fn run_notifier<N: Notifier>(
    mut rx: mpsc::Receiver<DomainEvent>,
    notifier: N,
    policy: RetryPolicy,
) {
    while let Some(event) = rx.recv().await {
        match event {
            DomainEvent::OrderPlaced(placed) => deliver(&notifier, &placed, policy).await,
        }
    }
    tracing::debug!("event channel closed, notifier exiting");
}

async fn deliver<N: Notifier>(notifier: &N, event: &OrderPlaced, policy: RetryPolicy) {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match notifier.order_placed(event).await {
            Ok(()) => return,
            Err(err) if attempt < attempts => {
                tracing::warn!(
                    error = %err,
                    attempt,
                    order_number = %event.order_number,
                    "notification failed, retrying"
                );
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    order_number = %event.order_number,
                    "notification failed, giving up"
                );
            }
        }
    }
}
