//! Turning a paid checkout session into exactly one stored order.
//!
//! Per session id there are two states, absent and materialized, and the second is terminal.
//! [`OrderMaterializer::materialize`] is called by the webhook listener and by the polling
//! endpoint, in any order and any number of times, possibly concurrently.
//!
//! The read-then-write against the document store is not atomic and no lock is taken.
//! Two concurrent callers may both see "absent" and both write. That is harmless because
//! the order is derived only from the provider session (frozen cart, total and creation
//! time), never from the live catalog or the clock, so every writer upserts the same
//! document under the same key.

use std::{fmt, sync::Arc};

use crate::{
    checkout::{FrozenCart, MetadataError},
    db::{DocumentStore, StoreError, get_typed, set_typed},
    metrics,
    orders::{ORDERS_COLLECTION, Order},
    payment_providers::{PaymentError, PaymentProvider},
};

/// What caused a materialization attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Provider-signed completion notification
    Webhook,
    /// Client polling for its order
    Poll,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Webhook => "webhook",
            Trigger::Poll => "poll",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("Payment not completed{}", .reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    PaymentNotCompleted { reason: Option<String> },

    #[error("Checkout session {0} not found")]
    UnknownSession(String),

    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(#[source] PaymentError),

    #[error("Checkout session {session_id} has corrupt metadata: {source}")]
    CorruptSessionMetadata {
        session_id: String,
        #[source]
        source: MetadataError,
    },

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),
}

/// Materializes orders for paid checkout sessions
#[derive(Clone)]
pub struct OrderMaterializer {
    provider: Arc<dyn PaymentProvider>,
    store: Arc<dyn DocumentStore>,
}

impl OrderMaterializer {
    pub fn new(provider: Arc<dyn PaymentProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self { provider, store }
    }

    /// Return the order for `session_id`, creating it if the session is paid and no order
    /// exists yet. Nothing is written on any error path.
    #[tracing::instrument(skip(self), fields(trigger = %trigger))]
    pub async fn materialize(&self, session_id: &str, trigger: Trigger) -> Result<Order, MaterializeError> {
        let result = self.try_materialize(session_id).await;

        let outcome = match &result {
            Ok((_, true)) => "created",
            Ok((_, false)) => "existing",
            Err(MaterializeError::PaymentNotCompleted { .. }) => "unpaid",
            Err(_) => "error",
        };
        metrics::record_materialization(trigger.as_str(), outcome);

        result.map(|(order, _)| order)
    }

    /// Returns the order and whether this call wrote it
    async fn try_materialize(&self, session_id: &str) -> Result<(Order, bool), MaterializeError> {
        let session = self
            .provider
            .get_payment_session(session_id)
            .await
            .map_err(|e| match e {
                PaymentError::SessionNotFound(id) => MaterializeError::UnknownSession(id),
                other => MaterializeError::ProviderUnavailable(other),
            })?;

        if !session.status.is_paid() {
            tracing::debug!(status = ?session.status, "Session not paid yet");
            return Err(MaterializeError::PaymentNotCompleted {
                reason: session.last_error,
            });
        }

        if let Some(existing) = get_typed::<Order>(self.store.as_ref(), ORDERS_COLLECTION, session_id).await? {
            tracing::trace!("Order already materialized");
            return Ok((existing, false));
        }

        let cart = FrozenCart::decode(&session.metadata).map_err(|source| {
            tracing::error!(
                data_integrity_alert = true,
                error = %source,
                "Paid checkout session carries unreadable cart metadata"
            );
            MaterializeError::CorruptSessionMetadata {
                session_id: session_id.to_string(),
                source,
            }
        })?;

        if let Some(charged) = session.amount_total
            && charged != cart.total
        {
            tracing::warn!(
                charged,
                frozen_total = cart.total,
                "Provider total differs from frozen cart total; keeping frozen total"
            );
        }

        let order = Order::from_paid_session(session_id, cart, session.created_at);
        set_typed(self.store.as_ref(), ORDERS_COLLECTION, session_id, &order).await?;

        tracing::info!(items = order.items.len(), total = order.total_amount, "Materialized order");
        Ok((order, true))
    }
}
