//! Dummy payment provider implementation
//!
//! Keeps sessions in process memory and never talks to an external service. With
//! `auto_complete` set, every session is paid the moment it is created, which makes the
//! full checkout-to-order flow runnable locally. Useful for testing and development purposes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{
    config::DummyConfig,
    payment_providers::{
        CheckoutRequest, CheckoutSessionHandle, PaymentError, PaymentIntentHandle, PaymentIntentRequest, PaymentProvider,
        PaymentSession, PaymentStatus, Result, WebhookEvent,
    },
    pricing::MinorUnits,
};

#[derive(Debug, Clone)]
struct DummySession {
    status: PaymentStatus,
    amount: MinorUnits,
    metadata: BTreeMap<String, String>,
    created_at: DateTime<Utc>,
    last_error: Option<String>,
}

/// In-process payment provider
#[derive(Debug, Default)]
pub struct DummyProvider {
    auto_complete: bool,
    sessions: DashMap<String, DummySession>,
}

impl From<DummyConfig> for DummyProvider {
    fn from(config: DummyConfig) -> Self {
        Self::new(config.auto_complete)
    }
}

impl DummyProvider {
    pub fn new(auto_complete: bool) -> Self {
        Self {
            auto_complete,
            sessions: DashMap::new(),
        }
    }

    /// Mark a session as paid. Returns false if the session doesn't exist.
    pub fn complete_session(&self, session_id: &str) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut session) => {
                session.status = PaymentStatus::Paid;
                session.last_error = None;
                tracing::info!("Dummy provider marked session {} as paid", session_id);
                true
            }
            None => false,
        }
    }

    /// Record a declined payment attempt. Returns false if the session doesn't exist.
    pub fn fail_session(&self, session_id: &str, reason: &str) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut session) => {
                session.status = PaymentStatus::Unpaid;
                session.last_error = Some(reason.to_string());
                true
            }
            None => false,
        }
    }

    fn initial_status(&self) -> PaymentStatus {
        if self.auto_complete {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        }
    }
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSessionHandle> {
        let session_id = format!("dummy_session_{}", uuid::Uuid::new_v4().simple());

        self.sessions.insert(
            session_id.clone(),
            DummySession {
                status: self.initial_status(),
                amount: request.amount,
                metadata: request.metadata.clone(),
                created_at: Utc::now(),
                last_error: None,
            },
        );

        // There is no hosted page; send the customer straight back to the storefront
        let url = request.success_url.replace("{CHECKOUT_SESSION_ID}", &session_id);

        tracing::info!("Dummy provider created checkout session {} for {}", session_id, request.amount);

        Ok(CheckoutSessionHandle { id: session_id, url })
    }

    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntentHandle> {
        let token = uuid::Uuid::new_v4().simple();
        let id = format!("dummy_pi_{token}");

        tracing::info!("Dummy provider created payment intent {} for {}", id, request.amount);

        Ok(PaymentIntentHandle {
            client_secret: format!("{id}_secret_{token}"),
            id,
        })
    }

    async fn get_payment_session(&self, session_id: &str) -> Result<PaymentSession> {
        let session = self
            .sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PaymentError::SessionNotFound(session_id.to_string()))?;

        Ok(PaymentSession {
            id: session_id.to_string(),
            status: session.status,
            amount_total: Some(session.amount),
            metadata: session.metadata,
            created_at: session.created_at,
            last_error: session.last_error,
        })
    }

    async fn validate_webhook(&self, _headers: &axum::http::HeaderMap, _body: &str) -> Result<Option<WebhookEvent>> {
        // Dummy provider doesn't use webhooks
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            amount: 950,
            currency: "gbp".to_string(),
            product_name: "Test Order".to_string(),
            success_url: "http://shop.test/success?session_id={CHECKOUT_SESSION_ID}".to_string(),
            cancel_url: "http://shop.test/cancel".to_string(),
            metadata: [("total_amount".to_string(), "950".to_string())].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn test_auto_complete_session_is_paid() {
        let provider = DummyProvider::new(true);
        let handle = provider.create_checkout_session(&request()).await.unwrap();

        assert!(handle.id.starts_with("dummy_session_"));
        assert_eq!(handle.url, format!("http://shop.test/success?session_id={}", handle.id));

        let session = provider.get_payment_session(&handle.id).await.unwrap();
        assert_eq!(session.status, PaymentStatus::Paid);
        assert_eq!(session.amount_total, Some(950));
        assert_eq!(session.metadata.get("total_amount").map(String::as_str), Some("950"));
    }

    #[tokio::test]
    async fn test_manual_completion() {
        let provider = DummyProvider::new(false);
        let handle = provider.create_checkout_session(&request()).await.unwrap();

        let session = provider.get_payment_session(&handle.id).await.unwrap();
        assert_eq!(session.status, PaymentStatus::Unpaid);

        assert!(provider.fail_session(&handle.id, "card_declined"));
        let session = provider.get_payment_session(&handle.id).await.unwrap();
        assert_eq!(session.last_error.as_deref(), Some("card_declined"));

        assert!(provider.complete_session(&handle.id));
        let completed = provider.get_payment_session(&handle.id).await.unwrap();
        assert_eq!(completed.status, PaymentStatus::Paid);
        assert_eq!(completed.last_error, None);
        // Creation time never moves
        assert_eq!(completed.created_at, session.created_at);

        assert!(!provider.complete_session("dummy_session_unknown"));
    }

    #[tokio::test]
    async fn test_payment_intent_has_client_secret() {
        let provider = DummyProvider::new(true);
        let intent = provider
            .create_payment_intent(&PaymentIntentRequest {
                amount: 500,
                currency: "gbp".to_string(),
                metadata: BTreeMap::new(),
            })
            .await
            .unwrap();

        assert!(intent.client_secret.starts_with(&format!("{}_secret_", intent.id)));
    }

    #[tokio::test]
    async fn test_dummy_has_no_webhooks() {
        let provider = DummyProvider::new(true);
        let event = provider.validate_webhook(&axum::http::HeaderMap::new(), "{}").await.unwrap();
        assert!(event.is_none());
    }
}
