//! Opening payment sessions for a priced cart.
//!
//! [`CheckoutSessionFactory`] is a thin adapter over the [`PaymentProvider`]: it freezes the
//! priced cart into session metadata (so orders can later be built without consulting the
//! catalog again) and asks the provider for a session. It never retries; a provider failure
//! is reported to the caller as [`CheckoutError::ProviderUnavailable`].

use std::sync::Arc;

use crate::{
    config::Config,
    payment_providers::{CheckoutRequest, PaymentError, PaymentIntentHandle, PaymentIntentRequest, PaymentProvider},
    pricing::{CartLine, MinorUnits},
};

pub mod metadata;

pub use metadata::{FrozenCart, MetadataError};

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Invalid amount {0}")]
    InvalidAmount(MinorUnits),

    #[error("Failed to freeze cart into session metadata: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(#[source] PaymentError),
}

/// A checkout session the customer can be sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedSession {
    pub session_id: String,
    pub url: String,
    pub amount: MinorUnits,
}

/// Opens provider sessions carrying a frozen cart
#[derive(Clone)]
pub struct CheckoutSessionFactory {
    provider: Arc<dyn PaymentProvider>,
    currency: String,
    product_name: String,
    success_url: String,
    cancel_url: String,
}

impl CheckoutSessionFactory {
    pub fn new(provider: Arc<dyn PaymentProvider>, config: &Config) -> Self {
        Self {
            provider,
            currency: config.checkout.currency.clone(),
            product_name: config.checkout.product_name.clone(),
            success_url: config.success_url(),
            cancel_url: config.cancel_url(),
        }
    }

    fn freeze(amount: MinorUnits, lines: &[CartLine]) -> Result<FrozenCart, CheckoutError> {
        if amount <= 0 {
            return Err(CheckoutError::InvalidAmount(amount));
        }
        Ok(FrozenCart::new(lines.to_vec(), amount))
    }

    /// Open a hosted checkout session charging `amount` for `lines`
    #[tracing::instrument(skip_all, fields(amount = amount))]
    pub async fn open(&self, amount: MinorUnits, lines: &[CartLine]) -> Result<OpenedSession, CheckoutError> {
        let frozen = Self::freeze(amount, lines)?;

        let request = CheckoutRequest {
            amount,
            currency: self.currency.clone(),
            product_name: self.product_name.clone(),
            success_url: self.success_url.clone(),
            cancel_url: self.cancel_url.clone(),
            metadata: frozen.encode()?,
        };

        let handle = self
            .provider
            .create_checkout_session(&request)
            .await
            .map_err(CheckoutError::ProviderUnavailable)?;

        Ok(OpenedSession {
            session_id: handle.id,
            url: handle.url,
            amount,
        })
    }

    /// Open a payment intent for an embedded payment form
    #[tracing::instrument(skip_all, fields(amount = amount))]
    pub async fn open_payment_intent(&self, amount: MinorUnits, lines: &[CartLine]) -> Result<PaymentIntentHandle, CheckoutError> {
        let frozen = Self::freeze(amount, lines)?;

        let request = PaymentIntentRequest {
            amount,
            currency: self.currency.clone(),
            metadata: frozen.encode()?,
        };

        self.provider
            .create_payment_intent(&request)
            .await
            .map_err(CheckoutError::ProviderUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        payment_providers::{CheckoutSessionHandle, PaymentSession, WebhookEvent, dummy::DummyProvider},
        pricing::{price_cart, test_support::{item, tea_shop}},
    };
    use async_trait::async_trait;

    struct FailingProvider;

    #[async_trait]
    impl PaymentProvider for FailingProvider {
        async fn create_checkout_session(&self, _request: &CheckoutRequest) -> crate::payment_providers::Result<CheckoutSessionHandle> {
            Err(PaymentError::ProviderApi("connection refused".to_string()))
        }

        async fn create_payment_intent(&self, _request: &PaymentIntentRequest) -> crate::payment_providers::Result<PaymentIntentHandle> {
            Err(PaymentError::ProviderApi("connection refused".to_string()))
        }

        async fn get_payment_session(&self, session_id: &str) -> crate::payment_providers::Result<PaymentSession> {
            Err(PaymentError::SessionNotFound(session_id.to_string()))
        }

        async fn validate_webhook(
            &self,
            _headers: &axum::http::HeaderMap,
            _body: &str,
        ) -> crate::payment_providers::Result<Option<WebhookEvent>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_open_freezes_cart_into_session() {
        let provider = Arc::new(DummyProvider::new(false));
        let factory = CheckoutSessionFactory::new(provider.clone(), &Config::default());

        let priced = price_cart(&[item("A", 3, "reg")], &tea_shop()).unwrap();
        let opened = factory.open(priced.total, &priced.lines).await.unwrap();

        assert_eq!(opened.amount, 950);
        assert!(opened.url.starts_with("http://localhost:3000/success?session_id=dummy_session_"));

        let session = provider.get_payment_session(&opened.session_id).await.unwrap();
        let frozen = FrozenCart::decode(&session.metadata).unwrap();
        assert_eq!(frozen.total, 950);
        assert_eq!(frozen.lines, priced.lines);
    }

    #[tokio::test]
    async fn test_zero_amount_is_rejected_before_provider_call() {
        let factory = CheckoutSessionFactory::new(Arc::new(FailingProvider), &Config::default());

        let result = factory.open(0, &[]).await;
        assert!(matches!(result, Err(CheckoutError::InvalidAmount(0))));

        let result = factory.open_payment_intent(-1, &[]).await;
        assert!(matches!(result, Err(CheckoutError::InvalidAmount(-1))));
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_retried() {
        let factory = CheckoutSessionFactory::new(Arc::new(FailingProvider), &Config::default());
        let priced = price_cart(&[item("B", 1, "large")], &tea_shop()).unwrap();

        let result = factory.open(priced.total, &priced.lines).await;
        assert!(matches!(result, Err(CheckoutError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_open_payment_intent() {
        let factory = CheckoutSessionFactory::new(Arc::new(DummyProvider::new(true)), &Config::default());
        let priced = price_cart(&[item("A", 2, "reg")], &tea_shop()).unwrap();

        let intent = factory.open_payment_intent(priced.total, &priced.lines).await.unwrap();
        assert!(intent.client_secret.contains("_secret_"));
    }
}
