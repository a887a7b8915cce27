//! Payment provider abstraction layer
//!
//! This module defines the `PaymentProvider` trait which abstracts the hosted payment
//! service: opening checkout sessions and payment intents, retrieving a session's outcome,
//! and authenticating completion notifications. Everything the provider knows about the
//! cart travels in the session's string metadata (see [`crate::checkout::metadata`]).

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{config::PaymentConfig, pricing::MinorUnits};

pub mod dummy;
pub mod stripe;

/// Create a payment provider from configuration
///
/// This is the single point where we convert config into provider instances.
/// Adding a new provider requires adding a match arm here.
pub fn create_provider(config: PaymentConfig) -> Result<Arc<dyn PaymentProvider>> {
    match config {
        PaymentConfig::Stripe(stripe_config) => Ok(Arc::new(stripe::StripeProvider::new(stripe_config)?)),
        PaymentConfig::Dummy(dummy_config) => Ok(Arc::new(dummy::DummyProvider::from(dummy_config))),
    }
}

/// Result type for payment provider operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur talking to a payment provider
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider API error: {0}")]
    ProviderApi(String),

    #[error("Payment session {0} not found")]
    SessionNotFound(String),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),

    #[error("Webhook signature verification failed: {0}")]
    SignatureVerification(String),
}

/// Provider-side payment state of a checkout session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    /// Total was zero or fully discounted; nothing to collect
    NoPaymentRequired,
}

impl PaymentStatus {
    pub fn is_paid(self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::NoPaymentRequired)
    }
}

/// Parameters for a hosted checkout session with a single line item
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Charge in minor units
    pub amount: MinorUnits,
    pub currency: String,
    /// Line item name shown on the hosted page
    pub product_name: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

/// A freshly opened checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionHandle {
    pub id: String,
    /// Hosted payment page to redirect the customer to
    pub url: String,
}

/// Parameters for an embedded-form payment intent
#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub amount: MinorUnits,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentHandle {
    pub id: String,
    pub client_secret: String,
}

/// A checkout session as reported by the provider
#[derive(Debug, Clone)]
pub struct PaymentSession {
    pub id: String,
    pub status: PaymentStatus,
    /// Total the provider charged, in minor units
    pub amount_total: Option<MinorUnits>,
    /// Metadata written when the session was opened, returned verbatim
    pub metadata: BTreeMap<String, String>,
    /// When the provider created the session
    pub created_at: DateTime<Utc>,
    /// Reason for the most recent failed payment attempt, if any
    pub last_error: Option<String>,
}

/// Represents a webhook event from a payment provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Type of event (e.g., "checkout.session.completed")
    pub event_type: String,
    /// Session ID associated with this event, if applicable
    pub session_id: Option<String>,
}

impl WebhookEvent {
    /// Whether this event reports a checkout session whose payment went through
    pub fn is_checkout_completion(&self) -> bool {
        matches!(
            self.event_type.as_str(),
            "checkout.session.completed" | "checkout.session.async_payment_succeeded"
        )
    }
}

/// Abstract payment provider interface
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open a hosted checkout session for a fixed amount
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSessionHandle>;

    /// Open a payment intent for an embedded payment form
    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntentHandle>;

    /// Retrieve a checkout session's current state
    async fn get_payment_session(&self, session_id: &str) -> Result<PaymentSession>;

    /// Validate and extract webhook event from raw request data
    ///
    /// Returns None if this provider doesn't support webhooks.
    /// Returns Err if validation fails (invalid signature, malformed data, etc.)
    async fn validate_webhook(&self, headers: &axum::http::HeaderMap, body: &str) -> Result<Option<WebhookEvent>>;
}
