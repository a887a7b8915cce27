//! Stripe payment provider implementation

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stripe::{Client, ClientBuilder, StripeError};
use stripe_checkout::{
    CheckoutSession, CheckoutSessionMode, CheckoutSessionPaymentStatus,
    checkout_session::{
        CreateCheckoutSession, CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
        CreateCheckoutSessionPaymentMethodTypes, ProductData, RetrieveCheckoutSession,
    },
};
use stripe_core::payment_intent::{CreatePaymentIntent, CreatePaymentIntentAutomaticPaymentMethods};
use stripe_types::Currency;
use stripe_webhook::{EventObject, Webhook, WebhookError};

use crate::{
    config::StripeConfig,
    payment_providers::{
        CheckoutRequest, CheckoutSessionHandle, PaymentError, PaymentIntentHandle, PaymentIntentRequest, PaymentProvider,
        PaymentSession, PaymentStatus, Result, WebhookEvent,
    },
};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Stripe payment provider
pub struct StripeProvider {
    client: Client,
    webhook_secret: String,
}

impl StripeProvider {
    /// Create a new Stripe provider
    pub fn new(config: StripeConfig) -> Result<Self> {
        crate::install_crypto_provider();

        // Request paths are appended straight after the base
        let api_base = format!("{}/", config.api_base.trim_end_matches('/'));

        let client = ClientBuilder::new(config.api_key)
            .url(api_base)
            .build()
            .map_err(|e| PaymentError::InvalidData(format!("Invalid Stripe client configuration: {e}")))?;

        Ok(Self {
            client,
            webhook_secret: config.webhook_secret,
        })
    }
}

/// Map a Stripe client failure onto the provider error taxonomy
fn provider_error(error: StripeError) -> PaymentError {
    match error {
        StripeError::Stripe(detail, status) => {
            let message = detail.message.clone().unwrap_or_else(|| format!("HTTP {status}"));
            tracing::error!(status, code = ?detail.code, "Stripe API request failed: {}", message);
            PaymentError::ProviderApi(message)
        }
        StripeError::JSONDeserialize(e) => {
            tracing::error!("Unexpected Stripe response: {}", e);
            PaymentError::InvalidData(format!("Unexpected Stripe response: {e}"))
        }
        other => {
            tracing::error!("Stripe request failed: {}", other);
            PaymentError::ProviderApi(other.to_string())
        }
    }
}

fn currency(code: &str) -> Currency {
    let Ok(currency) = code.to_lowercase().parse::<Currency>();
    currency
}

/// Stripe ids are `<prefix>_<alphanumerics>`; anything else cannot name a session
fn is_session_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn payment_status(status: &CheckoutSessionPaymentStatus) -> PaymentStatus {
    match status {
        CheckoutSessionPaymentStatus::Paid => PaymentStatus::Paid,
        CheckoutSessionPaymentStatus::NoPaymentRequired => PaymentStatus::NoPaymentRequired,
        CheckoutSessionPaymentStatus::Unpaid | CheckoutSessionPaymentStatus::Unknown(_) | _ => PaymentStatus::Unpaid,
    }
}

/// Reason for the last failed charge, when the payment intent was expanded
fn last_payment_error(session: &CheckoutSession) -> Option<String> {
    let error = session.payment_intent.as_ref()?.as_object()?.last_payment_error.as_ref()?;
    error
        .message
        .clone()
        .or_else(|| error.code.as_ref().map(|code| code.as_str().to_string()))
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSessionHandle> {
        let mut price_data = CreateCheckoutSessionLineItemsPriceData::new(currency(&request.currency));
        price_data.unit_amount = Some(request.amount);
        price_data.product_data = Some(ProductData::new(request.product_name.clone()));

        let mut line_item = CreateCheckoutSessionLineItems::new();
        line_item.price_data = Some(price_data);
        line_item.quantity = Some(1);

        let metadata: HashMap<String, String> = request.metadata.clone().into_iter().collect();

        let session = CreateCheckoutSession::new()
            .mode(CheckoutSessionMode::Payment)
            .payment_method_types(vec![CreateCheckoutSessionPaymentMethodTypes::Card])
            .line_items(vec![line_item])
            .success_url(request.success_url.clone())
            .cancel_url(request.cancel_url.clone())
            .metadata(metadata)
            .send(&self.client)
            .await
            .map_err(provider_error)?;

        let url = session.url.ok_or_else(|| {
            tracing::error!("Checkout session {} missing URL", session.id);
            PaymentError::InvalidData("Checkout session missing URL".to_string())
        })?;

        tracing::info!("Created checkout session {} for {} {}", session.id, request.amount, request.currency);

        Ok(CheckoutSessionHandle {
            id: session.id.to_string(),
            url,
        })
    }

    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntentHandle> {
        let metadata: HashMap<String, String> = request.metadata.clone().into_iter().collect();

        let intent = CreatePaymentIntent::new(request.amount, currency(&request.currency))
            .automatic_payment_methods(CreatePaymentIntentAutomaticPaymentMethods::new(true))
            .metadata(metadata)
            .send(&self.client)
            .await
            .map_err(provider_error)?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            tracing::error!("Payment intent {} missing client_secret", intent.id);
            PaymentError::InvalidData("Payment intent missing client_secret".to_string())
        })?;

        tracing::info!("Created payment intent {} for {} {}", intent.id, request.amount, request.currency);

        Ok(PaymentIntentHandle {
            id: intent.id.to_string(),
            client_secret,
        })
    }

    async fn get_payment_session(&self, session_id: &str) -> Result<PaymentSession> {
        if !is_session_id(session_id) {
            tracing::debug!("Rejecting malformed checkout session id {:?}", session_id);
            return Err(PaymentError::SessionNotFound(session_id.to_string()));
        }

        let session = RetrieveCheckoutSession::new(session_id)
            .expand(vec!["payment_intent".to_string()])
            .send(&self.client)
            .await
            .map_err(|e| match e {
                StripeError::Stripe(_, 404) => {
                    tracing::debug!("Stripe has no checkout session {}", session_id);
                    PaymentError::SessionNotFound(session_id.to_string())
                }
                other => provider_error(other),
            })?;

        let created_at = DateTime::<Utc>::from_timestamp(session.created, 0)
            .ok_or_else(|| PaymentError::InvalidData(format!("Invalid session creation time {}", session.created)))?;

        Ok(PaymentSession {
            status: payment_status(&session.payment_status),
            amount_total: session.amount_total,
            last_error: last_payment_error(&session),
            metadata: session.metadata.clone().unwrap_or_default().into_iter().collect::<BTreeMap<_, _>>(),
            created_at,
            id: session.id.to_string(),
        })
    }

    async fn validate_webhook(&self, headers: &axum::http::HeaderMap, body: &str) -> Result<Option<WebhookEvent>> {
        // Get the Stripe signature from headers
        let signature = headers
            .get(SIGNATURE_HEADER)
            .ok_or_else(|| {
                tracing::error!("Missing stripe-signature header");
                PaymentError::SignatureVerification("Missing stripe-signature header".to_string())
            })?
            .to_str()
            .map_err(|e| {
                tracing::error!("Invalid stripe-signature header: {:?}", e);
                PaymentError::SignatureVerification("Invalid stripe-signature header".to_string())
            })?;

        let event = Webhook::construct_event(body, signature, &self.webhook_secret).map_err(|e| match e {
            WebhookError::BadParse(reason) => {
                tracing::error!("Failed to parse webhook event: {}", reason);
                PaymentError::InvalidData(format!("Malformed webhook event: {reason}"))
            }
            other => {
                tracing::error!("Failed to verify webhook signature: {}", other);
                PaymentError::SignatureVerification(other.to_string())
            }
        })?;

        let event_type = event.type_.as_str().to_string();
        tracing::trace!("Validated Stripe webhook event: {}", event_type);

        let session_id = match event.data.object {
            EventObject::CheckoutSessionCompleted(session)
            | EventObject::CheckoutSessionAsyncPaymentSucceeded(session)
            | EventObject::CheckoutSessionAsyncPaymentFailed(session)
            | EventObject::CheckoutSessionExpired(session) => Some(session.id.to_string()),
            _ => None,
        };

        Ok(Some(WebhookEvent { event_type, session_id }))
    }
}

/// A checkout session as the Stripe API renders it, with the fields the client requires
#[cfg(test)]
pub(crate) fn checkout_session_json(
    id: &str,
    payment_status: &str,
    amount_total: i64,
    metadata: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "object": "checkout.session",
        "url": format!("https://checkout.stripe.com/c/pay/{id}"),
        "mode": "payment",
        "livemode": false,
        "payment_status": payment_status,
        "status": if payment_status == "unpaid" { "open" } else { "complete" },
        "amount_total": amount_total,
        "currency": "gbp",
        "created": 1_760_000_000,
        "expires_at": 1_760_086_400,
        "metadata": metadata,
        "payment_intent": null,
        "payment_method_types": ["card"],
        "automatic_tax": {"enabled": false, "liability": null, "provider": null, "status": null},
        "custom_fields": [],
        "custom_text": {"after_submit": null, "shipping_address": null, "submit": null, "terms_of_service_acceptance": null},
        "shipping_options": []
    })
}
