//! Payment provider webhook listener.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::{
    AppState,
    api::models::ErrorResponse,
    errors::{Error, Result},
    metrics,
    orders::Trigger,
    payment_providers::PaymentError,
};

/// Receive payment provider events
///
/// Signature failures are rejected with 400 so the provider surfaces them. Every verified
/// event is acknowledged with 200, including when materialization fails: the polling
/// endpoint recovers those sessions, and a non-2xx would only make the provider retry
/// into the same failure.
#[utoipa::path(
    post,
    path = "/webhook",
    tag = "webhooks",
    summary = "Payment webhook",
    description = "Verifies the provider signature and materializes the order for completed checkout sessions.",
    request_body(content = String, description = "Raw provider event payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Signature verification failed", body = ErrorResponse),
        (status = 501, description = "No payment provider configured", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn payment_webhook(State(state): State<AppState>, headers: HeaderMap, body: String) -> Result<StatusCode> {
    let Some(provider) = state.payment_provider.clone() else {
        tracing::warn!("Webhook received but no payment provider is configured");
        return Err(Error::PaymentsDisabled);
    };

    let event = match provider.validate_webhook(&headers, &body).await {
        Ok(Some(event)) => event,
        Ok(None) => {
            tracing::debug!("Provider does not use webhooks, acknowledging");
            return Ok(StatusCode::OK);
        }
        Err(e @ (PaymentError::SignatureVerification(_) | PaymentError::InvalidData(_))) => {
            metrics::record_webhook("rejected");
            return Err(Error::BadRequest {
                message: e.to_string(),
            });
        }
        Err(e) => {
            metrics::record_webhook("rejected");
            return Err(anyhow::Error::new(e).context("validate webhook").into());
        }
    };

    tracing::info!("Received webhook event: {}", event.event_type);

    let session_id = match event.session_id {
        Some(session_id) if event.is_checkout_completion() => session_id,
        _ => {
            tracing::debug!("Ignoring webhook event type: {}", event.event_type);
            metrics::record_webhook("ignored");
            return Ok(StatusCode::OK);
        }
    };

    match state.materializer()?.materialize(&session_id, Trigger::Webhook).await {
        Ok(order) => {
            tracing::info!("Webhook materialized order {}", order.id);
            metrics::record_webhook("processed");
        }
        Err(e) => {
            tracing::error!(session_id = %session_id, "Failed to materialize order from webhook: {}", e);
            metrics::record_webhook("failed");
        }
    }

    Ok(StatusCode::OK)
}
