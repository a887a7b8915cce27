//! HTTP handlers for reading orders.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{
    AppState,
    api::models::{ErrorResponse, orders::VerifySessionQuery},
    db::get_typed,
    errors::{Error, Result},
    orders::{ORDERS_COLLECTION, Order, Trigger},
};

/// Verify a checkout session and return its order
///
/// This is the polling counterpart of the webhook: whichever runs first creates the order,
/// and both always agree on its content.
#[utoipa::path(
    get,
    path = "/api/verify-session",
    tag = "orders",
    summary = "Verify checkout session",
    description = "Checks the session with the payment provider and returns its order, creating it on first successful verification. Idempotent.",
    params(VerifySessionQuery),
    responses(
        (status = 200, description = "Order for the paid session", body = Order),
        (status = 402, description = "Payment not verified yet", body = ErrorResponse),
        (status = 404, description = "Unknown checkout session", body = ErrorResponse),
        (status = 501, description = "No payment provider configured", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all, fields(session_id = ?query.session_id))]
pub async fn verify_session(State(state): State<AppState>, Query(query): Query<VerifySessionQuery>) -> Result<Json<Order>> {
    let Some(session_id) = query.session_id.filter(|id| !id.trim().is_empty()) else {
        return Err(Error::BadRequest {
            message: "session_id is required".to_string(),
        });
    };

    let order = state.materializer()?.materialize(&session_id, Trigger::Poll).await?;
    Ok(Json(order))
}

#[utoipa::path(
    get,
    path = "/api/orders/{session_id}",
    tag = "orders",
    summary = "Get order",
    description = "Returns a stored order without contacting the payment provider.",
    params(
        ("session_id" = String, Path, description = "Checkout session id"),
    ),
    responses(
        (status = 200, description = "Stored order", body = Order),
        (status = 404, description = "No order for this session yet", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all, fields(session_id = %session_id))]
pub async fn get_order(State(state): State<AppState>, Path(session_id): Path<String>) -> Result<Json<Order>> {
    get_typed::<Order>(state.store.as_ref(), ORDERS_COLLECTION, &session_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound {
            resource: "Order".to_string(),
            id: session_id,
        })
}
