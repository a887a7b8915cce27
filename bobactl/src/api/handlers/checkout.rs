//! HTTP handlers for opening payment sessions.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        ErrorResponse,
        checkout::{CartRequest, CheckoutSessionResponse, PaymentIntentResponse},
    },
    errors::{Error, Result},
    metrics,
    pricing::{PricedCart, price_cart},
};

/// Price a cart against the current catalog snapshot
async fn price(state: &AppState, request: &CartRequest) -> Result<PricedCart> {
    let snapshot = state.catalog.snapshot().await.map_err(crate::pricing::PricingError::from)?;
    Ok(price_cart(&request.items, &snapshot)?)
}

fn record_failure(err: &Error) {
    metrics::record_checkout_failure(err.error_code());
}

#[utoipa::path(
    post,
    path = "/create-checkout-session",
    tag = "checkout",
    summary = "Create checkout session",
    description = "Prices the cart against the catalog, applying bundle promotions, and opens a hosted checkout session for the total.",
    request_body = CartRequest,
    responses(
        (status = 200, description = "Checkout session opened", body = CheckoutSessionResponse),
        (status = 400, description = "Checkout blocked by the cart contents", body = ErrorResponse),
        (status = 501, description = "No payment provider configured", body = ErrorResponse),
        (status = 502, description = "Payment provider unavailable", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all, fields(items = request.items.len()))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(request): Json<CartRequest>,
) -> Result<Json<CheckoutSessionResponse>> {
    let result = async {
        let factory = state.checkout_factory()?;
        let priced = price(&state, &request).await?;
        Ok::<_, Error>(factory.open(priced.total, &priced.lines).await?)
    }
    .await
    .inspect_err(record_failure)?;

    metrics::record_checkout_opened("checkout_session");
    tracing::info!("Opened checkout session {} for {}", result.session_id, result.amount);

    Ok(Json(CheckoutSessionResponse {
        session_id: result.session_id,
        url: result.url,
        amount: result.amount,
    }))
}

#[utoipa::path(
    post,
    path = "/api/create-payment-intent",
    tag = "checkout",
    summary = "Create payment intent",
    description = "Prices the cart against the catalog and opens a payment intent for an embedded payment form.",
    request_body = CartRequest,
    responses(
        (status = 200, description = "Payment intent opened", body = PaymentIntentResponse),
        (status = 400, description = "Checkout blocked by the cart contents", body = ErrorResponse),
        (status = 501, description = "No payment provider configured", body = ErrorResponse),
        (status = 502, description = "Payment provider unavailable", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all, fields(items = request.items.len()))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<CartRequest>,
) -> Result<Json<PaymentIntentResponse>> {
    let (intent, amount) = async {
        let factory = state.checkout_factory()?;
        let priced = price(&state, &request).await?;
        let intent = factory.open_payment_intent(priced.total, &priced.lines).await?;
        Ok::<_, Error>((intent, priced.total))
    }
    .await
    .inspect_err(record_failure)?;

    metrics::record_checkout_opened("payment_intent");
    tracing::info!("Opened payment intent {} for {}", intent.id, amount);

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
        amount,
    }))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            ErrorResponse,
            checkout::{CheckoutSessionResponse, PaymentIntentResponse},
        },
        test_utils::{create_test_server, dummy_state},
    };
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_checkout_session_charges_bundle_price() {
        let (state, _provider) = dummy_state(true);
        let server = create_test_server(state);

        let response = server
            .post("/create-checkout-session")
            .json(&json!({
                "items": [
                    {"productId": "A", "quantity": 3, "size": "reg", "category": "tea"},
                    {"productId": "B", "quantity": 1, "size": "large"}
                ]
            }))
            .await;

        response.assert_status_ok();
        let body: CheckoutSessionResponse = response.json();
        assert_eq!(body.amount, 950 + 425);
        assert!(body.session_id.starts_with("dummy_session_"));
        assert!(body.url.contains(&body.session_id));
    }

    #[tokio::test]
    async fn test_unknown_product_blocks_checkout() {
        let (state, _provider) = dummy_state(true);
        let server = create_test_server(state);

        let response = server
            .post("/create-checkout-session")
            .json(&json!({"items": [{"productId": "nope", "quantity": 1, "size": "reg"}]}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "invalid_product");
        assert!(body.message.starts_with("Checkout blocked"));
    }

    #[tokio::test]
    async fn test_empty_cart_and_zero_quantity_are_rejected() {
        let (state, _provider) = dummy_state(true);
        let server = create_test_server(state);

        let response = server.post("/create-checkout-session").json(&json!({"items": []})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().error, "empty_cart");

        let response = server
            .post("/api/create-payment-intent")
            .json(&json!({"items": [{"productId": "A", "quantity": 0, "size": "reg"}]}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().error, "invalid_quantity");
    }

    #[tokio::test]
    async fn test_payment_intent_returns_client_secret() {
        let (state, _provider) = dummy_state(true);
        let server = create_test_server(state);

        let response = server
            .post("/api/create-payment-intent")
            .json(&json!({"items": [{"productId": "A", "quantity": 2, "size": "reg"}]}))
            .await;

        response.assert_status_ok();
        let body: PaymentIntentResponse = response.json();
        assert_eq!(body.amount, 600);
        assert!(body.client_secret.contains("_secret_"));
    }

    #[tokio::test]
    async fn test_checkout_without_provider_is_not_implemented() {
        let server = create_test_server(crate::test_utils::state_without_provider());

        let response = server
            .post("/create-checkout-session")
            .json(&json!({"items": [{"productId": "A", "quantity": 1, "size": "reg"}]}))
            .await;

        response.assert_status(StatusCode::NOT_IMPLEMENTED);
        assert_eq!(response.json::<ErrorResponse>().error, "payments_disabled");
    }
}
