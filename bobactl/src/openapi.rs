//! OpenAPI documentation for the storefront API, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::{api, orders, pricing};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "bobactl",
        description = "Cart pricing, hosted checkout and order materialization for the tea shop storefront."
    ),
    paths(
        api::handlers::checkout::create_checkout_session,
        api::handlers::checkout::create_payment_intent,
        api::handlers::orders::verify_session,
        api::handlers::orders::get_order,
        api::handlers::webhooks::payment_webhook,
    ),
    components(
        schemas(
            api::models::ErrorResponse,
            api::models::checkout::CartRequest,
            api::models::checkout::CheckoutSessionResponse,
            api::models::checkout::PaymentIntentResponse,
            pricing::CartItem,
            pricing::CartLine,
            orders::Order,
            orders::OrderStatus,
        )
    ),
    tags(
        (name = "checkout", description = "Price a cart and open a payment session.

Prices always come from the catalog. Bundle promotions group items by category and size, and
any leftover items are charged at their unit price."),
        (name = "orders", description = "Read orders created from paid checkout sessions.

An order exists only once the payment provider reports the session as paid. Polling
`/api/verify-session` and the webhook converge on the same order."),
        (name = "webhooks", description = "Signed notifications from the payment provider."),
    )
)]
pub struct ApiDoc;
