use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::pricing::{CartItem, MinorUnits};

// Request models
/// A cart to price. Prices are always looked up in the catalog, never taken from the client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartRequest {
    pub items: Vec<CartItem>,
}

// Response models
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    /// Checkout session id; poll `/api/verify-session` with it after payment
    pub session_id: String,
    /// Hosted payment page to redirect the customer to
    pub url: String,
    /// Amount charged, in minor units
    pub amount: MinorUnits,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    /// Secret for confirming the payment client-side
    pub client_secret: String,
    /// Amount charged, in minor units
    pub amount: MinorUnits,
}
