//! API request and response models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod checkout;
pub mod orders;

/// Body returned with every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error kind, e.g. `invalid_product` or `payment_not_completed`
    pub error: String,
    /// Message safe to show to the customer
    pub message: String,
}
