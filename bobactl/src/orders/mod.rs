//! Orders materialized from paid checkout sessions.
//!
//! An order is written once, keyed by its checkout session id in the `orders` collection,
//! and never modified afterwards by this service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    checkout::FrozenCart,
    pricing::{CartLine, MinorUnits},
};

pub mod materializer;

pub use materializer::{MaterializeError, OrderMaterializer, Trigger};

/// Document store collection holding orders
pub const ORDERS_COLLECTION: &str = "orders";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Paid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Checkout session id
    pub id: String,
    pub items: Vec<CartLine>,
    /// Amount charged, in minor units
    pub total_amount: MinorUnits,
    pub status: OrderStatus,
    /// Preparation time in minutes, assigned by the shop after the order is placed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build the order for a paid session.
    ///
    /// Every input comes from the provider session, so any two callers produce the same
    /// order for the same session.
    pub fn from_paid_session(session_id: &str, cart: FrozenCart, session_created_at: DateTime<Utc>) -> Self {
        Self {
            id: session_id.to_string(),
            items: cart.lines,
            total_amount: cart.total,
            status: OrderStatus::Paid,
            prep_time: None,
            created_at: session_created_at,
            updated_at: session_created_at,
        }
    }
}
