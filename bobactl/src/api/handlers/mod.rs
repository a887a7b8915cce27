//! HTTP route handlers.

pub mod checkout;
pub mod orders;
pub mod webhooks;
