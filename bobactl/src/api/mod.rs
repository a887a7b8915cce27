//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response bodies
//!
//! # Routes
//!
//! - `POST /create-checkout-session`: price a cart and open a hosted checkout session
//! - `POST /api/create-payment-intent`: price a cart and open a payment intent
//! - `GET /api/verify-session?session_id=...`: materialize (or fetch) the order for a session
//! - `GET /api/orders/{session_id}`: read a stored order without contacting the provider
//! - `POST /webhook`: payment provider notifications
//!
//! All endpoints are documented with `utoipa`; the document is served at `/api/openapi.json`.

pub mod handlers;
pub mod models;
