use crate::{
    checkout::{CheckoutError, MetadataError},
    db::StoreError,
    orders::MaterializeError,
    pricing::PricingError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// No payment provider is configured
    #[error("Payment processing is not configured")]
    PaymentsDisabled,

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Cart could not be priced
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Payment session could not be opened
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Order could not be materialized
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    /// Document store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

const CHECKOUT_BLOCKED: &str = "Checkout blocked";
const NOT_VERIFIED: &str = "Payment not verified yet";

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::PaymentsDisabled => StatusCode::NOT_IMPLEMENTED,
            Error::Internal { .. } | Error::Other(_) | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Pricing(err) => match err {
                PricingError::InvalidProduct { .. } | PricingError::InvalidQuantity { .. } | PricingError::EmptyCart => {
                    StatusCode::BAD_REQUEST
                }
                PricingError::Catalog(_) => StatusCode::SERVICE_UNAVAILABLE,
                PricingError::InvalidPromotionConfiguration { .. } | PricingError::AmountOverflow => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Error::Checkout(err) => match err {
                CheckoutError::InvalidAmount(_) | CheckoutError::Metadata(MetadataError::CartTooLarge { .. }) => {
                    StatusCode::BAD_REQUEST
                }
                CheckoutError::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CheckoutError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            },
            Error::Materialize(err) => match err {
                MaterializeError::PaymentNotCompleted { .. } => StatusCode::PAYMENT_REQUIRED,
                MaterializeError::UnknownSession(_) => StatusCode::NOT_FOUND,
                MaterializeError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
                MaterializeError::CorruptSessionMetadata { .. } | MaterializeError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Machine-readable error kind for the `error` field of the response body
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::BadRequest { .. } => "bad_request",
            Error::NotFound { .. } => "not_found",
            Error::PaymentsDisabled => "payments_disabled",
            Error::Internal { .. } | Error::Other(_) | Error::Store(_) => "internal_error",
            Error::Pricing(err) => match err {
                PricingError::InvalidProduct { .. } => "invalid_product",
                PricingError::InvalidQuantity { .. } => "invalid_quantity",
                PricingError::EmptyCart => "empty_cart",
                PricingError::Catalog(_) => "catalog_unavailable",
                PricingError::InvalidPromotionConfiguration { .. } | PricingError::AmountOverflow => "pricing_failed",
            },
            Error::Checkout(err) => match err {
                CheckoutError::InvalidAmount(_) => "invalid_amount",
                CheckoutError::Metadata(MetadataError::CartTooLarge { .. }) => "cart_too_large",
                CheckoutError::Metadata(_) => "internal_error",
                CheckoutError::ProviderUnavailable(_) => "provider_unavailable",
            },
            Error::Materialize(err) => match err {
                MaterializeError::PaymentNotCompleted { .. } => "payment_not_completed",
                MaterializeError::UnknownSession(_) => "session_not_found",
                MaterializeError::ProviderUnavailable(_) => "provider_unavailable",
                MaterializeError::CorruptSessionMetadata { .. } | MaterializeError::Store(_) => "order_unavailable",
            },
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::PaymentsDisabled => "Payment processing is not configured".to_string(),
            Error::Internal { .. } | Error::Other(_) | Error::Store(_) => "Internal server error".to_string(),
            Error::Pricing(err) => match err {
                PricingError::InvalidProduct { product_id, .. } => format!("{CHECKOUT_BLOCKED}: unknown product {product_id}"),
                PricingError::InvalidQuantity { product_id } => {
                    format!("{CHECKOUT_BLOCKED}: quantity for {product_id} must be at least 1")
                }
                PricingError::EmptyCart => format!("{CHECKOUT_BLOCKED}: cart is empty"),
                PricingError::Catalog(_)
                | PricingError::InvalidPromotionConfiguration { .. }
                | PricingError::AmountOverflow => format!("{CHECKOUT_BLOCKED}: prices are temporarily unavailable"),
            },
            Error::Checkout(err) => match err {
                CheckoutError::InvalidAmount(_) => "Invalid amount".to_string(),
                CheckoutError::Metadata(MetadataError::CartTooLarge { .. }) => {
                    format!("{CHECKOUT_BLOCKED}: too many items in one order")
                }
                CheckoutError::Metadata(_) => format!("{CHECKOUT_BLOCKED}: please try again"),
                CheckoutError::ProviderUnavailable(_) => format!("{CHECKOUT_BLOCKED}: payment provider unavailable"),
            },
            Error::Materialize(err) => match err {
                MaterializeError::PaymentNotCompleted { reason: Some(reason) } => format!("{NOT_VERIFIED}: {reason}"),
                MaterializeError::PaymentNotCompleted { reason: None } => NOT_VERIFIED.to_string(),
                MaterializeError::UnknownSession(id) => format!("{NOT_VERIFIED}: unknown checkout session {id}"),
                MaterializeError::ProviderUnavailable(_)
                | MaterializeError::CorruptSessionMetadata { .. }
                | MaterializeError::Store(_) => NOT_VERIFIED.to_string(),
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log full error details for debugging - different log levels based on severity
        if status.is_server_error() {
            tracing::error!("Internal service error: {:#}", self);
        } else if status == StatusCode::PAYMENT_REQUIRED {
            tracing::info!("Payment pending: {}", self);
        } else {
            tracing::debug!("Client error: {}", self);
        }

        let body = json!({
            "error": self.error_code(),
            "message": self.user_message(),
        });

        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment_providers::PaymentError;

    #[test]
    fn test_pricing_errors_block_checkout() {
        let err = Error::from(PricingError::InvalidProduct {
            product_id: "Z".to_string(),
            reason: "not in catalog".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Checkout blocked: unknown product Z");

        let err = Error::from(PricingError::InvalidPromotionConfiguration {
            promotion: "tea-pair".to_string(),
            reason: "no price".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.user_message().starts_with(CHECKOUT_BLOCKED));
        // Internals stay out of the response
        assert!(!err.user_message().contains("tea-pair"));
    }

    #[test]
    fn test_checkout_errors() {
        let err = Error::from(CheckoutError::InvalidAmount(0));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Invalid amount");

        let err = Error::from(CheckoutError::ProviderUnavailable(PaymentError::ProviderApi("timeout".to_string())));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), "provider_unavailable");
    }

    #[test]
    fn test_materialize_errors_read_as_not_verified() {
        let err = Error::from(MaterializeError::PaymentNotCompleted {
            reason: Some("card_declined".to_string()),
        });
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.user_message(), "Payment not verified yet: card_declined");

        let err = Error::from(MaterializeError::UnknownSession("cs_x".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = Error::from(MaterializeError::Store(StoreError::Unavailable("down".to_string())));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), NOT_VERIFIED);
    }
}
