//! Cart pricing under bundle promotions.
//!
//! Pricing runs in two steps over an immutable [`CatalogSnapshot`]:
//!
//! 1. [`matcher::match_promotions`] resolves each cart item to a [`CartLine`] with a unit
//!    price frozen in minor units, and groups lines by (category, size) wherever an active
//!    promotion applies.
//! 2. [`aggregator::aggregate`] charges every full set in a group at the bundle price,
//!    leftover and unmatched units at their own price, and sums the lot.
//!
//! All arithmetic is on integer minor units. Major-unit prices from the catalog are
//! converted exactly once, rounding half away from zero, and the rounded value is reused
//! everywhere downstream. Any error aborts the whole computation: there are no partial
//! totals.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

pub mod aggregator;
pub mod catalog;
pub mod matcher;

pub use catalog::{CatalogError, CatalogSnapshot, CatalogSource, FileCatalog, Product, Promotion, StaticCatalog};
pub use matcher::{CartItem, CartLine, MatchedCart, PromotionGroup, PromotionGroupKey};

/// Amount in the smallest currency denomination (e.g. pence)
pub type MinorUnits = i64;

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Invalid product {product_id}: {reason}")]
    InvalidProduct { product_id: String, reason: String },

    #[error("Quantity for product {product_id} must be at least 1")]
    InvalidQuantity { product_id: String },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Promotion {promotion} is misconfigured: {reason}")]
    InvalidPromotionConfiguration { promotion: String, reason: String },

    #[error("Cart total is out of range")]
    AmountOverflow,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Convert a major-unit amount to minor units, rounding half away from zero.
///
/// Returns `None` if the result does not fit in [`MinorUnits`].
pub fn to_minor_units(amount: Decimal) -> Option<MinorUnits> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// A cart resolved against the catalog together with its charge amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub lines: Vec<CartLine>,
    pub total: MinorUnits,
}

/// Price a cart against one catalog snapshot.
pub fn price_cart(items: &[CartItem], catalog: &CatalogSnapshot) -> Result<PricedCart, PricingError> {
    let matched = matcher::match_promotions(items, catalog)?;
    let total = aggregator::aggregate(&matched)?;

    tracing::debug!(
        lines = matched.lines.len(),
        groups = matched.groups.len(),
        total,
        "Priced cart"
    );

    Ok(PricedCart {
        lines: matched.lines,
        total,
    })
}
