//! Promotion matching: resolves cart items against the catalog and groups the lines a
//! single bundle promotion can discount.

use std::collections::{BTreeMap, HashMap, btree_map::Entry};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    MinorUnits, PricingError,
    catalog::{CatalogSnapshot, Product, Promotion},
    to_minor_units,
};

/// A cart entry as submitted by the client. Prices are never taken from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub quantity: u32,
    pub size: String,
    /// Overrides the product's own category when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A cart entry resolved against the catalog, with its unit price frozen in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub quantity: u32,
    pub category: String,
    pub size: String,
    /// Unit price in minor currency units
    pub unit_price: MinorUnits,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromotionGroupKey {
    pub category: String,
    pub size: String,
}

impl PromotionGroupKey {
    pub fn new(category: &str, size: &str) -> Self {
        Self {
            category: category.to_string(),
            size: size.to_string(),
        }
    }
}

/// Cart lines sharing a (category, size) key together with the promotion that applies to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionGroup {
    pub promotion_id: String,
    pub required_quantity: u32,
    /// Bundle price for this group's size, in minor units
    pub bundle_price: MinorUnits,
    pub total_quantity: u64,
    /// Contributing lines in cart order
    pub lines: Vec<CartLine>,
}

impl PromotionGroup {
    fn for_promotion(promotion: &Promotion, size: &str) -> Result<Self, PricingError> {
        let invalid = |reason: &str| PricingError::InvalidPromotionConfiguration {
            promotion: promotion_label(promotion),
            reason: reason.to_string(),
        };

        if promotion.required_quantity < 1 {
            return Err(invalid("required quantity must be at least 1"));
        }

        let price = promotion
            .prices
            .get(size)
            .ok_or_else(|| invalid(&format!("no bundle price for size '{size}'")))?;
        let bundle_price = to_minor_units(*price).ok_or_else(|| invalid("bundle price is out of range"))?;
        if bundle_price < 0 {
            return Err(invalid("bundle price is negative"));
        }

        Ok(Self {
            promotion_id: promotion.id.clone(),
            required_quantity: promotion.required_quantity,
            bundle_price,
            total_quantity: 0,
            lines: Vec::new(),
        })
    }

    fn push(&mut self, line: CartLine) {
        self.total_quantity += u64::from(line.quantity);
        self.lines.push(line);
    }

    /// Whether the lines in this group disagree on unit price, which makes the choice of
    /// which units are left over observable.
    pub fn has_mixed_prices(&self) -> bool {
        self.lines.windows(2).any(|pair| pair[0].unit_price != pair[1].unit_price)
    }
}

/// Output of [`match_promotions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedCart {
    /// Every resolved line, in cart order
    pub lines: Vec<CartLine>,
    pub groups: BTreeMap<PromotionGroupKey, PromotionGroup>,
    /// Lines no active promotion applies to, charged at full price
    pub residual: Vec<CartLine>,
}

fn promotion_label(promotion: &Promotion) -> String {
    if promotion.id.is_empty() {
        format!("{}/{}", promotion.category, promotion.size)
    } else {
        promotion.id.clone()
    }
}

fn resolve_line(item: &CartItem, products: &HashMap<&str, &Product>) -> Result<CartLine, PricingError> {
    if item.quantity == 0 {
        return Err(PricingError::InvalidQuantity {
            product_id: item.product_id.clone(),
        });
    }

    let product = products
        .get(item.product_id.as_str())
        .ok_or_else(|| PricingError::InvalidProduct {
            product_id: item.product_id.clone(),
            reason: "not found in catalog".to_string(),
        })?;

    let unit_price = to_minor_units(product.price).ok_or(PricingError::AmountOverflow)?;
    if unit_price < 0 {
        return Err(PricingError::InvalidProduct {
            product_id: item.product_id.clone(),
            reason: "price is negative".to_string(),
        });
    }

    let category = match item.category.as_deref() {
        Some(category) if !category.is_empty() => category.to_string(),
        _ => product.category.clone(),
    };

    Ok(CartLine {
        product_id: product.id.clone(),
        quantity: item.quantity,
        category,
        size: item.size.clone(),
        unit_price,
    })
}

/// Resolve every cart item and group the ones an active promotion applies to.
///
/// Products and promotions are indexed once per call. When several active promotions share
/// a (category, size) key the first one in catalog order wins.
pub fn match_promotions(items: &[CartItem], catalog: &CatalogSnapshot) -> Result<MatchedCart, PricingError> {
    if items.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    let mut products: HashMap<&str, &Product> = HashMap::with_capacity(catalog.products.len());
    for product in &catalog.products {
        products.entry(product.id.as_str()).or_insert(product);
    }

    let mut promotions: HashMap<(&str, &str), &Promotion> = HashMap::new();
    for promotion in catalog.promotions.iter().filter(|p| p.active) {
        promotions
            .entry((promotion.category.as_str(), promotion.size.as_str()))
            .or_insert(promotion);
    }

    let mut matched = MatchedCart::default();
    for item in items {
        let line = resolve_line(item, &products)?;

        match promotions.get(&(line.category.as_str(), line.size.as_str())) {
            Some(promotion) => {
                let group = match matched.groups.entry(PromotionGroupKey::new(&line.category, &line.size)) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => entry.insert(PromotionGroup::for_promotion(promotion, &line.size)?),
                };
                group.push(line.clone());
            }
            None => matched.residual.push(line.clone()),
        }

        matched.lines.push(line);
    }

    for (key, group) in &matched.groups {
        if group.has_mixed_prices() {
            tracing::warn!(
                category = %key.category,
                size = %key.size,
                promotion = %group.promotion_id,
                "Promotion group has mixed unit prices; leftover units are charged in cart order"
            );
        }
    }

    Ok(matched)
}
