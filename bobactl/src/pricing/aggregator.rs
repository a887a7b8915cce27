//! Sums a matched cart into one charge amount.

use super::{
    MinorUnits, PricingError,
    matcher::{CartLine, MatchedCart, PromotionGroup},
};

fn charge(unit_price: MinorUnits, units: u64) -> Result<MinorUnits, PricingError> {
    i64::try_from(units)
        .ok()
        .and_then(|units| unit_price.checked_mul(units))
        .ok_or(PricingError::AmountOverflow)
}

fn add(total: MinorUnits, amount: MinorUnits) -> Result<MinorUnits, PricingError> {
    total.checked_add(amount).ok_or(PricingError::AmountOverflow)
}

fn line_total(line: &CartLine) -> Result<MinorUnits, PricingError> {
    charge(line.unit_price, u64::from(line.quantity))
}

/// Price one promotion group.
///
/// Every full set of `required_quantity` units costs the bundle price. Leftover units are
/// charged at their own unit price, taken from the group's lines in cart order. A group
/// without a single full set pays full price for everything.
pub fn group_total(group: &PromotionGroup) -> Result<MinorUnits, PricingError> {
    let required = u64::from(group.required_quantity);
    if required == 0 {
        return Err(PricingError::InvalidPromotionConfiguration {
            promotion: group.promotion_id.clone(),
            reason: "required quantity must be at least 1".to_string(),
        });
    }

    let sets = group.total_quantity / required;
    if sets == 0 {
        return group.lines.iter().try_fold(0, |total, line| add(total, line_total(line)?));
    }

    let mut total = charge(group.bundle_price, sets)?;
    let mut remaining = group.total_quantity % required;
    for line in &group.lines {
        if remaining == 0 {
            break;
        }
        let units = remaining.min(u64::from(line.quantity));
        total = add(total, charge(line.unit_price, units)?)?;
        remaining -= units;
    }

    Ok(total)
}

/// Total charge for a matched cart, in minor units.
pub fn aggregate(matched: &MatchedCart) -> Result<MinorUnits, PricingError> {
    let residual = matched
        .residual
        .iter()
        .try_fold(0, |total, line| add(total, line_total(line)?))?;

    matched
        .groups
        .values()
        .try_fold(residual, |total, group| add(total, group_total(group)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{
        catalog::CatalogSnapshot,
        matcher::match_promotions,
        test_support::{item, product, promotion},
    };

    fn line(product_id: &str, quantity: u32, unit_price: MinorUnits) -> CartLine {
        CartLine {
            product_id: product_id.to_string(),
            quantity,
            category: "tea".to_string(),
            size: "reg".to_string(),
            unit_price,
        }
    }

    fn group(required_quantity: u32, bundle_price: MinorUnits, lines: Vec<CartLine>) -> PromotionGroup {
        PromotionGroup {
            promotion_id: "promo".to_string(),
            required_quantity,
            bundle_price,
            total_quantity: lines.iter().map(|l| u64::from(l.quantity)).sum(),
            lines,
        }
    }

    #[test]
    fn test_no_promotions_sums_full_prices() {
        let catalog = CatalogSnapshot::new(
            vec![product("A", "tea", "3.50"), product("B", "smoothie", "4.25"), product("C", "snack", "1.99")],
            vec![promotion("tea", "large", 2, "6.00")],
        );
        let cart = [item("A", 3, "reg"), item("B", 2, "large"), item("C", 1, "reg")];

        let matched = match_promotions(&cart, &catalog).unwrap();
        assert_eq!(aggregate(&matched).unwrap(), 3 * 350 + 2 * 425 + 199);
    }

    #[test]
    fn test_leftover_unit_charged_individually() {
        // Three single lines at 200, pairs cost 300: one set plus one leftover unit
        let pairs = group(2, 300, vec![line("A", 1, 200), line("B", 1, 200), line("C", 1, 200)]);
        assert_eq!(group_total(&pairs).unwrap(), 500);
    }

    #[test]
    fn test_exact_multiple_has_no_leftover() {
        let triples = group(3, 1000, vec![line("A", 4, 400), line("B", 2, 400)]);
        assert_eq!(group_total(&triples).unwrap(), 2000);
    }

    #[test]
    fn test_incomplete_set_pays_full_price() {
        let triples = group(3, 1000, vec![line("A", 1, 400), line("B", 1, 450)]);
        assert_eq!(group_total(&triples).unwrap(), 850);
    }

    #[test]
    fn test_leftover_units_taken_in_cart_order() {
        // 5 units, sets of 2: two bundles plus one leftover unit from the first line
        let pairs = group(2, 500, vec![line("A", 1, 300), line("B", 4, 350)]);
        assert_eq!(group_total(&pairs).unwrap(), 2 * 500 + 300);

        // 7 units, sets of 3: two bundles plus one unit, again from the first line
        let triples = group(3, 800, vec![line("A", 2, 300), line("B", 5, 350)]);
        assert_eq!(group_total(&triples).unwrap(), 2 * 800 + 300);
    }

    #[test]
    fn test_single_item_example() {
        // Three teas at 3.50 with a pair deal at 6.00: 600 + 350
        let catalog = CatalogSnapshot::new(vec![product("A", "tea", "3.50")], vec![promotion("tea", "reg", 2, "6.00")]);
        let mut cart_item = item("A", 3, "reg");
        cart_item.category = Some("tea".to_string());

        let matched = match_promotions(&[cart_item], &catalog).unwrap();
        assert_eq!(aggregate(&matched).unwrap(), 950);
    }

    #[test]
    fn test_reordering_cart_does_not_change_total() {
        let catalog = CatalogSnapshot::new(
            vec![
                product("A", "tea", "3.50"),
                product("B", "tea", "3.50"),
                product("C", "smoothie", "4.25"),
                product("D", "smoothie", "4.25"),
                product("E", "snack", "1.99"),
            ],
            vec![promotion("tea", "reg", 2, "6.00"), promotion("smoothie", "large", 3, "11.00")],
        );

        let cart = vec![
            item("A", 1, "reg"),
            item("C", 2, "large"),
            item("E", 3, "reg"),
            item("B", 2, "reg"),
            item("D", 2, "large"),
        ];
        let expected = aggregate(&match_promotions(&cart, &catalog).unwrap()).unwrap();

        let mut reversed = cart.clone();
        reversed.reverse();
        assert_eq!(aggregate(&match_promotions(&reversed, &catalog).unwrap()).unwrap(), expected);

        let mut rotated = cart.clone();
        rotated.rotate_left(2);
        assert_eq!(aggregate(&match_promotions(&rotated, &catalog).unwrap()).unwrap(), expected);
    }

    #[test]
    fn test_group_summation_order_does_not_matter() {
        let catalog = CatalogSnapshot::new(
            vec![product("A", "tea", "3.50"), product("C", "smoothie", "4.25"), product("E", "snack", "1.99")],
            vec![promotion("tea", "reg", 2, "6.00"), promotion("smoothie", "large", 3, "11.00")],
        );
        let matched = match_promotions(&[item("A", 5, "reg"), item("C", 4, "large"), item("E", 1, "reg")], &catalog).unwrap();

        let residual: MinorUnits = matched.residual.iter().map(|l| line_total(l).unwrap()).sum();
        let forward = matched.groups.values().map(|g| group_total(g).unwrap()).fold(residual, |a, b| a + b);
        let backward = matched.groups.values().rev().map(|g| group_total(g).unwrap()).fold(residual, |a, b| a + b);

        assert_eq!(forward, backward);
        assert_eq!(forward, aggregate(&matched).unwrap());
        // tea: 2 x 600 + 350, smoothie: 1100 + 425, snack: 199
        assert_eq!(forward, 1550 + 1525 + 199);
    }

    #[test]
    fn test_overflow_is_reported() {
        let singles = group(1, i64::MAX, vec![line("A", 2, 1)]);
        assert!(matches!(group_total(&singles), Err(PricingError::AmountOverflow)));
    }
}
