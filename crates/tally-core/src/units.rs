//! # Unit Converter
//!
//! Every stock-touching operation counts in minor units. A quantity entered
//! in the product's major unit is multiplied by `unit_content`; anything
//! else (the minor unit, no unit, or an unrecognized unit string) is taken
//! as minor units already.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Product;
use crate::validation::ValidationResult;

/// Converts `quantity` of `unit` into minor units of `product`.
///
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::types::Product;
/// use tally_core::units::to_minor_units;
///
/// let water = Product::new("w", "W-500", "Water 500ml", Money::from_major(1))
///     .with_major_unit("pack", 6);
///
/// assert_eq!(to_minor_units(&water, 2, Some("pack")), 12);
/// assert_eq!(to_minor_units(&water, 2, Some("piece")), 2);
/// assert_eq!(to_minor_units(&water, 2, Some("pallet")), 2);
/// assert_eq!(to_minor_units(&water, 2, None), 2);
/// ```
pub fn to_minor_units(product: &Product, quantity: i64, unit: Option<&str>) -> i64 {
    if is_major_unit(product, unit) {
        quantity.saturating_mul(product.unit_content())
    } else {
        quantity
    }
}

/// [`to_minor_units`] for command lines: a conversion that leaves the
/// `i64` range is rejected instead of saturating.
pub fn checked_minor_units(product: &Product, quantity: i64, unit: Option<&str>) -> ValidationResult<i64> {
    if is_major_unit(product, unit) {
        quantity
            .checked_mul(product.unit_content())
            .ok_or_else(|| ValidationError::too_large("quantity", i64::MAX))
    } else {
        Ok(quantity)
    }
}

/// Price of one `unit` of `product`.
///
/// Major unit: `major_unit_price` when set, else `price × unit_content`.
/// Any other unit: the minor-unit `price`.
pub fn unit_price(product: &Product, unit: Option<&str>) -> Money {
    if is_major_unit(product, unit) {
        product
            .major_unit_price
            .unwrap_or_else(|| product.price.multiply_quantity(product.unit_content()))
    } else {
        product.price
    }
}

/// Wholesale price of one `unit` of `product`.
pub fn wholesale_unit_price(product: &Product, unit: Option<&str>) -> Money {
    if is_major_unit(product, unit) {
        product.wholesale_price.multiply_quantity(product.unit_content())
    } else {
        product.wholesale_price
    }
}

/// Cost of one minor unit, given the cost of one entered `unit`.
pub fn minor_unit_cost(product: &Product, unit_cost: Money, unit: Option<&str>) -> Money {
    if is_major_unit(product, unit) {
        unit_cost.divide_by(product.unit_content())
    } else {
        unit_cost
    }
}

fn is_major_unit(product: &Product, unit: Option<&str>) -> bool {
    match (unit, product.major_unit.as_deref()) {
        (Some(unit), Some(major)) => unit == major,
        _ => false,
    }
}
