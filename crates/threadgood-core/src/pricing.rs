//! # Pricing Module
//!
//! Turns a prospective sale into every amount that gets stored with it.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sale Pricing                                     │
//! │                                                                         │
//! │  unit_price × quantity ─────────────► subtotal                          │
//! │                                          │                              │
//! │  Discount::{None, Flat, Percentage} ──► discount_amount (≤ subtotal)    │
//! │                                          │                              │
//! │                      subtotal − discount ▼                              │
//! │                                       sale_amount                       │
//! │  cost_price × quantity ──► cost_amount   │                              │
//! │                                          ▼                              │
//! │                      sale_amount − cost = profit (may be negative)      │
//! │                                          │                              │
//! │                max(0, profit) × charity% ▼                              │
//! │                                     charity_amount                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Charity is a share of profit, never of revenue. A loss-making sale is
//! still valid; it just generates no charity.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Percent;
use crate::validation::{validate_percent, validate_price, validate_quantity, ValidationResult};
use crate::MAX_AMOUNT_MINOR;

// =============================================================================
// Discount
// =============================================================================

/// A discount applied to the whole sale.
///
/// ## Wire format
/// ```json
/// { "type": "flat", "value": 20000 }
/// { "type": "percentage", "value": 1000 }
/// { "type": "none" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
#[ts(export)]
pub enum Discount {
    #[default]
    None,
    /// A fixed amount off the subtotal.
    Flat(Money),
    /// A share of the subtotal, half-up rounded to the minor unit.
    Percentage(Percent),
}

impl Discount {
    /// Resolves the discount against a subtotal.
    ///
    /// ## Errors
    /// - Negative flat amount
    /// - Percentage over 100%
    /// - Resolved amount larger than the subtotal (never silently clamped)
    pub fn resolve(&self, subtotal: Money) -> ValidationResult<Money> {
        let amount = match *self {
            Discount::None => Money::zero(),
            Discount::Flat(amount) => {
                if amount.is_negative() {
                    return Err(ValidationError::MustNotBeNegative {
                        field: "discount".to_string(),
                    });
                }
                amount
            }
            Discount::Percentage(rate) => {
                validate_percent("discount", rate)?;
                subtotal.percentage_of(rate)
            }
        };

        if amount > subtotal {
            return Err(ValidationError::DiscountExceedsSubtotal {
                discount: amount,
                subtotal,
            });
        }

        Ok(amount)
    }
}

// =============================================================================
// Input / Output
// =============================================================================

/// Everything the calculator needs to price a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingInput {
    pub unit_price: Money,
    pub cost_price: Money,
    pub quantity: u32,
    pub discount: Discount,
    pub charity_percentage: Percent,
}

/// The computed amounts of one sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleBreakdown {
    pub unit_price: Money,
    pub quantity: u32,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub sale_amount: Money,
    pub cost_amount: Money,
    pub profit: Money,
    pub charity_percentage: Percent,
    pub charity_amount: Money,
}

impl SaleBreakdown {
    /// True when the sale sells below cost.
    #[inline]
    pub fn is_loss(&self) -> bool {
        self.profit.is_negative()
    }
}

// =============================================================================
// Calculator
// =============================================================================

/// Prices a sale.
///
/// All checks run before any amount is produced, so a caller can reject the
/// sale before touching the database.
///
/// ## Example
/// ```rust
/// use threadgood_core::money::Money;
/// use threadgood_core::pricing::{compute, Discount, PricingInput};
/// use threadgood_core::types::Percent;
///
/// let b = compute(&PricingInput {
///     unit_price: Money::from_major(999),
///     cost_price: Money::from_major(500),
///     quantity: 2,
///     discount: Discount::Flat(Money::from_major(200)),
///     charity_percentage: Percent::from_whole(10),
/// })
/// .unwrap();
///
/// assert_eq!(b.sale_amount, Money::from_major(1798));
/// assert_eq!(b.profit, Money::from_major(798));
/// assert_eq!(b.charity_amount.minor(), 7980);
/// ```
pub fn compute(input: &PricingInput) -> ValidationResult<SaleBreakdown> {
    validate_quantity(input.quantity as i64)?;
    validate_price("unit price", input.unit_price)?;
    validate_price("cost price", input.cost_price)?;
    validate_percent("charity percentage", input.charity_percentage)?;

    let subtotal = line_total("unit price", input.unit_price, input.quantity)?;
    let discount_amount = input.discount.resolve(subtotal)?;
    let sale_amount = subtotal - discount_amount;
    let cost_amount = line_total("cost price", input.cost_price, input.quantity)?;
    let profit = sale_amount - cost_amount;
    let charity_amount = profit.floor_zero().percentage_of(input.charity_percentage);

    Ok(SaleBreakdown {
        unit_price: input.unit_price,
        quantity: input.quantity,
        subtotal,
        discount_amount,
        sale_amount,
        cost_amount,
        profit,
        charity_percentage: input.charity_percentage,
        charity_amount,
    })
}

fn line_total(field: &str, unit: Money, quantity: u32) -> ValidationResult<Money> {
    unit.checked_multiply_quantity(quantity)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_MINOR,
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn two_shirts(discount: Discount) -> PricingInput {
        PricingInput {
            unit_price: Money::from_major(999),
            cost_price: Money::from_major(500),
            quantity: 2,
            discount,
            charity_percentage: Percent::from_whole(10),
        }
    }

    #[test]
    fn test_no_discount() {
        let b = compute(&two_shirts(Discount::None)).unwrap();

        assert_eq!(b.subtotal, Money::from_major(1998));
        assert_eq!(b.discount_amount, Money::zero());
        assert_eq!(b.sale_amount, Money::from_major(1998));
        assert_eq!(b.cost_amount, Money::from_major(1000));
        assert_eq!(b.profit, Money::from_major(998));
        assert_eq!(b.charity_amount, Money::from_major_minor(99, 80));
    }

    #[test]
    fn test_flat_discount() {
        let b = compute(&two_shirts(Discount::Flat(Money::from_major(200)))).unwrap();

        assert_eq!(b.sale_amount, Money::from_major(1798));
        assert_eq!(b.profit, Money::from_major(798));
        assert_eq!(b.charity_amount, Money::from_major_minor(79, 80));
    }

    #[test]
    fn test_absurd_unit_price_is_rejected() {
        let input = PricingInput {
            unit_price: Money::from_minor(i64::MAX / 10),
            quantity: 20,
            ..two_shirts(Discount::None)
        };
        let err = compute(&input).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn test_largest_allowed_sale_prices_without_overflow() {
        let input = PricingInput {
            unit_price: Money::from_minor(MAX_AMOUNT_MINOR),
            cost_price: Money::from_minor(MAX_AMOUNT_MINOR),
            quantity: 999,
            ..two_shirts(Discount::None)
        };
        let b = compute(&input).unwrap();
        assert_eq!(b.subtotal.minor(), MAX_AMOUNT_MINOR * 999);
        assert_eq!(b.charity_amount, Money::zero());
    }

    #[test]
    fn test_discount_larger_than_subtotal_is_rejected() {
        let err = compute(&two_shirts(Discount::Flat(Money::from_major(2500)))).unwrap_err();
        assert!(matches!(err, ValidationError::DiscountExceedsSubtotal { .. }));
    }

    #[test]
    fn test_discount_equal_to_subtotal_is_allowed() {
        let b = compute(&two_shirts(Discount::Flat(Money::from_major(1998)))).unwrap();
        assert_eq!(b.sale_amount, Money::zero());
        assert_eq!(b.profit, Money::from_major(-1000));
        assert_eq!(b.charity_amount, Money::zero());
    }

    #[test]
    fn test_negative_flat_discount_is_rejected() {
        let err = compute(&two_shirts(Discount::Flat(Money::from_minor(-1)))).unwrap_err();
        assert!(matches!(err, ValidationError::MustNotBeNegative { .. }));
    }

    #[test]
    fn test_percentage_discount_rounds_half_up() {
        // 12.5% of 1998.00 = 249.75
        let b = compute(&two_shirts(Discount::Percentage(Percent::from_bps(1250)))).unwrap();
        assert_eq!(b.discount_amount, Money::from_major_minor(249, 75));

        // 33.33% of 0.03 = 0.009999 → 0.01
        let b = compute(&PricingInput {
            unit_price: Money::from_minor(3),
            cost_price: Money::zero(),
            quantity: 1,
            discount: Discount::Percentage(Percent::from_bps(3333)),
            charity_percentage: Percent::zero(),
        })
        .unwrap();
        assert_eq!(b.discount_amount.minor(), 1);
    }

    #[test]
    fn test_percentage_discount_over_hundred_is_rejected() {
        let input = two_shirts(Discount::Percentage(Percent::from_bps(10_001)));
        let err = compute(&input).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn test_loss_generates_no_charity() {
        let b = compute(&PricingInput {
            unit_price: Money::from_major(400),
            cost_price: Money::from_major(500),
            quantity: 1,
            discount: Discount::None,
            charity_percentage: Percent::from_whole(10),
        })
        .unwrap();

        assert!(b.is_loss());
        assert_eq!(b.profit, Money::from_major(-100));
        assert_eq!(b.charity_amount, Money::zero());
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let mut input = two_shirts(Discount::None);
        input.quantity = 0;
        assert!(matches!(
            compute(&input).unwrap_err(),
            ValidationError::MustBePositive { .. }
        ));
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut input = two_shirts(Discount::None);
        input.cost_price = Money::from_minor(-1);
        assert!(compute(&input).is_err());
    }

    #[test]
    fn test_charity_over_hundred_percent_is_rejected() {
        let mut input = two_shirts(Discount::None);
        input.charity_percentage = Percent::from_whole(101);
        assert!(compute(&input).is_err());
    }

    #[test]
    fn test_discount_wire_format() {
        let json = serde_json::to_string(&Discount::Flat(Money::from_major(200))).unwrap();
        assert_eq!(json, r#"{"type":"flat","value":20000}"#);

        let parsed: Discount = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
        assert_eq!(parsed, Discount::None);
    }

    #[test]
    fn test_sale_amount_identity_holds() {
        for flat in [0, 1, 500, 99_900, 199_800] {
            let b = compute(&two_shirts(Discount::Flat(Money::from_minor(flat)))).unwrap();
            assert_eq!(b.sale_amount, b.subtotal - b.discount_amount);
            assert!(b.discount_amount <= b.subtotal);
            assert!(!b.charity_amount.is_negative());
        }
    }
}
