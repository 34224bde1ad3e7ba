//! # Ledger Module
//!
//! Pure updates for the two running ledgers a sale touches: per-size stock
//! and a customer's lifetime totals.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  record sale ──► SizeStock::apply_delta   (size, −quantity)             │
//! │              └─► LedgerDelta::for_sale    (+sale_amount, +charity)      │
//! │                                                                         │
//! │  delete sale ──► SizeStock::apply_delta   (size, +quantity)             │
//! │              └─► LedgerDelta::reversed    (−sale_amount, −charity)      │
//! │                                                                         │
//! │  Every update is floored at zero: a ledger never goes negative.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The database applies the same floors in SQL so that concurrent writers
//! agree with these functions.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Sale, Size, SizeStock};
use crate::validation::ValidationResult;

// =============================================================================
// Stock
// =============================================================================

impl SizeStock {
    /// Applies a signed delta to one size, flooring the result at zero.
    ///
    /// ## Example
    /// ```rust
    /// use threadgood_core::types::{Size, SizeStock};
    ///
    /// let stock = SizeStock::new(3, 0, 0, 0);
    /// assert_eq!(stock.apply_delta(Size::M, -2).m, 1);
    /// assert_eq!(stock.apply_delta(Size::M, -5).m, 0);
    /// ```
    pub fn apply_delta(&self, size: Size, delta: i64) -> SizeStock {
        let mut next = *self;
        let updated = (self.get(size) as i64 + delta).clamp(0, u32::MAX as i64);
        *next.get_mut(size) = updated as u32;
        next
    }

    /// Checks if `quantity` units of `size` are on hand.
    pub fn has_available(&self, size: Size, quantity: u32) -> bool {
        self.get(size) >= quantity
    }

    /// Adds a batch of received stock.
    ///
    /// ## Errors
    /// A batch with nothing in it is rejected.
    pub fn restock(&self, additions: &SizeStock) -> ValidationResult<SizeStock> {
        if additions.total() == 0 {
            return Err(ValidationError::MustBePositive {
                field: "restock quantity".to_string(),
            });
        }

        let mut next = *self;
        for (size, added) in additions.iter() {
            *next.get_mut(size) = self.get(size).saturating_add(added);
        }
        Ok(next)
    }
}

// =============================================================================
// Customer Totals
// =============================================================================

/// A signed change to a customer's lifetime totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerDelta {
    pub amount: Money,
    pub charity: Money,
}

impl LedgerDelta {
    /// What a new sale adds to its customer.
    pub fn for_sale(sale: &Sale) -> Self {
        LedgerDelta {
            amount: sale.sale_amount,
            charity: sale.charity_amount,
        }
    }

    /// The inverse delta.
    pub fn reversed(&self) -> Self {
        LedgerDelta {
            amount: -self.amount,
            charity: -self.charity,
        }
    }
}

/// A customer's lifetime spend and charity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerTotals {
    pub total_spent: Money,
    pub total_charity: Money,
}

impl CustomerTotals {
    /// Applies a delta, flooring each total at zero.
    ///
    /// ## Example
    /// ```rust
    /// use threadgood_core::ledger::{CustomerTotals, LedgerDelta};
    /// use threadgood_core::money::Money;
    ///
    /// let totals = CustomerTotals {
    ///     total_spent: Money::from_major(100),
    ///     total_charity: Money::from_major(5),
    /// };
    /// let next = totals.apply_delta(LedgerDelta {
    ///     amount: Money::from_major(-150),
    ///     charity: Money::from_major(-2),
    /// });
    /// assert_eq!(next.total_spent, Money::zero());
    /// assert_eq!(next.total_charity, Money::from_major(3));
    /// ```
    pub fn apply_delta(&self, delta: LedgerDelta) -> CustomerTotals {
        CustomerTotals {
            total_spent: (self.total_spent + delta.amount).floor_zero(),
            total_charity: (self.total_charity + delta.charity).floor_zero(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
