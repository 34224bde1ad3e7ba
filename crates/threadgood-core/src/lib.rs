//! # threadgood-core: Pure Business Logic for Threadgood
//!
//! This crate holds the shop's business rules as pure functions with zero I/O
//! dependencies: what a sale costs, how much of its profit goes to charity,
//! and how a sale moves stock and customer totals.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Threadgood Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Dashboard (external caller)                    │   │
//! │  │    New Sale ──► Sales List ──► Charity ──► Expenses            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        threadgood-db (repositories, SaleService, reports)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ threadgood-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │ pricing │ │ ledger  │ │validation│ │ reports │  │   │
//! │  │   │ Product │ │Discount │ │SizeStock│ │  rules  │ │ Charity │  │   │
//! │  │   │  Sale   │ │Breakdown│ │ Totals  │ │  checks │ │ Stock   │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Customer, Expense, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Sale price, discount, profit and charity calculation
//! - [`ledger`] - Stock and customer-total deltas, floored at zero
//! - [`reports`] - Dashboard aggregates (charity impact, stock valuation, ...)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use threadgood_core::money::Money;
//! use threadgood_core::pricing::{compute, Discount, PricingInput};
//! use threadgood_core::types::Percent;
//!
//! let breakdown = compute(&PricingInput {
//!     unit_price: Money::from_major(999),
//!     cost_price: Money::from_major(500),
//!     quantity: 2,
//!     discount: Discount::None,
//!     charity_percentage: Percent::from_whole(10),
//! })
//! .unwrap();
//!
//! assert_eq!(breakdown.profit, Money::from_major(998));
//! assert_eq!(breakdown.charity_amount.minor(), 9980); // 99.80
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod reports;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{CustomerTotals, LedgerDelta};
pub use money::Money;
pub use pricing::{Discount, PricingInput, SaleBreakdown};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product in one sale.
///
/// ## Business Reason
/// Catches fat-fingered input (typing 100 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest unit price or single expense, in minor units (1,00,00,000.00).
///
/// Keeps `price × quantity` and report totals far from `i64` overflow.
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000;

/// Name given to a customer created at the till without a name.
pub const WALK_IN_CUSTOMER_NAME: &str = "Walk-in Customer";

/// Number of digits in a customer mobile number.
pub const MOBILE_NUMBER_DIGITS: usize = 10;

/// How many sales the recent-sales listing returns by default.
pub const DEFAULT_RECENT_SALES_LIMIT: u32 = 50;
