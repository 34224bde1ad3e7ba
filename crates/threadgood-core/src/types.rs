//! # Domain Types
//!
//! Core domain types used throughout Threadgood.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  product_id(FK) │   │  mobile (unique)│       │
//! │  │  selling_price  │   │  size, quantity │   │  total_spent    │       │
//! │  │  stock: M L XL  │   │  profit, charity│   │  total_charity  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Percent      │   │      Size       │   │    Expense      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  M | L          │   │  category       │       │
//! │  │  1000 = 10%     │   │  XL | XXL       │   │  amount         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, mobile) - human-readable, unique, editable

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::CustomerTotals;
use crate::money::Money;

// =============================================================================
// Percent
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (the usual charity share)
///
/// Used both for a product's charity share and for percentage discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    /// 100%.
    pub const FULL: Percent = Percent(10_000);

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a percentage from a whole number of percent (10 → 10%).
    #[inline]
    pub const fn from_whole(pct: u32) -> Self {
        Percent(pct * 100)
    }

    /// Creates a percentage from a decimal percent (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        Percent((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    /// Checks if the percentage is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}%", self.0 / 100)
        } else {
            write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
        }
    }
}

// =============================================================================
// Size
// =============================================================================

/// Garment size. Every product is stocked in exactly these four sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum Size {
    M,
    L,
    Xl,
    Xxl,
}

impl Size {
    /// All sizes in display order.
    pub const ALL: [Size; 4] = [Size::M, Size::L, Size::Xl, Size::Xxl];

    /// The label printed on the tag and stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Size::M => "M",
            Size::L => "L",
            Size::Xl => "XL",
            Size::Xxl => "XXL",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Size {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" => Ok(Size::M),
            "L" => Ok(Size::L),
            "XL" => Ok(Size::Xl),
            "XXL" => Ok(Size::Xxl),
            _ => Err(ValidationError::NotAllowed {
                field: "size".to_string(),
                allowed: Size::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Size Stock
// =============================================================================

/// Units on hand for each size of one product.
///
/// A fixed struct rather than a map: every size always has a count and
/// lookups are an exhaustive match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SizeStock {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "stock_m"))]
    pub m: u32,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "stock_l"))]
    pub l: u32,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "stock_xl"))]
    pub xl: u32,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "stock_xxl"))]
    pub xxl: u32,
}

impl SizeStock {
    /// Creates a stock record from per-size counts in M, L, XL, XXL order.
    pub const fn new(m: u32, l: u32, xl: u32, xxl: u32) -> Self {
        SizeStock { m, l, xl, xxl }
    }

    /// Units on hand for one size.
    pub const fn get(&self, size: Size) -> u32 {
        match size {
            Size::M => self.m,
            Size::L => self.l,
            Size::Xl => self.xl,
            Size::Xxl => self.xxl,
        }
    }

    /// Mutable access to one size's count.
    pub fn get_mut(&mut self, size: Size) -> &mut u32 {
        match size {
            Size::M => &mut self.m,
            Size::L => &mut self.l,
            Size::Xl => &mut self.xl,
            Size::Xxl => &mut self.xxl,
        }
    }

    /// Total units across all sizes.
    pub fn total(&self) -> u64 {
        Size::ALL.iter().map(|s| self.get(*s) as u64).sum()
    }

    /// Iterates `(size, units)` in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Size, u32)> + '_ {
        Size::ALL.iter().map(move |s| (*s, self.get(*s)))
    }
}

// =============================================================================
// Product
// =============================================================================

/// Garment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum ProductCategory {
    Shirt,
    #[serde(rename = "T-Shirt")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "T-Shirt"))]
    TShirt,
    Hoodie,
    Pants,
    Accessory,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 5] = [
        ProductCategory::Shirt,
        ProductCategory::TShirt,
        ProductCategory::Hoodie,
        ProductCategory::Pants,
        ProductCategory::Accessory,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Shirt => "Shirt",
            ProductCategory::TShirt => "T-Shirt",
            ProductCategory::Hoodie => "Hoodie",
            ProductCategory::Pants => "Pants",
            ProductCategory::Accessory => "Accessory",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A garment available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown at the till and in the CSV export.
    pub name: String,

    pub category: ProductCategory,

    /// What the shop paid per unit.
    pub cost_price: Money,

    /// Price per unit before discount.
    pub selling_price: Money,

    /// Share of each sale's profit given to charity.
    pub charity_percentage: Percent,

    /// Units on hand per size.
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub stock: SizeStock,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks that `quantity` units of `size` can be sold right now.
    ///
    /// ## Errors
    /// * `ProductInactive` - the product has been deactivated
    /// * `InsufficientStock` - fewer than `quantity` units of `size` on hand
    pub fn check_sellable(&self, size: Size, quantity: u32) -> CoreResult<()> {
        self.ensure_active()?;
        if self.stock.get(size) < quantity {
            return Err(self.shortage(size, quantity));
        }
        Ok(())
    }

    pub fn ensure_active(&self) -> CoreResult<()> {
        if self.is_active {
            Ok(())
        } else {
            Err(CoreError::ProductInactive(self.sku.clone()))
        }
    }

    /// The error for asking `requested` units of `size` beyond what is on hand.
    pub fn shortage(&self, size: Size, requested: u32) -> CoreError {
        CoreError::InsufficientStock {
            sku: self.sku.clone(),
            size,
            available: self.stock.get(size),
            requested,
        }
    }

    /// Profit per unit at full price.
    pub fn unit_margin(&self) -> Money {
        self.selling_price - self.cost_price
    }
}

// =============================================================================
// Payment & Sale Mode
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentMode {
    Cash,
    #[serde(rename = "UPI")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "UPI"))]
    Upi,
    Card,
}

impl PaymentMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "Cash",
            PaymentMode::Upi => "UPI",
            PaymentMode::Card => "Card",
        }
    }
}

impl Default for PaymentMode {
    fn default() -> Self {
        PaymentMode::Cash
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the sale was made in the shop or shipped.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SaleMode {
    Online,
    Offline,
}

impl SaleMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleMode::Online => "Online",
            SaleMode::Offline => "Offline",
        }
    }
}

impl Default for SaleMode {
    fn default() -> Self {
        SaleMode::Offline
    }
}

impl fmt::Display for SaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer, identified at the till by mobile number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// 10 digits, unique across customers.
    pub mobile: String,
    pub email: Option<String>,
    /// Lifetime sale amounts, never negative.
    pub total_spent: Money,
    /// Lifetime charity generated by this customer's purchases.
    pub total_charity: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn totals(&self) -> CustomerTotals {
        CustomerTotals {
            total_spent: self.total_spent,
            total_charity: self.total_charity,
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// One recorded sale of a single product in a single size.
///
/// Every amount is frozen at the time of sale, including the product's
/// charity percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub product_id: String,
    pub customer_id: Option<String>,
    pub quantity: u32,
    pub size: Size,
    pub payment_mode: PaymentMode,
    pub sale_mode: SaleMode,
    pub unit_price: Money,
    /// unit_price × quantity.
    pub subtotal: Money,
    pub discount_amount: Money,
    /// subtotal − discount_amount.
    pub sale_amount: Money,
    pub cost_amount: Money,
    /// sale_amount − cost_amount. Negative for a loss.
    pub profit: Money,
    pub charity_percentage: Percent,
    /// max(0, profit) × charity_percentage.
    pub charity_amount: Money,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sale joined with the product and customer it references.
///
/// The joined columns are optional: a listing must still render a sale whose
/// product or customer has since gone missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleWithDetails {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub sale: Sale,
    pub product_sku: Option<String>,
    pub product_name: Option<String>,
    pub customer_name: Option<String>,
    pub customer_mobile: Option<String>,
}

// =============================================================================
// Expense
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ExpenseCategory {
    Fabric,
    Stitching,
    Marketing,
    Logistics,
    Misc,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 5] = [
        ExpenseCategory::Fabric,
        ExpenseCategory::Stitching,
        ExpenseCategory::Marketing,
        ExpenseCategory::Logistics,
        ExpenseCategory::Misc,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Fabric => "Fabric",
            ExpenseCategory::Stitching => "Stitching",
            ExpenseCategory::Marketing => "Marketing",
            ExpenseCategory::Logistics => "Logistics",
            ExpenseCategory::Misc => "Misc",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A business expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub category: ExpenseCategory,
    /// Always positive.
    pub amount: Money,
    #[ts(as = "String")]
    pub expense_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Date Range
// =============================================================================

/// An inclusive range of calendar days, interpreted in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub from: NaiveDate,
    #[ts(as = "String")]
    pub to: NaiveDate,
}

impl DateRange {
    /// Creates a range; `from` must not be after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::invalid_format(
                "date range",
                "start date is after end date",
            ));
        }
        Ok(DateRange { from, to })
    }

    /// A single day.
    pub fn day(date: NaiveDate) -> Self {
        DateRange { from: date, to: date }
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let from = date.with_day(1).unwrap_or(date);
        let next_month = if from.month() == 12 {
            NaiveDate::from_ymd_opt(from.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(from.year(), from.month() + 1, 1)
        };
        let to = next_month
            .and_then(|d| d.pred_opt())
            .unwrap_or(from);
        DateRange { from, to }
    }

    /// The calendar month before the one containing `date`.
    pub fn previous_month_of(date: NaiveDate) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        match first.pred_opt() {
            Some(last_of_previous) => DateRange::month_of(last_of_previous),
            None => DateRange::month_of(first),
        }
    }

    /// Checks if a day falls within the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// First instant of the range.
    pub fn start(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.from.and_time(NaiveTime::MIN))
    }

    /// First instant after the range (exclusive upper bound for queries).
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.to.and_time(NaiveTime::MIN)) + Duration::days(1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_conversions() {
        assert_eq!(Percent::from_whole(10).bps(), 1000);
        assert_eq!(Percent::from_percentage(12.5).bps(), 1250);
        assert!((Percent::from_bps(825).percentage() - 8.25).abs() < 0.001);
        assert_eq!(Percent::from_whole(10).to_string(), "10%");
        assert_eq!(Percent::from_bps(1250).to_string(), "12.50%");
    }

    #[test]
    fn test_size_parse_and_display() {
        assert_eq!("xl".parse::<Size>().unwrap(), Size::Xl);
        assert_eq!(" XXL ".parse::<Size>().unwrap(), Size::Xxl);
        assert!("S".parse::<Size>().is_err());
        assert_eq!(Size::Xxl.to_string(), "XXL");
    }

    #[test]
    fn test_size_serde_wire_values() {
        assert_eq!(serde_json::to_string(&Size::Xl).unwrap(), "\"XL\"");
        assert_eq!(serde_json::from_str::<Size>("\"M\"").unwrap(), Size::M);
    }

    #[test]
    fn test_enum_wire_values_match_dashboard() {
        assert_eq!(
            serde_json::to_string(&ProductCategory::TShirt).unwrap(),
            "\"T-Shirt\""
        );
        assert_eq!(serde_json::to_string(&PaymentMode::Upi).unwrap(), "\"UPI\"");
        assert_eq!(serde_json::to_string(&SaleMode::Online).unwrap(), "\"Online\"");
    }

    #[test]
    fn test_size_stock_accessors() {
        let mut stock = SizeStock::new(3, 5, 0, 2);
        assert_eq!(stock.get(Size::M), 3);
        assert_eq!(stock.get(Size::Xl), 0);
        assert_eq!(stock.total(), 10);

        *stock.get_mut(Size::Xl) = 4;
        assert_eq!(stock.xl, 4);
        assert_eq!(stock.iter().count(), 4);
    }

    #[test]
    fn test_date_range_month_bounds() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
        let month = DateRange::month_of(d);
        assert_eq!(month.from, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(month.to, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let dec = DateRange::month_of(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(dec.to, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        let prev = DateRange::previous_month_of(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(prev.from, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(prev.to, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        let a = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(DateRange::new(a, b).is_err());
        assert!(DateRange::new(b, a).is_ok());
    }

    #[test]
    fn test_date_range_instants() {
        let day = DateRange::day(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(day.end_exclusive() - day.start(), Duration::days(1));
        assert!(day.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    }

    #[test]
    fn test_check_sellable() {
        let now = Utc::now();
        let mut product = Product {
            id: "p1".to_string(),
            sku: "HD-01".to_string(),
            name: "Oversized Hoodie".to_string(),
            category: ProductCategory::Hoodie,
            cost_price: Money::from_major(500),
            selling_price: Money::from_major(999),
            charity_percentage: Percent::from_whole(10),
            stock: SizeStock::new(3, 0, 0, 0),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        assert!(product.check_sellable(Size::M, 3).is_ok());
        assert!(matches!(
            product.check_sellable(Size::M, 5),
            Err(CoreError::InsufficientStock {
                available: 3,
                requested: 5,
                ..
            })
        ));

        product.is_active = false;
        assert!(matches!(
            product.check_sellable(Size::M, 1),
            Err(CoreError::ProductInactive(_))
        ));
    }
}
