//! # Reports Module
//!
//! Dashboard aggregates computed from already-loaded rows.
//!
//! ## Reports
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StockPolicy        → StockAlerts      (out of stock / low stock)      │
//! │  StockValuation     ← products + sales (current, sold, lifetime)       │
//! │  CharityImpact      ← sales + products (totals, month over month)      │
//! │  FinancialSummary   ← sales + expenses (net, after charity)            │
//! │  CategoryTotal      ← expenses         (per category)                  │
//! │  SalesSummary       ← sales + products (today, this month, top)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The database crate loads rows and calls into here; nothing in this module
//! knows where the rows came from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{DateRange, Expense, ExpenseCategory, Percent, Product, Sale, SizeStock};

/// How many products the charity report ranks.
pub const TOP_CHARITY_PRODUCTS: usize = 5;

// =============================================================================
// Stock Alerts
// =============================================================================

/// Stock level of one product under a [`StockPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockLevel {
    InStock,
    Low,
    OutOfStock,
}

/// The one rule deciding when a product needs restocking.
///
/// - Out of stock: every size is at zero.
/// - Low stock: not out of stock, and some size is at or below the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockPolicy {
    pub low_stock_threshold: u32,
}

impl StockPolicy {
    pub fn new(low_stock_threshold: u32) -> Self {
        StockPolicy { low_stock_threshold }
    }

    pub fn level(&self, stock: &SizeStock) -> StockLevel {
        if stock.total() == 0 {
            StockLevel::OutOfStock
        } else if stock.iter().any(|(_, units)| units <= self.low_stock_threshold) {
            StockLevel::Low
        } else {
            StockLevel::InStock
        }
    }
}

/// Active products that need attention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAlerts {
    pub out_of_stock: Vec<Product>,
    pub low_stock: Vec<Product>,
}

/// Sorts active products into the two alert lists.
pub fn stock_alerts(products: &[Product], policy: StockPolicy) -> StockAlerts {
    let mut alerts = StockAlerts::default();
    for product in products.iter().filter(|p| p.is_active) {
        match policy.level(&product.stock) {
            StockLevel::OutOfStock => alerts.out_of_stock.push(product.clone()),
            StockLevel::Low => alerts.low_stock.push(product.clone()),
            StockLevel::InStock => {}
        }
    }
    alerts
}

// =============================================================================
// Stock Valuation
// =============================================================================

/// What is on the shelf, what has left it, and the two together.
///
/// Sold values use the stored sale rows rather than today's prices, so a
/// price change does not rewrite history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockValuation {
    pub current_units: u64,
    pub sold_units: u64,
    pub lifetime_units: u64,
    pub current_cost_value: Money,
    pub current_selling_value: Money,
    pub sold_cost_value: Money,
    pub sold_selling_value: Money,
    pub lifetime_cost_value: Money,
    pub lifetime_selling_value: Money,
    pub total_discounts: Money,
}

impl StockValuation {
    pub fn compute(products: &[Product], sales: &[Sale]) -> Self {
        let mut v = StockValuation::default();

        for product in products {
            let units = product.stock.total();
            v.current_units += units;
            v.current_cost_value += product.cost_price * units as i64;
            v.current_selling_value += product.selling_price * units as i64;
        }

        for sale in sales {
            v.sold_units += sale.quantity as u64;
            v.sold_cost_value += sale.cost_amount;
            v.sold_selling_value += sale.sale_amount;
            v.total_discounts += sale.discount_amount;
        }

        v.lifetime_units = v.current_units + v.sold_units;
        v.lifetime_cost_value = v.current_cost_value + v.sold_cost_value;
        v.lifetime_selling_value = v.current_selling_value + v.sold_selling_value;
        v
    }
}

// =============================================================================
// Charity Impact
// =============================================================================

/// Charity generated by one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductCharity {
    pub product_id: String,
    pub product_name: String,
    pub units_sold: u64,
    pub charity: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CharityImpact {
    pub total_revenue: Money,
    pub total_profit: Money,
    pub total_charity: Money,
    pub this_month_charity: Money,
    pub last_month_charity: Money,
    /// Whole-percent change from last month, `None` when last month had none.
    pub month_growth_percent: Option<i64>,
    /// Charity as a share of profit, `None` when there was no profit.
    pub share_of_profit: Option<Percent>,
    pub top_products: Vec<ProductCharity>,
}

impl CharityImpact {
    /// Builds the report as of `today`.
    pub fn compute(sales: &[Sale], products: &[Product], today: NaiveDate) -> Self {
        let this_month = DateRange::month_of(today);
        let last_month = DateRange::previous_month_of(today);

        let total_revenue: Money = sales.iter().map(|s| s.sale_amount).sum();
        let total_profit: Money = sales.iter().map(|s| s.profit).sum();
        let total_charity: Money = sales.iter().map(|s| s.charity_amount).sum();
        let this_month_charity = charity_in(sales, &this_month);
        let last_month_charity = charity_in(sales, &last_month);

        let month_growth_percent = if last_month_charity.is_positive() {
            Some(ratio_rounded(
                (this_month_charity - last_month_charity).minor(),
                last_month_charity.minor(),
                100,
            ))
        } else {
            None
        };

        let share_of_profit = if total_profit.is_positive() {
            let bps = ratio_rounded(total_charity.minor(), total_profit.minor(), 10_000);
            Some(Percent::from_bps(bps.max(0) as u32))
        } else {
            None
        };

        let names: HashMap<&str, &str> = products
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();

        let mut by_product: HashMap<&str, ProductCharity> = HashMap::new();
        for sale in sales {
            let entry = by_product
                .entry(sale.product_id.as_str())
                .or_insert_with(|| ProductCharity {
                    product_id: sale.product_id.clone(),
                    product_name: names
                        .get(sale.product_id.as_str())
                        .copied()
                        .unwrap_or(UNKNOWN_PRODUCT)
                        .to_string(),
                    units_sold: 0,
                    charity: Money::zero(),
                });
            entry.units_sold += sale.quantity as u64;
            entry.charity += sale.charity_amount;
        }

        let mut top_products: Vec<ProductCharity> = by_product.into_values().collect();
        top_products.sort_by(|a, b| {
            b.charity
                .cmp(&a.charity)
                .then_with(|| a.product_name.cmp(&b.product_name))
        });
        top_products.truncate(TOP_CHARITY_PRODUCTS);

        CharityImpact {
            total_revenue,
            total_profit,
            total_charity,
            this_month_charity,
            last_month_charity,
            month_growth_percent,
            share_of_profit,
            top_products,
        }
    }
}

const UNKNOWN_PRODUCT: &str = "Unknown Product";

fn charity_in(sales: &[Sale], range: &DateRange) -> Money {
    sales
        .iter()
        .filter(|s| range.contains(s.sale_date.date_naive()))
        .map(|s| s.charity_amount)
        .sum()
}

/// `num × scale / den`, half away from zero. `den` must be non-zero.
fn ratio_rounded(num: i64, den: i64, scale: i64) -> i64 {
    let n = num as i128 * scale as i128;
    let d = den as i128;
    let q = (n.abs() + d.abs() / 2) / d.abs();
    if (n < 0) != (d < 0) {
        -(q as i64)
    } else {
        q as i64
    }
}

// =============================================================================
// Financial Summary
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinancialSummary {
    pub revenue: Money,
    pub expenses: Money,
    /// revenue − expenses.
    pub net: Money,
    pub profit: Money,
    pub charity: Money,
    pub profit_after_charity: Money,
    /// expenses / revenue, `None` with no revenue.
    pub expense_ratio: Option<Percent>,
}

impl FinancialSummary {
    pub fn compute(sales: &[Sale], expenses: &[Expense]) -> Self {
        let revenue: Money = sales.iter().map(|s| s.sale_amount).sum();
        let profit: Money = sales.iter().map(|s| s.profit).sum();
        let charity: Money = sales.iter().map(|s| s.charity_amount).sum();
        let spent: Money = expenses.iter().map(|e| e.amount).sum();

        let expense_ratio = if revenue.is_positive() {
            let bps = ratio_rounded(spent.minor(), revenue.minor(), 10_000);
            Some(Percent::from_bps(bps.clamp(0, u32::MAX as i64) as u32))
        } else {
            None
        };

        FinancialSummary {
            revenue,
            expenses: spent,
            net: revenue - spent,
            profit,
            charity,
            profit_after_charity: profit - charity,
            expense_ratio,
        }
    }
}

// =============================================================================
// Expenses By Category
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub total: Money,
    pub count: u32,
}

/// Per-category totals, largest first. Categories with no expenses are left out.
pub fn expenses_by_category(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = ExpenseCategory::ALL
        .iter()
        .map(|category| {
            let rows = expenses.iter().filter(|e| e.category == *category);
            CategoryTotal {
                category: *category,
                total: rows.clone().map(|e| e.amount).sum(),
                count: rows.count() as u32,
            }
        })
        .filter(|t| t.count > 0)
        .collect();

    totals.sort_by(|a, b| b.total.cmp(&a.total).then(a.category.cmp(&b.category)));
    totals
}

// =============================================================================
// Sales Summary
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductRevenue {
    pub product_id: String,
    pub product_name: String,
    pub units_sold: u64,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub today_revenue: Money,
    pub today_count: u32,
    pub month_revenue: Money,
    pub month_count: u32,
    pub top_products: Vec<ProductRevenue>,
}

impl SalesSummary {
    /// Builds the summary as of `today`, ranking at most `top_n` products.
    pub fn compute(sales: &[Sale], products: &[Product], today: NaiveDate, top_n: usize) -> Self {
        let day = DateRange::day(today);
        let month = DateRange::month_of(today);

        let in_range = |range: &DateRange| {
            sales
                .iter()
                .filter(|s| range.contains(s.sale_date.date_naive()))
                .fold((Money::zero(), 0u32), |(sum, n), s| (sum + s.sale_amount, n + 1))
        };
        let (today_revenue, today_count) = in_range(&day);
        let (month_revenue, month_count) = in_range(&month);

        SalesSummary {
            today_revenue,
            today_count,
            month_revenue,
            month_count,
            top_products: top_products_by_revenue(sales, products, top_n),
        }
    }
}

/// Products ranked by sale amount, highest first.
pub fn top_products_by_revenue(
    sales: &[Sale],
    products: &[Product],
    top_n: usize,
) -> Vec<ProductRevenue> {
    let names: HashMap<&str, &str> = products
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();

    let mut by_product: HashMap<&str, ProductRevenue> = HashMap::new();
    for sale in sales {
        let entry = by_product
            .entry(sale.product_id.as_str())
            .or_insert_with(|| ProductRevenue {
                product_id: sale.product_id.clone(),
                product_name: names
                    .get(sale.product_id.as_str())
                    .copied()
                    .unwrap_or(UNKNOWN_PRODUCT)
                    .to_string(),
                units_sold: 0,
                revenue: Money::zero(),
            });
        entry.units_sold += sale.quantity as u64;
        entry.revenue += sale.sale_amount;
    }

    let mut ranked: Vec<ProductRevenue> = by_product.into_values().collect();
    ranked.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    ranked.truncate(top_n);
    ranked
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMode, ProductCategory, SaleMode, Size};
    use chrono::{TimeZone, Utc};

    fn product(id: &str, name: &str, stock: SizeStock) -> Product {
        let now = Utc::now();
        Product {
            id: id.into(),
            sku: id.to_uppercase(),
            name: name.into(),
            category: ProductCategory::Hoodie,
            cost_price: Money::from_major(500),
            selling_price: Money::from_major(999),
            charity_percentage: Percent::from_whole(10),
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn sale_on(
        product_id: &str,
        date: NaiveDate,
        qty: u32,
        amount: i64,
        profit: i64,
        charity: i64,
    ) -> Sale {
        let at = Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap());
        Sale {
            id: format!("{product_id}-{date}"),
            product_id: product_id.into(),
            customer_id: None,
            quantity: qty,
            size: Size::M,
            payment_mode: PaymentMode::Cash,
            sale_mode: SaleMode::Offline,
            unit_price: Money::from_major(999),
            subtotal: Money::from_minor(amount + 100),
            discount_amount: Money::from_minor(100),
            sale_amount: Money::from_minor(amount),
            cost_amount: Money::from_minor(amount - profit),
            profit: Money::from_minor(profit),
            charity_percentage: Percent::from_whole(10),
            charity_amount: Money::from_minor(charity),
            created_by: None,
            sale_date: at,
            created_at: at,
        }
    }

    fn expense(category: ExpenseCategory, amount: i64) -> Expense {
        let now = Utc::now();
        Expense {
            id: format!("{category}-{amount}"),
            category,
            amount: Money::from_minor(amount),
            expense_date: now.date_naive(),
            notes: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_stock_policy_levels() {
        let policy = StockPolicy::default();
        assert_eq!(policy.level(&SizeStock::new(0, 0, 0, 0)), StockLevel::OutOfStock);
        assert_eq!(policy.level(&SizeStock::new(3, 0, 2, 1)), StockLevel::Low);
        assert_eq!(policy.level(&SizeStock::new(3, 1, 2, 1)), StockLevel::InStock);

        let policy = StockPolicy::new(2);
        assert_eq!(policy.level(&SizeStock::new(3, 5, 2, 9)), StockLevel::Low);
        assert_eq!(policy.level(&SizeStock::new(3, 5, 3, 9)), StockLevel::InStock);
    }

    #[test]
    fn test_stock_alerts_skip_inactive_and_never_double_list() {
        let mut retired = product("p3", "Retired", SizeStock::default());
        retired.is_active = false;
        let products = vec![
            product("p1", "Empty", SizeStock::default()),
            product("p2", "Thin", SizeStock::new(1, 0, 1, 1)),
            retired,
            product("p4", "Full", SizeStock::new(4, 4, 4, 4)),
        ];

        let alerts = stock_alerts(&products, StockPolicy::default());
        assert_eq!(alerts.out_of_stock.len(), 1);
        assert_eq!(alerts.out_of_stock[0].id, "p1");
        assert_eq!(alerts.low_stock.len(), 1);
        assert_eq!(alerts.low_stock[0].id, "p2");
    }

    #[test]
    fn test_stock_valuation() {
        let products = vec![product("p1", "Hoodie", SizeStock::new(1, 1, 0, 0))];
        let sales = vec![sale_on("p1", ymd(2024, 3, 1), 2, 179_800, 79_800, 7_980)];

        let v = StockValuation::compute(&products, &sales);
        assert_eq!(v.current_units, 2);
        assert_eq!(v.sold_units, 2);
        assert_eq!(v.lifetime_units, 4);
        assert_eq!(v.current_cost_value, Money::from_major(1000));
        assert_eq!(v.current_selling_value, Money::from_major(1998));
        assert_eq!(v.sold_cost_value, Money::from_major(1000));
        assert_eq!(v.sold_selling_value, Money::from_major(1798));
        assert_eq!(v.lifetime_selling_value, Money::from_major(1998 + 1798));
        assert_eq!(v.total_discounts, Money::from_major(1));
    }

    #[test]
    fn test_charity_impact_month_over_month() {
        let products = vec![
            product("p1", "Hoodie", SizeStock::default()),
            product("p2", "Tee", SizeStock::default()),
        ];
        let sales = vec![
            sale_on("p1", ymd(2024, 2, 10), 1, 100_000, 50_000, 5_000),
            sale_on("p2", ymd(2024, 3, 5), 1, 100_000, 50_000, 5_000),
            sale_on("p1", ymd(2024, 3, 6), 1, 100_000, 20_000, 2_500),
        ];

        let report = CharityImpact::compute(&sales, &products, ymd(2024, 3, 20));
        assert_eq!(report.total_charity, Money::from_minor(12_500));
        assert_eq!(report.this_month_charity, Money::from_minor(7_500));
        assert_eq!(report.last_month_charity, Money::from_minor(5_000));
        assert_eq!(report.month_growth_percent, Some(50));
        // 12500 / 120000 = 10.42%
        assert_eq!(report.share_of_profit, Some(Percent::from_bps(1042)));
        assert_eq!(report.top_products[0].product_id, "p1");
        assert_eq!(report.top_products[0].charity, Money::from_minor(7_500));
    }

    #[test]
    fn test_charity_impact_without_history() {
        let report = CharityImpact::compute(&[], &[], ymd(2024, 3, 20));
        assert_eq!(report.month_growth_percent, None);
        assert_eq!(report.share_of_profit, None);
        assert!(report.top_products.is_empty());
    }

    #[test]
    fn test_top_products_are_capped() {
        let sales: Vec<Sale> = (0..8)
            .map(|i| sale_on(&format!("p{i}"), ymd(2024, 3, 1), 1, 10_000, 5_000, 500 + i))
            .collect();
        let report = CharityImpact::compute(&sales, &[], ymd(2024, 3, 2));
        assert_eq!(report.top_products.len(), TOP_CHARITY_PRODUCTS);
        assert_eq!(report.top_products[0].product_name, "Unknown Product");
        assert_eq!(report.top_products[0].charity, Money::from_minor(507));
    }

    #[test]
    fn test_financial_summary() {
        let sales = vec![sale_on("p1", ymd(2024, 3, 1), 2, 179_800, 79_800, 7_980)];
        let expenses = vec![
            expense(ExpenseCategory::Fabric, 40_000),
            expense(ExpenseCategory::Marketing, 5_000),
        ];

        let s = FinancialSummary::compute(&sales, &expenses);
        assert_eq!(s.revenue, Money::from_minor(179_800));
        assert_eq!(s.expenses, Money::from_minor(45_000));
        assert_eq!(s.net, Money::from_minor(134_800));
        assert_eq!(s.profit_after_charity, Money::from_minor(71_820));
        // 45000 / 179800 = 25.03%
        assert_eq!(s.expense_ratio, Some(Percent::from_bps(2503)));
    }

    #[test]
    fn test_expenses_by_category() {
        let expenses = vec![
            expense(ExpenseCategory::Fabric, 1_000),
            expense(ExpenseCategory::Misc, 9_000),
            expense(ExpenseCategory::Fabric, 2_000),
        ];

        let totals = expenses_by_category(&expenses);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].category, ExpenseCategory::Misc);
        assert_eq!(totals[1].total, Money::from_minor(3_000));
        assert_eq!(totals[1].count, 2);
    }

    #[test]
    fn test_sales_summary() {
        let products = vec![product("p1", "Hoodie", SizeStock::default())];
        let sales = vec![
            sale_on("p1", ymd(2024, 3, 20), 1, 10_000, 1_000, 100),
            sale_on("p1", ymd(2024, 3, 2), 1, 20_000, 1_000, 100),
            sale_on("p2", ymd(2024, 2, 28), 1, 40_000, 1_000, 100),
        ];

        let s = SalesSummary::compute(&sales, &products, ymd(2024, 3, 20), 5);
        assert_eq!(s.today_count, 1);
        assert_eq!(s.today_revenue, Money::from_minor(10_000));
        assert_eq!(s.month_count, 2);
        assert_eq!(s.month_revenue, Money::from_minor(30_000));
        assert_eq!(s.top_products[0].product_id, "p2");
        assert_eq!(s.top_products[1].product_name, "Hoodie");
    }

    #[test]
    fn test_ratio_rounded_is_sign_aware() {
        assert_eq!(ratio_rounded(1, 3, 100), 33);
        assert_eq!(ratio_rounded(2, 3, 100), 67);
        assert_eq!(ratio_rounded(-2, 3, 100), -67);
    }
}
