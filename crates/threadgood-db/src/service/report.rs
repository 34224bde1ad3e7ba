//! # Report Service
//!
//! Loads rows for the dashboard widgets and hands them to
//! `threadgood_core::reports`. Nothing here does arithmetic of its own.

use chrono::NaiveDate;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::DbResult;
use crate::pool::Database;
use threadgood_core::reports::{
    self, CategoryTotal, CharityImpact, FinancialSummary, SalesSummary, StockAlerts,
    StockPolicy, StockValuation,
};
use threadgood_core::{Customer, DateRange, Expense, Sale};

/// How many products the sales summary ranks.
pub const TOP_SELLING_PRODUCTS: usize = 5;

/// Read-only dashboard reports.
#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
    policy: StockPolicy,
}

impl ReportService {
    pub fn new(db: Database, policy: StockPolicy) -> Self {
        ReportService { db, policy }
    }

    /// Uses the configured low-stock threshold.
    pub fn from_config(db: Database, config: &AppConfig) -> Self {
        ReportService::new(db, config.stock_policy())
    }

    /// Lifetime charity totals with this month against last month.
    pub async fn charity_impact(&self, today: NaiveDate) -> DbResult<CharityImpact> {
        debug!(today = %today, "Building charity impact report");
        let sales = self.db.sales().list_all().await?;
        let products = self.db.products().list_all().await?;
        Ok(CharityImpact::compute(&sales, &products, today))
    }

    /// Revenue against expenses, over `range` or over all time.
    pub async fn financial_summary(&self, range: Option<&DateRange>) -> DbResult<FinancialSummary> {
        let sales = self.sales(range).await?;
        let expenses = self.expenses(range).await?;
        Ok(FinancialSummary::compute(&sales, &expenses))
    }

    pub async fn stock_valuation(&self) -> DbResult<StockValuation> {
        let products = self.db.products().list_all().await?;
        let sales = self.db.sales().list_all().await?;
        Ok(StockValuation::compute(&products, &sales))
    }

    /// Active products that are sold out or running low.
    pub async fn stock_alerts(&self) -> DbResult<StockAlerts> {
        let products = self.db.products().list_all().await?;
        Ok(reports::stock_alerts(&products, self.policy))
    }

    pub async fn expenses_by_category(
        &self,
        range: Option<&DateRange>,
    ) -> DbResult<Vec<CategoryTotal>> {
        let expenses = self.expenses(range).await?;
        Ok(reports::expenses_by_category(&expenses))
    }

    /// Today's and this month's takings, with the best sellers.
    pub async fn sales_summary(&self, today: NaiveDate) -> DbResult<SalesSummary> {
        let sales = self.db.sales().list_all().await?;
        let products = self.db.products().list_all().await?;
        Ok(SalesSummary::compute(&sales, &products, today, TOP_SELLING_PRODUCTS))
    }

    /// Customers first seen in the month containing `today`.
    pub async fn new_customers_this_month(&self, today: NaiveDate) -> DbResult<i64> {
        self.db
            .customers()
            .count_created_in(&DateRange::month_of(today))
            .await
    }

    pub async fn top_spenders(&self, limit: u32) -> DbResult<Vec<Customer>> {
        self.db.customers().top_spenders(limit).await
    }

    async fn sales(&self, range: Option<&DateRange>) -> DbResult<Vec<Sale>> {
        match range {
            Some(range) => Ok(self
                .db
                .sales()
                .in_range(range)
                .await?
                .into_iter()
                .map(|row| row.sale)
                .collect()),
            None => self.db.sales().list_all().await,
        }
    }

    async fn expenses(&self, range: Option<&DateRange>) -> DbResult<Vec<Expense>> {
        match range {
            Some(range) => self.db.expenses().in_range(range).await,
            None => self.db.expenses().list_all().await,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::expense::NewExpense;
    use crate::repository::product::NewProduct;
    use crate::service::sale::{NewSaleRequest, SaleService};
    use crate::DbConfig;
    use chrono::Utc;
    use std::time::Duration;
    use threadgood_core::{ExpenseCategory, Money, Percent, ProductCategory, Size, SizeStock};

    async fn shop() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(NewProduct {
                sku: "TS-01".to_string(),
                name: "Organic Tee".to_string(),
                category: ProductCategory::TShirt,
                cost_price: Money::from_major(200),
                selling_price: Money::from_major(500),
                charity_percentage: Percent::from_whole(20),
                stock: SizeStock::new(4, 4, 1, 0),
            })
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_reports_follow_recorded_sales() {
        let (db, product_id) = shop().await;
        let sales = SaleService::new(db.clone(), Duration::from_secs(10));
        let request =
            NewSaleRequest::new(&product_id, Size::M, 2).customer("9000000001", Some("Ravi"));
        sales.record_sale(request).await.unwrap();

        let today = Utc::now().date_naive();
        db.expenses()
            .create(NewExpense {
                category: ExpenseCategory::Marketing,
                amount: Money::from_major(250),
                expense_date: today,
                notes: None,
                created_by: None,
            })
            .await
            .unwrap();

        let reports = ReportService::new(db.clone(), StockPolicy::default());

        let charity = reports.charity_impact(today).await.unwrap();
        assert_eq!(charity.total_revenue, Money::from_major(1000));
        assert_eq!(charity.total_charity, Money::from_major(120));
        assert_eq!(charity.this_month_charity, Money::from_major(120));
        assert_eq!(charity.month_growth_percent, None);
        assert_eq!(charity.top_products[0].product_name, "Organic Tee");

        let money = reports.financial_summary(None).await.unwrap();
        assert_eq!(money.net, Money::from_major(750));
        assert_eq!(money.profit_after_charity, Money::from_major(480));
        assert_eq!(money.expense_ratio, Some(Percent::from_whole(25)));

        let summary = reports.sales_summary(today).await.unwrap();
        assert_eq!(summary.today_count, 1);
        assert_eq!(summary.month_revenue, Money::from_major(1000));

        let valuation = reports.stock_valuation().await.unwrap();
        assert_eq!(valuation.current_units, 7);
        assert_eq!(valuation.sold_units, 2);
        assert_eq!(valuation.lifetime_units, 9);

        let alerts = reports.stock_alerts().await.unwrap();
        assert!(alerts.out_of_stock.is_empty());
        assert_eq!(alerts.low_stock.len(), 1);

        let by_category = reports.expenses_by_category(None).await.unwrap();
        assert_eq!(by_category[0].category, ExpenseCategory::Marketing);

        assert_eq!(reports.new_customers_this_month(today).await.unwrap(), 1);
        assert_eq!(reports.top_spenders(5).await.unwrap()[0].name, "Ravi");
    }

    #[tokio::test]
    async fn test_configured_threshold_drives_low_stock() {
        let (db, _) = shop().await;
        db.products()
            .create(NewProduct {
                sku: "HD-01".to_string(),
                name: "Oversized Hoodie".to_string(),
                category: ProductCategory::Hoodie,
                cost_price: Money::from_major(500),
                selling_price: Money::from_major(999),
                charity_percentage: Percent::from_whole(10),
                stock: SizeStock::new(3, 3, 2, 3),
            })
            .await
            .unwrap();

        let default = ReportService::from_config(db.clone(), &AppConfig::default());
        assert_eq!(default.stock_alerts().await.unwrap().low_stock.len(), 1);

        let config = AppConfig::from_toml("[inventory]\nlow_stock_threshold = 2").unwrap();
        let strict = ReportService::from_config(db, &config);
        let low = strict.stock_alerts().await.unwrap().low_stock;
        assert_eq!(low.len(), 2);
        assert!(low.iter().any(|p| p.sku == "HD-01"));
    }

    #[tokio::test]
    async fn test_financial_summary_over_empty_range() {
        let (db, _) = shop().await;
        let reports = ReportService::new(db, StockPolicy::default());

        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let summary = reports
            .financial_summary(Some(&DateRange::day(day)))
            .await
            .unwrap();
        assert_eq!(summary, FinancialSummary::default());
    }
}
