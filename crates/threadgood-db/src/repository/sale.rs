//! # Sale Repository
//!
//! Database operations for sale rows.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. RECORD  (SaleService::record_sale, one transaction)                │
//! │     └── insert_in()   → sale row with every computed amount            │
//! │                                                                         │
//! │  2. LIST                                                                │
//! │     └── recent() / in_range() / for_customer() → SaleWithDetails       │
//! │                                                                         │
//! │  3. DELETE  (SaleService::delete_sale, one transaction)                │
//! │     └── delete_in()   → row removed after ledgers are reversed         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales are never edited in place. Writes happen only inside the sale
//! service's transactions, so the write functions here take a connection.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use threadgood_core::{DateRange, Sale, SaleWithDetails};

const SALE_COLUMNS: &str = "s.id, s.product_id, s.customer_id, s.quantity, s.size, s.payment_mode, \
    s.sale_mode, s.unit_price, s.subtotal, s.discount_amount, s.sale_amount, s.cost_amount, \
    s.profit, s.charity_percentage, s.charity_amount, s.created_by, s.sale_date, s.created_at";

const DETAIL_JOINS: &str = "p.sku AS product_sku, p.name AS product_name, \
    c.name AS customer_name, c.mobile AS customer_mobile \
    FROM sales s \
    LEFT JOIN products p ON p.id = s.product_id \
    LEFT JOIN customers c ON c.id = s.customer_id";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a fully priced sale.
    pub async fn insert_in(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, product_id = %sale.product_id, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, product_id, customer_id, quantity, size, payment_mode, sale_mode,
                unit_price, subtotal, discount_amount, sale_amount, cost_amount,
                profit, charity_percentage, charity_amount, created_by, sale_date, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.product_id)
        .bind(&sale.customer_id)
        .bind(sale.quantity)
        .bind(sale.size)
        .bind(sale.payment_mode)
        .bind(sale.sale_mode)
        .bind(sale.unit_price)
        .bind(sale.subtotal)
        .bind(sale.discount_amount)
        .bind(sale.sale_amount)
        .bind(sale.cost_amount)
        .bind(sale.profit)
        .bind(sale.charity_percentage)
        .bind(sale.charity_amount)
        .bind(&sale.created_by)
        .bind(sale.sale_date)
        .bind(sale.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Removes a sale row.
    ///
    /// ## Returns
    /// * `Ok(false)` - No such sale
    pub async fn delete_in(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    /// Gets a sale by ID on a caller-supplied connection.
    pub async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        debug!(id = %id, "Fetching sale");

        let sql = format!("SELECT {SALE_COLUMNS} FROM sales s WHERE s.id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(sale)
    }

    /// Most recent sales with product and customer, newest first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<SaleWithDetails>> {
        debug!(limit, "Listing recent sales");

        let sql = format!(
            "SELECT {SALE_COLUMNS}, {DETAIL_JOINS} \
             ORDER BY s.sale_date DESC, s.created_at DESC LIMIT ?1"
        );
        let sales = sqlx::query_as::<_, SaleWithDetails>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Sales whose sale date falls within `range`, newest first.
    pub async fn in_range(&self, range: &DateRange) -> DbResult<Vec<SaleWithDetails>> {
        debug!(from = %range.from, to = %range.to, "Listing sales in range");

        let sql = format!(
            "SELECT {SALE_COLUMNS}, {DETAIL_JOINS} \
             WHERE s.sale_date >= ?1 AND s.sale_date < ?2 \
             ORDER BY s.sale_date DESC, s.created_at DESC"
        );
        let sales = sqlx::query_as::<_, SaleWithDetails>(&sql)
            .bind(range.start())
            .bind(range.end_exclusive())
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// A customer's sales, newest first.
    pub async fn for_customer(&self, customer_id: &str) -> DbResult<Vec<SaleWithDetails>> {
        debug!(customer_id = %customer_id, "Listing customer sales");

        let sql = format!(
            "SELECT {SALE_COLUMNS}, {DETAIL_JOINS} \
             WHERE s.customer_id = ?1 \
             ORDER BY s.sale_date DESC, s.created_at DESC"
        );
        let sales = sqlx::query_as::<_, SaleWithDetails>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Every sale row (for reports).
    pub async fn list_all(&self) -> DbResult<Vec<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales s ORDER BY s.sale_date");
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Counts all sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::new_id;
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig};
    use chrono::{Duration, Utc};
    use threadgood_core::{
        Money, PaymentMode, Percent, ProductCategory, SaleMode, Size, SizeStock,
    };

    async fn seeded() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(NewProduct {
                sku: "HD-01".to_string(),
                name: "Oversized Hoodie".to_string(),
                category: ProductCategory::Hoodie,
                cost_price: Money::from_major(500),
                selling_price: Money::from_major(999),
                charity_percentage: Percent::from_whole(10),
                stock: SizeStock::new(10, 10, 10, 10),
            })
            .await
            .unwrap();
        (db, product.id)
    }

    fn sale(product_id: &str, days_ago: i64) -> Sale {
        let at = Utc::now() - Duration::days(days_ago);
        Sale {
            id: new_id(),
            product_id: product_id.to_string(),
            customer_id: None,
            quantity: 1,
            size: Size::L,
            payment_mode: PaymentMode::Upi,
            sale_mode: SaleMode::Offline,
            unit_price: Money::from_major(999),
            subtotal: Money::from_major(999),
            discount_amount: Money::zero(),
            sale_amount: Money::from_major(999),
            cost_amount: Money::from_major(500),
            profit: Money::from_major(499),
            charity_percentage: Percent::from_whole(10),
            charity_amount: Money::from_minor(4990),
            created_by: None,
            sale_date: at,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_insert_get_delete() {
        let (db, product_id) = seeded().await;
        let s = sale(&product_id, 0);

        let mut conn = db.pool().acquire().await.unwrap();
        SaleRepository::insert_in(&mut conn, &s).await.unwrap();
        drop(conn);

        let fetched = db.sales().get_by_id(&s.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, s.id);
        assert_eq!(fetched.size, Size::L);
        assert_eq!(fetched.payment_mode, PaymentMode::Upi);
        assert_eq!(fetched.charity_amount, Money::from_minor(4990));
        assert_eq!(fetched.charity_percentage, Percent::from_whole(10));

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(SaleRepository::delete_in(&mut conn, &s.id).await.unwrap());
        assert!(!SaleRepository::delete_in(&mut conn, &s.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_listing_joins_product() {
        let (db, product_id) = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();
        for days_ago in [3, 0, 1] {
            SaleRepository::insert_in(&mut conn, &sale(&product_id, days_ago))
                .await
                .unwrap();
        }
        drop(conn);

        let recent = db.sales().recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].sale.sale_date > recent[1].sale.sale_date);
        assert_eq!(recent[0].product_sku.as_deref(), Some("HD-01"));
        assert_eq!(recent[0].customer_name, None);

        let today = DateRange::day(Utc::now().date_naive());
        assert_eq!(db.sales().in_range(&today).await.unwrap().len(), 1);
        assert_eq!(db.sales().list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_sale_for_unknown_product_is_rejected() {
        let (db, _) = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = SaleRepository::insert_in(&mut conn, &sale("missing", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::DbError::ForeignKeyViolation { .. }));
    }
}
