//! # Product Repository
//!
//! Database operations for products and their per-size stock.
//!
//! ## Key Operations
//! - CRUD and search by name or SKU
//! - Restock (additive, all sizes at once)
//! - Conditional stock decrement for sales
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: Read then write (two tills can both see M = 1)              │
//! │     SELECT stock_m ... ; UPDATE products SET stock_m = 0               │
//! │                                                                         │
//! │  ✅ CORRECT: One conditional statement                                  │
//! │     UPDATE products SET stock_m = stock_m - 1                          │
//! │     WHERE id = ? AND stock_m >= 1                                      │
//! │                                                                         │
//! │  0 rows affected → not enough stock, nothing changed                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{like_pattern, new_id};
use threadgood_core::validation::{
    normalize_sku, validate_percent, validate_price, validate_product_name, validate_search_query,
    validate_sku,
};
use threadgood_core::{Money, Percent, Product, ProductCategory, Size, SizeStock};

const PRODUCT_COLUMNS: &str = "id, sku, name, category, cost_price, selling_price, \
    charity_percentage, stock_m, stock_l, stock_xl, stock_xxl, is_active, created_at, updated_at";

/// Column holding the stock of one size.
pub(crate) const fn stock_column(size: Size) -> &'static str {
    match size {
        Size::M => "stock_m",
        Size::L => "stock_l",
        Size::Xl => "stock_xl",
        Size::Xxl => "stock_xxl",
    }
}

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category: ProductCategory,
    pub cost_price: Money,
    pub selling_price: Money,
    pub charity_percentage: Percent,
    pub stock: SizeStock,
}

impl NewProduct {
    fn validate(&self) -> DbResult<()> {
        validate_sku(&self.sku)?;
        validate_product_name(&self.name)?;
        validate_price("cost price", self.cost_price)?;
        validate_price("selling price", self.selling_price)?;
        validate_percent("charity percentage", self.charity_percentage)?;
        Ok(())
    }
}

/// Changes to a product's details. `None` leaves a field as it is.
///
/// Stock is not editable here; use [`ProductRepository::restock`].
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub category: Option<ProductCategory>,
    pub cost_price: Option<Money>,
    pub selling_price: Option<Money>,
    pub charity_percentage: Option<Percent>,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product, active
    /// * `Err(DbError::Invalid)` - A field failed validation
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn create(&self, new: NewProduct) -> DbResult<Product> {
        new.validate()?;

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            sku: normalize_sku(&new.sku),
            name: new.name.trim().to_string(),
            category: new.category,
            cost_price: new.cost_price,
            selling_price: new.selling_price,
            charity_percentage: new.charity_percentage,
            stock: new.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, category, cost_price, selling_price, charity_percentage,
                stock_m, stock_l, stock_xl, stock_xxl, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.category)
        .bind(product.cost_price)
        .bind(product.selling_price)
        .bind(product.charity_percentage)
        .bind(product.stock.m)
        .bind(product.stock.l)
        .bind(product.stock.xl)
        .bind(product.stock.xxl)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&product.sku))?;

        info!(id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    /// Gets a product by its ID on a caller-supplied connection.
    pub async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        debug!(id = %id, "Fetching product");

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        debug!(sku = %sku, "Fetching product by SKU");

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(normalize_sku(sku))
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists every product, active or not (for reports).
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Searches active products by name or SKU (case-insensitive substring).
    ///
    /// An empty query lists active products.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE is_active = 1
              AND (name LIKE ?1 ESCAPE '\' OR sku LIKE ?1 ESCAPE '\')
            ORDER BY name
            LIMIT ?2
            "#
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(like_pattern(&query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Updates a product's details.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The product after the update
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: &str, changes: ProductUpdate) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        if let Some(sku) = &changes.sku {
            validate_sku(sku)?;
        }
        if let Some(name) = &changes.name {
            validate_product_name(name)?;
        }
        if let Some(price) = changes.cost_price {
            validate_price("cost price", price)?;
        }
        if let Some(price) = changes.selling_price {
            validate_price("selling price", price)?;
        }
        if let Some(pct) = changes.charity_percentage {
            validate_percent("charity percentage", pct)?;
        }

        let sku = changes.sku.as_deref().map(normalize_sku);
        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = COALESCE(?2, sku),
                name = COALESCE(?3, name),
                category = COALESCE(?4, category),
                cost_price = COALESCE(?5, cost_price),
                selling_price = COALESCE(?6, selling_price),
                charity_percentage = COALESCE(?7, charity_percentage),
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&sku)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.category)
        .bind(changes.cost_price)
        .bind(changes.selling_price)
        .bind(changes.charity_percentage)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(sku.as_deref().unwrap_or_default()))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Adds a batch of received stock.
    ///
    /// ## Errors
    /// * `DbError::Invalid` - nothing in the batch
    /// * `DbError::NotFound` - product doesn't exist
    pub async fn restock(&self, id: &str, additions: &SizeStock) -> DbResult<Product> {
        // Validates the batch; the stored counts are added in SQL below.
        SizeStock::default().restock(additions)?;

        debug!(id = %id, added = additions.total(), "Restocking product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                stock_m = stock_m + ?2,
                stock_l = stock_l + ?3,
                stock_xl = stock_xl + ?4,
                stock_xxl = stock_xxl + ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(additions.m)
        .bind(additions.l)
        .bind(additions.xl)
        .bind(additions.xxl)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        let product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        info!(id = %id, sku = %product.sku, added = additions.total(), "Product restocked");
        Ok(product)
    }

    /// Activates or deactivates a product.
    ///
    /// Historical sales keep referencing an inactive product, so products are
    /// never deleted.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Setting product active flag");

        let result =
            sqlx::query("UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(active)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Takes `quantity` units of `size` off the shelf if that many are there.
    ///
    /// ## Returns
    /// * `Ok(true)` - Stock decremented
    /// * `Ok(false)` - Product missing or not enough stock; nothing changed
    pub async fn decrement_stock_in(
        conn: &mut SqliteConnection,
        id: &str,
        size: Size,
        quantity: u32,
    ) -> DbResult<bool> {
        debug!(id = %id, size = %size, quantity, "Decrementing stock");

        let column = stock_column(size);
        let sql = format!(
            "UPDATE products SET {column} = {column} - ?1, updated_at = ?2 \
             WHERE id = ?3 AND {column} >= ?1"
        );
        let result = sqlx::query(&sql)
            .bind(quantity)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Puts `quantity` units of `size` back on the shelf.
    ///
    /// ## Returns
    /// * `Ok(false)` - Product doesn't exist
    pub async fn increment_stock_in(
        conn: &mut SqliteConnection,
        id: &str,
        size: Size,
        quantity: u32,
    ) -> DbResult<bool> {
        debug!(id = %id, size = %size, quantity, "Incrementing stock");

        let column = stock_column(size);
        let sql = format!(
            "UPDATE products SET {column} = {column} + ?1, updated_at = ?2 WHERE id = ?3"
        );
        let result = sqlx::query(&sql)
            .bind(quantity)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
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
    use crate::{Database, DbConfig};

    fn hoodie(sku: &str) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: "Oversized Hoodie".to_string(),
            category: ProductCategory::Hoodie,
            cost_price: Money::from_major(500),
            selling_price: Money::from_major(999),
            charity_percentage: Percent::from_whole(10),
            stock: SizeStock::new(3, 5, 2, 0),
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = db().await;
        let created = db.products().create(hoodie("HD-01")).await.unwrap();

        let fetched = db.products().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.sku, "HD-01");
        assert_eq!(fetched.category, ProductCategory::Hoodie);
        assert_eq!(fetched.stock, SizeStock::new(3, 5, 2, 0));
        assert_eq!(fetched.charity_percentage, Percent::from_whole(10));
        assert!(fetched.is_active);

        let by_sku = db.products().get_by_sku("HD-01").await.unwrap().unwrap();
        assert_eq!(by_sku.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_rejected() {
        let db = db().await;
        db.products().create(hoodie("HD-01")).await.unwrap();

        let err = db.products().create(hoodie("HD-01")).await.unwrap_err();
        match err {
            DbError::UniqueViolation { value, .. } => assert_eq!(value, "HD-01"),
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sku_is_stored_uppercase() {
        let db = db().await;
        let created = db.products().create(hoodie(" hd-01 ")).await.unwrap();
        assert_eq!(created.sku, "HD-01");

        let by_sku = db.products().get_by_sku("hd-01").await.unwrap().unwrap();
        assert_eq!(by_sku.id, created.id);

        let err = db.products().create(hoodie("HD-01")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let renamed = db
            .products()
            .update(
                &created.id,
                ProductUpdate {
                    sku: Some("hd-02".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.sku, "HD-02");
    }

    #[tokio::test]
    async fn test_invalid_product_is_rejected() {
        let db = db().await;
        let mut bad = hoodie("HD-01");
        bad.charity_percentage = Percent::from_whole(150);

        assert!(matches!(
            db.products().create(bad).await.unwrap_err(),
            DbError::Invalid(_)
        ));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_matches_name_and_sku() {
        let db = db().await;
        db.products().create(hoodie("HD-01")).await.unwrap();
        let mut tee = hoodie("TS-01");
        tee.name = "Graphic Tee".to_string();
        tee.category = ProductCategory::TShirt;
        db.products().create(tee).await.unwrap();

        assert_eq!(db.products().search("hoodie", 10).await.unwrap().len(), 1);
        assert_eq!(db.products().search("ts-", 10).await.unwrap().len(), 1);
        assert_eq!(db.products().search("", 10).await.unwrap().len(), 2);
        assert!(db.products().search("100%", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_details() {
        let db = db().await;
        let p = db.products().create(hoodie("HD-01")).await.unwrap();

        let updated = db
            .products()
            .update(
                &p.id,
                ProductUpdate {
                    selling_price: Some(Money::from_major(1099)),
                    name: Some("Heavy Hoodie".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.selling_price, Money::from_major(1099));
        assert_eq!(updated.name, "Heavy Hoodie");
        assert_eq!(updated.cost_price, p.cost_price);
        assert_eq!(updated.stock, p.stock);
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let db = db().await;
        let err = db
            .products()
            .update("missing", ProductUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_restock() {
        let db = db().await;
        let p = db.products().create(hoodie("HD-01")).await.unwrap();

        let restocked = db
            .products()
            .restock(&p.id, &SizeStock::new(2, 0, 0, 4))
            .await
            .unwrap();
        assert_eq!(restocked.stock, SizeStock::new(5, 5, 2, 4));

        assert!(db
            .products()
            .restock(&p.id, &SizeStock::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_conditional_decrement() {
        let db = db().await;
        let p = db.products().create(hoodie("HD-01")).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        assert!(ProductRepository::decrement_stock_in(&mut conn, &p.id, Size::M, 2)
            .await
            .unwrap());
        assert!(!ProductRepository::decrement_stock_in(&mut conn, &p.id, Size::M, 2)
            .await
            .unwrap());
        assert!(!ProductRepository::decrement_stock_in(&mut conn, &p.id, Size::Xxl, 1)
            .await
            .unwrap());
        assert!(ProductRepository::increment_stock_in(&mut conn, &p.id, Size::M, 4)
            .await
            .unwrap());
        drop(conn);

        let after = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(after.stock.m, 5);
    }

    #[tokio::test]
    async fn test_deactivated_products_are_not_listed() {
        let db = db().await;
        let p = db.products().create(hoodie("HD-01")).await.unwrap();
        db.products().set_active(&p.id, false).await.unwrap();

        assert!(db.products().list_active(10).await.unwrap().is_empty());
        assert_eq!(db.products().list_all().await.unwrap().len(), 1);
    }
}
