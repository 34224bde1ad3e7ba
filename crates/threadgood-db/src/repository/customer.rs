//! # Customer Repository
//!
//! Customers are keyed at the till by mobile number. Their lifetime totals
//! are written only through [`CustomerRepository::apply_delta_in`], which
//! floors both totals at zero in SQL.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use threadgood_core::validation::{validate_customer_name, validate_email, validate_mobile};
use threadgood_core::{Customer, DateRange, LedgerDelta, Money};

const CUSTOMER_COLUMNS: &str =
    "id, name, mobile, email, total_spent, total_charity, created_at, updated_at";

/// Fields for a new customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
}

impl NewCustomer {
    fn validate(&self) -> DbResult<()> {
        validate_customer_name(&self.name)?;
        validate_mobile(&self.mobile)?;
        if let Some(email) = non_empty(self.email.as_deref()) {
            validate_email(email)?;
        }
        Ok(())
    }
}

/// Changes to a customer's contact details. `None` leaves a field as it is;
/// an empty email clears it.
#[derive(Debug, Clone, Default)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer with zero totals.
    ///
    /// ## Errors
    /// * `DbError::Invalid` - bad name, mobile or email
    /// * `DbError::UniqueViolation` - mobile already registered
    pub async fn create(&self, new: NewCustomer) -> DbResult<Customer> {
        let mut conn = self.pool.acquire().await?;
        Self::create_in(&mut conn, new).await
    }

    /// Creates a customer on a caller-supplied connection.
    pub async fn create_in(conn: &mut SqliteConnection, new: NewCustomer) -> DbResult<Customer> {
        new.validate()?;

        let now = Utc::now();
        let customer = Customer {
            id: new_id(),
            name: new.name.trim().to_string(),
            mobile: new.mobile,
            email: non_empty(new.email.as_deref()).map(str::to_string),
            total_spent: Money::zero(),
            total_charity: Money::zero(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %customer.id, mobile = %customer.mobile, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, mobile, email, total_spent, total_charity, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.mobile)
        .bind(&customer.email)
        .bind(customer.total_spent)
        .bind(customer.total_charity)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from(e).with_value(&customer.mobile))?;

        info!(id = %customer.id, "Customer created");
        Ok(customer)
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    /// Gets a customer by ID on a caller-supplied connection.
    pub async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
        debug!(id = %id, "Fetching customer");

        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(customer)
    }

    /// Finds a customer by mobile number.
    pub async fn find_by_mobile(&self, mobile: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_mobile_in(&mut conn, mobile).await
    }

    /// Finds a customer by mobile number on a caller-supplied connection.
    pub async fn find_by_mobile_in(
        conn: &mut SqliteConnection,
        mobile: &str,
    ) -> DbResult<Option<Customer>> {
        debug!(mobile = %mobile, "Fetching customer by mobile");

        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE mobile = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(mobile)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(customer)
    }

    /// Updates contact details. Totals are never touched here.
    pub async fn update(&self, id: &str, changes: CustomerUpdate) -> DbResult<Customer> {
        debug!(id = %id, "Updating customer");

        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))?;

        let name = match changes.name {
            Some(name) => {
                validate_customer_name(&name)?;
                name.trim().to_string()
            }
            None => current.name,
        };
        let mobile = match changes.mobile {
            Some(mobile) => {
                validate_mobile(&mobile)?;
                mobile
            }
            None => current.mobile,
        };
        let email = match changes.email {
            Some(email) => match non_empty(Some(email.as_str())) {
                Some(e) => {
                    validate_email(e)?;
                    Some(e.to_string())
                }
                None => None,
            },
            None => current.email,
        };

        let result = sqlx::query(
            "UPDATE customers SET name = ?2, mobile = ?3, email = ?4, updated_at = ?5 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(&name)
        .bind(&mobile)
        .bind(&email)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&mobile))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Applies a signed delta to a customer's totals, flooring each at zero.
    ///
    /// Mirrors `CustomerTotals::apply_delta` in SQL so concurrent sales
    /// against one customer never lose an update.
    ///
    /// ## Returns
    /// * `Ok(false)` - Customer doesn't exist
    pub async fn apply_delta_in(
        conn: &mut SqliteConnection,
        id: &str,
        delta: LedgerDelta,
    ) -> DbResult<bool> {
        debug!(
            id = %id,
            amount = delta.amount.minor(),
            charity = delta.charity.minor(),
            "Applying customer delta"
        );

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                total_spent = MAX(0, total_spent + ?2),
                total_charity = MAX(0, total_charity + ?3),
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta.amount)
        .bind(delta.charity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Lists customers, newest first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY created_at DESC LIMIT ?1"
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// Customers with the highest lifetime spend.
    pub async fn top_spenders(&self, limit: u32) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE total_spent > 0 \
             ORDER BY total_spent DESC, name LIMIT ?1"
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// Counts customers first seen within `range`.
    pub async fn count_created_in(&self, range: &DateRange) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM customers WHERE created_at >= ?1 AND created_at < ?2",
        )
        .bind(range.start())
        .bind(range.end_exclusive())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Counts all customers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
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

    fn asha() -> NewCustomer {
        NewCustomer {
            name: "Asha".to_string(),
            mobile: "9876543210".to_string(),
            email: Some("asha@example.com".to_string()),
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_by_mobile() {
        let db = db().await;
        let created = db.customers().create(asha()).await.unwrap();
        assert_eq!(created.total_spent, Money::zero());

        let found = db
            .customers()
            .find_by_mobile("9876543210")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.email.as_deref(), Some("asha@example.com"));
    }

    #[tokio::test]
    async fn test_duplicate_mobile_is_rejected() {
        let db = db().await;
        db.customers().create(asha()).await.unwrap();

        let err = db.customers().create(asha()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_invalid_mobile_is_rejected() {
        let db = db().await;
        let mut bad = asha();
        bad.mobile = "12345".to_string();
        assert!(matches!(
            db.customers().create(bad).await.unwrap_err(),
            DbError::Invalid(_)
        ));
    }

    #[tokio::test]
    async fn test_update_contact_details() {
        let db = db().await;
        let c = db.customers().create(asha()).await.unwrap();

        let updated = db
            .customers()
            .update(
                &c.id,
                CustomerUpdate {
                    name: Some("Asha Rao".to_string()),
                    email: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Asha Rao");
        assert_eq!(updated.mobile, c.mobile);
        assert_eq!(updated.email, None);
    }

    #[tokio::test]
    async fn test_apply_delta_floors_at_zero() {
        let db = db().await;
        let c = db.customers().create(asha()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let sale = LedgerDelta {
            amount: Money::from_major(1798),
            charity: Money::from_minor(7980),
        };
        assert!(CustomerRepository::apply_delta_in(&mut conn, &c.id, sale).await.unwrap());
        assert!(CustomerRepository::apply_delta_in(
            &mut conn,
            &c.id,
            LedgerDelta {
                amount: Money::from_major(-5000),
                charity: Money::from_minor(-80),
            }
        )
        .await
        .unwrap());
        assert!(!CustomerRepository::apply_delta_in(&mut conn, "missing", sale)
            .await
            .unwrap());
        drop(conn);

        let after = db.customers().get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(after.total_spent, Money::zero());
        assert_eq!(after.total_charity, Money::from_minor(7900));
    }

    #[tokio::test]
    async fn test_top_spenders_order() {
        let db = db().await;
        let a = db.customers().create(asha()).await.unwrap();
        let b = db
            .customers()
            .create(NewCustomer {
                name: "Ravi".to_string(),
                mobile: "9123456780".to_string(),
                email: None,
            })
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        for (id, major) in [(&a.id, 100), (&b.id, 300)] {
            CustomerRepository::apply_delta_in(
                &mut conn,
                id,
                LedgerDelta {
                    amount: Money::from_major(major),
                    charity: Money::zero(),
                },
            )
            .await
            .unwrap();
        }
        drop(conn);

        let top = db.customers().top_spenders(10).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, b.id);

        let today = DateRange::day(Utc::now().date_naive());
        assert_eq!(db.customers().count_created_in(&today).await.unwrap(), 2);
    }
}
