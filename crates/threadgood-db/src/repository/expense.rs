//! # Expense Repository
//!
//! Plain CRUD over the `expenses` table.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use threadgood_core::validation::{validate_expense_amount, validate_notes};
use threadgood_core::{DateRange, Expense, ExpenseCategory, Money};

const EXPENSE_COLUMNS: &str =
    "id, category, amount, expense_date, notes, created_by, created_at, updated_at";

/// Fields for a new expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub category: ExpenseCategory,
    pub amount: Money,
    pub expense_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

/// Changes to an expense. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct ExpenseUpdate {
    pub category: Option<ExpenseCategory>,
    pub amount: Option<Money>,
    pub expense_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Creates a new ExpenseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Records an expense.
    pub async fn create(&self, new: NewExpense) -> DbResult<Expense> {
        validate_expense_amount(new.amount)?;
        if let Some(notes) = &new.notes {
            validate_notes(notes)?;
        }

        let now = Utc::now();
        let expense = Expense {
            id: new_id(),
            category: new.category,
            amount: new.amount,
            expense_date: new.expense_date,
            notes: new.notes,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %expense.id, category = %expense.category, "Inserting expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, category, amount, expense_date, notes, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&expense.id)
        .bind(expense.category)
        .bind(expense.amount)
        .bind(expense.expense_date)
        .bind(&expense.notes)
        .bind(&expense.created_by)
        .bind(expense.created_at)
        .bind(expense.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %expense.id, amount = %expense.amount, "Expense recorded");
        Ok(expense)
    }

    /// Gets an expense by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Expense>> {
        debug!(id = %id, "Fetching expense");

        let sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1");
        let expense = sqlx::query_as::<_, Expense>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(expense)
    }

    /// Updates an expense.
    pub async fn update(&self, id: &str, changes: ExpenseUpdate) -> DbResult<Expense> {
        debug!(id = %id, "Updating expense");

        if let Some(amount) = changes.amount {
            validate_expense_amount(amount)?;
        }
        if let Some(notes) = &changes.notes {
            validate_notes(notes)?;
        }

        let result = sqlx::query(
            r#"
            UPDATE expenses SET
                category = COALESCE(?2, category),
                amount = COALESCE(?3, amount),
                expense_date = COALESCE(?4, expense_date),
                notes = COALESCE(?5, notes),
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(changes.category)
        .bind(changes.amount)
        .bind(changes.expense_date)
        .bind(&changes.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Expense", id))
    }

    /// Deletes an expense.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting expense");

        let result = sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }

        info!(id = %id, "Expense deleted");
        Ok(())
    }

    /// Lists expenses, newest first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses \
             ORDER BY expense_date DESC, created_at DESC LIMIT ?1"
        );
        let expenses = sqlx::query_as::<_, Expense>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(expenses)
    }

    /// Expenses dated within `range`, newest first.
    pub async fn in_range(&self, range: &DateRange) -> DbResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses \
             WHERE expense_date >= ?1 AND expense_date <= ?2 \
             ORDER BY expense_date DESC, created_at DESC"
        );
        let expenses = sqlx::query_as::<_, Expense>(&sql)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(&self.pool)
            .await?;

        Ok(expenses)
    }

    /// Every expense (for reports).
    pub async fn list_all(&self) -> DbResult<Vec<Expense>> {
        let sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY expense_date DESC");
        let expenses = sqlx::query_as::<_, Expense>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(expenses)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn fabric(amount: i64, day: u32) -> NewExpense {
        NewExpense {
            category: ExpenseCategory::Fabric,
            amount: Money::from_major(amount),
            expense_date: date(day),
            notes: Some("cotton bale".to_string()),
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();

        let e = repo.create(fabric(4000, 1)).await.unwrap();
        assert_eq!(repo.get_by_id(&e.id).await.unwrap().unwrap().amount, Money::from_major(4000));

        let updated = repo
            .update(
                &e.id,
                ExpenseUpdate {
                    category: Some(ExpenseCategory::Stitching),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.category, ExpenseCategory::Stitching);
        assert_eq!(updated.notes.as_deref(), Some("cotton bale"));

        repo.delete(&e.id).await.unwrap();
        assert!(repo.get_by_id(&e.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&e.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_amount_must_be_positive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.expenses().create(fabric(0, 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_in_range_is_inclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();
        for day in [1, 10, 20, 31] {
            repo.create(fabric(100, day)).await.unwrap();
        }

        let range = DateRange::new(date(10), date(20)).unwrap();
        let found = repo.in_range(&range).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].expense_date, date(20));
        assert_eq!(repo.list(3).await.unwrap().len(), 3);
    }
}
