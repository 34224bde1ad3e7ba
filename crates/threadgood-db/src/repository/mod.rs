//! # Repository Module
//!
//! Database repository implementations for Threadgood.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │  db.products().search("hoodie", 20)                            │
//! │       ▼                                                                 │
//! │  ProductRepository                  (holds a pool handle)              │
//! │  ├── search(&self, query, limit)    ← one-off reads and writes         │
//! │  ├── get_by_id(&self, id)                                              │
//! │  └── decrement_stock_in(conn, ..)   ← joins a caller's transaction     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Associated functions ending in `_in` take a `&mut SqliteConnection` so the
//! sale service can run several of them inside one transaction
//! (`&mut *tx`). Methods on `&self` use the pool.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Products and per-size stock
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and lifetime totals
//! - [`SaleRepository`](sale::SaleRepository) - Sale rows and listings
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Expenses

pub mod customer;
pub mod expense;
pub mod product;
pub mod sale;

use uuid::Uuid;

/// Generates a new entity ID (UUID v4).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Escapes `%`, `_` and `\` so user input matches literally in `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("hoodie"), "%hoodie%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_new_id_is_uuid() {
        assert!(threadgood_core::validation::validate_uuid(&new_id()).is_ok());
    }
}
