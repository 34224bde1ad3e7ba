//! # threadgood-db: Storage and Services for Threadgood
//!
//! SQLite persistence through sqlx, the repositories over it, and the
//! services that span them: the sale transaction, dashboard reports and the
//! CSV export.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Threadgood Data Flow                             │
//! │                                                                         │
//! │  Dashboard / binaries                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 threadgood-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │               │    │               │    │  (embedded)  │  │   │
//! │  │   │ SaleService   │───►│ ProductRepo   │    │              │  │   │
//! │  │   │ ReportService │    │ CustomerRepo  │    │ 001_initial_ │  │   │
//! │  │   │ CSV export    │    │ SaleRepo      │    │   schema.sql │  │   │
//! │  │   │               │    │ ExpenseRepo   │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │                        Database (pool.rs)                       │   │
//! │  └────────────────────────────────┼────────────────────────────────┘   │
//! │                                   ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `threadgood.toml` and `THREADGOOD_*` settings
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Product, customer, sale and expense repositories
//! - [`service`] - Sale transactions, reports, CSV export
//!
//! ## Usage
//!
//! ```rust,ignore
//! use threadgood_db::{AppConfig, Database, NewSaleRequest, SaleService};
//! use threadgood_core::Size;
//!
//! let config = AppConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let sales = SaleService::from_config(db.clone(), &config);
//! let recorded = sales
//!     .record_sale(NewSaleRequest::new(product_id, Size::M, 1).customer("9876543210", None))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::{CustomerRepository, CustomerUpdate, NewCustomer};
pub use repository::expense::{ExpenseRepository, ExpenseUpdate, NewExpense};
pub use repository::product::{NewProduct, ProductRepository, ProductUpdate};
pub use repository::sale::SaleRepository;

pub use service::export::{export_sales_csv, ExportError};
pub use service::report::ReportService;
pub use service::sale::{NewSaleRequest, RecordedSale, ReversedSale, SaleService};
pub use service::{SaleError, SaleResult};

use tracing_subscriber::EnvFilter;

/// Installs the `tracing` subscriber used by the binaries.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=threadgood_db=trace` - Trace the storage layer only
/// - Default: `info,threadgood=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,threadgood=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
