//! # Sales Export
//!
//! Writes the sales of a date range as CSV, oldest first:
//!
//! ```text
//! SKU,Product Name,Size,Qty,Sold amount after discount,Mode,Customer name
//! "HD-01","Oversized Hoodie","M","2","1798.00","UPI","Asha"
//! "N/A","Unknown Product","L","1","999.00","Cash","Walk-in"
//! ```
//!
//! The header is written bare; every data field is double-quoted with `"`
//! doubled inside it.

use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::error::DbError;
use crate::pool::Database;
use threadgood_core::{DateRange, SaleWithDetails};

pub const EXPORT_HEADER: [&str; 7] = [
    "SKU",
    "Product Name",
    "Size",
    "Qty",
    "Sold amount after discount",
    "Mode",
    "Customer name",
];

const MISSING_SKU: &str = "N/A";
const MISSING_PRODUCT: &str = "Unknown Product";
const MISSING_CUSTOMER: &str = "Walk-in";

#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing was sold in the range, so no file is produced.
    #[error("No sales found between {from} and {to}")]
    NoSales {
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Write error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Suggested download name, e.g. `sales_2024-03-01_to_2024-03-31.csv`.
pub fn export_file_name(range: &DateRange) -> String {
    format!("sales_{}_to_{}.csv", range.from, range.to)
}

/// Exports the sales dated within `range`. Returns the number of rows
/// written.
pub async fn export_sales_csv<W: Write>(
    db: &Database,
    range: &DateRange,
    writer: W,
) -> ExportResult<usize> {
    let mut rows = db.sales().in_range(range).await?;
    if rows.is_empty() {
        return Err(ExportError::NoSales {
            from: range.from,
            to: range.to,
        });
    }

    rows.sort_by(|a, b| {
        a.sale
            .sale_date
            .cmp(&b.sale.sale_date)
            .then_with(|| a.sale.created_at.cmp(&b.sale.created_at))
    });

    let written = write_sales_csv(&rows, writer)?;
    info!(from = %range.from, to = %range.to, rows = written, "Sales exported");
    Ok(written)
}

/// Exports the sales dated within `range` to the file at `path`.
///
/// The CSV is rendered before the file is opened, so an existing file at
/// `path` is left as it was when there is nothing to export.
pub async fn export_sales_to_path(
    db: &Database,
    range: &DateRange,
    path: &Path,
) -> ExportResult<usize> {
    let mut csv = Vec::new();
    let written = export_sales_csv(db, range, &mut csv).await?;
    fs::write(path, &csv)?;
    Ok(written)
}

/// Writes `rows` in the order given.
pub fn write_sales_csv<W: Write>(rows: &[SaleWithDetails], mut writer: W) -> ExportResult<usize> {
    writeln!(writer, "{}", EXPORT_HEADER.join(","))?;

    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    for row in rows {
        let sale = &row.sale;
        csv.write_record([
            row.product_sku.as_deref().unwrap_or(MISSING_SKU),
            row.product_name.as_deref().unwrap_or(MISSING_PRODUCT),
            sale.size.as_str(),
            sale.quantity.to_string().as_str(),
            sale.sale_amount.to_string().as_str(),
            sale.payment_mode.as_str(),
            row.customer_name.as_deref().unwrap_or(MISSING_CUSTOMER),
        ])?;
    }

    csv.flush()?;
    Ok(rows.len())
}

// =============================================================================
// Unit Tests
// =============================================================================
