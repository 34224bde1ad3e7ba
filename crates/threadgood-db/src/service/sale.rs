//! # Sale Service
//!
//! Records and deletes sales. Each call is one SQLite transaction that
//! moves the product's stock, the customer's totals and the sale row
//! together.
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         record_sale()                                   │
//! │                                                                         │
//! │  Validating ──► Pricing ──► BEGIN                                      │
//! │   (no I/O)     (pre-read)     │                                         │
//! │                               ▼                                         │
//! │                PersistingInventory                                      │
//! │                  UPDATE stock_<size> = stock_<size> - n                 │
//! │                  WHERE stock_<size> >= n       (0 rows → reject)        │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                PersistingSale                                           │
//! │                  find or create customer by mobile, INSERT sale         │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                PersistingCustomer                                       │
//! │                  total = MAX(0, total + delta)                          │
//! │                               │                                         │
//! │                               ▼                                         │
//! │   ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ deadline ends here         │
//! │                               ▼                                         │
//! │                COMMIT ──► Done                                          │
//! │                                                                         │
//! │  Any error after BEGIN drops the transaction, which rolls it back.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock decrement is the first statement of the transaction, so the
//! write lock is taken before anything is read. Prices are read again after
//! it and the sale is priced from that read.
//!
//! The operation deadline covers everything up to COMMIT. Once COMMIT has
//! been sent it runs to completion, so a `Timeout` always means the
//! transaction was dropped uncommitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::DbError;
use crate::pool::Database;
use crate::repository::customer::{CustomerRepository, NewCustomer};
use crate::repository::new_id;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::service::{SaleError, SaleResult};
use sqlx::{Sqlite, Transaction};
use threadgood_core::pricing::{self, Discount, PricingInput, SaleBreakdown};
use threadgood_core::validation::{
    validate_customer_name, validate_mobile, validate_percent, validate_quantity,
};
use threadgood_core::{
    Customer, LedgerDelta, PaymentMode, Product, Sale, SaleMode, Size, ValidationError,
    WALK_IN_CUSTOMER_NAME,
};

// =============================================================================
// Stages
// =============================================================================

/// Where a sale operation is. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleStage {
    Validating,
    Pricing,
    PersistingInventory,
    PersistingSale,
    PersistingCustomer,
    Reversing,
    Done,
}

impl fmt::Display for SaleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaleStage::Validating => "validating",
            SaleStage::Pricing => "pricing",
            SaleStage::PersistingInventory => "persisting_inventory",
            SaleStage::PersistingSale => "persisting_sale",
            SaleStage::PersistingCustomer => "persisting_customer",
            SaleStage::Reversing => "reversing",
            SaleStage::Done => "done",
        };
        f.write_str(name)
    }
}

fn enter(stage: SaleStage, id: &str) {
    debug!(stage = %stage, id = %id, "Sale stage");
}

/// Work done under the deadline: the open transaction and what committing
/// it will return.
type Staged<T> = (Transaction<'static, Sqlite>, T);

async fn commit(tx: Transaction<'static, Sqlite>) -> SaleResult<()> {
    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
    Ok(())
}

// =============================================================================
// Requests and Results
// =============================================================================

/// Input for [`SaleService::record_sale`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSaleRequest {
    pub product_id: String,

    /// Ten-digit mobile number. Without one the sale is a walk-in sale.
    #[serde(default)]
    pub customer_mobile: Option<String>,

    /// Name for a customer created by this sale.
    #[serde(default)]
    pub customer_name: Option<String>,

    pub quantity: i64,
    pub size: Size,

    #[serde(default)]
    pub discount: Discount,

    #[serde(default)]
    pub payment_mode: PaymentMode,

    #[serde(default)]
    pub sale_mode: SaleMode,

    #[serde(default)]
    pub created_by: Option<String>,

    /// Defaults to now.
    #[serde(default)]
    pub sale_date: Option<DateTime<Utc>>,
}

impl NewSaleRequest {
    /// A walk-in, cash, offline sale with no discount.
    pub fn new(product_id: impl Into<String>, size: Size, quantity: i64) -> Self {
        NewSaleRequest {
            product_id: product_id.into(),
            customer_mobile: None,
            customer_name: None,
            quantity,
            size,
            discount: Discount::None,
            payment_mode: PaymentMode::default(),
            sale_mode: SaleMode::default(),
            created_by: None,
            sale_date: None,
        }
    }

    pub fn customer(mut self, mobile: impl Into<String>, name: Option<&str>) -> Self {
        self.customer_mobile = Some(mobile.into());
        self.customer_name = name.map(str::to_string);
        self
    }

    pub fn discount(mut self, discount: Discount) -> Self {
        self.discount = discount;
        self
    }

    fn mobile(&self) -> Option<&str> {
        trimmed(self.customer_mobile.as_deref())
    }

    fn name(&self) -> Option<&str> {
        trimmed(self.customer_name.as_deref())
    }

    /// Checks everything that needs no database. Returns the quantity.
    fn validate(&self) -> SaleResult<u32> {
        if self.product_id.trim().is_empty() {
            return Err(ValidationError::required("product id").into());
        }

        let quantity = units(self.quantity)?;

        if let Some(mobile) = self.mobile() {
            validate_mobile(mobile)?;
        }
        if let Some(name) = self.name() {
            validate_customer_name(name)?;
        }

        match self.discount {
            Discount::Flat(amount) if amount.is_negative() => {
                return Err(ValidationError::MustNotBeNegative {
                    field: "discount".to_string(),
                }
                .into());
            }
            Discount::Percentage(rate) => validate_percent("discount", rate)?,
            _ => {}
        }

        Ok(quantity)
    }
}

fn trimmed(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn units(quantity: i64) -> SaleResult<u32> {
    validate_quantity(quantity)?;
    u32::try_from(quantity).map_err(|_| {
        ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into()
    })
}

/// A committed sale with the rows it changed, as they are after the commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedSale {
    pub sale: Sale,
    pub product: Product,
    pub customer: Option<Customer>,
}

/// A deleted sale with the rows its reversal restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversedSale {
    pub sale: Sale,
    pub product: Product,
    pub customer: Option<Customer>,
}

// =============================================================================
// Service
// =============================================================================

/// Records and deletes sales.
#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
    timeout: Duration,
}

impl SaleService {
    pub fn new(db: Database, timeout: Duration) -> Self {
        SaleService { db, timeout }
    }

    pub fn from_config(db: Database, config: &AppConfig) -> Self {
        SaleService::new(db, config.operation_timeout())
    }

    /// Prices a sale against the stored product without writing anything.
    pub async fn preview(
        &self,
        product_id: &str,
        quantity: i64,
        discount: Discount,
    ) -> SaleResult<SaleBreakdown> {
        let quantity = units(quantity)?;
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| SaleError::not_found("Product", product_id))?;

        price(&product, quantity, discount)
    }

    /// Records a sale.
    ///
    /// ## Errors
    /// * `Validation` - bad input, inactive product, discount above subtotal
    /// * `NotFound` - no such product
    /// * `InsufficientStock` - the size has fewer units than requested
    /// * `Persistence` / `Timeout` - rolled back, nothing recorded
    pub async fn record_sale(&self, request: NewSaleRequest) -> SaleResult<RecordedSale> {
        let product_id = request.product_id.clone();
        let result = match self.bounded(self.record(request)).await {
            Ok((tx, recorded)) => commit(tx).await.map(|()| recorded),
            Err(e) => Err(e),
        };

        match &result {
            Ok(recorded) => {
                let sale = &recorded.sale;
                enter(SaleStage::Done, &sale.id);
                info!(
                    sale_id = %sale.id,
                    sku = %recorded.product.sku,
                    size = %sale.size,
                    quantity = sale.quantity,
                    sale_amount = %sale.sale_amount,
                    charity = %sale.charity_amount,
                    "Sale recorded"
                );
            }
            Err(e) => {
                warn!(product_id = %product_id, code = e.code(), error = %e, "Sale rejected");
            }
        }
        result
    }

    /// Deletes a sale and reverses its effect on stock and customer totals.
    ///
    /// ## Errors
    /// * `NotFound` - the sale, its product or its customer is missing
    /// * `Persistence` / `Timeout` - rolled back, nothing changed
    pub async fn delete_sale(&self, sale_id: &str) -> SaleResult<ReversedSale> {
        let result = match self.bounded(self.reverse(sale_id)).await {
            Ok((tx, reversed)) => commit(tx).await.map(|()| reversed),
            Err(e) => Err(e),
        };

        match &result {
            Ok(reversed) => {
                enter(SaleStage::Done, sale_id);
                info!(
                    sale_id = %reversed.sale.id,
                    sku = %reversed.product.sku,
                    size = %reversed.sale.size,
                    quantity = reversed.sale.quantity,
                    "Sale deleted"
                );
            }
            Err(e) => {
                warn!(sale_id = %sale_id, code = e.code(), error = %e, "Sale deletion rejected");
            }
        }
        result
    }

    /// Runs `operation` under the configured deadline. A timed-out
    /// operation drops its transaction uncommitted.
    async fn bounded<T>(&self, operation: impl Future<Output = SaleResult<T>>) -> SaleResult<T> {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(SaleError::Timeout(self.timeout)),
        }
    }

    async fn record(&self, request: NewSaleRequest) -> SaleResult<Staged<RecordedSale>> {
        enter(SaleStage::Validating, &request.product_id);
        let quantity = request.validate()?;

        let product = self
            .db
            .products()
            .get_by_id(&request.product_id)
            .await?
            .ok_or_else(|| SaleError::not_found("Product", &request.product_id))?;
        product.check_sellable(request.size, quantity)?;

        enter(SaleStage::Pricing, &product.id);
        price(&product, quantity, request.discount)?;

        let mut tx = self.db.begin().await?;

        enter(SaleStage::PersistingInventory, &product.id);
        let taken =
            ProductRepository::decrement_stock_in(&mut *tx, &product.id, request.size, quantity)
                .await?;
        let current = ProductRepository::get_in(&mut *tx, &product.id)
            .await?
            .ok_or_else(|| SaleError::not_found("Product", &product.id))?;
        if !taken {
            return Err(current.shortage(request.size, quantity).into());
        }
        current.ensure_active()?;
        let breakdown = price(&current, quantity, request.discount)?;

        enter(SaleStage::PersistingSale, &product.id);
        let customer_id = match request.mobile() {
            Some(mobile) => Some(resolve_customer(&mut *tx, mobile, request.name()).await?.id),
            None => None,
        };

        let now = Utc::now();
        let sale = Sale {
            id: new_id(),
            product_id: current.id.clone(),
            customer_id,
            quantity,
            size: request.size,
            payment_mode: request.payment_mode,
            sale_mode: request.sale_mode,
            unit_price: breakdown.unit_price,
            subtotal: breakdown.subtotal,
            discount_amount: breakdown.discount_amount,
            sale_amount: breakdown.sale_amount,
            cost_amount: breakdown.cost_amount,
            profit: breakdown.profit,
            charity_percentage: breakdown.charity_percentage,
            charity_amount: breakdown.charity_amount,
            created_by: request.created_by.clone(),
            sale_date: request.sale_date.unwrap_or(now),
            created_at: now,
        };
        SaleRepository::insert_in(&mut *tx, &sale).await?;

        enter(SaleStage::PersistingCustomer, &sale.id);
        let customer = match &sale.customer_id {
            Some(id) => {
                let delta = LedgerDelta::for_sale(&sale);
                if !CustomerRepository::apply_delta_in(&mut *tx, id, delta).await? {
                    return Err(SaleError::not_found("Customer", id));
                }
                CustomerRepository::get_in(&mut *tx, id).await?
            }
            None => None,
        };

        Ok((
            tx,
            RecordedSale {
                sale,
                product: current,
                customer,
            },
        ))
    }

    async fn reverse(&self, sale_id: &str) -> SaleResult<Staged<ReversedSale>> {
        enter(SaleStage::Reversing, sale_id);
        if sale_id.trim().is_empty() {
            return Err(ValidationError::required("sale id").into());
        }

        let before = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| SaleError::not_found("Sale", sale_id))?;

        let mut tx = self.db.begin().await?;

        if !ProductRepository::increment_stock_in(
            &mut *tx,
            &before.product_id,
            before.size,
            before.quantity,
        )
        .await?
        {
            return Err(SaleError::not_found("Product", &before.product_id));
        }

        // Gone if another deletion committed after the read above.
        let sale = SaleRepository::get_in(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| SaleError::not_found("Sale", sale_id))?;

        let customer = match &sale.customer_id {
            Some(id) => {
                let delta = LedgerDelta::for_sale(&sale).reversed();
                if !CustomerRepository::apply_delta_in(&mut *tx, id, delta).await? {
                    return Err(SaleError::not_found("Customer", id));
                }
                CustomerRepository::get_in(&mut *tx, id).await?
            }
            None => None,
        };

        if !SaleRepository::delete_in(&mut *tx, sale_id).await? {
            return Err(SaleError::not_found("Sale", sale_id));
        }

        let product = ProductRepository::get_in(&mut *tx, &sale.product_id)
            .await?
            .ok_or_else(|| SaleError::not_found("Product", &sale.product_id))?;

        Ok((
            tx,
            ReversedSale {
                sale,
                product,
                customer,
            },
        ))
    }
}

fn price(product: &Product, quantity: u32, discount: Discount) -> SaleResult<SaleBreakdown> {
    Ok(pricing::compute(&PricingInput {
        unit_price: product.selling_price,
        cost_price: product.cost_price,
        quantity,
        discount,
        charity_percentage: product.charity_percentage,
    })?)
}

/// Finds the customer with `mobile`, creating one if no one has it yet.
async fn resolve_customer(
    conn: &mut sqlx::SqliteConnection,
    mobile: &str,
    name: Option<&str>,
) -> SaleResult<Customer> {
    if let Some(existing) = CustomerRepository::find_by_mobile_in(conn, mobile).await? {
        return Ok(existing);
    }

    let customer = CustomerRepository::create_in(
        conn,
        NewCustomer {
            name: name.unwrap_or(WALK_IN_CUSTOMER_NAME).to_string(),
            mobile: mobile.to_string(),
            email: None,
        },
    )
    .await?;
    Ok(customer)
}

// =============================================================================
// Unit Tests
// =============================================================================
