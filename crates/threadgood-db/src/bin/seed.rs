//! # Seed Data Generator
//!
//! Populates a database with sample garments, customers, expenses and sales
//! for development.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database (threadgood.toml / THREADGOOD_DB_PATH)
//! cargo run -p threadgood-db --bin seed
//!
//! # Seed a specific file
//! cargo run -p threadgood-db --bin seed -- --db ./data/threadgood.db
//! ```
//!
//! Sales go through `SaleService`, so stock and customer totals end up
//! exactly as if the sales had been rung up at the till.

use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use std::env;
use std::path::PathBuf;
use tracing::info;

use threadgood_core::pricing::Discount;
use threadgood_core::{
    ExpenseCategory, Money, PaymentMode, Percent, ProductCategory, SaleMode, Size, SizeStock,
};
use threadgood_db::{
    init_tracing, AppConfig, Database, NewExpense, NewProduct, NewSaleRequest, ReportService,
    SaleService,
};

/// (sku, name, category, cost, price, charity %)
const GARMENTS: &[(&str, &str, ProductCategory, i64, i64, u32)] = &[
    ("SH-OXF", "Oxford Shirt", ProductCategory::Shirt, 650, 1499, 10),
    ("SH-LIN", "Linen Shirt", ProductCategory::Shirt, 800, 1799, 10),
    ("TS-ORG", "Organic Cotton Tee", ProductCategory::TShirt, 220, 599, 15),
    ("TS-GRA", "Graphic Tee", ProductCategory::TShirt, 250, 699, 15),
    ("HD-OVR", "Oversized Hoodie", ProductCategory::Hoodie, 500, 999, 10),
    ("HD-ZIP", "Zip Hoodie", ProductCategory::Hoodie, 700, 1599, 12),
    ("PT-CHN", "Chinos", ProductCategory::Pants, 600, 1299, 8),
    ("PT-JGR", "Joggers", ProductCategory::Pants, 450, 999, 8),
    ("AC-CAP", "Canvas Cap", ProductCategory::Accessory, 120, 349, 20),
    ("AC-TOT", "Tote Bag", ProductCategory::Accessory, 90, 299, 25),
];

/// (name, mobile)
const CUSTOMERS: &[(&str, &str)] = &[
    ("Asha Rao", "9876543210"),
    ("Vikram Mehta", "9823456701"),
    ("Neha Kulkarni", "9811122233"),
    ("Rahul Iyer", "9900011122"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                let Some(path) = args.get(i + 1) else {
                    bail!("--db needs a path");
                };
                db_path = Some(PathBuf::from(path));
                i += 1;
            }
            "--help" | "-h" => {
                println!("Threadgood Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: from threadgood.toml)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => bail!("Unknown argument: {other}"),
        }
        i += 1;
    }

    let mut config = AppConfig::load(None).context("loading configuration")?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🌱 {} Seed Data Generator", config.store.name);
    println!("=================================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config())
        .await
        .context("opening database")?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut products = Vec::with_capacity(GARMENTS.len());
    for (idx, (sku, name, category, cost, price, charity)) in GARMENTS.iter().enumerate() {
        let base = 4 + (idx as u32 * 3) % 9;
        let product = db
            .products()
            .create(NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                category: *category,
                cost_price: Money::from_major(*cost),
                selling_price: Money::from_major(*price),
                charity_percentage: Percent::from_whole(*charity),
                stock: SizeStock::new(base + 2, base + 4, base, base.saturating_sub(3)),
            })
            .await
            .with_context(|| format!("creating product {sku}"))?;
        products.push(product);
    }
    println!("✓ Created {} products", products.len());

    let sales = SaleService::from_config(db.clone(), &config);
    let now = Utc::now();
    let mut recorded = 0;

    for n in 0..40usize {
        let product = &products[(n * 7) % products.len()];
        let size = Size::ALL[n % Size::ALL.len()];
        let mut request = NewSaleRequest::new(&product.id, size, 1 + (n % 2) as i64);

        if n % 3 != 0 {
            let (name, mobile) = CUSTOMERS[n % CUSTOMERS.len()];
            request = request.customer(mobile, Some(name));
        }
        if n % 5 == 0 {
            request = request.discount(Discount::Percentage(Percent::from_whole(10)));
        }
        request.payment_mode = [PaymentMode::Cash, PaymentMode::Upi, PaymentMode::Card][n % 3];
        request.sale_mode = if n % 4 == 0 { SaleMode::Online } else { SaleMode::Offline };
        request.sale_date = Some(now - Duration::days((n * 2) as i64));

        // Sizes that ran out are skipped rather than failing the seed.
        match sales.record_sale(request).await {
            Ok(_) => recorded += 1,
            Err(e) => info!(sku = %product.sku, size = %size, error = %e, "Skipped sample sale"),
        }
    }
    println!("✓ Recorded {} sales", recorded);

    let expenses = [
        (ExpenseCategory::Fabric, 18_000, 3, "Organic cotton, 40 m"),
        (ExpenseCategory::Stitching, 9_500, 10, "Batch of 60 tees"),
        (ExpenseCategory::Marketing, 4_000, 20, "Instagram promotion"),
        (ExpenseCategory::Logistics, 1_200, 35, "Courier pickups"),
        (ExpenseCategory::Misc, 650, 50, "Packing tape and tags"),
    ];
    for (category, amount, days_ago, notes) in expenses {
        db.expenses()
            .create(NewExpense {
                category,
                amount: Money::from_major(amount),
                expense_date: (now - Duration::days(days_ago)).date_naive(),
                notes: Some(notes.to_string()),
                created_by: None,
            })
            .await
            .context("creating expense")?;
    }
    println!("✓ Recorded {} expenses", expenses.len());

    let reports = ReportService::from_config(db.clone(), &config);
    let summary = reports.financial_summary(None).await?;
    let alerts = reports.stock_alerts().await?;
    println!();
    println!("  Revenue:  {}", config.format_money(summary.revenue));
    println!("  Expenses: {}", config.format_money(summary.expenses));
    println!("  Charity:  {}", config.format_money(summary.charity));
    println!(
        "  Stock:    {} out of stock, {} running low",
        alerts.out_of_stock.len(),
        alerts.low_stock.len()
    );

    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    Ok(())
}
