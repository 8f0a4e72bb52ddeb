//! # zf-seed
//!
//! Fills a development database with the default settings, a couple of
//! customers and orders, and the catalog entries synced from those orders.
//!
//! ```text
//! ZF_DB_PATH=./dev.db RUST_LOG=debug cargo run -p zf-services --bin zf-seed
//! ```
//!
//! Re-running against a seeded database only adds what is missing.

use std::error::Error;

use tokio::sync::watch;
use tracing::info;
use zf_core::{Money, NewCustomer, NewOrder, OrderProduct, UserRole};
use zf_services::telemetry::init_tracing;
use zf_services::{
    AppContext, ColorSettings, CustomersProvider, OrdersProvider, ProductSettings,
    ProductsProvider, Session, UsersProvider,
};
use zf_store::{ErrorReporting, QueryState, StoreConfig};

const DEFAULT_DB: &str = "zf-ops.db";
const SEED_UID: &str = "seed-admin";

async fn settled<T: Clone>(
    mut rx: watch::Receiver<QueryState<T>>,
    done: impl FnMut(&QueryState<T>) -> bool,
) -> QueryState<T> {
    let settled = rx.wait_for(done).await.map(|state| state.clone());
    match settled {
        Ok(state) => state,
        Err(_) => rx.borrow().clone(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let config = StoreConfig::new(DEFAULT_DB).with_env_overrides();
    info!(path = %config.database_path.display(), "Seeding database");

    let ctx = AppContext::open(config)
        .await?
        .with_session(Some(Session::new(SEED_UID, UserRole::Admin)));
    let _listener = ctx.spawn_error_listener(ErrorReporting::from_env());

    // Profile
    let users = UsersProvider::new(&ctx)?;
    users.current_subscription().ready().await;
    if users.current_user().is_none() {
        users.create_profile("admin@zf.example", "Seed Admin").await?;
    }

    // Settings seed themselves on first load
    let categories = ProductSettings::new(&ctx)?;
    let colors = ColorSettings::new(&ctx)?;
    settled(categories.subscription().watch(), |s| {
        s.data.is_some() || s.error.is_some()
    })
    .await;
    settled(colors.subscription().watch(), |s| {
        s.data.is_some() || s.error.is_some()
    })
    .await;

    // Customers and orders
    let customers = CustomersProvider::new(&ctx)?;
    let orders = OrdersProvider::new(&ctx)?;
    customers.subscription().ready().await;
    orders.subscription().ready().await;

    let existing = orders.orders().len();
    let mut added = 0;
    if customers.customers().is_empty() {
        let ayla = customers
            .add_customer(NewCustomer {
                name: "Ayla Demir".to_string(),
                phone: "+90 555 123 4567".to_string(),
                email: Some("ayla@example.com".to_string()),
                address: Some("Kadikoy, Istanbul".to_string()),
            })
            .await?;
        let order_id = orders.add_order(NewOrder {
            customer_id: ayla.clone(),
            customer_name: "Ayla Demir".to_string(),
            income_amount: Money::new(15_000),
            prepaid_amount: Money::new(7_500),
            products: vec![
                line("Corner Sofa", "Sofa", 1),
                line("Coffee Table", "Table", 1),
            ],
            colors: vec!["Walnut".to_string()],
            ..Default::default()
        })?;
        customers.link_order(&ayla, &order_id)?.wait().await;
        added += 1;

        let kerem = customers
            .add_customer(NewCustomer {
                name: "Kerem Aksoy".to_string(),
                phone: "+90 555 765 4321".to_string(),
                ..Default::default()
            })
            .await?;
        let order_id = orders.add_order(NewOrder {
            customer_id: kerem.clone(),
            customer_name: "Kerem Aksoy".to_string(),
            income_amount: Money::new(9_800),
            products: vec![
                line("Oak Wardrobe", "Wardrobe", 1),
                line("Coffee Table", "Table", 2),
            ],
            ..Default::default()
        })?;
        customers.link_order(&kerem, &order_id)?.wait().await;
        added += 1;
    }

    let snapshot = settled(orders.subscription().watch(), |s| {
        !s.loading && s.data.len() >= existing + added
    })
    .await;

    // Catalog
    let products = ProductsProvider::new(&ctx)?;
    let inserted = products.sync_products_from_orders(&snapshot.data).await?;

    info!(
        orders = snapshot.data.len(),
        customers = customers.customers().len(),
        categories = categories.categories().len(),
        colors = colors.colors().len(),
        products_inserted = inserted,
        "Seed complete"
    );
    ctx.store().close().await;
    Ok(())
}

fn line(name: &str, category: &str, quantity: u32) -> OrderProduct {
    OrderProduct {
        name: name.to_string(),
        category: category.to_string(),
        quantity,
        attachments: vec![],
    }
}
