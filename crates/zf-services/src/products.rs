//! # Products Provider
//!
//! Live view of the product catalog, plus the sync that copies product names
//! found in orders into the catalog.
//!
//! ## Sync From Orders
//! ```text
//! orders[*].products[*].name
//!         │
//!         ├── in catalog snapshot? ──yes──► skip
//!         ├── already queued? ───────yes──► skip
//!         └── queue set(products/{new id}) and remember the name
//!                         │
//!                         ▼
//!            one WriteBatch, committed atomically
//! ```
//! Names are compared exactly (case-sensitive, untrimmed apart from
//! skipping blank names). The comparison is against the last received
//! catalog snapshot, so two sessions syncing at once can both insert the
//! same name.

use std::collections::HashSet;

use serde_json::json;
use tracing::{debug, info};
use zf_core::{NewProduct, Order, Product};
use zf_core::validation::validate_new_product;
use zf_store::{
    to_fields, watch_collection, CollectionSubscription, Direction, FieldValue, Query,
    WriteBatch, WriteTicket,
};

use crate::context::{collection, doc, AppContext, PRODUCTS};
use crate::error::ServiceResult;

pub struct ProductsProvider {
    ctx: AppContext,
    products: CollectionSubscription<Product>,
}

impl ProductsProvider {
    pub fn new(ctx: &AppContext) -> ServiceResult<Self> {
        let query = match ctx.session() {
            Some(_) => Some(
                Query::new(collection(PRODUCTS)?).order_by("name", Direction::Ascending),
            ),
            None => None,
        };
        Ok(ProductsProvider {
            ctx: ctx.clone(),
            products: watch_collection(ctx.store(), ctx.errors(), query),
        })
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.data()
    }

    pub fn loading(&self) -> bool {
        self.products.loading()
    }

    pub fn subscription(&self) -> &CollectionSubscription<Product> {
        &self.products
    }

    pub fn get_product_by_id(&self, id: &str) -> Option<Product> {
        self.products.data().into_iter().find(|p| p.id == id)
    }

    /// Adds a catalog entry without waiting for the write.
    pub fn add_product(&self, product: NewProduct) -> ServiceResult<String> {
        self.ctx.require_session()?;
        validate_new_product(&product)?;

        let mut fields = to_fields(&product)?;
        fields.insert("createdAt".to_string(), FieldValue::server_timestamp());

        let (path, _ticket) = self
            .ctx
            .writer()
            .add_document(&collection(PRODUCTS)?, fields);
        debug!(product_id = %path.id(), name = %product.name, "Product added");
        Ok(path.id().to_string())
    }

    pub fn delete_product(&self, id: &str) -> ServiceResult<WriteTicket> {
        self.ctx.require_session()?;
        Ok(self.ctx.writer().delete_document(doc(PRODUCTS, id)?))
    }

    /// Inserts every product name used in `orders` that the catalog lacks.
    ///
    /// Waits for the first catalog snapshot, then commits all inserts in one
    /// batch. Returns how many entries were inserted; with nothing to insert
    /// no batch is committed.
    ///
    /// ## Errors
    /// `Store` when the batch is rejected. Nothing is inserted in that case.
    pub async fn sync_products_from_orders(&self, orders: &[Order]) -> ServiceResult<usize> {
        self.ctx.require_session()?;
        let catalog = self.products.ready().await.data;
        let known: HashSet<&str> = catalog.iter().map(|p| p.name.as_str()).collect();

        let products = collection(PRODUCTS)?;
        let mut queued: HashSet<&str> = HashSet::new();
        let mut batch = WriteBatch::new();

        for order in orders {
            for item in &order.products {
                let name = item.name.as_str();
                if name.trim().is_empty() || known.contains(name) || !queued.insert(name) {
                    continue;
                }

                let product = NewProduct {
                    name: item.name.clone(),
                    category: item.category.clone(),
                    attachments: item.attachments.clone(),
                    source_order_id: Some(order.id.clone()),
                };
                let mut fields = to_fields(&product)?;
                fields.insert("createdAt".to_string(), FieldValue::server_timestamp());
                batch.set(products.new_doc(), fields);
            }
        }

        let inserted = batch.len();
        if inserted == 0 {
            debug!(orders = orders.len(), "Catalog already up to date");
            return Ok(0);
        }

        self.ctx.store().commit(batch).await?;
        info!(inserted, orders = orders.len(), "Products synced from orders");
        Ok(inserted)
    }
}
