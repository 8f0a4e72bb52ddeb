//! # Customers Provider
//!
//! Live view of `customers`. Creating a customer is awaited (the form
//! navigates to the new record), everything else is fire-and-forget.

use serde_json::json;
use tracing::info;
use zf_core::{Customer, CustomerUpdate, NewCustomer, Review, ValidationError};
use zf_core::validation::{
    validate_email, validate_new_customer, validate_phone, validate_review, validate_text,
};
use zf_store::{
    to_fields, watch_collection, CollectionSubscription, Direction, FieldValue, Fields, Query,
    StoreError, WriteTicket,
};

use crate::context::{collection, doc, AppContext, CUSTOMERS};
use crate::error::ServiceResult;

pub struct CustomersProvider {
    ctx: AppContext,
    customers: CollectionSubscription<Customer>,
}

impl CustomersProvider {
    pub fn new(ctx: &AppContext) -> ServiceResult<Self> {
        let query = match ctx.session() {
            Some(_) => Some(
                Query::new(collection(CUSTOMERS)?).order_by("name", Direction::Ascending),
            ),
            None => None,
        };
        Ok(CustomersProvider {
            ctx: ctx.clone(),
            customers: watch_collection(ctx.store(), ctx.errors(), query),
        })
    }

    /// Last received snapshot, sorted by name.
    pub fn customers(&self) -> Vec<Customer> {
        self.customers.data()
    }

    pub fn loading(&self) -> bool {
        self.customers.loading()
    }

    pub fn subscription(&self) -> &CollectionSubscription<Customer> {
        &self.customers
    }

    pub fn get_customer_by_id(&self, id: &str) -> Option<Customer> {
        self.customers.data().into_iter().find(|c| c.id == id)
    }

    /// Creates a customer and waits for the store to accept it.
    ///
    /// ## Errors
    /// - `Validation` for a bad name, phone or email
    /// - `Store` when the write is rejected
    pub async fn add_customer(&self, customer: NewCustomer) -> ServiceResult<String> {
        let session = self.ctx.require_session()?;
        validate_new_customer(&customer)?;

        let mut fields = to_fields(&customer)?;
        fields.insert("ownerId".to_string(), json!(session.uid));
        fields.insert("orderIds".to_string(), json!([]));
        fields.insert("reviews".to_string(), json!([]));
        fields.insert("createdAt".to_string(), FieldValue::server_timestamp());

        let path = self
            .ctx
            .store()
            .add(&collection(CUSTOMERS)?, fields)
            .await?;
        info!(customer_id = %path.id(), name = %customer.name, "Customer created");
        Ok(path.id().to_string())
    }

    pub fn update_customer(&self, id: &str, update: CustomerUpdate) -> ServiceResult<WriteTicket> {
        self.ctx.require_session()?;
        if update == CustomerUpdate::default() {
            return Err(ValidationError::Required {
                field: "update".to_string(),
            }
            .into());
        }
        if let Some(name) = &update.name {
            validate_text("name", name, 120)?;
        }
        if let Some(phone) = &update.phone {
            validate_phone(phone)?;
        }
        if let Some(email) = update.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email(email)?;
        }

        Ok(self
            .ctx
            .writer()
            .update_document(doc(CUSTOMERS, id)?, to_fields(&update)?))
    }

    /// Records that `order_id` belongs to the customer. Linking twice is a
    /// no-op.
    pub fn link_order(&self, customer_id: &str, order_id: &str) -> ServiceResult<WriteTicket> {
        self.ctx.require_session()?;
        let mut fields = Fields::new();
        fields.insert("orderIds".to_string(), FieldValue::array_union([order_id]));
        Ok(self
            .ctx
            .writer()
            .update_document(doc(CUSTOMERS, customer_id)?, fields))
    }

    pub fn add_review(&self, customer_id: &str, review: Review) -> ServiceResult<WriteTicket> {
        self.ctx.require_session()?;
        validate_review(&review)?;

        let value = serde_json::to_value(&review).map_err(StoreError::from)?;
        let mut fields = Fields::new();
        fields.insert("reviews".to_string(), FieldValue::array_union([value]));
        Ok(self
            .ctx
            .writer()
            .update_document(doc(CUSTOMERS, customer_id)?, fields))
    }
}
