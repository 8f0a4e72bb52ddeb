//! # Orders Provider
//!
//! Live view of the `orders` collection plus the order mutations.
//!
//! ## Visibility
//! Admins and managers follow every order; everyone else follows only the
//! orders they own (`ownerId == uid`). Without a session the subscription
//! has no reference: it is idle and empty and never touches the store.
//!
//! ## Write Path
//! ```text
//! add_order(NewOrder)
//!     │ validate ─── ValidationError ──► caller
//!     │ + ownerId (session) + createdAt (server) + status Pending
//!     ▼
//! NonBlockingWriter::add_document ──► id returned at once
//!     │
//!     └── commit ──► change feed ──► subscription refetch ──► orders()
//!                └─ failure ──► ErrorChannel (never the caller)
//! ```

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use zf_core::{
    Attachment, ChatMessage, FileRemover, NewOrder, Order, OrderStatus, OrderUpdate,
    ValidationError,
};
use zf_core::validation::{
    validate_amount, validate_new_order, validate_order_product, validate_text,
};
use zf_flows::{
    generate_chat_reply, predict_order_status, ChatReplyInput, PredictStatusInput,
    PredictStatusOutput, TextModel,
};
use zf_store::{
    to_fields, watch_collection, CollectionSubscription, Direction, FieldValue, Fields, Query,
    WriteTicket,
};

use crate::context::{collection, doc, AppContext, Session, ORDERS};
use crate::error::{ServiceError, ServiceResult};

const MAX_MESSAGE_LEN: usize = 2000;

/// Author fields stamped on replies drafted by the chat flow.
pub const ASSISTANT_ID: &str = "assistant";
pub const ASSISTANT_NAME: &str = "ZF Assistant";

pub struct OrdersProvider {
    ctx: AppContext,
    orders: CollectionSubscription<Order>,
}

impl OrdersProvider {
    pub fn new(ctx: &AppContext) -> ServiceResult<Self> {
        let query = orders_query(ctx.session())?;
        let orders = watch_collection(ctx.store(), ctx.errors(), query);
        Ok(OrdersProvider {
            ctx: ctx.clone(),
            orders,
        })
    }

    /// Last received snapshot, newest first.
    pub fn orders(&self) -> Vec<Order> {
        self.orders.data()
    }

    pub fn loading(&self) -> bool {
        self.orders.loading()
    }

    pub fn subscription(&self) -> &CollectionSubscription<Order> {
        &self.orders
    }

    /// Looks `id` up in the last snapshot.
    ///
    /// `None` means "not found or still loading"; check [`Self::loading`].
    pub fn get_order_by_id(&self, id: &str) -> Option<Order> {
        self.orders.data().into_iter().find(|order| order.id == id)
    }

    /// Creates an order and returns its id without waiting for the write.
    ///
    /// ## Errors
    /// - `Unauthenticated` without a session
    /// - `Validation` when the form is invalid
    pub fn add_order(&self, order: NewOrder) -> ServiceResult<String> {
        let session = self.ctx.require_session()?;
        validate_new_order(&order)?;

        let mut fields = to_fields(&order)?;
        fields.insert("ownerId".to_string(), json!(session.uid));
        fields.insert("status".to_string(), json!(OrderStatus::Pending));
        fields.insert("messages".to_string(), json!([]));
        fields.insert("createdAt".to_string(), FieldValue::server_timestamp());

        let (path, _ticket) = self
            .ctx
            .writer()
            .add_document(&collection(ORDERS)?, fields);
        info!(order_id = %path.id(), customer = %order.customer_name, "Order created");
        Ok(path.id().to_string())
    }

    /// Writes the `Some` fields of `update`.
    ///
    /// When the order is in the snapshot, the new prepaid amount is checked
    /// against the total it would end up with.
    pub fn update_order(&self, id: &str, update: OrderUpdate) -> ServiceResult<WriteTicket> {
        self.ctx.require_session()?;
        if update.is_empty() {
            return Err(ValidationError::Required {
                field: "update".to_string(),
            }
            .into());
        }
        validate_update(&update, self.get_order_by_id(id).as_ref())?;

        let fields = to_fields(&update)?;
        debug!(order_id = %id, fields = fields.len(), "Updating order");
        Ok(self.ctx.writer().update_document(doc(ORDERS, id)?, fields))
    }

    /// Moves an order along the workflow.
    ///
    /// ## Errors
    /// `InvalidTransition` when the snapshot shows a status the workflow
    /// cannot leave for `status`. Orders not yet in the snapshot are written
    /// without the check.
    pub fn update_status(&self, id: &str, status: OrderStatus) -> ServiceResult<WriteTicket> {
        self.ctx.require_session()?;
        if let Some(order) = self.get_order_by_id(id) {
            if !order.status.can_transition_to(status) {
                return Err(ServiceError::InvalidTransition {
                    order_id: id.to_string(),
                    from: order.status,
                    to: status,
                });
            }
        }

        info!(order_id = %id, %status, "Order status changed");
        Ok(self
            .ctx
            .writer()
            .update_document(doc(ORDERS, id)?, single("status", json!(status))))
    }

    pub fn cancel_order(&self, id: &str) -> ServiceResult<WriteTicket> {
        self.update_status(id, OrderStatus::Cancelled)
    }

    /// Appends a message to the order thread.
    pub fn add_message(&self, id: &str, message: ChatMessage) -> ServiceResult<WriteTicket> {
        self.ctx.require_session()?;
        validate_text("text", &message.text, MAX_MESSAGE_LEN)?;

        let value = serde_json::to_value(&message).map_err(zf_store::StoreError::from)?;
        Ok(self.ctx.writer().update_document(
            doc(ORDERS, id)?,
            single("messages", FieldValue::array_union([value])),
        ))
    }

    /// Removes an attachment from the order, then deletes the file.
    ///
    /// The document edit goes through the writer. The file deletion is
    /// best-effort: a failure is logged and the call still succeeds.
    pub async fn delete_order_attachment(
        &self,
        id: &str,
        attachment: &Attachment,
        remover: &dyn FileRemover,
    ) -> ServiceResult<WriteTicket> {
        self.ctx.require_session()?;
        let value = serde_json::to_value(attachment).map_err(zf_store::StoreError::from)?;
        let ticket = self.ctx.writer().update_document(
            doc(ORDERS, id)?,
            single("attachments", FieldValue::array_remove([value])),
        );

        match remover.remove_attachment(attachment).await {
            Ok(true) => debug!(key = %attachment.key, "Attachment file removed"),
            Ok(false) => debug!(key = %attachment.key, "Attachment lives in another backend"),
            Err(err) => warn!(error = %err, "Attachment file not removed"),
        }
        Ok(ticket)
    }

    // =========================================================================
    // Flow-backed operations
    // =========================================================================

    /// Asks the model for the next status and stores it as `predictedStatus`.
    pub async fn predict_status(
        &self,
        id: &str,
        model: &dyn TextModel,
    ) -> ServiceResult<PredictStatusOutput> {
        self.ctx.require_session()?;
        let order = self
            .get_order_by_id(id)
            .ok_or_else(|| ServiceError::not_found("Order", id))?;

        let input = PredictStatusInput::from_order(&order, Utc::now());
        let output = predict_order_status(model, &input).await?;

        let _ticket = self.ctx.writer().update_document(
            doc(ORDERS, id)?,
            single("predictedStatus", json!(output.predicted_status)),
        );
        Ok(output)
    }

    /// Drafts an assistant reply to `question` and appends it to the thread.
    pub async fn draft_reply(
        &self,
        id: &str,
        question: &str,
        model: &dyn TextModel,
    ) -> ServiceResult<ChatMessage> {
        self.ctx.require_session()?;
        let order = self
            .get_order_by_id(id)
            .ok_or_else(|| ServiceError::not_found("Order", id))?;

        let input = ChatReplyInput::from_order(&order, question);
        let output = generate_chat_reply(model, &input).await?;

        let message = ChatMessage {
            author_id: ASSISTANT_ID.to_string(),
            author_name: ASSISTANT_NAME.to_string(),
            text: output.reply,
            from_assistant: true,
            sent_at: Utc::now(),
        };
        let _ticket = self.add_message(id, message.clone())?;
        Ok(message)
    }
}

fn orders_query(session: Option<&Session>) -> ServiceResult<Option<Query>> {
    let Some(session) = session else {
        return Ok(None);
    };
    let query = Query::new(collection(ORDERS)?).order_by("createdAt", Direction::Descending);
    if session.role.sees_all_orders() {
        Ok(Some(query))
    } else {
        Ok(Some(query.where_eq("ownerId", json!(session.uid))))
    }
}

fn validate_update(update: &OrderUpdate, current: Option<&Order>) -> ServiceResult<()> {
    if let Some(name) = &update.customer_name {
        validate_text("customerName", name, 120)?;
    }
    if let Some(income) = update.income_amount {
        validate_amount("incomeAmount", income)?;
    }
    if let Some(prepaid) = update.prepaid_amount {
        validate_amount("prepaidAmount", prepaid)?;
    }
    if let Some(expense) = update.expense_amount {
        validate_amount("expenseAmount", expense)?;
    }
    if let Some(products) = &update.products {
        products.iter().try_for_each(validate_order_product)?;
    }
    if let Some(notes) = &update.notes {
        if notes.chars().count() > MAX_MESSAGE_LEN {
            return Err(ValidationError::TooLong {
                field: "notes".to_string(),
                max: MAX_MESSAGE_LEN,
            }
            .into());
        }
    }

    let income = update
        .income_amount
        .or_else(|| current.map(|order| order.income_amount));
    let prepaid = update
        .prepaid_amount
        .or_else(|| current.map(|order| order.prepaid_amount));
    if let (Some(income), Some(prepaid)) = (income, prepaid) {
        if prepaid > income {
            return Err(ValidationError::Inconsistent {
                field: "prepaidAmount".to_string(),
                reason: "cannot exceed incomeAmount".to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn single(field: &str, value: Value) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field.to_string(), value);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use zf_core::{
        format_order_id, Money, OrderProduct, PaymentLabel, Receipt, StorageBackend, UserRole,
    };
    use zf_store::{Operation, OwnerOrAdmin};

    use crate::testing::{context, context_with_policy, until, CannedModel, RecordingRemover};

    fn new_order(customer: &str) -> NewOrder {
        NewOrder {
            customer_id: "c1".to_string(),
            customer_name: customer.to_string(),
            income_amount: Money::new(15_000),
            prepaid_amount: Money::new(7_500),
            products: vec![OrderProduct {
                name: "Corner Sofa".to_string(),
                category: "Sofa".to_string(),
                quantity: 1,
                attachments: vec![],
            }],
            ..Default::default()
        }
    }

    fn attachment(key: &str) -> Attachment {
        Attachment {
            name: format!("{key}.pdf"),
            url: format!("https://files.example/{key}"),
            key: key.to_string(),
            storage: StorageBackend::ObjectStorage,
            content_type: Some("application/pdf".to_string()),
        }
    }

    #[tokio::test]
    async fn test_no_session_means_no_reads() {
        let ctx = context("u1", UserRole::Admin).await.with_session(None);
        let provider = OrdersProvider::new(&ctx).unwrap();

        assert!(!provider.loading());
        assert!(provider.orders().is_empty());
        assert_eq!(ctx.store().stats().reads, 0);
        assert!(matches!(
            provider.add_order(new_order("Ayla")),
            Err(ServiceError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_add_order_derives_fields() {
        let ctx = context("u1", UserRole::Sales).await;
        let provider = OrdersProvider::new(&ctx).unwrap();

        let id = provider.add_order(new_order("Ayla")).unwrap();
        let state = until(provider.subscription().watch(), |s| s.data.len() == 1).await;

        let order = &state.data[0];
        assert_eq!(order.id, id);
        assert_eq!(order.owner_id, "u1");
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.created_at.is_some());
        assert_eq!(provider.get_order_by_id(&id).as_ref(), Some(order));

        // Receipt view
        assert_eq!(order.balance_due(), Money::new(7_500));
        assert_eq!(Receipt::for_order(order).label.as_str(), "Balance Due");
        assert_eq!(format_order_id("order-12345"), "#ZF-ORD-12345");
    }

    #[tokio::test]
    async fn test_invalid_order_is_rejected_before_writing() {
        let ctx = context("u1", UserRole::Sales).await;
        let provider = OrdersProvider::new(&ctx).unwrap();

        let mut order = new_order("Ayla");
        order.prepaid_amount = Money::new(20_000);
        let err = provider.add_order(order).unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(ctx.store().stats().writes, 0);
    }

    #[tokio::test]
    async fn test_non_admin_sees_only_own_orders() {
        let admin = context("boss", UserRole::Admin).await;
        let sales = admin.with_session(Some(Session::new("s1", UserRole::Sales)));

        let admin_orders = OrdersProvider::new(&admin).unwrap();
        let sales_orders = OrdersProvider::new(&sales).unwrap();

        admin_orders.add_order(new_order("Boss Customer")).unwrap();
        let mine = sales_orders.add_order(new_order("Sales Customer")).unwrap();

        until(admin_orders.subscription().watch(), |s| s.data.len() == 2).await;
        let state = until(sales_orders.subscription().watch(), |s| {
            s.data.iter().any(|o| o.id == mine)
        })
        .await;
        assert_eq!(state.data.len(), 1);
    }

    #[tokio::test]
    async fn test_status_transitions_are_checked_against_snapshot() {
        let ctx = context("u1", UserRole::Manager).await;
        let provider = OrdersProvider::new(&ctx).unwrap();

        let id = provider.add_order(new_order("Ayla")).unwrap();
        until(provider.subscription().watch(), |s| s.data.len() == 1).await;

        assert!(provider.cancel_order(&id).unwrap().wait().await);
        until(provider.subscription().watch(), |s| {
            s.data.first().map(|o| o.status) == Some(OrderStatus::Cancelled)
        })
        .await;

        let err = provider
            .update_status(&id, OrderStatus::InProgress)
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::InProgress,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_update_checks_prepaid_against_snapshot_total() {
        let ctx = context("u1", UserRole::Manager).await;
        let provider = OrdersProvider::new(&ctx).unwrap();

        let id = provider.add_order(new_order("Ayla")).unwrap();
        until(provider.subscription().watch(), |s| s.data.len() == 1).await;

        let too_much = OrderUpdate {
            prepaid_amount: Some(Money::new(16_000)),
            ..Default::default()
        };
        assert!(matches!(
            provider.update_order(&id, too_much),
            Err(ServiceError::Validation(ValidationError::Inconsistent { .. }))
        ));
        assert!(matches!(
            provider.update_order(&id, OrderUpdate::default()),
            Err(ServiceError::Validation(ValidationError::Required { .. }))
        ));

        let paid = OrderUpdate {
            prepaid_amount: Some(Money::new(15_000)),
            ..Default::default()
        };
        assert!(provider.update_order(&id, paid).unwrap().wait().await);
        let state = until(provider.subscription().watch(), |s| {
            s.data[0].prepaid_amount == Money::new(15_000)
        })
        .await;
        assert_eq!(Receipt::for_order(&state.data[0]).label, PaymentLabel::PaidInFull);
    }

    #[tokio::test]
    async fn test_failed_write_routes_to_error_channel() {
        let owner = context_with_policy("owner", UserRole::Sales, Arc::new(OwnerOrAdmin)).await;
        let other = owner.with_session(Some(Session::new("other", UserRole::Sales)));

        let provider = OrdersProvider::new(&owner).unwrap();
        let id = provider.add_order(new_order("Ayla")).unwrap();
        until(provider.subscription().watch(), |s| s.data.len() == 1).await;

        let mut errors = other.errors().subscribe();
        let theirs = OrdersProvider::new(&other).unwrap();
        // Not in the other user's snapshot, so no transition check applies
        let ticket = theirs.update_status(&id, OrderStatus::Designing).unwrap();

        assert!(!ticket.wait().await);
        let err = errors.recv().await.unwrap();
        assert_eq!(err.operation, Operation::Update);
        assert_eq!(err.path, format!("orders/{id}"));
    }

    #[tokio::test]
    async fn test_add_message_appends() {
        let ctx = context("u1", UserRole::Manager).await;
        let provider = OrdersProvider::new(&ctx).unwrap();
        let id = provider.add_order(new_order("Ayla")).unwrap();
        until(provider.subscription().watch(), |s| s.data.len() == 1).await;

        let message = ChatMessage {
            author_id: "u1".to_string(),
            author_name: "Deniz".to_string(),
            text: "Fabric samples arrived".to_string(),
            from_assistant: false,
            sent_at: Utc::now(),
        };
        assert!(provider.add_message(&id, message.clone()).unwrap().wait().await);

        let state = until(provider.subscription().watch(), |s| {
            s.data[0].messages.len() == 1
        })
        .await;
        assert_eq!(state.data[0].messages[0], message);

        let blank = ChatMessage {
            text: "  ".to_string(),
            ..message
        };
        assert!(provider.add_message(&id, blank).is_err());
    }

    #[tokio::test]
    async fn test_delete_attachment_swallows_remote_failure() {
        let ctx = context("u1", UserRole::Manager).await;
        let provider = OrdersProvider::new(&ctx).unwrap();

        let mut order = new_order("Ayla");
        order.attachments = vec![attachment("plan"), attachment("photo")];
        let id = provider.add_order(order).unwrap();
        until(provider.subscription().watch(), |s| s.data.len() == 1).await;

        let failing = RecordingRemover::new(true);
        let ticket = provider
            .delete_order_attachment(&id, &attachment("plan"), &failing)
            .await
            .unwrap();
        assert!(ticket.wait().await);

        let state = until(provider.subscription().watch(), |s| {
            s.data[0].attachments.len() == 1
        })
        .await;
        assert_eq!(state.data[0].attachments[0].key, "photo");

        let working = RecordingRemover::new(false);
        provider
            .delete_order_attachment(&id, &attachment("photo"), &working)
            .await
            .unwrap();
        assert_eq!(*working.removed.lock().unwrap(), vec!["photo".to_string()]);
    }

    #[tokio::test]
    async fn test_predict_status_writes_suggestion_back() {
        let ctx = context("u1", UserRole::Manager).await;
        let provider = OrdersProvider::new(&ctx).unwrap();
        let id = provider.add_order(new_order("Ayla")).unwrap();
        until(provider.subscription().watch(), |s| s.data.len() == 1).await;

        let model = CannedModel(
            r#"{"predictedStatus":"Designing","confidence":0.8,"reasoning":"Fabric chosen"}"#
                .to_string(),
        );
        let output = provider.predict_status(&id, &model).await.unwrap();
        assert_eq!(output.predicted_status, OrderStatus::Designing);

        until(provider.subscription().watch(), |s| {
            s.data[0].predicted_status == Some(OrderStatus::Designing)
        })
        .await;

        let missing = provider.predict_status("nope", &model).await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound { kind: "Order", .. }));
    }

    #[tokio::test]
    async fn test_draft_reply_appends_assistant_message() {
        let ctx = context("u1", UserRole::Manager).await;
        let provider = OrdersProvider::new(&ctx).unwrap();
        let id = provider.add_order(new_order("Ayla")).unwrap();
        until(provider.subscription().watch(), |s| s.data.len() == 1).await;

        let model = CannedModel(r#"{"reply":"Your sofa ships Friday."}"#.to_string());
        let message = provider
            .draft_reply(&id, "When will it ship?", &model)
            .await
            .unwrap();
        assert!(message.from_assistant);

        let state = until(provider.subscription().watch(), |s| {
            s.data[0].messages.len() == 1
        })
        .await;
        assert_eq!(state.data[0].messages[0].text, "Your sofa ships Friday.");
    }
}
