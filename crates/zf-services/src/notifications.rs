//! # Notifications Provider
//!
//! The signed-in user's `users/{uid}/notifications`, newest first. Anyone
//! may drop a notification into another user's inbox; only the owner reads
//! and marks them.

use serde_json::json;
use tracing::debug;
use zf_core::Notification;
use zf_core::validation::validate_text;
use zf_store::{
    to_fields, watch_collection, CollectionSubscription, Direction, FieldValue, Fields, Query,
    WriteBatch, WriteTicket,
};

use crate::context::{notifications_of, AppContext};
use crate::error::ServiceResult;

pub struct NotificationsProvider {
    ctx: AppContext,
    inbox: CollectionSubscription<Notification>,
}

impl NotificationsProvider {
    pub fn new(ctx: &AppContext) -> ServiceResult<Self> {
        let query = match ctx.session() {
            Some(session) => Some(
                Query::new(notifications_of(&session.uid)?)
                    .order_by("createdAt", Direction::Descending),
            ),
            None => None,
        };
        Ok(NotificationsProvider {
            ctx: ctx.clone(),
            inbox: watch_collection(ctx.store(), ctx.errors(), query),
        })
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inbox.data()
    }

    pub fn loading(&self) -> bool {
        self.inbox.loading()
    }

    pub fn subscription(&self) -> &CollectionSubscription<Notification> {
        &self.inbox
    }

    pub fn unread_count(&self) -> usize {
        self.inbox.data().iter().filter(|n| !n.read).count()
    }

    /// Delivers `notification` to `uid` without waiting. Returns its id.
    pub fn notify(&self, uid: &str, notification: Notification) -> ServiceResult<String> {
        self.ctx.require_session()?;
        validate_text("title", &notification.title, 200)?;

        let mut fields = to_fields(&notification)?;
        fields.insert("read".to_string(), json!(false));
        fields.insert("createdAt".to_string(), FieldValue::server_timestamp());

        let (path, _ticket) = self
            .ctx
            .writer()
            .add_document(&notifications_of(uid)?, fields);
        debug!(%path, "Notification sent");
        Ok(path.id().to_string())
    }

    pub fn mark_read(&self, id: &str) -> ServiceResult<WriteTicket> {
        let session = self.ctx.require_session()?;
        let path = notifications_of(&session.uid)?.doc(id)?;
        Ok(self.ctx.writer().update_document(path, read_flag()))
    }

    /// Marks every unread notification in the snapshot as read in one batch.
    /// `None` when there is nothing to mark.
    pub fn mark_all_read(&self) -> ServiceResult<Option<WriteTicket>> {
        let session = self.ctx.require_session()?;
        let inbox = notifications_of(&session.uid)?;

        let mut batch = WriteBatch::new();
        for notification in self.inbox.data().iter().filter(|n| !n.read) {
            batch.update(inbox.doc(&notification.id)?, read_flag());
        }
        if batch.is_empty() {
            return Ok(None);
        }
        debug!(count = batch.len(), "Marking notifications read");
        Ok(Some(self.ctx.writer().commit_batch(batch)))
    }
}

fn read_flag() -> Fields {
    let mut fields = Fields::new();
    fields.insert("read".to_string(), json!(true));
    fields
}
