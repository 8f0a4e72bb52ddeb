//! # Users Provider
//!
//! Profiles under `users/{uid}` and the admin-only role management.
//!
//! New accounts start as `Pending` until an admin approves them. The very
//! first account in an empty store becomes `Admin` so someone can. Creating
//! a profile that already exists returns the stored one untouched.

use serde_json::json;
use tracing::{debug, info};
use zf_core::{AppUser, UserRole};
use zf_core::validation::validate_email;
use zf_store::{
    to_fields, watch_collection, watch_doc, CollectionSubscription, Direction, DocSubscription,
    FieldValue, Fields, Query, WriteTicket,
};

use crate::context::{collection, doc, AppContext, USERS};
use crate::error::{ServiceError, ServiceResult};

pub struct UsersProvider {
    ctx: AppContext,
    users: CollectionSubscription<AppUser>,
    current: DocSubscription<AppUser>,
}

impl UsersProvider {
    pub fn new(ctx: &AppContext) -> ServiceResult<Self> {
        let (query, me) = match ctx.session() {
            Some(session) => (
                Some(Query::new(collection(USERS)?).order_by("email", Direction::Ascending)),
                Some(doc(USERS, &session.uid)?),
            ),
            None => (None, None),
        };
        Ok(UsersProvider {
            ctx: ctx.clone(),
            users: watch_collection(ctx.store(), ctx.errors(), query),
            current: watch_doc(ctx.store(), ctx.errors(), me),
        })
    }

    pub fn users(&self) -> Vec<AppUser> {
        self.users.data()
    }

    pub fn loading(&self) -> bool {
        self.users.loading() || self.current.loading()
    }

    pub fn subscription(&self) -> &CollectionSubscription<AppUser> {
        &self.users
    }

    pub fn current_subscription(&self) -> &DocSubscription<AppUser> {
        &self.current
    }

    /// The signed-in user's profile, `None` before it exists or loads.
    pub fn current_user(&self) -> Option<AppUser> {
        self.current.data()
    }

    pub fn get_user_by_id(&self, uid: &str) -> Option<AppUser> {
        self.users.data().into_iter().find(|u| u.id == uid)
    }

    /// Writes the profile for the signed-in account and waits for it.
    ///
    /// Two accounts signing up into an empty store at the same moment can
    /// both become admin; the check is a read followed by a write.
    pub async fn create_profile(&self, email: &str, display_name: &str) -> ServiceResult<AppUser> {
        let session = self.ctx.require_session()?;
        validate_email(email)?;

        let users = collection(USERS)?;
        let path = users.doc(&session.uid)?;
        if let Some(existing) = self.ctx.store().get(&path).await? {
            debug!(uid = %session.uid, "Profile already exists");
            return Ok(existing.decode::<AppUser>()?);
        }

        let first = self
            .ctx
            .store()
            .run_query(&Query::new(users.clone()).limit(1))
            .await?
            .is_empty();
        let role = if first {
            UserRole::Admin
        } else {
            UserRole::Pending
        };

        let profile = AppUser {
            id: session.uid.clone(),
            email: email.trim().to_string(),
            display_name: display_name.trim().to_string(),
            role,
            created_at: None,
        };
        let mut fields = to_fields(&profile)?;
        fields.insert("createdAt".to_string(), FieldValue::server_timestamp());

        self.ctx.store().set(&path, fields).await?;
        info!(uid = %session.uid, %role, "Profile created");
        Ok(profile)
    }

    /// Changes another account's role.
    ///
    /// ## Errors
    /// `Forbidden` unless the session is an admin.
    pub fn update_role(&self, uid: &str, role: UserRole) -> ServiceResult<WriteTicket> {
        let session = self.ctx.require_session()?;
        if !session.role.is_admin() {
            return Err(ServiceError::Forbidden(format!(
                "{} cannot change roles",
                session.role
            )));
        }

        let mut fields = Fields::new();
        fields.insert("role".to_string(), json!(role));
        info!(uid = %uid, %role, by = %session.uid, "Role updated");
        Ok(self.ctx.writer().update_document(doc(USERS, uid)?, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use zf_store::OwnerOrAdmin;

    use crate::context::Session;
    use crate::testing::{context_with_policy, until};

    #[tokio::test]
    async fn test_first_profile_becomes_admin() {
        let founder = context_with_policy("u1", UserRole::Pending, Arc::new(OwnerOrAdmin)).await;
        let provider = UsersProvider::new(&founder).unwrap();
        let profile = provider
            .create_profile("founder@example.com", "Founder")
            .await
            .unwrap();
        assert_eq!(profile.role, UserRole::Admin);

        let hire = founder.with_session(Some(Session::new("u2", UserRole::Pending)));
        let provider = UsersProvider::new(&hire).unwrap();
        let profile = provider
            .create_profile("hire@example.com", "New Hire")
            .await
            .unwrap();
        assert_eq!(profile.role, UserRole::Pending);

        let state = until(provider.current_subscription().watch(), |s| s.data.is_some()).await;
        let me = state.data.unwrap();
        assert_eq!(me.id, "u2");
        assert!(me.created_at.is_some());
    }

    #[tokio::test]
    async fn test_repeated_profile_creation_keeps_role() {
        let founder = context_with_policy("u1", UserRole::Pending, Arc::new(OwnerOrAdmin)).await;
        let provider = UsersProvider::new(&founder).unwrap();
        let first = provider
            .create_profile("founder@example.com", "Founder")
            .await
            .unwrap();
        assert_eq!(first.role, UserRole::Admin);
        let writes = founder.store().stats().writes;

        let again = provider
            .create_profile("other@example.com", "Someone Else")
            .await
            .unwrap();
        assert_eq!(again.role, UserRole::Admin);
        assert_eq!(again.email, "founder@example.com");
        assert!(again.created_at.is_some());
        assert_eq!(founder.store().stats().writes, writes);
    }

    #[tokio::test]
    async fn test_only_admins_change_roles() {
        let admin = context_with_policy("boss", UserRole::Admin, Arc::new(OwnerOrAdmin)).await;
        UsersProvider::new(&admin)
            .unwrap()
            .create_profile("boss@example.com", "Boss")
            .await
            .unwrap();

        let hire = admin.with_session(Some(Session::new("u2", UserRole::Pending)));
        let hire_users = UsersProvider::new(&hire).unwrap();
        hire_users
            .create_profile("hire@example.com", "Hire")
            .await
            .unwrap();

        let err = hire_users.update_role("u2", UserRole::Admin).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let admin_users = UsersProvider::new(&admin).unwrap();
        assert!(admin_users
            .update_role("u2", UserRole::Designer)
            .unwrap()
            .wait()
            .await);

        let state = until(admin_users.subscription().watch(), |s| {
            s.data.iter().any(|u| u.id == "u2" && u.role == UserRole::Designer)
        })
        .await;
        assert_eq!(state.data.len(), 2);
        assert_eq!(
            admin_users.get_user_by_id("u2").map(|u| u.role),
            Some(UserRole::Designer)
        );
    }

    #[tokio::test]
    async fn test_signed_out_has_no_profile() {
        let ctx = context_with_policy("u1", UserRole::Sales, Arc::new(OwnerOrAdmin))
            .await
            .with_session(None);
        let provider = UsersProvider::new(&ctx).unwrap();

        assert!(!provider.loading());
        assert!(provider.current_user().is_none());
        assert_eq!(ctx.store().stats().reads, 0);
        assert!(matches!(
            provider.create_profile("a@example.com", "A").await,
            Err(ServiceError::Unauthenticated)
        ));
    }
}
