//! # Access Policy
//!
//! Every read and write is checked against an injected [`AccessPolicy`]
//! before it touches the database.
//!
//! ```text
//!   store.get(path) ──► policy.allows(AccessRequest { auth, Get, path })
//!                              │
//!                 ┌────────────┴─────────────┐
//!               true                       false
//!                 │                          │
//!            run the query      StoreError::PermissionDenied
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::Fields;

// =============================================================================
// Operation
// =============================================================================

/// The kind of access being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Read one document.
    Get,
    /// Run a query over a collection.
    List,
    /// Write a document that does not exist yet.
    Create,
    /// Write over an existing document.
    Update,
    Delete,
    /// A write whose create/update split is not known to the caller
    /// (set, batches).
    Write,
}

impl Operation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Write => "write",
        }
    }

    pub const fn is_read(&self) -> bool {
        matches!(self, Operation::Get | Operation::List)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Auth Context
// =============================================================================

/// Who is asking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// Signed-in user id, `None` when anonymous.
    pub uid: Option<String>,
    /// Whether the user holds the admin role.
    pub admin: bool,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        AuthContext::default()
    }

    pub fn user(uid: impl Into<String>) -> Self {
        AuthContext {
            uid: Some(uid.into()),
            admin: false,
        }
    }

    pub fn admin(uid: impl Into<String>) -> Self {
        AuthContext {
            uid: Some(uid.into()),
            admin: true,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.uid.is_some()
    }
}

/// One access check.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub auth: &'a AuthContext,
    pub operation: Operation,
    /// Document path, or collection path for `List`.
    pub path: &'a str,
    /// Fields as they would be stored after a write.
    pub data: Option<&'a Fields>,
}

impl AccessRequest<'_> {
    fn segments(&self) -> Vec<&str> {
        self.path.split('/').collect()
    }
}

// =============================================================================
// Policies
// =============================================================================

/// Decides whether a request may proceed.
pub trait AccessPolicy: Send + Sync + fmt::Debug {
    fn allows(&self, request: &AccessRequest<'_>) -> bool;
}

/// Permits everything. The default for local tooling and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn allows(&self, _request: &AccessRequest<'_>) -> bool {
        true
    }
}

/// Permits everything to signed-in users.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignedIn;

impl AccessPolicy for SignedIn {
    fn allows(&self, request: &AccessRequest<'_>) -> bool {
        request.auth.is_signed_in()
    }
}

/// The dashboard's production rules.
///
/// | Path                          | Rule                                          |
/// |-------------------------------|-----------------------------------------------|
/// | anything                      | must be signed in; admins may do anything     |
/// | `users/{uid}`                 | read by anyone, written by `uid` only         |
/// | `users/{uid}/notifications/*` | read/update/delete by `uid`, create by anyone |
/// | `orders/*`, `customers/*`     | writes keep `ownerId == uid`, no deletes      |
/// | `settings/*`                  | read by anyone, written by admins             |
/// | others                        | allowed                                       |
///
/// Settings are seeded by whoever loads them first, so a missing settings
/// document may also be created by any signed-in user.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerOrAdmin;

impl AccessPolicy for OwnerOrAdmin {
    fn allows(&self, request: &AccessRequest<'_>) -> bool {
        let Some(uid) = request.auth.uid.as_deref() else {
            return false;
        };
        if request.auth.admin {
            return true;
        }

        let segments = request.segments();
        let op = request.operation;
        match segments.as_slice() {
            ["users"] | ["users", _] if op.is_read() => true,
            ["users", owner] => *owner == uid && op != Operation::Delete,
            ["users", owner, "notifications", ..] => {
                *owner == uid || op == Operation::Create
            }
            [collection, ..] if *collection == "orders" || *collection == "customers" => {
                match op {
                    Operation::Get | Operation::List => true,
                    Operation::Delete => false,
                    _ => request
                        .data
                        .and_then(|data| data.get("ownerId"))
                        .and_then(|owner| owner.as_str())
                        .map_or(false, |owner| owner == uid),
                }
            }
            ["settings", ..] => op.is_read() || op == Operation::Create,
            _ => true,
        }
    }
}
