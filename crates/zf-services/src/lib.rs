//! # zf-services: Domain Providers
//!
//! One provider per domain, each pairing a live subscription with the writes
//! for that domain. Providers are built from an [`AppContext`] and hold no
//! state of their own beyond the last snapshot.
//!
//! ## Provider Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         XProvider::new(&ctx)                            │
//! │                                                                         │
//! │   reads                                   writes                        │
//! │   ─────                                   ──────                        │
//! │   Subscription<X> ◄── change feed         add_x / update_x / ...        │
//! │     │                                       │ validate (zf-core)        │
//! │     ├── xs()          snapshot              │ derive ownerId/createdAt  │
//! │     ├── loading()                           ▼                           │
//! │     └── get_x_by_id() lookup only        NonBlockingWriter              │
//! │                                           (or awaited where noted)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `get_x_by_id` never reads the store: `None` means "not in the last
//! snapshot", which includes "still loading".
//!
//! ## Example
//! ```rust,no_run
//! use zf_core::UserRole;
//! use zf_services::{AppContext, OrdersProvider, Session};
//! use zf_store::StoreConfig;
//!
//! # async fn run() -> Result<(), zf_services::ServiceError> {
//! let ctx = AppContext::open(StoreConfig::new("zf-ops.db")).await?
//!     .with_session(Some(Session::new("u1", UserRole::Manager)));
//! let orders = OrdersProvider::new(&ctx)?;
//! let _ready = orders.subscription().ready().await;
//! println!("{} orders", orders.orders().len());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod customers;
pub mod error;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod settings;
pub mod telemetry;
pub mod users;

#[cfg(test)]
mod testing;

pub use context::{AppContext, Session};
pub use customers::CustomersProvider;
pub use error::{ServiceError, ServiceResult};
pub use notifications::NotificationsProvider;
pub use orders::OrdersProvider;
pub use products::ProductsProvider;
pub use settings::{ColorSettings, ProductSettings, SettingsDocument, SettingsProvider};
pub use users::UsersProvider;
