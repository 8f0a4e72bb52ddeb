//! # zf-core: Pure Domain Logic for ZF Ops
//!
//! Document shapes, validation rules and presentation helpers shared by
//! every other crate in the workspace. Nothing in here touches the network,
//! the disk or the runtime.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ZF Ops Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Dashboard UI (browser)                       │   │
//! │  │   Orders table ──► Order form ──► Chat ──► Receipt              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ provider calls                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 zf-services (domain providers)                  │   │
//! │  └───────────────┬─────────────────────────────────┬───────────────┘   │
//! │                  │                                 │                    │
//! │  ┌───────────────▼───────────────┐  ┌──────────────▼────────────────┐  │
//! │  │  zf-store (documents, live)   │  │  zf-flows (model, S3, Drive)  │  │
//! │  └───────────────┬───────────────┘  └──────────────┬────────────────┘  │
//! │                  │                                 │                    │
//! │  ┌───────────────▼─────────────────────────────────▼───────────────┐   │
//! │  │                  ★ zf-core (THIS CRATE) ★                       │   │
//! │  │   types · money · validation · display · icons · files          │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Document shapes (Order, Customer, Product, AppUser, ...)
//! - [`money`] - Whole-unit money amounts
//! - [`error`] - Domain error types
//! - [`validation`] - Form validation
//! - [`display`] - Order display ids and receipts
//! - [`icons`] - Enumerated icon registry for product categories
//! - [`files`] - Trait seam for deleting remote files
//!
//! ## Example Usage
//!
//! ```rust
//! use zf_core::display::format_order_id;
//!
//! assert_eq!(format_order_id("order-12345"), "#ZF-ORD-12345");
//! ```

pub mod display;
pub mod error;
pub mod files;
pub mod icons;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use display::{format_order_id, PaymentLabel, Receipt, ReceiptLine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use files::{FileRemover, RemoveError};
pub use icons::{IconKey, UnknownIcon};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix of every human-facing order number.
pub const ORDER_DISPLAY_PREFIX: &str = "#ZF-ORD-";

/// Number of trailing id characters shown in an order number.
pub const ORDER_DISPLAY_SUFFIX_LEN: usize = 5;

/// Maximum number of products embedded in one order.
///
/// Keeps order documents well under the store's practical document size.
pub const MAX_ORDER_PRODUCTS: usize = 50;

/// Maximum quantity for a single embedded product line.
pub const MAX_PRODUCT_QUANTITY: u32 = 999;
