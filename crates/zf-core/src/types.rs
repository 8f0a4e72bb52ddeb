//! # Domain Types
//!
//! Document shapes used throughout ZF Ops.
//!
//! ## Document Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Stored Documents                                │
//! │                                                                         │
//! │  orders/{id}            customers/{id}          products/{id}           │
//! │  ┌─────────────────┐    ┌─────────────────┐     ┌─────────────────┐     │
//! │  │ customerId ─────┼───►│ orderIds[]      │     │ name            │     │
//! │  │ status          │    │ reviews[]       │     │ category        │     │
//! │  │ incomeAmount    │    │ phone, email    │     │ sourceOrderId   │     │
//! │  │ products[] ─────┼────┼─────────────────┼────►│ (synced by name)│     │
//! │  │ messages[]      │    └─────────────────┘     └─────────────────┘     │
//! │  │ ownerId         │                                                    │
//! │  └─────────────────┘    users/{uid}             settings/products       │
//! │                         ┌─────────────────┐     settings/colors         │
//! │                         │ role            │     ┌─────────────────┐     │
//! │                         │ notifications/  │     │ singleton,      │     │
//! │                         │   {id}          │     │ seeded on first │     │
//! │                         └─────────────────┘     │ read            │     │
//! │                                                 └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! The document id is not stored inside the document. Readers inject it
//! (`{id, ...fields}`) and writers strip it, so every struct here carries an
//! `id` that defaults to empty when a value is built before it has a path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::icons::IconKey;
use crate::money::Money;

// =============================================================================
// Order Status
// =============================================================================

/// Where an order is in the workshop.
///
/// ## Workflow
/// ```text
/// Pending ─► In Progress ─► Designing ─► Manufacturing ─► Completed ─► Shipped
///    │            │             │              │
///    └────────────┴─────────────┴──────────────┴──────────► Cancelled
/// ```
/// Any non-terminal status may move to any other status. Completed may only
/// move on to Shipped; Shipped and Cancelled are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum OrderStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Designing,
    Manufacturing,
    Completed,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in workflow order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::Designing,
        OrderStatus::Manufacturing,
        OrderStatus::Completed,
        OrderStatus::Shipped,
        OrderStatus::Cancelled,
    ];

    /// The label stored in documents and shown in the UI.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::InProgress => "In Progress",
            OrderStatus::Designing => "Designing",
            OrderStatus::Manufacturing => "Manufacturing",
            OrderStatus::Completed => "Completed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Completed, Shipped and Cancelled orders are no longer worked on.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Shipped | OrderStatus::Cancelled
        )
    }

    /// Checks whether the workflow allows moving to `next`.
    ///
    /// ## Example
    /// ```rust
    /// use zf_core::OrderStatus;
    ///
    /// assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Manufacturing));
    /// assert!(OrderStatus::Completed.can_transition_to(OrderStatus::Shipped));
    /// assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
    /// ```
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return false;
        }
        match self {
            OrderStatus::Cancelled | OrderStatus::Shipped => false,
            OrderStatus::Completed => next == OrderStatus::Shipped,
            _ => true,
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        OrderStatus::ALL
            .into_iter()
            .find(|status| {
                status.as_str().eq_ignore_ascii_case(wanted)
                    || format!("{:?}", status).eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("unknown order status '{}'", s))
    }
}

// =============================================================================
// Embedded Order Parts
// =============================================================================

/// Which backend holds an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum StorageBackend {
    /// S3-compatible object storage, `key` is the object key.
    ObjectStorage,
    /// Drive-style file API, `key` is the file id.
    Drive,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::ObjectStorage
    }
}

/// A file attached to an order or product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Name shown to the user (the original upload name).
    pub name: String,
    /// Public URL.
    pub url: String,
    /// Object key or file id inside `storage`.
    pub key: String,
    #[serde(default)]
    pub storage: StorageBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Outer measurements of a piece, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// A product line embedded in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderProduct {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

fn default_quantity() -> u32 {
    1
}

/// One message in an order's chat thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    /// Set for replies drafted by the chat flow.
    #[serde(default)]
    pub from_assistant: bool,
    #[ts(as = "String")]
    pub sent_at: DateTime<Utc>,
}

// =============================================================================
// Order
// =============================================================================

/// A furniture order, stored at `orders/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub id: String,
    pub customer_id: String,
    pub customer_name: String,
    #[serde(default)]
    pub status: OrderStatus,
    /// What the customer pays in total.
    pub income_amount: Money,
    /// What the customer paid up front.
    #[serde(default)]
    pub prepaid_amount: Money,
    /// Material and labour cost, when tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub deadline: Option<DateTime<Utc>>,
    /// Assigned by the store when the order is created.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
    /// Uid of the user who created the order.
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub products: Vec<OrderProduct>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Last suggestion written back by the status prediction flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_status: Option<OrderStatus>,
}

impl Order {
    /// Outstanding amount, never below zero.
    pub fn balance_due(&self) -> Money {
        self.income_amount.saturating_sub_floor(self.prepaid_amount)
    }

    /// Income minus expense, when the expense is known.
    pub fn margin(&self) -> Option<Money> {
        self.expense_amount.map(|expense| self.income_amount - expense)
    }

    pub fn total_quantity(&self) -> u32 {
        self.products.iter().map(|p| p.quantity).sum()
    }
}

/// Caller-supplied fields for a new order.
///
/// The provider adds `ownerId`, `createdAt` and the initial status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_id: String,
    pub customer_name: String,
    pub income_amount: Money,
    #[serde(default)]
    pub prepaid_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub products: Vec<OrderProduct>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A partial edit of an order. Only the `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepaid_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<OrderProduct>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_status: Option<OrderStatus>,
}

impl OrderUpdate {
    pub fn is_empty(&self) -> bool {
        *self == OrderUpdate::default()
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A review left by a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// 1 to 5 stars.
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A customer, stored at `customers/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Back-references to orders. Not enforced against `orders`.
    #[serde(default)]
    pub order_ids: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// Mean rating, `None` without reviews.
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let sum: u32 = self.reviews.iter().map(|r| r.rating as u32).sum();
        Some(sum as f64 / self.reviews.len() as f64)
    }
}

/// Form input for a new customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A partial edit of a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A catalog entry, stored at `products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Set when the entry was created by syncing from an order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_order_id: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Form input for a new catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_order_id: Option<String>,
}

// =============================================================================
// Users & Roles
// =============================================================================

/// Dashboard areas gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Dashboard,
    Orders,
    Customers,
    Products,
    Settings,
    Users,
}

/// What a signed-in account may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum UserRole {
    Admin,
    Manager,
    Sales,
    Designer,
    /// Signed up but not yet approved by an admin.
    Pending,
}

impl UserRole {
    pub const fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Navigation gate.
    ///
    /// | Role     | Sections                                       |
    /// |----------|------------------------------------------------|
    /// | Admin    | everything                                     |
    /// | Manager  | everything except Users                        |
    /// | Sales    | Dashboard, Orders, Customers                   |
    /// | Designer | Dashboard, Orders, Products                    |
    /// | Pending  | nothing                                        |
    pub fn can_access(&self, section: Section) -> bool {
        match self {
            UserRole::Admin => true,
            UserRole::Manager => section != Section::Users,
            UserRole::Sales => matches!(
                section,
                Section::Dashboard | Section::Orders | Section::Customers
            ),
            UserRole::Designer => matches!(
                section,
                Section::Dashboard | Section::Orders | Section::Products
            ),
            UserRole::Pending => false,
        }
    }

    /// Whether the role sees every order instead of only its own.
    pub const fn sees_all_orders(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Pending
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A user profile, stored at `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    #[serde(default)]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Settings
// =============================================================================

/// A product category with its icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub name: String,
    pub icon: IconKey,
}

/// The `settings/products` singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductCategories {
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Default for ProductCategories {
    fn default() -> Self {
        let category = |name: &str, icon| Category {
            name: name.to_string(),
            icon,
        };
        ProductCategories {
            categories: vec![
                category("Sofa", IconKey::Sofa),
                category("Chair", IconKey::Armchair),
                category("Table", IconKey::Table),
                category("Bed", IconKey::Bed),
                category("Wardrobe", IconKey::Wardrobe),
                category("Kitchen", IconKey::Kitchen),
            ],
        }
    }
}

/// A named upholstery or finish colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ColorSwatch {
    pub name: String,
    /// `#RRGGBB`.
    pub hex: String,
}

/// The `settings/colors` singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ColorPalette {
    #[serde(default)]
    pub colors: Vec<ColorSwatch>,
}

impl Default for ColorPalette {
    fn default() -> Self {
        let swatch = |name: &str, hex: &str| ColorSwatch {
            name: name.to_string(),
            hex: hex.to_string(),
        };
        ColorPalette {
            colors: vec![
                swatch("Walnut", "#5C4033"),
                swatch("Oak", "#C8A165"),
                swatch("Graphite", "#3B3B3B"),
                swatch("Ivory", "#FFFFF0"),
                swatch("Sage", "#9CAF88"),
                swatch("Navy", "#1F2A44"),
            ],
        }
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// A per-user event record, stored at `users/{uid}/notifications/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// An unread notification, optionally pointing at an order.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        order_id: Option<String>,
    ) -> Self {
        Notification {
            id: String::new(),
            title: title.into(),
            body: body.into(),
            order_id,
            read: false,
            created_at: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serializes_as_label() {
        let json = serde_json::to_string(&OrderStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let back: OrderStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(back, OrderStatus::InProgress);
    }

    #[test]
    fn test_status_from_str_accepts_label_and_variant() {
        assert_eq!("In Progress".parse::<OrderStatus>(), Ok(OrderStatus::InProgress));
        assert_eq!("inprogress".parse::<OrderStatus>(), Ok(OrderStatus::InProgress));
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert!("Lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Cancelled));
        assert!(Manufacturing.can_transition_to(Designing));
        assert!(Completed.can_transition_to(Shipped));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(InProgress));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(
            terminal,
            vec![OrderStatus::Completed, OrderStatus::Shipped, OrderStatus::Cancelled]
        );
    }

    #[test]
    fn test_order_decodes_sparse_document() {
        let order: Order = serde_json::from_value(json!({
            "id": "order-1",
            "customerId": "c1",
            "customerName": "Ayla",
            "status": "Designing",
            "incomeAmount": 15000,
            "prepaidAmount": 7500,
            "createdAt": "2024-03-01T10:00:00Z",
            "products": [{ "name": "Corner Sofa" }]
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Designing);
        assert_eq!(order.balance_due(), Money::new(7500));
        assert_eq!(order.products[0].quantity, 1);
        assert!(order.messages.is_empty());
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_order_update_only_writes_set_fields() {
        let update = OrderUpdate {
            notes: Some("Use darker stain".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, json!({ "notes": "Use darker stain" }));
        assert!(!update.is_empty());
        assert!(OrderUpdate::default().is_empty());
    }

    #[test]
    fn test_margin() {
        let mut order: Order = serde_json::from_value(json!({
            "customerId": "c1",
            "customerName": "Ayla",
            "incomeAmount": 10000
        }))
        .unwrap();
        assert_eq!(order.margin(), None);
        order.expense_amount = Some(Money::new(6000));
        assert_eq!(order.margin(), Some(Money::new(4000)));
    }

    #[test]
    fn test_role_gates() {
        assert!(UserRole::Admin.can_access(Section::Users));
        assert!(!UserRole::Manager.can_access(Section::Users));
        assert!(UserRole::Manager.can_access(Section::Settings));
        assert!(UserRole::Sales.can_access(Section::Customers));
        assert!(!UserRole::Sales.can_access(Section::Products));
        assert!(UserRole::Designer.can_access(Section::Products));
        assert!(!UserRole::Pending.can_access(Section::Dashboard));
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Manager.is_admin());
    }

    #[test]
    fn test_average_rating() {
        let mut customer: Customer = serde_json::from_value(json!({
            "name": "Ayla",
            "phone": "+90 555 000 0000"
        }))
        .unwrap();
        assert_eq!(customer.average_rating(), None);

        for rating in [4, 5] {
            customer.reviews.push(Review {
                rating,
                comment: String::new(),
                order_id: None,
                created_at: Utc::now(),
            });
        }
        assert_eq!(customer.average_rating(), Some(4.5));
    }

    #[test]
    fn test_settings_defaults_are_populated() {
        assert!(!ProductCategories::default().categories.is_empty());
        assert!(ColorPalette::default()
            .colors
            .iter()
            .all(|c| c.hex.starts_with('#') && c.hex.len() == 7));
    }
}
