//! # Display Helpers
//!
//! Human-facing order numbers and the receipt summary.
//!
//! ## Receipt Layout
//! ```text
//! ┌──────────────────────────────────────┐
//! │ ZF Furniture          #ZF-ORD-12345  │
//! │ Customer: Ayla Demir                 │
//! │ ──────────────────────────────────── │
//! │ 1 x Corner Sofa (Sofa)               │
//! │ 2 x Side Table (Table)               │
//! │ ──────────────────────────────────── │
//! │ Total                         15,000 │
//! │ Prepaid                        7,500 │
//! │ Balance Due                    7,500 │
//! └──────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::types::Order;
use crate::{ORDER_DISPLAY_PREFIX, ORDER_DISPLAY_SUFFIX_LEN};

// =============================================================================
// Order Numbers
// =============================================================================

/// Formats a document id as an order number: the prefix plus the last five
/// characters of the id, or the whole id when it is shorter.
///
/// ## Example
/// ```rust
/// use zf_core::format_order_id;
///
/// assert_eq!(format_order_id("order-12345"), "#ZF-ORD-12345");
/// assert_eq!(format_order_id("abc"), "#ZF-ORD-abc");
/// ```
pub fn format_order_id(id: &str) -> String {
    let len = id.chars().count();
    let suffix: String = if len > ORDER_DISPLAY_SUFFIX_LEN {
        id.chars().skip(len - ORDER_DISPLAY_SUFFIX_LEN).collect()
    } else {
        id.to_string()
    };
    format!("{}{}", ORDER_DISPLAY_PREFIX, suffix)
}

// =============================================================================
// Receipt
// =============================================================================

/// Headline shown under the totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentLabel {
    #[serde(rename = "Balance Due")]
    BalanceDue,
    #[serde(rename = "Paid in Full")]
    PaidInFull,
}

impl PaymentLabel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentLabel::BalanceDue => "Balance Due",
            PaymentLabel::PaidInFull => "Paid in Full",
        }
    }
}

impl fmt::Display for PaymentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product line on the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub quantity: u32,
    pub name: String,
    pub category: String,
}

/// What the receipt view renders for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub order_number: String,
    pub customer_name: String,
    pub lines: Vec<ReceiptLine>,
    pub total: Money,
    pub prepaid: Money,
    pub balance_due: Money,
    pub label: PaymentLabel,
}

impl Receipt {
    /// Builds the receipt for an order.
    ///
    /// ## Example
    /// ```rust
    /// use zf_core::{Money, PaymentLabel, Receipt};
    /// # use zf_core::Order;
    /// # let order: Order = serde_json::from_value(serde_json::json!({
    /// #     "id": "order-12345", "customerId": "c1", "customerName": "Ayla",
    /// #     "incomeAmount": 15000, "prepaidAmount": 7500
    /// # })).unwrap();
    ///
    /// let receipt = Receipt::for_order(&order);
    /// assert_eq!(receipt.balance_due, Money::new(7_500));
    /// assert_eq!(receipt.label, PaymentLabel::BalanceDue);
    /// ```
    pub fn for_order(order: &Order) -> Self {
        let balance_due = order.balance_due();
        let label = if balance_due.is_positive() {
            PaymentLabel::BalanceDue
        } else {
            PaymentLabel::PaidInFull
        };

        Receipt {
            order_number: format_order_id(&order.id),
            customer_name: order.customer_name.clone(),
            lines: order
                .products
                .iter()
                .map(|p| ReceiptLine {
                    quantity: p.quantity,
                    name: p.name.clone(),
                    category: p.category.clone(),
                })
                .collect(),
            total: order.income_amount,
            prepaid: order.prepaid_amount,
            balance_due,
            label,
        }
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const WIDTH: usize = 36;

        writeln!(f, "{:<20}{:>16}", "ZF Furniture", self.order_number)?;
        writeln!(f, "Customer: {}", self.customer_name)?;
        writeln!(f, "{}", "-".repeat(WIDTH))?;
        for line in &self.lines {
            if line.category.is_empty() {
                writeln!(f, "{} x {}", line.quantity, line.name)?;
            } else {
                writeln!(f, "{} x {} ({})", line.quantity, line.name, line.category)?;
            }
        }
        writeln!(f, "{}", "-".repeat(WIDTH))?;
        writeln!(f, "{:<20}{:>16}", "Total", self.total.to_string())?;
        writeln!(f, "{:<20}{:>16}", "Prepaid", self.prepaid.to_string())?;
        match self.label {
            PaymentLabel::BalanceDue => write!(
                f,
                "{:<20}{:>16}",
                self.label.as_str(),
                self.balance_due.to_string()
            ),
            PaymentLabel::PaidInFull => write!(f, "{}", self.label),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
