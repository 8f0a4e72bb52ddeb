//! # Validation Module
//!
//! Form validation for ZF Ops. Every failure names its field so the form can
//! render the message next to the input instead of in a toast.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form (browser)                                               │
//! │  └── Required markers, input types                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Provider call (Rust)                                         │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: business rules, checked before any write             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Document store                                               │
//! │  └── Access policy (who may write where)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use zf_core::validation::{validate_phone, validate_hex_color};
//!
//! assert!(validate_phone("+90 (532) 555 01 02").is_ok());
//! assert!(validate_hex_color("#5C4033").is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Category, NewCustomer, NewOrder, NewProduct, OrderProduct, Review};
use crate::{MAX_ORDER_PRODUCTS, MAX_PRODUCT_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 120;
const MAX_NOTES_LEN: usize = 2000;

// =============================================================================
// String Validators
// =============================================================================

/// Checks that a trimmed value is present and at most `max` characters.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - Must contain 7 to 15 digits
/// - May contain spaces, dashes, parentheses and a leading `+`
///
/// ## Example
/// ```rust
/// use zf_core::validation::validate_phone;
///
/// assert!(validate_phone("0532 555 01 02").is_ok());
/// assert!(validate_phone("call me").is_err());
/// assert!(validate_phone("").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "phone".to_string(),
        reason: "must be 7 to 15 digits".to_string(),
    };

    let mut digits = 0;
    for (i, c) in phone.chars().enumerate() {
        match c {
            '0'..='9' => digits += 1,
            '+' if i == 0 => {}
            ' ' | '-' | '(' | ')' => {}
            _ => return Err(invalid()),
        }
    }

    if !(7..=15).contains(&digits) {
        return Err(invalid());
    }

    Ok(())
}

/// Validates an email address (shape only: `local@domain.tld`).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(|| invalid("missing @"))?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must look like name@example.com"));
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && tld.len() >= 2 => Ok(()),
        _ => Err(invalid("must look like name@example.com")),
    }
}

/// Validates a `#RRGGBB` colour code.
pub fn validate_hex_color(hex: &str) -> ValidationResult<()> {
    let valid = hex.len() == 7
        && hex.starts_with('#')
        && hex[1..].chars().all(|c| c.is_ascii_hexdigit());

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "hex".to_string(),
            reason: "must be #RRGGBB".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an amount entered on a form.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an embedded product quantity (1 to 999).
pub fn validate_quantity(qty: u32) -> ValidationResult<()> {
    if qty == 0 || qty > MAX_PRODUCT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_PRODUCT_QUANTITY as i64,
        });
    }
    Ok(())
}

/// Validates a review rating (1 to 5 stars).
pub fn validate_rating(rating: u8) -> ValidationResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: 1,
            max: 5,
        });
    }
    Ok(())
}

// =============================================================================
// Form Validators
// =============================================================================

/// Validates one embedded product line.
pub fn validate_order_product(product: &OrderProduct) -> ValidationResult<()> {
    validate_text("products.name", &product.name, MAX_NAME_LEN)?;
    validate_quantity(product.quantity)
}

/// Validates the order form.
///
/// ## Rules
/// ```text
/// customerId, customerName   required
/// incomeAmount               >= 0
/// prepaidAmount              >= 0 and <= incomeAmount
/// expenseAmount              >= 0 when present
/// products                   at most 50, each named, quantity 1..=999
/// notes                      at most 2000 characters
/// ```
pub fn validate_new_order(order: &NewOrder) -> ValidationResult<()> {
    validate_text("customerId", &order.customer_id, MAX_NAME_LEN)?;
    validate_text("customerName", &order.customer_name, MAX_NAME_LEN)?;
    validate_amount("incomeAmount", order.income_amount)?;
    validate_amount("prepaidAmount", order.prepaid_amount)?;
    if let Some(expense) = order.expense_amount {
        validate_amount("expenseAmount", expense)?;
    }

    if order.prepaid_amount > order.income_amount {
        return Err(ValidationError::Inconsistent {
            field: "prepaidAmount".to_string(),
            reason: "cannot exceed incomeAmount".to_string(),
        });
    }

    if order.products.len() > MAX_ORDER_PRODUCTS {
        return Err(ValidationError::OutOfRange {
            field: "products".to_string(),
            min: 0,
            max: MAX_ORDER_PRODUCTS as i64,
        });
    }
    order.products.iter().try_for_each(validate_order_product)?;

    if let Some(notes) = &order.notes {
        if notes.chars().count() > MAX_NOTES_LEN {
            return Err(ValidationError::TooLong {
                field: "notes".to_string(),
                max: MAX_NOTES_LEN,
            });
        }
    }

    Ok(())
}

/// Validates the customer form.
pub fn validate_new_customer(customer: &NewCustomer) -> ValidationResult<()> {
    validate_text("name", &customer.name, MAX_NAME_LEN)?;
    validate_phone(&customer.phone)?;
    if let Some(email) = customer.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    Ok(())
}

/// Validates the product form.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_text("name", &product.name, MAX_NAME_LEN)
}

/// Validates a review before it is appended to a customer.
pub fn validate_review(review: &Review) -> ValidationResult<()> {
    validate_rating(review.rating)?;
    if review.comment.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "comment".to_string(),
            max: MAX_NOTES_LEN,
        });
    }
    Ok(())
}

/// Validates a new category against the existing list (names are unique,
/// compared case-insensitively).
pub fn validate_new_category(existing: &[Category], name: &str) -> ValidationResult<()> {
    validate_text("name", name, MAX_NAME_LEN)?;
    let name = name.trim();
    if existing.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
        return Err(ValidationError::Duplicate {
            field: "name".to_string(),
            value: name.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
