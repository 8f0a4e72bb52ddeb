//! # Money Module
//!
//! Provides the `Money` type for order amounts.
//!
//! ## Why Whole Units?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Furniture orders are quoted, invoiced and prepaid in whole currency    │
//! │  units. Storing an integer keeps the documents exact and makes the      │
//! │  receipt arithmetic (total - prepaid) free of float drift:              │
//! │                                                                         │
//! │    incomeAmount  15000                                                  │
//! │    prepaidAmount  7500                                                  │
//! │    ─────────────────────                                                │
//! │    balance due    7500   (never 7499.999...)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use zf_core::money::Money;
//!
//! let total = Money::new(15_000);
//! let prepaid = Money::new(7_500);
//! assert_eq!((total - prepaid).amount(), 7_500);
//! assert_eq!(total.to_string(), "15,000");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in whole currency units.
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds and over-payments can go negative
/// - **serde transparent**: stored as a plain JSON number (`"incomeAmount": 15000`)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates an amount.
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Money(amount)
    }

    /// Returns the raw amount.
    #[inline]
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Subtraction that stops at zero.
    ///
    /// ## Example
    /// ```rust
    /// use zf_core::money::Money;
    ///
    /// assert_eq!(Money::new(100).saturating_sub_floor(Money::new(250)), Money::zero());
    /// ```
    pub fn saturating_sub_floor(self, other: Money) -> Money {
        let diff = self.0.saturating_sub(other.0);
        Money(diff.max(0))
    }

    /// Multiplies by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: u32) -> Self {
        Money(self.0 * qty as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Formats with thousands separators: `15000` → `15,000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        if self.0 < 0 {
            write!(f, "-{}", grouped)
        } else {
            write!(f, "{}", grouped)
        }
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::new(0).to_string(), "0");
        assert_eq!(Money::new(999).to_string(), "999");
        assert_eq!(Money::new(1_000).to_string(), "1,000");
        assert_eq!(Money::new(15_000).to_string(), "15,000");
        assert_eq!(Money::new(1_234_567).to_string(), "1,234,567");
        assert_eq!(Money::new(-7_500).to_string(), "-7,500");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::new(1000);
        let b = Money::new(400);

        assert_eq!((a + b).amount(), 1400);
        assert_eq!((a - b).amount(), 600);
        assert_eq!((a * 3).amount(), 3000);
        assert_eq!(b.multiply_quantity(2).amount(), 800);
    }

    #[test]
    fn test_saturating_sub_floor() {
        assert_eq!(Money::new(15_000).saturating_sub_floor(Money::new(7_500)), Money::new(7_500));
        assert_eq!(Money::new(100).saturating_sub_floor(Money::new(100)), Money::zero());
        assert_eq!(Money::new(100).saturating_sub_floor(Money::new(500)), Money::zero());
    }

    #[test]
    fn test_serde_is_plain_number() {
        let json = serde_json::to_string(&Money::new(15_000)).unwrap();
        assert_eq!(json, "15000");
        let back: Money = serde_json::from_str("7500").unwrap();
        assert_eq!(back, Money::new(7_500));
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::new(1), Money::new(2), Money::new(3)].into_iter().sum();
        assert_eq!(total, Money::new(6));
    }

    #[test]
    fn test_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::new(5).is_positive());
        assert!(Money::new(-5).is_negative());
    }
}
