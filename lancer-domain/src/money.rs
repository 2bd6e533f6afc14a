//! Monetary amounts.
//!
//! Every monetary value in the system is a [`rust_decimal::Decimal`];
//! floats never touch money.

use crate::error::DomainError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strictly positive monetary amount.
///
/// # Invariants
/// - Must be greater than zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    /// Create a new amount with validation.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] if the value is zero or negative.
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "Amount must be positive, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// The underlying decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
