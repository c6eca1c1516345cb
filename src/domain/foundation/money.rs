//! Money value object in minor currency units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use super::ValidationError;

/// Monetary amount stored as minor units (never floats).
///
/// The gateway wire format wants a 2-decimal string ("5000.00" for an amount
/// of 500000 minor units), while notifications deliver integer minor units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Creates an amount from minor units, rejecting negatives.
    pub fn from_minor_units(value: i64) -> Result<Self, ValidationError> {
        if value < 0 {
            return Err(ValidationError::out_of_range("amount", 0, i64::MAX, value));
        }
        Ok(Self(value))
    }

    /// Zero amount.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units.
    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Formats the amount as the gateway's 2-decimal string.
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }

    /// True if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}
