//! Basket id generation and charge-kind classification.
//!
//! Every gateway operation gets a unique basket id whose prefix encodes the
//! operation class. The kind is decided here, at generation time, and carried
//! on the transaction record; the prefix table is only a fallback classifier
//! for notifications whose basket id has no stored transaction. The table is
//! configuration so operators can swap the assignment without a code change
//! if live gateway traffic proves the prefixes are mapped the other way
//! around.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of gateway charge a basket id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeKind {
    /// First-time charge; requests recurring-capable instrument storage.
    Initial,

    /// Off-session charge against a stored credential.
    Recurring,
}

/// Configurable basket-id prefix table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketPrefixes {
    /// Prefix for first-time charges.
    pub initial: String,

    /// Prefix for recurring charges.
    pub recurring: String,
}

impl Default for BasketPrefixes {
    fn default() -> Self {
        Self {
            initial: "SUB-".to_string(),
            recurring: "RECUR-".to_string(),
        }
    }
}

impl BasketPrefixes {
    /// Returns the prefix for a charge kind.
    pub fn prefix_for(&self, kind: ChargeKind) -> &str {
        match kind {
            ChargeKind::Initial => &self.initial,
            ChargeKind::Recurring => &self.recurring,
        }
    }

    /// Classifies a basket id by its prefix.
    ///
    /// Fallback only: the authoritative kind is the one stored on the
    /// transaction when the basket id was generated.
    pub fn classify(&self, basket_id: &str) -> Option<ChargeKind> {
        if basket_id.starts_with(self.initial.as_str()) {
            Some(ChargeKind::Initial)
        } else if basket_id.starts_with(self.recurring.as_str()) {
            Some(ChargeKind::Recurring)
        } else {
            None
        }
    }
}

/// A gateway basket id: prefix + random alphanumeric suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasketId(String);

const SUFFIX_LEN: usize = 16;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

impl BasketId {
    /// Generates a fresh basket id for the given charge kind.
    pub fn generate(kind: ChargeKind, prefixes: &BasketPrefixes) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(format!("{}{}", prefixes.prefix_for(kind), suffix))
    }

    /// Wraps an id received on the wire.
    pub fn from_wire(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BasketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
