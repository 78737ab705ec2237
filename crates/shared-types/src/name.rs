//! Canonical account names.
//!
//! Accounts are addressed by human-readable names rather than key-derived
//! addresses. A valid name is non-empty, at most
//! [`MAX_NAME_LENGTH`](crate::params::MAX_NAME_LENGTH) bytes, and drawn
//! from `[a-z0-9.]`. Names sort lexicographically; the ordering queue
//! relies on this as its deterministic tie-breaker.

use crate::params::MAX_NAME_LENGTH;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonical account name.
///
/// Construction does not validate; consensus checks call
/// [`Name::is_valid`] where an invalid name must be rejected (for
/// example candidate validation). This mirrors how names arrive from
/// configuration and the wire: carried as-is, judged at the boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    /// Wrap a raw string as a name.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Whether this name satisfies the protocol charset and length rules.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= MAX_NAME_LENGTH
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.')
    }

    /// Whether the name is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
