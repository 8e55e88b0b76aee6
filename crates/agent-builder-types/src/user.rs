//! Caller identity types.
//!
//! Identity is resolved by an upstream authorizer; this crate only carries
//! the resulting identifier around.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Longest user identifier accepted from the authorizer.
pub const MAX_USER_ID_LEN: usize = 128;

/// Opaque identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identifier is usable as a storage key component.
    ///
    /// Identifiers must be non-empty, at most [`MAX_USER_ID_LEN`] bytes, and
    /// must not contain the `#` key delimiter or control characters.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= MAX_USER_ID_LEN
            && !self.0.contains('#')
            && !self.0.chars().any(char::is_control)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}
