//! A validated email-address newtype.
//!
//! Emails coming from outside the system (e.g. an API request) should be
//! created with [Email::new], which rejects strings that are not valid email
//! addresses. Emails read back from trusted storage can be wrapped with
//! [Email::new_unchecked].

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A validated email address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Email(String);

impl Email {
    /// Create and validate an email address.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidEmail] if `raw_email` is
    /// not a valid email address.
    pub fn new(raw_email: &str) -> Result<Self, Error> {
        if !raw_email.is_empty() && raw_email.contains('@') {
            Ok(Self(raw_email.to_string()))
        } else {
            Err(Error::InvalidEmail(raw_email.to_string()))
        }
    }

    /// Create an email address without validation.
    ///
    /// The caller should ensure that `raw_email` is a correctly formatted
    /// email address.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// if an incorrectly formatted email is provided it will cause incorrect
    /// behaviour but not affect memory safety.
    pub fn new_unchecked(raw_email: &str) -> Self {
        Self(raw_email.to_string())
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
