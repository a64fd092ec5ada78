//! Input validation for account creation
//!
//! [`AccountName`] keeps its field private so every instance went through
//! [`AccountName::new`].

use std::fmt;

use super::models::{MAX_ACCOUNT_NAME_LEN, Points};

/// Validation errors for account input
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid format for {field}: control characters are not allowed")]
    ControlCharacters { field: &'static str },

    #[error("Initial balance must not be negative: got {0}")]
    NegativeBalance(Points),
}

/// Validated account display name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountName(String);

impl AccountName {
    /// Create a new validated AccountName
    ///
    /// # Validation Rules
    /// - Surrounding whitespace is trimmed
    /// - Length: 1-128 characters
    /// - No control characters
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        let len = name.chars().count();

        if len == 0 || len > MAX_ACCOUNT_NAME_LEN {
            return Err(ValidationError::InvalidLength {
                field: "name",
                min: 1,
                max: MAX_ACCOUNT_NAME_LEN,
                actual: len,
            });
        }

        if name.chars().any(char::is_control) {
            return Err(ValidationError::ControlCharacters { field: "name" });
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opening balance must be zero or positive
pub fn validate_initial_balance(balance: Points) -> Result<Points, ValidationError> {
    if balance < 0 {
        return Err(ValidationError::NegativeBalance(balance));
    }
    Ok(balance)
}
