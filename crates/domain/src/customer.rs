//! Customer profile data. Owned by the caller; read-only to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 120;

/// Customer profile attached to a conversation at start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerData {
    pub id: String,
    pub name: String,
    pub email: String,
    pub age: u32,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub goals: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub lifestyle: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerData {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        age: u32,
    ) -> Result<Self> {
        let now = Utc::now();
        let customer = Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            age,
            occupation: None,
            interests: Vec::new(),
            goals: HashMap::new(),
            lifestyle: HashMap::new(),
            created_at: now,
            updated_at: now,
        };
        customer.validate()?;
        Ok(customer)
    }

    pub fn with_interests(mut self, interests: Vec<String>) -> Self {
        self.interests = interests;
        self
    }

    /// Validate caller-supplied fields. Also used on deserialized payloads.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(Error::Validation(format!(
                "age must be between {MIN_AGE} and {MAX_AGE} (got {})",
                self.age
            )));
        }
        if !self.email.contains('@') {
            return Err(Error::Validation(format!(
                "invalid email address: {:?}",
                self.email
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation("name must not be empty".into()));
        }
        Ok(())
    }

    /// The customer's given name (first word of the full name).
    pub fn given_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_bounds_are_enforced() {
        assert!(CustomerData::new("c", "Ana", "a@b.com", 17).is_err());
        assert!(CustomerData::new("c", "Ana", "a@b.com", 121).is_err());
        assert!(CustomerData::new("c", "Ana", "a@b.com", 18).is_ok());
        assert!(CustomerData::new("c", "Ana", "a@b.com", 120).is_ok());
    }

    #[test]
    fn email_must_look_like_an_address() {
        let err = CustomerData::new("c", "Ana", "not-an-email", 30).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn given_name_is_first_word() {
        let c = CustomerData::new("c", "Ana María López", "a@b.com", 30).unwrap();
        assert_eq!(c.given_name(), "Ana");
    }
}
