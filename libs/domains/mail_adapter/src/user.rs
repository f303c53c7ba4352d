//! User records and the user directory seam.
//!
//! User records are owned by the host framework; the adapter only reads a
//! handful of attributes from them.

use crate::error::MailAdapterResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A read-only bag of user attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRecord {
    attributes: Map<String, Value>,
}

impl UserRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set an attribute.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// String attribute, treating empty strings as absent.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    pub fn username(&self) -> Option<&str> {
        self.get_str("username")
    }

    /// Preferred language, read from `language` and then `locale`.
    pub fn language(&self) -> Option<&str> {
        self.get_str("language").or_else(|| self.get_str("locale"))
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}

impl From<Map<String, Value>> for UserRecord {
    fn from(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }
}

/// Query capability against the host's user store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Find the full record of the user with the given email address.
    async fn find_by_email(&self, email: &str) -> MailAdapterResult<Option<UserRecord>>;
}

/// In-memory user directory (for development/testing).
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserLookup {
    users: Arc<RwLock<Vec<UserRecord>>>,
}

impl InMemoryUserLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    pub async fn insert(&self, user: UserRecord) {
        self.users.write().await.push(user);
    }
}

#[async_trait]
impl UserLookup for InMemoryUserLookup {
    async fn find_by_email(&self, email: &str) -> MailAdapterResult<Option<UserRecord>> {
        let users = self.users.read().await;
        let user = users
            .iter()
            .find(|user| {
                user.email()
                    .is_some_and(|candidate| candidate.eq_ignore_ascii_case(email))
            })
            .cloned();
        Ok(user)
    }
}
