//! Identity collaborator: resolves the auth token carried by every command.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::persistence::PersistenceError;

/// Token validation and lookup. Tokens are opaque strings issued at login by
/// an out-of-process auth service.
pub trait IdentityProvider: Send + Sync {
    fn validate_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;
    fn username_for_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<String>, PersistenceError>> + Send;
}

/// Token table held in memory.
#[derive(Default)]
pub struct MemoryIdentityStore {
    tokens: RwLock<HashMap<String, String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for `username`.
    pub async fn issue_token(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens
            .write()
            .await
            .insert(token.clone(), username.to_owned());
        token
    }
}

impl IdentityProvider for MemoryIdentityStore {
    async fn validate_token(&self, token: &str) -> Result<bool, PersistenceError> {
        Ok(self.tokens.read().await.contains_key(token))
    }

    async fn username_for_token(&self, token: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.tokens.read().await.get(token).cloned())
    }
}
