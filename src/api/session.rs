use tokio::sync::{Mutex, RwLock};

use super::types::TokenPair;

/// In-memory bearer tokens for one client.
///
/// Nothing is written to disk; a new process logs in again.
#[derive(Debug, Default)]
pub struct Session {
    tokens: RwLock<Option<TokenPair>>,
    // Serializes refreshes so concurrent 401s trigger a single refresh call.
    refresh_lock: Mutex<()>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
            refresh_lock: Mutex::new(()),
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.as_ref().map(|t| t.access.clone())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.tokens.read().await.as_ref().map(|t| t.refresh.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    pub async fn store(&self, tokens: TokenPair) {
        *self.tokens.write().await = Some(tokens);
    }

    /// Swap in a refreshed access token, keeping the refresh token.
    pub async fn update_access(&self, access: String) {
        if let Some(tokens) = self.tokens.write().await.as_mut() {
            tokens.access = access;
        }
    }

    pub async fn clear(&self) {
        *self.tokens.write().await = None;
    }

    pub(crate) async fn lock_refresh(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.refresh_lock.lock().await
    }
}
