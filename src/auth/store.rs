//! Token storage for the server session and per-customer sessions.
//!
//! Both stores are cheap to clone and share their state; the refresh loop
//! and API callers hold clones of the same store.

use std::collections::HashMap;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::{CustomerNumber, TokenPair};

/// Holds the server (institution) token pair, if any.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<TokenPair>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the server token pair.
    pub async fn set(&self, tokens: TokenPair) {
        *self.inner.write().await = Some(tokens);
    }

    /// A copy of the server token pair.
    pub async fn get(&self) -> Option<TokenPair> {
        self.inner.read().await.clone()
    }

    /// Remove the server token pair, returning it.
    pub async fn clear(&self) -> Option<TokenPair> {
        self.inner.write().await.take()
    }

    /// Returns `true` if a server token pair is stored.
    pub async fn is_set(&self) -> bool {
        self.inner.read().await.is_some()
    }
}

/// How a customer session was established. Decides which flow re-logs it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOrigin {
    /// Customer token issued on top of the server session
    Customer,
    /// User/password login
    User,
}

/// A customer's tokens plus the flow that produced them.
#[derive(Debug, Clone)]
pub struct CustomerSession {
    /// Current token pair
    pub tokens: TokenPair,
    /// Flow that issued the tokens
    pub origin: LoginOrigin,
}

impl CustomerSession {
    /// Create a session record.
    pub fn new(tokens: TokenPair, origin: LoginOrigin) -> Self {
        Self { tokens, origin }
    }
}

/// Customer sessions keyed by customer number.
///
/// Readers always see a complete [`CustomerSession`]; an insert replaces the
/// whole record.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<CustomerNumber, CustomerSession>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a customer's session.
    pub async fn insert(&self, customer: CustomerNumber, session: CustomerSession) {
        self.inner.write().await.insert(customer, session);
    }

    /// Replace only the tokens of an existing session. Returns `false` if the
    /// customer was removed in the meantime.
    pub async fn update_tokens(&self, customer: &CustomerNumber, tokens: TokenPair) -> bool {
        match self.inner.write().await.get_mut(customer) {
            Some(session) => {
                session.tokens = tokens;
                true
            }
            None => false,
        }
    }

    /// Replace the tokens only if the session still holds `expected_refresh`.
    /// Returns `false` if the customer was removed or logged in again.
    pub async fn update_if_current(
        &self,
        customer: &CustomerNumber,
        expected_refresh: &SecretString,
        tokens: TokenPair,
    ) -> bool {
        match self.inner.write().await.get_mut(customer) {
            Some(session) if holds_refresh(session, expected_refresh) => {
                session.tokens = tokens;
                true
            }
            _ => false,
        }
    }

    /// Remove the session only if it still holds `expected_refresh`.
    pub async fn remove_if_current(
        &self,
        customer: &CustomerNumber,
        expected_refresh: &SecretString,
    ) -> Option<CustomerSession> {
        let mut sessions = self.inner.write().await;
        match sessions.get(customer) {
            Some(session) if holds_refresh(session, expected_refresh) => sessions.remove(customer),
            _ => None,
        }
    }

    /// A copy of a customer's session.
    pub async fn get(&self, customer: &CustomerNumber) -> Option<CustomerSession> {
        self.inner.read().await.get(customer).cloned()
    }

    /// Remove a customer's session, returning it.
    pub async fn remove(&self, customer: &CustomerNumber) -> Option<CustomerSession> {
        self.inner.write().await.remove(customer)
    }

    /// Returns `true` if the customer has a session.
    pub async fn contains(&self, customer: &CustomerNumber) -> bool {
        self.inner.read().await.contains_key(customer)
    }

    /// Customer numbers present right now, sorted.
    pub async fn customers(&self) -> Vec<CustomerNumber> {
        let mut customers: Vec<_> = self.inner.read().await.keys().cloned().collect();
        customers.sort();
        customers
    }

    /// Copies of every session, sorted by customer number.
    pub async fn snapshot(&self) -> Vec<(CustomerNumber, CustomerSession)> {
        let mut sessions: Vec<_> = self
            .inner
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        sessions.sort_by(|a, b| a.0.cmp(&b.0));
        sessions
    }

    /// Remove every session.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Number of sessions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Returns `true` if no sessions exist.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

fn holds_refresh(session: &CustomerSession, refresh: &SecretString) -> bool {
    session.tokens.refresh_token.expose_secret() == refresh.expose_secret()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn tokens(access: &str) -> TokenPair {
        let now = Utc::now();
        TokenPair::new(access, "R", now + Duration::minutes(1), now + Duration::hours(1))
    }

    #[tokio::test]
    async fn test_session_store() {
        let store = SessionStore::new();
        assert!(!store.is_set().await);

        store.set(tokens("A")).await;
        let clone = store.clone();
        assert!(clone.is_set().await);

        assert!(store.clear().await.is_some());
        assert!(clone.get().await.is_none());
    }

    #[tokio::test]
    async fn test_registry_insert_get_remove() {
        let registry = SessionRegistry::new();
        let c1 = CustomerNumber::new("C1");

        registry
            .insert(c1.clone(), CustomerSession::new(tokens("A1"), LoginOrigin::Customer))
            .await;
        assert!(registry.contains(&c1).await);
        assert_eq!(registry.len().await, 1);
        assert_eq!(
            registry.get(&c1).await.map(|s| s.origin),
            Some(LoginOrigin::Customer)
        );

        assert!(registry.remove(&c1).await.is_some());
        assert!(registry.is_empty().await);
        assert!(registry.remove(&c1).await.is_none());
    }

    #[tokio::test]
    async fn test_registry_update_tokens_only_existing() {
        let registry = SessionRegistry::new();
        let c1 = CustomerNumber::new("C1");
        assert!(!registry.update_tokens(&c1, tokens("A2")).await);

        registry
            .insert(c1.clone(), CustomerSession::new(tokens("A1"), LoginOrigin::User))
            .await;
        assert!(registry.update_tokens(&c1, tokens("A2")).await);

        let session = registry.get(&c1).await.unwrap();
        assert_eq!(session.tokens.access_token.expose_secret(), "A2");
        assert_eq!(session.origin, LoginOrigin::User);
    }

    #[tokio::test]
    async fn test_conditional_ops_skip_replaced_session() {
        let registry = SessionRegistry::new();
        let c1 = CustomerNumber::new("C1");
        let now = Utc::now();
        let old = TokenPair::new("A1", "R-OLD", now, now + Duration::hours(1));
        let relogged = TokenPair::new("A2", "R-NEW", now, now + Duration::hours(1));
        registry
            .insert(c1.clone(), CustomerSession::new(relogged, LoginOrigin::Customer))
            .await;

        assert!(registry.remove_if_current(&c1, &old.refresh_token).await.is_none());
        assert!(!registry.update_if_current(&c1, &old.refresh_token, tokens("A3")).await);
        let session = registry.get(&c1).await.unwrap();
        assert_eq!(session.tokens.access_token.expose_secret(), "A2");

        let current = session.tokens.refresh_token.clone();
        assert!(registry.update_if_current(&c1, &current, tokens("A3")).await);
        assert!(registry.remove_if_current(&c1, &SecretString::from("R".to_string())).await.is_some());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_registry_snapshot_is_sorted_copy() {
        let registry = SessionRegistry::new();
        for cn in ["C3", "C1", "C2"] {
            registry
                .insert(
                    CustomerNumber::new(cn),
                    CustomerSession::new(tokens(cn), LoginOrigin::Customer),
                )
                .await;
        }

        let snapshot = registry.snapshot().await;
        registry.clear().await;

        let names: Vec<_> = snapshot.iter().map(|(cn, _)| cn.as_str()).collect();
        assert_eq!(names, ["C1", "C2", "C3"]);
        assert!(registry.is_empty().await);
        assert!(registry.customers().await.is_empty());
    }
}
