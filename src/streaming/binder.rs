//! Current-token lookup for streaming connections.

use secrecy::SecretString;

use crate::auth::{SessionRegistry, SessionStore};
use crate::models::token::bearer;
use crate::CustomerNumber;

/// Resolves the latest access token at the moment a stream connects.
///
/// Reads the session stores on every call; a token renewed by the refresh
/// scheduler is visible to the next lookup.
#[derive(Debug, Clone)]
pub struct SessionBinder {
    server: SessionStore,
    customers: SessionRegistry,
}

impl SessionBinder {
    /// Bind to a server slot and customer registry.
    pub fn new(server: SessionStore, customers: SessionRegistry) -> Self {
        Self { server, customers }
    }

    /// The customer's access token, or the server's when `customer` is
    /// `None`. `None` if no such session exists.
    pub async fn current_access_token(
        &self,
        customer: Option<&CustomerNumber>,
    ) -> Option<SecretString> {
        match customer {
            Some(customer) => self
                .customers
                .get(customer)
                .await
                .map(|session| session.tokens.access_token),
            None => self.server.get().await.map(|tokens| tokens.access_token),
        }
    }

    /// `Bearer <token>` for the same lookup.
    pub async fn bearer(&self, customer: Option<&CustomerNumber>) -> Option<String> {
        self.current_access_token(customer)
            .await
            .map(|token| bearer(&token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CustomerSession, LoginOrigin};
    use crate::TokenPair;
    use chrono::{Duration, Utc};

    fn tokens(access: &str) -> TokenPair {
        let now = Utc::now();
        TokenPair::new(access, "R", now + Duration::minutes(5), now + Duration::hours(5))
    }

    #[tokio::test]
    async fn test_server_and_customer_lookup() {
        let server = SessionStore::new();
        let customers = SessionRegistry::new();
        let binder = SessionBinder::new(server.clone(), customers.clone());
        let c1 = CustomerNumber::new("C1");

        assert!(binder.current_access_token(None).await.is_none());
        assert!(binder.bearer(Some(&c1)).await.is_none());

        server.set(tokens("S")).await;
        customers
            .insert(c1.clone(), CustomerSession::new(tokens("C"), LoginOrigin::Customer))
            .await;

        assert_eq!(binder.bearer(None).await.as_deref(), Some("Bearer S"));
        assert_eq!(binder.bearer(Some(&c1)).await.as_deref(), Some("Bearer C"));
    }

    #[tokio::test]
    async fn test_sees_latest_token() {
        let server = SessionStore::new();
        let binder = SessionBinder::new(server.clone(), SessionRegistry::new());

        server.set(tokens("OLD")).await;
        assert_eq!(binder.bearer(None).await.as_deref(), Some("Bearer OLD"));

        server.set(tokens("NEW")).await;
        assert_eq!(binder.bearer(None).await.as_deref(), Some("Bearer NEW"));
    }
}
