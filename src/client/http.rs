//! Client façade: session lifecycle plus authenticated API calls.

use std::sync::Arc;

use reqwest::Method;
use secrecy::SecretString;
use serde_json::Value;
use tracing::debug;

use super::config::ClientConfig;
use super::transport::{HttpTransport, Transport};
use crate::auth::{request_headers, Authenticator, Credential, UserCredential};
use crate::models::token::bearer;
use crate::streaming::SessionBinder;
use crate::{AuthOutcome, CustomerNumber, Error, Result, SessionState};

/// The main client for the GTN API.
///
/// Owns one [`Authenticator`] and the [`Transport`] every call goes
/// through. Cloning is cheap; clones share the session.
///
/// # Example
///
/// ```no_run
/// use gtn_rs::{ClientConfig, Credential, CustomerNumber, GtnClient};
///
/// # async fn example() -> gtn_rs::Result<()> {
/// let client = GtnClient::connect(
///     "https://api.example.com",
///     Credential::from_env()?,
///     ClientConfig::default(),
/// )?;
///
/// let outcome = client.init().await?;
/// if outcome.is_success() {
///     let customer = CustomerNumber::new("100234");
///     client.init_customer(customer.clone()).await;
///
///     let response = client.get("/trade/accounts", Some(&customer)).await?;
///     println!("{} {}", response.status, response.body);
/// }
///
/// client.stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GtnClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    auth: Authenticator,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    api_url: Option<String>,
}

/// Status and decoded body of an API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// JSON body; `Null` when empty, a string when not JSON
    pub body: Value,
}

impl ApiResponse {
    fn from_raw(status: u16, body: &str) -> Self {
        let trimmed = body.trim();
        let body = if trimmed.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(body.to_string()))
        };
        Self { status, body }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl GtnClient {
    /// Create a client that talks to `api_url` over HTTP.
    ///
    /// No network call is made until [`init`](Self::init) or
    /// [`login_user`](Self::login_user).
    pub fn connect(
        api_url: impl AsRef<str>,
        credential: Credential,
        config: ClientConfig,
    ) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(api_url.as_ref(), &config)?);
        let api_url = Some(api_url.as_ref().trim().to_string());
        Ok(Self::build(credential, transport, config, api_url))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(
        credential: Credential,
        transport: Arc<dyn Transport>,
        config: ClientConfig,
    ) -> Self {
        Self::build(credential, transport, config, None)
    }

    fn build(
        credential: Credential,
        transport: Arc<dyn Transport>,
        config: ClientConfig,
        api_url: Option<String>,
    ) -> Self {
        let auth = Authenticator::new(credential, transport.clone(), config.clone());
        Self {
            inner: Arc::new(ClientInner {
                auth,
                transport,
                config,
                api_url,
            }),
        }
    }

    /// Log in as the institution. See [`Authenticator::init`].
    pub async fn init(&self) -> Result<AuthOutcome> {
        self.inner.auth.init().await
    }

    /// Log in a customer. See [`Authenticator::init_customer`].
    pub async fn init_customer(&self, customer: impl Into<CustomerNumber>) -> AuthOutcome {
        self.inner.auth.init_customer(customer).await
    }

    /// Log in with a login name and password. See [`Authenticator::login_user`].
    pub async fn login_user(&self, user: UserCredential) -> Result<AuthOutcome> {
        self.inner.auth.login_user(user).await
    }

    /// Remove a customer's session.
    pub async fn logout_customer(&self, customer: &CustomerNumber) -> Result<()> {
        self.inner.auth.logout_customer(customer).await
    }

    /// Stop the refresh scheduler and drop every session.
    pub async fn stop(&self) {
        self.inner.auth.stop().await
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.inner.auth.state().await
    }

    /// Returns `true` if the customer has a session with a live access token.
    pub async fn is_customer_valid(&self, customer: &CustomerNumber) -> bool {
        self.inner.auth.is_customer_valid(customer).await
    }

    /// Customer numbers with a live session.
    pub async fn active_customers(&self) -> Vec<CustomerNumber> {
        self.inner.auth.active_customers().await
    }

    /// The customer's current access token.
    pub async fn customer_access_token(&self, customer: &CustomerNumber) -> Result<SecretString> {
        self.inner.auth.customer_access_token(customer).await
    }

    /// The underlying authenticator.
    pub fn auth(&self) -> &Authenticator {
        &self.inner.auth
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// A binder resolving the latest tokens for streaming connections.
    pub fn binder(&self) -> SessionBinder {
        SessionBinder::new(
            self.inner.auth.server_store().clone(),
            self.inner.auth.registry().clone(),
        )
    }

    /// Market-data streaming services over WebSocket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the client was built without an API URL.
    #[cfg(feature = "streaming")]
    pub fn streaming(&self) -> Result<crate::streaming::StreamingServices> {
        let api_url = self.inner.api_url.as_deref().ok_or_else(|| {
            Error::Config("streaming requires a client created with an API URL".to_string())
        })?;
        let transport = Arc::new(crate::streaming::WebSocketTransport::new(api_url)?);
        Ok(self.streaming_with(transport))
    }

    /// Trade streaming services over server-sent events.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the client was built without an API URL.
    #[cfg(feature = "streaming")]
    pub fn trade_streaming(&self) -> Result<crate::streaming::StreamingServices> {
        let api_url = self.inner.api_url.as_deref().ok_or_else(|| {
            Error::Config("trade streaming requires a client created with an API URL".to_string())
        })?;
        let transport = Arc::new(crate::streaming::SseTransport::new(api_url, &self.inner.config)?);
        Ok(self.streaming_with(transport))
    }

    /// Streaming services over a custom transport.
    pub fn streaming_with(
        &self,
        transport: Arc<dyn crate::streaming::StreamingTransport>,
    ) -> crate::streaming::StreamingServices {
        crate::streaming::StreamingServices::new(
            self.binder(),
            transport,
            self.inner.auth.credential().app_key(),
        )
    }

    /// Send a GET request as `customer`, or as the server when `None`.
    pub async fn get(&self, path: &str, customer: Option<&CustomerNumber>) -> Result<ApiResponse> {
        self.request(Method::GET, path, customer, None).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(
        &self,
        path: &str,
        customer: Option<&CustomerNumber>,
        body: &Value,
    ) -> Result<ApiResponse> {
        self.request(Method::POST, path, customer, Some(body)).await
    }

    /// Send a PATCH request with a JSON body.
    pub async fn patch(
        &self,
        path: &str,
        customer: Option<&CustomerNumber>,
        body: &Value,
    ) -> Result<ApiResponse> {
        self.request(Method::PATCH, path, customer, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(
        &self,
        path: &str,
        customer: Option<&CustomerNumber>,
    ) -> Result<ApiResponse> {
        self.request(Method::DELETE, path, customer, None).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        customer: Option<&CustomerNumber>,
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        let token = match customer {
            Some(customer) => self.inner.auth.customer_access_token(customer).await?,
            None => self
                .inner
                .auth
                .server_access_token()
                .await
                .ok_or(Error::NotActive)?,
        };

        let authorization = bearer(&token);
        let headers = request_headers(
            self.inner.auth.credential().app_key(),
            &self.inner.config.user_agent,
            Some(&authorization),
        )?;

        debug!(method = %method, path, "API request");
        let response = self.inner.transport.send(method, path, headers, body).await?;
        Ok(ApiResponse::from_raw(response.status, &response.body))
    }
}

impl std::fmt::Debug for GtnClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GtnClient")
            .field("auth", &self.inner.auth)
            .field("api_url", &self.inner.api_url)
            .finish_non_exhaustive()
    }
}
