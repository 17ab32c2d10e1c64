//! Client configuration options.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::Channel;

/// Configuration for the GTN client.
///
/// # Example
///
/// ```
/// use gtn_rs::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_user_agent("my-app/1.0")
///     .with_cycle_interval(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// A token expiring within this margin is refreshed (access) or evicted (refresh)
    pub refresh_margin: Duration,
    /// Pause between two sessions inside one refresh cycle
    pub customer_gap: Duration,
    /// Pause at the end of each refresh cycle
    pub cycle_interval: Duration,
    /// Token endpoint paths per channel and operation
    pub endpoints: EndpointTable,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("gtn-rs/{} (Rust)", env!("CARGO_PKG_VERSION")),
            refresh_margin: Duration::from_secs(5),
            customer_gap: Duration::from_millis(100),
            cycle_interval: Duration::from_secs(10),
            endpoints: EndpointTable::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the expiry safety margin.
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Set the pause between sessions inside a refresh cycle.
    pub fn with_customer_gap(mut self, gap: Duration) -> Self {
        self.customer_gap = gap;
        self
    }

    /// Set the pause at the end of each refresh cycle.
    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    /// Override or add a token endpoint path.
    pub fn with_endpoint(
        mut self,
        channel: &Channel,
        operation: TokenOperation,
        path: impl Into<String>,
    ) -> Self {
        self.endpoints.insert(channel, operation, path);
        self
    }

    /// The refresh margin as a `chrono` duration, for expiry arithmetic.
    pub(crate) fn refresh_margin_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.refresh_margin).unwrap_or_else(|_| chrono::Duration::seconds(5))
    }
}

/// A token endpoint operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenOperation {
    /// Exchange an assertion for a server token
    ServerToken,
    /// Refresh the server token
    ServerTokenRefresh,
    /// Exchange a customer number for a customer token
    CustomerToken,
    /// Refresh a customer token
    CustomerTokenRefresh,
    /// User/password login
    UserLogin,
}

impl TokenOperation {
    /// The operation code used in endpoint table keys.
    pub fn code(&self) -> &'static str {
        match self {
            TokenOperation::ServerToken => "SERVER_TOKEN",
            TokenOperation::ServerTokenRefresh => "SERVER_TOKEN_REFRESH",
            TokenOperation::CustomerToken => "CUSTOMER_TOKEN",
            TokenOperation::CustomerTokenRefresh => "CUSTOMER_TOKEN_REFRESH",
            TokenOperation::UserLogin => "USER_LOGIN",
        }
    }
}

impl fmt::Display for TokenOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Token endpoint paths keyed by `{CHANNEL}_{OPERATION}`.
///
/// # Example
///
/// ```
/// use gtn_rs::{Channel, EndpointTable, TokenOperation};
///
/// let table = EndpointTable::default();
/// assert_eq!(
///     table.resolve(&Channel::trade(), TokenOperation::ServerToken),
///     Some("/trade/auth/token")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTable {
    paths: HashMap<String, String>,
}

impl Default for EndpointTable {
    fn default() -> Self {
        let mut table = Self::empty();
        let trade = Channel::trade();
        let dwm = Channel::dwm();

        table.insert(&trade, TokenOperation::ServerToken, "/trade/auth/token");
        table.insert(&trade, TokenOperation::ServerTokenRefresh, "/trade/auth/token/refresh");
        table.insert(&trade, TokenOperation::CustomerToken, "/trade/auth/customer/token");
        table.insert(
            &trade,
            TokenOperation::CustomerTokenRefresh,
            "/trade/auth/customer/token/refresh",
        );
        table.insert(&trade, TokenOperation::UserLogin, "/trade/auth/user-login");

        table.insert(&dwm, TokenOperation::ServerToken, "/microinvest/v1.0/auth/server/token");
        table.insert(
            &dwm,
            TokenOperation::ServerTokenRefresh,
            "/microinvest/v1.0/auth/server/refresh-token",
        );
        table.insert(&dwm, TokenOperation::CustomerToken, "/microinvest/v1.0/auth/client/token");
        table.insert(
            &dwm,
            TokenOperation::CustomerTokenRefresh,
            "/microinvest/v1.0/auth/client/refresh-token",
        );

        table
    }
}

impl EndpointTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            paths: HashMap::new(),
        }
    }

    /// Insert or replace a path.
    pub fn insert(&mut self, channel: &Channel, operation: TokenOperation, path: impl Into<String>) {
        self.paths.insert(Self::key(channel, operation), path.into());
    }

    /// Resolve the path for a channel and operation.
    pub fn resolve(&self, channel: &Channel, operation: TokenOperation) -> Option<&str> {
        self.paths
            .get(&Self::key(channel, operation))
            .map(String::as_str)
    }

    fn key(channel: &Channel, operation: TokenOperation) -> String {
        format!("{}_{}", channel.as_str(), operation.code())
    }
}
