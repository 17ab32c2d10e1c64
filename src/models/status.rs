//! Authentication status codes and login outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status reported by a login flow.
///
/// Wire values match the platform's historical codes, including the
/// `SEVER_AUTH_FAILED` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthStatus {
    /// Login succeeded
    #[serde(rename = "AUTH_SUCCESS")]
    AuthSuccess,
    /// Generic authentication failure
    #[serde(rename = "AUTH_FAILED")]
    AuthFailed,
    /// The assertion could not be created
    #[serde(rename = "ASSERTION_ERROR")]
    AssertionError,
    /// The institution (server) login was rejected
    #[serde(rename = "SEVER_AUTH_FAILED")]
    ServerAuthFailed,
    /// The customer login was rejected
    #[serde(rename = "CUSTOMER_AUTH_FAILED")]
    CustomerAuthFailed,
    /// The server token was renewed
    #[serde(rename = "SERVER_TOKEN_RENEWED")]
    ServerTokenRenewed,
    /// The server token could not be renewed
    #[serde(rename = "SERVER_TOKEN_RENEW_FAILED")]
    ServerTokenRenewFailed,
    /// A customer token was renewed
    #[serde(rename = "CUSTOMER_TOKEN_RENEWED")]
    CustomerTokenRenewed,
    /// A customer token could not be renewed
    #[serde(rename = "CUSTOMER_TOKEN_RENEWED_FAILED")]
    CustomerTokenRenewFailed,
    /// The session has expired
    #[serde(rename = "AUTH_EXPIRED")]
    AuthExpired,
}

impl AuthStatus {
    /// The wire value of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::AuthSuccess => "AUTH_SUCCESS",
            AuthStatus::AuthFailed => "AUTH_FAILED",
            AuthStatus::AssertionError => "ASSERTION_ERROR",
            AuthStatus::ServerAuthFailed => "SEVER_AUTH_FAILED",
            AuthStatus::CustomerAuthFailed => "CUSTOMER_AUTH_FAILED",
            AuthStatus::ServerTokenRenewed => "SERVER_TOKEN_RENEWED",
            AuthStatus::ServerTokenRenewFailed => "SERVER_TOKEN_RENEW_FAILED",
            AuthStatus::CustomerTokenRenewed => "CUSTOMER_TOKEN_RENEWED",
            AuthStatus::CustomerTokenRenewFailed => "CUSTOMER_TOKEN_RENEWED_FAILED",
            AuthStatus::AuthExpired => "AUTH_EXPIRED",
        }
    }

    /// Returns `true` for statuses that represent success.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            AuthStatus::AuthSuccess
                | AuthStatus::ServerTokenRenewed
                | AuthStatus::CustomerTokenRenewed
        )
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a login attempt.
///
/// Serializes as `{"http_status": 200, "auth_status": "AUTH_SUCCESS"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOutcome {
    /// HTTP status of the decisive exchange, or `-1` when none applies
    pub http_status: i32,
    /// Outcome of the flow
    pub auth_status: AuthStatus,
}

impl AuthOutcome {
    /// Status used when no meaningful HTTP status exists.
    pub const NO_STATUS: i32 = -1;

    /// A successful outcome.
    pub fn success(http_status: u16) -> Self {
        Self {
            http_status: i32::from(http_status),
            auth_status: AuthStatus::AuthSuccess,
        }
    }

    /// A failed outcome without an HTTP status.
    pub fn failed(auth_status: AuthStatus) -> Self {
        Self {
            http_status: Self::NO_STATUS,
            auth_status,
        }
    }

    /// A failed outcome carrying the server's status.
    pub fn rejected(http_status: u16, auth_status: AuthStatus) -> Self {
        Self {
            http_status: i32::from(http_status),
            auth_status,
        }
    }

    /// Returns `true` if the login succeeded.
    pub fn is_success(&self) -> bool {
        self.auth_status.is_success()
    }
}

/// Lifecycle state of an authentication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// `init()` has not been called
    #[default]
    Uninitialized,
    /// A login flow is in progress
    Authenticating,
    /// A session is live and the refresh loop is running
    Active,
    /// The session ended (logout, eviction, or failed login); terminal
    LoggedOut,
}

impl SessionState {
    /// Returns `true` if the session is active.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Authenticating => write!(f, "authenticating"),
            SessionState::Active => write!(f, "active"),
            SessionState::LoggedOut => write!(f, "logged-out"),
        }
    }
}
