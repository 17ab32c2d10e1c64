//! Access/refresh token pairs as returned by the token endpoints.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::CustomerNumber;

/// Server status value that marks a token response as successful.
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// An access/refresh token pair with expiry times.
///
/// Deserialized from the token endpoint body. Expiries arrive as epoch
/// milliseconds under either `accessTokenExpiresAt`/`refreshTokenExpiresAt`
/// or the alternate `tokenExpiry`/`refreshTokenExpiry` names.
///
/// Token strings are kept as [`SecretString`] and are redacted from
/// `Debug` output.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "TokenWire")]
pub struct TokenPair {
    /// Short-lived bearer token
    pub access_token: SecretString,
    /// Long-lived token used to obtain a new access token
    pub refresh_token: SecretString,
    /// When the access token stops being accepted
    pub access_token_expires_at: DateTime<Utc>,
    /// When the refresh token stops being accepted
    pub refresh_token_expires_at: DateTime<Utc>,
    /// Server-reported status (`SUCCESS`, `FAILED`, ...)
    pub status: Option<String>,
    /// Customer number, returned by the user/password login
    pub customer_number: Option<CustomerNumber>,
}

impl TokenPair {
    /// Create a token pair without a server status.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        access_token_expires_at: DateTime<Utc>,
        refresh_token_expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
            access_token_expires_at,
            refresh_token_expires_at,
            status: None,
            customer_number: None,
        }
    }

    /// `true` if the access token expires less than `margin` after `now`.
    pub fn access_expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.access_token_expires_at - now < margin
    }

    /// `true` if the refresh token expires less than `margin` after `now`.
    pub fn refresh_expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.refresh_token_expires_at - now < margin
    }
}

/// `true` if a server status is absent or equals `SUCCESS` (any case).
pub(crate) fn status_is_success(status: Option<&str>) -> bool {
    status.map_or(true, |s| s.eq_ignore_ascii_case(STATUS_SUCCESS))
}

/// `Authorization` header value for an access token.
pub(crate) fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenWire {
    access_token: String,
    refresh_token: String,
    #[serde(alias = "tokenExpiry")]
    access_token_expires_at: i64,
    #[serde(alias = "refreshTokenExpiry")]
    refresh_token_expires_at: i64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    customer_number: Option<serde_json::Value>,
}

impl TryFrom<TokenWire> for TokenPair {
    type Error = String;

    fn try_from(wire: TokenWire) -> std::result::Result<Self, Self::Error> {
        let access_token_expires_at = DateTime::from_timestamp_millis(wire.access_token_expires_at)
            .ok_or_else(|| format!("access token expiry out of range: {}", wire.access_token_expires_at))?;
        let refresh_token_expires_at = DateTime::from_timestamp_millis(wire.refresh_token_expires_at)
            .ok_or_else(|| format!("refresh token expiry out of range: {}", wire.refresh_token_expires_at))?;

        // Some deployments send the customer number as a JSON number
        let customer_number = match wire.customer_number {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(CustomerNumber::new(s)),
            Some(serde_json::Value::Number(n)) => Some(CustomerNumber::new(n.to_string())),
            _ => None,
        };

        Ok(Self {
            access_token: SecretString::from(wire.access_token),
            refresh_token: SecretString::from(wire.refresh_token),
            access_token_expires_at,
            refresh_token_expires_at,
            status: wire.status,
            customer_number,
        })
    }
}
