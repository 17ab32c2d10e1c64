//! Token exchange calls.
//!
//! Stateless request/response wrappers around the token endpoints. Every
//! call resolves its path from the channel endpoint table, sends through
//! the [`Transport`], and classifies the reply as an [`ExchangeOutcome`].

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::assertion::Assertion;
use super::credential::{Credential, UserCredential};
use super::password::{hash_password, PASSWORD_ENCRYPTION_TYPE};
use crate::client::{ClientConfig, EndpointTable, RawResponse, TokenOperation, Transport};
use crate::error::describe_body;
use crate::models::token::{bearer, status_is_success};
use crate::{AuthOutcome, Channel, CustomerNumber, Error, Result, TokenPair};

/// Header carrying the app key for rate limiting (`Throttle-Key`).
pub const THROTTLE_KEY_HEADER: &str = "throttle-key";

/// Classified result of one token exchange.
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// The server issued a token pair
    Success {
        /// HTTP status
        status: u16,
        /// Issued tokens
        tokens: TokenPair,
    },
    /// A 2xx reply whose `status` field reports failure (e.g. `FAILED`)
    ServerFailed {
        /// HTTP status
        status: u16,
        /// Server-reported status value
        server_status: String,
    },
    /// The server rejected the request, or replied without a token
    AuthRejected {
        /// HTTP status
        status: u16,
        /// Server description; `None` when the body was empty
        description: Option<String>,
    },
    /// No HTTP status was obtained
    TransportFailure(Error),
}

impl ExchangeOutcome {
    /// Classify a raw reply.
    pub fn from_response(response: RawResponse) -> Self {
        let status = response.status;
        let trimmed = response.body.trim();
        let value: Option<Value> = serde_json::from_str(trimmed).ok();

        let empty = match &value {
            None => trimmed.is_empty(),
            Some(Value::Null) => true,
            Some(Value::Object(map)) => map.is_empty(),
            Some(_) => false,
        };

        if !response.is_success() {
            return ExchangeOutcome::AuthRejected {
                status,
                description: (!empty).then(|| describe_body(trimmed)),
            };
        }
        if empty {
            return ExchangeOutcome::AuthRejected {
                status,
                description: None,
            };
        }

        let Some(value) = value else {
            return ExchangeOutcome::AuthRejected {
                status,
                description: Some("token response is not JSON".to_string()),
            };
        };

        let server_status = value.get("status").and_then(Value::as_str);
        if !status_is_success(server_status) {
            return ExchangeOutcome::ServerFailed {
                status,
                server_status: server_status.unwrap_or_default().to_string(),
            };
        }

        match serde_json::from_value::<TokenPair>(value) {
            Ok(tokens) => ExchangeOutcome::Success { status, tokens },
            Err(e) => ExchangeOutcome::AuthRejected {
                status,
                description: Some(format!("malformed token response: {e}")),
            },
        }
    }

    /// Returns `true` if tokens were issued.
    pub fn is_success(&self) -> bool {
        matches!(self, ExchangeOutcome::Success { .. })
    }

    /// HTTP status reported in a failed [`AuthOutcome`].
    ///
    /// The server's status is passed through only for non-2xx replies that
    /// carried a body; every other failure reports `-1`.
    pub fn failure_http_status(&self) -> i32 {
        match self {
            ExchangeOutcome::AuthRejected {
                status,
                description: Some(_),
            } if !(200..300).contains(status) => i32::from(*status),
            _ => AuthOutcome::NO_STATUS,
        }
    }

    /// Convert a failed outcome into an [`Error`] for logging or propagation.
    pub fn into_error(self) -> Option<Error> {
        match self {
            ExchangeOutcome::Success { .. } => None,
            ExchangeOutcome::ServerFailed {
                status,
                server_status,
            } => Some(Error::AuthFailure {
                status,
                description: format!("server reported status {server_status}"),
            }),
            ExchangeOutcome::AuthRejected {
                status,
                description,
            } => Some(Error::AuthFailure {
                status,
                description: description.unwrap_or_else(|| "empty token response".to_string()),
            }),
            ExchangeOutcome::TransportFailure(e) => Some(e),
        }
    }
}

/// Client for the token endpoints of one channel.
#[derive(Clone)]
pub struct TokenExchangeClient {
    transport: Arc<dyn Transport>,
    endpoints: EndpointTable,
    channel: Channel,
    app_key: String,
    basic_auth: SecretString,
    user_agent: String,
}

impl TokenExchangeClient {
    /// Create an exchange client for the credential's channel.
    pub fn new(transport: Arc<dyn Transport>, credential: &Credential, config: &ClientConfig) -> Self {
        Self {
            transport,
            endpoints: config.endpoints.clone(),
            channel: credential.channel().clone(),
            app_key: credential.app_key().to_string(),
            basic_auth: SecretString::from(credential.basic_auth()),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Exchange a signed assertion for a server token.
    pub async fn issue_server_token(&self, assertion: &Assertion) -> ExchangeOutcome {
        let body = json!({ "assertion": assertion.as_str() });
        self.exchange(
            TokenOperation::ServerToken,
            Some(self.basic_auth.expose_secret()),
            &body,
        )
        .await
    }

    /// Exchange the server refresh token for a new server token.
    pub async fn refresh_server_token(
        &self,
        refresh_token: &SecretString,
        access_token: &SecretString,
    ) -> ExchangeOutcome {
        let body = json!({ "refreshToken": refresh_token.expose_secret() });
        let bearer = bearer(access_token);
        self.exchange(TokenOperation::ServerTokenRefresh, Some(&bearer), &body)
            .await
    }

    /// Exchange a customer number and the server access token for a
    /// customer token.
    pub async fn issue_customer_token(
        &self,
        customer: &CustomerNumber,
        server_access_token: &SecretString,
    ) -> ExchangeOutcome {
        let body = json!({
            "customerNumber": customer.as_str(),
            "accessToken": server_access_token.expose_secret(),
        });
        self.exchange(
            TokenOperation::CustomerToken,
            Some(self.basic_auth.expose_secret()),
            &body,
        )
        .await
    }

    /// Exchange a customer refresh token for a new customer token.
    ///
    /// `access_token` authenticates the call: the server access token in
    /// institution mode, the customer's own token in user mode.
    pub async fn refresh_customer_token(
        &self,
        refresh_token: &SecretString,
        access_token: &SecretString,
    ) -> ExchangeOutcome {
        let body = json!({ "refreshToken": refresh_token.expose_secret() });
        let bearer = bearer(access_token);
        self.exchange(TokenOperation::CustomerTokenRefresh, Some(&bearer), &body)
            .await
    }

    /// Log in with a login name and password.
    pub async fn issue_user_token(&self, user: &UserCredential) -> ExchangeOutcome {
        let body = json!({
            "loginName": user.login_name(),
            "password": hash_password(user.password().expose_secret()),
            "institutionCode": user.institution(),
            "encryptionType": PASSWORD_ENCRYPTION_TYPE,
        });
        self.exchange(TokenOperation::UserLogin, None, &body).await
    }

    async fn exchange(
        &self,
        operation: TokenOperation,
        authorization: Option<&str>,
        body: &Value,
    ) -> ExchangeOutcome {
        let Some(path) = self.endpoints.resolve(&self.channel, operation) else {
            return ExchangeOutcome::TransportFailure(Error::Config(format!(
                "no endpoint for {}_{}",
                self.channel, operation
            )));
        };

        let headers = match self.headers(authorization) {
            Ok(headers) => headers,
            Err(e) => return ExchangeOutcome::TransportFailure(e),
        };

        debug!(operation = %operation, channel = %self.channel, path, "Token exchange");

        match self
            .transport
            .send(Method::POST, path, headers, Some(body))
            .await
        {
            Ok(response) => {
                let outcome = ExchangeOutcome::from_response(response);
                if !outcome.is_success() {
                    debug!(operation = %operation, outcome = ?outcome, "Token exchange unsuccessful");
                }
                outcome
            }
            Err(e) => {
                warn!(operation = %operation, error = %e, "Token exchange transport failure");
                ExchangeOutcome::TransportFailure(e)
            }
        }
    }

    fn headers(&self, authorization: Option<&str>) -> Result<HeaderMap> {
        request_headers(&self.app_key, &self.user_agent, authorization)
    }
}

impl std::fmt::Debug for TokenExchangeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExchangeClient")
            .field("channel", &self.channel)
            .field("app_key", &self.app_key)
            .finish()
    }
}

/// Headers sent on every call: JSON content type, throttle key, user agent,
/// and the optional `Authorization` value.
pub(crate) fn request_headers(
    app_key: &str,
    user_agent: &str,
    authorization: Option<&str>,
) -> Result<HeaderMap> {
    let invalid = |name: &str| Error::InvalidInput(format!("invalid {name} header value"));

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        THROTTLE_KEY_HEADER,
        HeaderValue::from_str(app_key).map_err(|_| invalid("Throttle-Key"))?,
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent).map_err(|_| invalid("User-Agent"))?,
    );

    if let Some(authorization) = authorization {
        let mut value = HeaderValue::from_str(authorization).map_err(|_| invalid("Authorization"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::testing::StubTransport;
    use chrono::Utc;

    fn credential(channel: Channel) -> Credential {
        Credential::builder()
            .app_key("K")
            .app_secret("S")
            .private_key(include_str!("../../tests/fixtures/test_private_key.b64"))
            .institution("INST")
            .user_id("svc")
            .channel(channel)
            .build()
            .unwrap()
    }

    fn token_body(status: Option<&str>) -> Value {
        let now = Utc::now().timestamp_millis();
        let mut body = json!({
            "accessToken": "A",
            "refreshToken": "R",
            "accessTokenExpiresAt": now + 90_000,
            "refreshTokenExpiresAt": now + 999_999,
        });
        if let Some(status) = status {
            body["status"] = json!(status);
        }
        body
    }

    #[test]
    fn test_classify_success() {
        let outcome =
            ExchangeOutcome::from_response(RawResponse::new(200, token_body(None).to_string()));
        assert!(outcome.is_success());
    }

    #[test]
    fn test_classify_empty_and_rejected() {
        let outcome = ExchangeOutcome::from_response(RawResponse::new(200, ""));
        assert!(matches!(outcome, ExchangeOutcome::AuthRejected { status: 200, description: None }));
        assert_eq!(outcome.failure_http_status(), -1);

        let outcome = ExchangeOutcome::from_response(RawResponse::new(401, "{}"));
        assert!(matches!(outcome, ExchangeOutcome::AuthRejected { status: 401, description: None }));
        assert_eq!(outcome.failure_http_status(), -1);

        let outcome =
            ExchangeOutcome::from_response(RawResponse::new(403, r#"{"message":"locked"}"#));
        match &outcome {
            ExchangeOutcome::AuthRejected {
                status,
                description,
            } => {
                assert_eq!(*status, 403);
                assert_eq!(description.as_deref(), Some("locked"));
            }
            other => panic!("Expected AuthRejected, got {:?}", other),
        }
        assert_eq!(outcome.failure_http_status(), 403);
    }

    #[test]
    fn test_classify_server_failed() {
        let outcome = ExchangeOutcome::from_response(RawResponse::new(
            200,
            json!({"status": "FAILED"}).to_string(),
        ));
        assert!(matches!(
            outcome,
            ExchangeOutcome::ServerFailed { status: 200, ref server_status } if server_status == "FAILED"
        ));
        assert_eq!(outcome.failure_http_status(), -1);
    }

    #[test]
    fn test_classify_missing_fields() {
        let outcome = ExchangeOutcome::from_response(RawResponse::new(
            200,
            json!({"accessToken": "A"}).to_string(),
        ));
        assert!(matches!(
            outcome,
            ExchangeOutcome::AuthRejected { status: 200, description: Some(_) }
        ));
    }

    #[tokio::test]
    async fn test_issue_server_token_request_shape() {
        let stub = Arc::new(StubTransport::new());
        stub.reply("/trade/auth/token", 200, token_body(Some("SUCCESS")));

        let credential = credential(Channel::trade());
        let client = TokenExchangeClient::new(stub.clone(), &credential, &ClientConfig::default());
        let assertion = super::super::assertion::sign(&credential, Utc::now()).unwrap();

        let outcome = client.issue_server_token(&assertion).await;
        assert!(outcome.is_success());

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers[AUTHORIZATION], "Basic SzpT");
        assert_eq!(request.headers[THROTTLE_KEY_HEADER], "K");
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert!(request.headers.contains_key(USER_AGENT));
        assert_eq!(
            request.body.as_ref().unwrap()["assertion"],
            json!(assertion.as_str())
        );
    }

    #[tokio::test]
    async fn test_dwm_channel_paths_and_bearer() {
        let stub = Arc::new(StubTransport::new());
        stub.reply(
            "/microinvest/v1.0/auth/client/refresh-token",
            200,
            token_body(None),
        );

        let client = TokenExchangeClient::new(
            stub.clone(),
            &credential(Channel::dwm()),
            &ClientConfig::default(),
        );
        let outcome = client
            .refresh_customer_token(
                &SecretString::from("R1".to_string()),
                &SecretString::from("SERVER-A".to_string()),
            )
            .await;
        assert!(outcome.is_success());

        let request = &stub.requests()[0];
        assert_eq!(request.headers[AUTHORIZATION], "Bearer SERVER-A");
        assert_eq!(request.body.as_ref().unwrap()["refreshToken"], "R1");
    }

    #[tokio::test]
    async fn test_user_login_hashes_password() {
        let stub = Arc::new(StubTransport::new());
        stub.reply("/trade/auth/user-login", 200, token_body(Some("SUCCESS")));

        let client = TokenExchangeClient::new(
            stub.clone(),
            &credential(Channel::trade()),
            &ClientConfig::default(),
        );
        let user = UserCredential::new("jdoe", "secret", "INST");
        assert!(client.issue_user_token(&user).await.is_success());

        let request = &stub.requests()[0];
        let body = request.body.as_ref().unwrap();
        assert_eq!(body["loginName"], "jdoe");
        assert_eq!(body["password"], json!(hash_password("secret")));
        assert_eq!(body["institutionCode"], "INST");
        assert_eq!(body["encryptionType"], 2);
        assert!(!request.headers.contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_transport_failure() {
        let stub = Arc::new(StubTransport::new());
        let client = TokenExchangeClient::new(
            stub.clone(),
            &credential(Channel::dwm()),
            &ClientConfig::default(),
        );

        let outcome = client
            .issue_user_token(&UserCredential::new("jdoe", "pw", "INST"))
            .await;
        assert!(matches!(
            outcome,
            ExchangeOutcome::TransportFailure(Error::Config(_))
        ));
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_is_transport_failure() {
        let stub = Arc::new(StubTransport::new());
        stub.fail("/trade/auth/customer/token", "connection reset");

        let client = TokenExchangeClient::new(
            stub.clone(),
            &credential(Channel::trade()),
            &ClientConfig::default(),
        );
        let outcome = client
            .issue_customer_token(
                &CustomerNumber::new("C1"),
                &SecretString::from("A".to_string()),
            )
            .await;

        assert!(matches!(
            outcome,
            ExchangeOutcome::TransportFailure(Error::Transport(_))
        ));
        assert_eq!(outcome.failure_http_status(), -1);
    }
}
