//! Authentication and session-token lifecycle.
//!
//! Three login flows are supported:
//!
//! 1. **Institution** - a signed assertion is exchanged for a server token
//! 2. **Customer** - a customer number is exchanged for a customer token on
//!    top of the server session
//! 3. **User** - a login name and hashed password are exchanged for a
//!    customer token directly
//!
//! A successful institution or user login starts a background refresh
//! scheduler that renews access tokens before they expire and evicts
//! sessions whose refresh token runs out.
//!
//! # Institution and customer login
//!
//! ```no_run
//! use std::sync::Arc;
//! use gtn_rs::auth::Authenticator;
//! use gtn_rs::client::HttpTransport;
//! use gtn_rs::{ClientConfig, Credential};
//!
//! # async fn example() -> gtn_rs::Result<()> {
//! let config = ClientConfig::default();
//! let transport = Arc::new(HttpTransport::new("https://api.example.com", &config)?);
//! let auth = Authenticator::new(Credential::from_env()?, transport, config);
//!
//! let outcome = auth.init().await?;
//! println!("{} {}", outcome.http_status, outcome.auth_status);
//!
//! let outcome = auth.init_customer("100234").await;
//! assert!(outcome.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! # User login
//!
//! ```no_run
//! use std::sync::Arc;
//! use gtn_rs::auth::{Authenticator, UserCredential};
//! use gtn_rs::client::HttpTransport;
//! use gtn_rs::{ClientConfig, Credential};
//!
//! # async fn example() -> gtn_rs::Result<()> {
//! let config = ClientConfig::default();
//! let transport = Arc::new(HttpTransport::new("https://api.example.com", &config)?);
//! let auth = Authenticator::new(Credential::from_env()?, transport, config);
//!
//! let user = UserCredential::new("jdoe", "password", "INST");
//! let outcome = auth.login_user(user).await?;
//! # Ok(())
//! # }
//! ```

mod assertion;
mod authenticator;
mod credential;
mod exchange;
mod password;
mod scheduler;
mod store;

pub use assertion::{sign, Assertion, AssertionClaims, ASSERTION_VALIDITY_HOURS};
pub use authenticator::Authenticator;
pub use credential::{Credential, CredentialBuilder, UserCredential};
pub use exchange::{ExchangeOutcome, TokenExchangeClient, THROTTLE_KEY_HEADER};
pub use password::{hash_password, PASSWORD_ENCRYPTION_TYPE};
pub use store::{CustomerSession, LoginOrigin, SessionRegistry, SessionStore};

pub(crate) use exchange::request_headers;
