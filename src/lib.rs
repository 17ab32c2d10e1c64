//! # gtn-rs
//!
//! Authentication and session-token lifecycle for the GTN trading API.
//!
//! This crate signs institution assertions, exchanges them for server and
//! customer access tokens, and keeps those tokens alive in a background
//! refresh task for as long as the process runs.
//!
//! ## Features
//!
//! - **Institution login**: RS256-signed assertions exchanged for a server token
//! - **Customer sessions**: per-customer tokens layered on the server session
//! - **User login**: login name and PBKDF2-hashed password
//! - **Automatic refresh**: a single task renews tokens before expiry and
//!   evicts sessions whose refresh token runs out
//! - **Streaming**: market-data WebSocket and trade SSE streams, both bound
//!   to the latest token
//! - **Pluggable transport**: every call goes through a [`client::Transport`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gtn_rs::{ClientConfig, Credential, CustomerNumber, GtnClient};
//!
//! #[tokio::main]
//! async fn main() -> gtn_rs::Result<()> {
//!     let credential = Credential::builder()
//!         .app_key("app-key")
//!         .app_secret("app-secret")
//!         .private_key("MIIEvQIBADANBg...")
//!         .institution("INST")
//!         .user_id("svc-user")
//!         .build()?;
//!
//!     let client = GtnClient::connect(
//!         "https://api.example.com",
//!         credential,
//!         ClientConfig::default(),
//!     )?;
//!
//!     // {"http_status": 200, "auth_status": "AUTH_SUCCESS"}
//!     let outcome = client.init().await?;
//!     println!("{}", serde_json::to_string(&outcome)?);
//!
//!     let customer = CustomerNumber::new("100234");
//!     let outcome = client.init_customer(customer.clone()).await;
//!     if outcome.is_success() {
//!         let response = client.get("/trade/accounts", Some(&customer)).await?;
//!         println!("{}", response.body);
//!     }
//!
//!     client.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming Example
//!
//! ```rust,no_run
//! use gtn_rs::streaming::StreamEvent;
//! use gtn_rs::{ClientConfig, Credential, GtnClient};
//!
//! #[tokio::main]
//! async fn main() -> gtn_rs::Result<()> {
//!     let client = GtnClient::connect(
//!         "https://api.example.com",
//!         Credential::from_env()?,
//!         ClientConfig::default(),
//!     )?;
//!     client.init().await?;
//!
//!     let mut stream = client
//!         .streaming()?
//!         .connect("/market-data/price", None)
//!         .await?;
//!
//!     while let Some(event) = stream.next().await {
//!         if let StreamEvent::Message(payload) = event {
//!             println!("{payload}");
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod streaming;

// Re-export primary types at crate root for convenience
pub use auth::{Authenticator, Credential, UserCredential};
pub use client::{ApiResponse, ClientConfig, EndpointTable, GtnClient, TokenOperation};
pub use error::{Error, Result};
pub use models::{AuthOutcome, AuthStatus, Channel, CustomerNumber, SessionState, TokenPair};

pub use streaming::StreamingServices;

/// Prelude module for convenient imports.
///
/// ```rust
/// use gtn_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::auth::{Authenticator, Credential, UserCredential};
    pub use crate::client::{ApiResponse, ClientConfig, GtnClient, Transport};
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        AuthOutcome, AuthStatus, Channel, CustomerNumber, SessionState, TokenPair,
    };
    pub use crate::streaming::{EventStream, SessionBinder, StreamEvent, StreamingServices};
}
