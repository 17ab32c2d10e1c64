//! Client façade, configuration, and the transport seam.
//!
//! [`GtnClient`] is the main entry point: it owns the session and sends
//! authenticated API calls through a [`Transport`].
//!
//! # Example
//!
//! ```no_run
//! use gtn_rs::{ClientConfig, Credential, GtnClient};
//!
//! # async fn example() -> gtn_rs::Result<()> {
//! let client = GtnClient::connect(
//!     "https://api.example.com",
//!     Credential::from_env()?,
//!     ClientConfig::default(),
//! )?;
//!
//! let outcome = client.init().await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

mod config;
mod http;
pub(crate) mod transport;

pub use config::{ClientConfig, EndpointTable, TokenOperation};
pub use http::{ApiResponse, GtnClient};
pub use transport::{HttpTransport, RawResponse, Transport};
