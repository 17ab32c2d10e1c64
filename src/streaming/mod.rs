//! Streaming connections bound to the current session token.
//!
//! Stream transports are external collaborators behind [`StreamingTransport`].
//! [`StreamingServices::connect`] looks up the latest access token through
//! the [`SessionBinder`] at connect time and hands it to the transport.
//! Events come back, in order, as [`StreamEvent`]s on an [`EventStream`].
//!
//! # Example
//!
//! ```no_run
//! use gtn_rs::streaming::StreamEvent;
//!
//! # async fn example(client: gtn_rs::GtnClient) -> gtn_rs::Result<()> {
//! let mut stream = client.streaming()?.connect("/market-data/price", None).await?;
//!
//! while let Some(event) = stream.next().await {
//!     match event {
//!         StreamEvent::Message(payload) => println!("{payload}"),
//!         StreamEvent::Error(error) => eprintln!("{error}"),
//!         StreamEvent::Close(_) => break,
//!         StreamEvent::Open => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod binder;
mod events;
#[cfg(feature = "streaming")]
mod sse;
#[cfg(feature = "streaming")]
mod websocket;

pub use binder::SessionBinder;
pub use events::{EventStream, StreamCommand, StreamEvent, StreamPipe, DEFAULT_EVENT_CAPACITY};
#[cfg(feature = "streaming")]
pub use sse::SseTransport;
#[cfg(feature = "streaming")]
pub use websocket::WebSocketTransport;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::debug;

use crate::{CustomerNumber, Error, Result};

/// Everything a transport needs to open one stream.
#[derive(Clone)]
pub struct StreamRequest {
    /// Endpoint path, relative to the API host
    pub endpoint: String,
    /// Event filter sent as the `events` query parameter
    pub events: Option<String>,
    /// Access token resolved at connect time
    pub token: SecretString,
    /// App key, sent as the throttle key
    pub app_key: String,
}

impl StreamRequest {
    /// `Bearer <token>`.
    pub fn bearer(&self) -> String {
        crate::models::token::bearer(&self.token)
    }
}

impl std::fmt::Debug for StreamRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRequest")
            .field("endpoint", &self.endpoint)
            .field("events", &self.events)
            .field("token", &"[REDACTED]")
            .field("app_key", &self.app_key)
            .finish()
    }
}

/// Opens streams. Implementations own framing and connection teardown.
#[async_trait]
pub trait StreamingTransport: Send + Sync {
    /// Open a stream and start delivering events.
    async fn open(&self, request: StreamRequest) -> Result<EventStream>;
}

/// Access point for streaming connections.
#[derive(Clone)]
pub struct StreamingServices {
    binder: SessionBinder,
    transport: Arc<dyn StreamingTransport>,
    app_key: String,
}

impl StreamingServices {
    /// Create streaming services over a transport.
    pub fn new(
        binder: SessionBinder,
        transport: Arc<dyn StreamingTransport>,
        app_key: impl Into<String>,
    ) -> Self {
        Self {
            binder,
            transport,
            app_key: app_key.into(),
        }
    }

    /// Open a stream authenticated as `customer`, or as the server session
    /// when `customer` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSession`] if the customer has no session,
    /// [`Error::NotActive`] if no server session exists, or the transport's
    /// connection error.
    pub async fn connect(
        &self,
        endpoint: &str,
        customer: Option<&CustomerNumber>,
    ) -> Result<EventStream> {
        self.open(endpoint, None, customer).await
    }

    /// Like [`connect`](Self::connect), asking for the given events
    /// (for example `"ORDER,POSITION"`).
    pub async fn subscribe(
        &self,
        endpoint: &str,
        events: impl Into<String>,
        customer: Option<&CustomerNumber>,
    ) -> Result<EventStream> {
        self.open(endpoint, Some(events.into()), customer).await
    }

    async fn open(
        &self,
        endpoint: &str,
        events: Option<String>,
        customer: Option<&CustomerNumber>,
    ) -> Result<EventStream> {
        let token = self
            .binder
            .current_access_token(customer)
            .await
            .ok_or_else(|| match customer {
                Some(customer) => Error::UnknownSession(customer.to_string()),
                None => Error::NotActive,
            })?;

        debug!(endpoint, customer = ?customer.map(CustomerNumber::as_str), "Opening stream");
        self.transport
            .open(StreamRequest {
                endpoint: endpoint.to_string(),
                events,
                token,
                app_key: self.app_key.clone(),
            })
            .await
    }

    /// The binder used to resolve tokens.
    pub fn binder(&self) -> &SessionBinder {
        &self.binder
    }
}

impl std::fmt::Debug for StreamingServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingServices")
            .field("app_key", &self.app_key)
            .finish_non_exhaustive()
    }
}
