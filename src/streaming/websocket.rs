//! WebSocket streaming transport.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use super::events::{EventStream, StreamCommand, StreamEvent, StreamPipe, DEFAULT_EVENT_CAPACITY};
use super::{StreamRequest, StreamingTransport};
use crate::{Error, Result};

/// Query parameter carrying the app key.
const THROTTLE_KEY_PARAM: &str = "throttle-key";
const EVENTS_PARAM: &str = "events";

/// Connects to `wss://<api host><endpoint>?throttle-key=<app key>`.
///
/// After the handshake the access token is sent as the first frame
/// (`{"token": "..."}`); frames are then pumped into the event stream.
/// Reconnecting is left to the caller.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    base: String,
}

impl WebSocketTransport {
    /// Derive the WebSocket base from the HTTP API URL (`https` becomes
    /// `wss`, `http` becomes `ws`).
    pub fn new(api_url: impl AsRef<str>) -> Result<Self> {
        let mut url = Url::parse(api_url.as_ref().trim())?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(Error::Config(format!(
                    "unsupported API URL scheme for streaming: {other}"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| Error::Config(format!("cannot stream over {}", url.scheme())))?;

        Ok(Self {
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// The WebSocket base URL.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Full connection URL for a request.
    pub fn url_for(&self, request: &StreamRequest) -> Result<Url> {
        let endpoint = request.endpoint.trim_start_matches('/');
        let mut url = Url::parse(&format!("{}/{}", self.base, endpoint))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(THROTTLE_KEY_PARAM, &request.app_key);
            if let Some(events) = &request.events {
                query.append_pair(EVENTS_PARAM, events);
            }
        }
        Ok(url)
    }

    async fn pump<S>(mut socket: S, mut pipe: StreamPipe)
    where
        S: futures_util::Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
            + futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
            + Unpin,
    {
        loop {
            tokio::select! {
                frame = socket.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if !pipe.emit(classify_frame(&text)).await {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by server".to_string());
                        info!(reason = %reason, "Stream closed by server");
                        pipe.emit(StreamEvent::Close(reason)).await;
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "Stream error");
                        pipe.emit(StreamEvent::Error(json!({ "message": e.to_string() }))).await;
                        pipe.emit(StreamEvent::Close(e.to_string())).await;
                        return;
                    }
                    None => {
                        pipe.emit(StreamEvent::Close("connection ended".to_string())).await;
                        return;
                    }
                },
                command = pipe.next_command() => match command {
                    Some(StreamCommand::Send(payload)) => {
                        if let Err(e) = socket.send(Message::Text(payload.to_string())).await {
                            warn!(error = %e, "Failed to send stream frame");
                            pipe.emit(StreamEvent::Error(json!({ "message": e.to_string() }))).await;
                        }
                    }
                    Some(StreamCommand::Close) | None => {
                        let _ = socket.close().await;
                        debug!("Stream closed by client");
                        pipe.emit(StreamEvent::Close("closed by client".to_string())).await;
                        return;
                    }
                },
            }
        }
    }
}

#[async_trait]
impl StreamingTransport for WebSocketTransport {
    async fn open(&self, request: StreamRequest) -> Result<EventStream> {
        let url = self.url_for(&request)?;

        let mut handshake = url.as_str().into_client_request()?;
        let bearer = HeaderValue::from_str(&request.bearer())
            .map_err(|_| Error::InvalidInput("invalid access token".to_string()))?;
        handshake.headers_mut().insert(AUTHORIZATION, bearer);

        info!(endpoint = %request.endpoint, "Connecting stream");
        let (mut socket, _) = connect_async(handshake).await?;

        let auth = json!({ "token": request.token.expose_secret() });
        socket.send(Message::Text(auth.to_string())).await?;

        let (stream, pipe) = EventStream::channel(DEFAULT_EVENT_CAPACITY);
        pipe.emit(StreamEvent::Open).await;
        tokio::spawn(Self::pump(socket, pipe));

        Ok(stream)
    }
}

/// `{"event": "ERROR", ...}` frames become errors; other JSON becomes a
/// message; non-JSON text is passed through as a string.
pub(super) fn classify_frame(text: &str) -> StreamEvent {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => {
            let is_error = value
                .get("event")
                .and_then(Value::as_str)
                .is_some_and(|event| event.eq_ignore_ascii_case("ERROR"));
            if is_error {
                StreamEvent::Error(value)
            } else {
                StreamEvent::Message(value)
            }
        }
        Err(_) => StreamEvent::Message(Value::String(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn request(endpoint: &str) -> StreamRequest {
        StreamRequest {
            endpoint: endpoint.to_string(),
            events: None,
            token: SecretString::from("A".to_string()),
            app_key: "K".to_string(),
        }
    }

    #[test]
    fn test_scheme_mapping() {
        let transport = WebSocketTransport::new("https://api.example.com/").unwrap();
        assert_eq!(transport.base_url(), "wss://api.example.com");

        let transport = WebSocketTransport::new("http://localhost:8080").unwrap();
        assert_eq!(transport.base_url(), "ws://localhost:8080");

        assert!(matches!(
            WebSocketTransport::new("ftp://example.com"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_url_carries_throttle_key() {
        let transport = WebSocketTransport::new("https://api.example.com").unwrap();
        let url = transport.url_for(&request("/market-data/ws")).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://api.example.com/market-data/ws?throttle-key=K"
        );

        let mut filtered = request("market-data/ws");
        filtered.events = Some("TRADE".to_string());
        assert_eq!(
            transport.url_for(&filtered).unwrap().as_str(),
            "wss://api.example.com/market-data/ws?throttle-key=K&events=TRADE"
        );
    }

    #[test]
    fn test_classify_frame() {
        assert_eq!(
            classify_frame(r#"{"symbol":"AAPL"}"#),
            StreamEvent::Message(json!({"symbol": "AAPL"}))
        );
        assert!(matches!(
            classify_frame(r#"{"event":"ERROR","message":"bad token"}"#),
            StreamEvent::Error(_)
        ));
        assert_eq!(
            classify_frame("ping"),
            StreamEvent::Message(Value::String("ping".into()))
        );
    }
}
