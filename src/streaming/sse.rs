//! Server-sent events transport, used by the trade stream.

use std::fmt::Display;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use super::events::{EventStream, StreamCommand, StreamEvent, StreamPipe, DEFAULT_EVENT_CAPACITY};
use super::websocket::classify_frame;
use super::{StreamRequest, StreamingTransport};
use crate::auth::THROTTLE_KEY_HEADER;
use crate::client::ClientConfig;
use crate::error::describe_body;
use crate::{Error, Result};

const EVENTS_PARAM: &str = "events";
const DATA_PREFIX: &str = "data:";

/// Opens `GET <api><endpoint>?events=<events>` and reads the response as an
/// event stream.
///
/// Each `data:` line is decoded like a WebSocket frame: JSON with
/// `"event": "ERROR"` becomes [`StreamEvent::Error`], anything else a
/// [`StreamEvent::Message`]. Other SSE fields are ignored. The stream is
/// receive-only; [`EventStream::send`] yields an error event.
///
/// # Example
///
/// ```no_run
/// # async fn example(client: gtn_rs::GtnClient) -> gtn_rs::Result<()> {
/// let trade = client.trade_streaming()?;
/// let mut stream = trade
///     .subscribe("/trade/sse/v1.0/stream", "ORDER,POSITION", None)
///     .await?;
/// while let Some(event) = stream.next().await {
///     println!("{:?}", event);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SseTransport {
    http: reqwest::Client,
    base: String,
}

impl SseTransport {
    /// Create a transport for `api_url`. Only the connect phase is bounded by
    /// the configured timeout; an open stream may stay idle indefinitely.
    pub fn new(api_url: impl AsRef<str>, config: &ClientConfig) -> Result<Self> {
        let base = api_url.as_ref().trim().trim_end_matches('/').to_string();
        Url::parse(&base)?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { http, base })
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Full request URL for a stream.
    pub fn url_for(&self, request: &StreamRequest) -> Result<Url> {
        let endpoint = request.endpoint.trim_start_matches('/');
        let mut url = Url::parse(&format!("{}/{}", self.base, endpoint))?;
        if let Some(events) = &request.events {
            url.query_pairs_mut().append_pair(EVENTS_PARAM, events);
        }
        Ok(url)
    }

    async fn pump<S, B, E>(mut body: S, mut pipe: StreamPipe)
    where
        S: Stream<Item = std::result::Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Display,
    {
        let mut lines = LineBuffer::default();

        loop {
            tokio::select! {
                chunk = body.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for line in lines.push(bytes.as_ref()) {
                            if let Some(event) = classify_line(&line) {
                                if !pipe.emit(event).await {
                                    return;
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Trade stream error");
                        pipe.emit(StreamEvent::Error(json!({ "message": e.to_string() }))).await;
                        pipe.emit(StreamEvent::Close(e.to_string())).await;
                        return;
                    }
                    None => {
                        if let Some(event) = lines.finish().as_deref().and_then(classify_line) {
                            pipe.emit(event).await;
                        }
                        info!("Trade stream ended by server");
                        pipe.emit(StreamEvent::Close("Session closed".to_string())).await;
                        return;
                    }
                },
                command = pipe.next_command() => match command {
                    Some(StreamCommand::Send(_)) => {
                        warn!("Trade stream is receive-only; message dropped");
                        pipe.emit(StreamEvent::Error(json!({ "message": "stream does not accept messages" }))).await;
                    }
                    Some(StreamCommand::Close) | None => {
                        debug!("Trade stream closed by client");
                        pipe.emit(StreamEvent::Close("closed by client".to_string())).await;
                        return;
                    }
                },
            }
        }
    }
}

#[async_trait]
impl StreamingTransport for SseTransport {
    async fn open(&self, request: StreamRequest) -> Result<EventStream> {
        let url = self.url_for(&request)?;

        let mut bearer = HeaderValue::from_str(&request.bearer())
            .map_err(|_| Error::InvalidInput("invalid access token".to_string()))?;
        bearer.set_sensitive(true);

        info!(endpoint = %request.endpoint, events = ?request.events, "Connecting trade stream");
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, bearer)
            .header(THROTTLE_KEY_HEADER, &request.app_key)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let description = describe_body(&body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::AuthFailure {
                    status: status.as_u16(),
                    description,
                },
                _ => Error::StreamRejected {
                    status: status.as_u16(),
                    description,
                },
            });
        }

        let (stream, pipe) = EventStream::channel(DEFAULT_EVENT_CAPACITY);
        pipe.emit(StreamEvent::Open).await;
        tokio::spawn(Self::pump(Box::pin(response.bytes_stream()), pipe));

        Ok(stream)
    }
}

/// Splits a byte stream into lines; a line may span several chunks.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(decode_line(&line));
        }
        lines
    }

    /// The unterminated tail, if any.
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.pending);
        Some(decode_line(&tail))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(&['\r', '\n'][..])
        .to_string()
}

/// Only `data:` lines carry payloads; comments, `event:`, `id:` and blank
/// separators are skipped.
fn classify_line(line: &str) -> Option<StreamEvent> {
    let data = line.strip_prefix(DATA_PREFIX)?.trim();
    if data.is_empty() {
        return None;
    }
    Some(classify_frame(data))
}
