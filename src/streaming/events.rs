//! Stream events and the channel pair connecting a transport to its consumer.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::{Error, Result};

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Something that happened on a stream, delivered in order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The connection is established and authenticated
    Open,
    /// A payload from the server
    Message(Value),
    /// An error reported by the server or the transport
    Error(Value),
    /// The stream ended; carries the close reason
    Close(String),
}

impl StreamEvent {
    /// Returns `true` for [`StreamEvent::Close`].
    pub fn is_close(&self) -> bool {
        matches!(self, StreamEvent::Close(_))
    }
}

/// Instruction from the consumer to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamCommand {
    /// Send a JSON payload
    Send(Value),
    /// Close the connection
    Close,
}

/// Consumer side of a stream.
#[derive(Debug)]
pub struct EventStream {
    events: mpsc::Receiver<StreamEvent>,
    commands: mpsc::Sender<StreamCommand>,
}

/// Transport side of a stream.
#[derive(Debug)]
pub struct StreamPipe {
    events: mpsc::Sender<StreamEvent>,
    commands: mpsc::Receiver<StreamCommand>,
}

impl EventStream {
    /// Create a connected consumer/transport pair.
    pub fn channel(capacity: usize) -> (EventStream, StreamPipe) {
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (command_tx, command_rx) = mpsc::channel(capacity);

        (
            EventStream {
                events: event_rx,
                commands: command_tx,
            },
            StreamPipe {
                events: event_tx,
                commands: command_rx,
            },
        )
    }

    /// Get the next event. `None` once the transport has gone away.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Send a JSON payload over the stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamDisconnected`] if the transport has gone away.
    pub async fn send(&self, payload: Value) -> Result<()> {
        self.commands
            .send(StreamCommand::Send(payload))
            .await
            .map_err(|_| Error::StreamDisconnected)
    }

    /// Ask the transport to close the connection.
    pub async fn close(&self) -> Result<()> {
        self.commands
            .send(StreamCommand::Close)
            .await
            .map_err(|_| Error::StreamDisconnected)
    }
}

impl StreamPipe {
    /// Deliver an event. Returns `false` if the consumer is gone.
    pub async fn emit(&self, event: StreamEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    /// Next command from the consumer. `None` once the consumer is gone.
    pub async fn next_command(&mut self) -> Option<StreamCommand> {
        self.commands.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (mut stream, pipe) = EventStream::channel(8);

        assert!(pipe.emit(StreamEvent::Open).await);
        assert!(pipe.emit(StreamEvent::Message(json!({"n": 1}))).await);
        assert!(pipe.emit(StreamEvent::Close("bye".into())).await);
        drop(pipe);

        assert_eq!(stream.next().await, Some(StreamEvent::Open));
        assert_eq!(stream.next().await, Some(StreamEvent::Message(json!({"n": 1}))));
        assert!(stream.next().await.unwrap().is_close());
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_commands_reach_transport() {
        let (stream, mut pipe) = EventStream::channel(8);

        stream.send(json!({"subscribe": ["AAPL"]})).await.unwrap();
        stream.close().await.unwrap();

        assert_eq!(
            pipe.next_command().await,
            Some(StreamCommand::Send(json!({"subscribe": ["AAPL"]})))
        );
        assert_eq!(pipe.next_command().await, Some(StreamCommand::Close));
    }

    #[tokio::test]
    async fn test_send_after_transport_gone() {
        let (stream, pipe) = EventStream::channel(8);
        drop(pipe);

        assert!(matches!(
            stream.send(json!({})).await,
            Err(Error::StreamDisconnected)
        ));
    }
}
