//! WebSocket transport to the rendezvous server.
//!
//! One JSON text frame per signaling message. Writes go through an unbounded
//! queue drained by a writer task, so `send` never blocks the caller; this is
//! what lets pipeline callbacks emit candidates from their own threads.

use futures_util::stream::{BoxStream, Stream};
use futures_util::{future, SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{ConnectError, RecvError, SendError};
use crate::peer::types::SignalingMessage;

/// Inbound text frames, ending when the server closes the connection.
pub type Inbound = BoxStream<'static, Result<String, RecvError>>;

/// Cloneable, non-blocking handle for outbound frames.
#[derive(Debug, Clone)]
pub struct SignalingSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl SignalingSender {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }

    pub fn send(&self, message: &SignalingMessage) -> Result<(), SendError> {
        let text = message.to_text()?;
        self.tx
            .send(Message::Text(text))
            .map_err(|_| SendError::Closed)
    }

    /// Asks the writer to send a Close frame and stop.
    pub fn close(&self) {
        if self.tx.send(Message::Close(None)).is_err() {
            debug!("signaling writer already gone");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// An established signaling connection.
pub struct Connection {
    sender: SignalingSender,
    inbound: Inbound,
    writer: Option<JoinHandle<()>>,
}

impl Connection {
    /// Builds a connection from an arbitrary frame stream and outbound queue.
    pub fn from_parts<S>(tx: mpsc::UnboundedSender<Message>, inbound: S) -> Self
    where
        S: Stream<Item = Result<String, RecvError>> + Send + 'static,
    {
        Self {
            sender: SignalingSender::new(tx),
            inbound: inbound.boxed(),
            writer: None,
        }
    }

    pub fn sender(&self) -> SignalingSender {
        self.sender.clone()
    }

    pub fn send(&self, message: &SignalingMessage) -> Result<(), SendError> {
        self.sender.send(message)
    }

    /// The inbound frame sequence. Restartable only through a new `connect`.
    pub fn receive(&mut self) -> &mut Inbound {
        &mut self.inbound
    }

    pub fn into_parts(self) -> (SignalingSender, Inbound, Option<JoinHandle<()>>) {
        (self.sender, self.inbound, self.writer)
    }
}

/// Opens the persistent connection. No retry: a failure here ends the session.
pub async fn connect(url: &str) -> Result<Connection, ConnectError> {
    validate_endpoint(url)?;

    let (ws_stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|source| ConnectError::Handshake {
            url: url.to_string(),
            source,
        })?;
    info!("Connected to signaling server {}", url);

    let (mut ws_sender, ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if let Err(e) = ws_sender.send(msg).await {
                warn!("signaling write failed: {}", e);
                break;
            }
            if closing {
                break;
            }
        }
        debug!("signaling writer stopped");
    });

    let inbound = ws_receiver
        .take_while(|frame| future::ready(!matches!(frame, Ok(Message::Close(_)))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(Message::Text(text)) => Some(Ok(text)),
                // ping/pong are answered by tungstenite; binary is not signaling
                Ok(_) => None,
                Err(e) => Some(Err(RecvError::from(e))),
            })
        });

    let mut connection = Connection::from_parts(tx, inbound);
    connection.writer = Some(writer);
    Ok(connection)
}

fn validate_endpoint(url: &str) -> Result<(), ConnectError> {
    let invalid = |reason: &str| ConnectError::InvalidEndpoint {
        url: url.to_string(),
        reason: reason.to_string(),
    };
    let rest = url
        .strip_prefix("ws://")
        .or_else(|| url.strip_prefix("wss://"))
        .ok_or_else(|| invalid("scheme must be ws:// or wss://"))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(invalid("missing host"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::types::IceCandidate;
    use futures_util::stream;

    #[test]
    fn endpoint_validation() {
        assert!(validate_endpoint("ws://0.0.0.0:8765").is_ok());
        assert!(validate_endpoint("wss://signal.example.org/room").is_ok());
        assert!(matches!(
            validate_endpoint("http://0.0.0.0:8765"),
            Err(ConnectError::InvalidEndpoint { .. })
        ));
        assert!(validate_endpoint("ws://").is_err());
        assert!(validate_endpoint("ws:///path").is_err());
    }

    #[tokio::test]
    async fn connect_rejects_bad_scheme_without_io() {
        let err = connect("tcp://localhost:1").await.err().unwrap();
        assert!(matches!(err, ConnectError::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn connect_failure_is_a_handshake_error() {
        // nothing listens on port 1
        let err = connect("ws://127.0.0.1:1").await.err().unwrap();
        assert!(matches!(err, ConnectError::Handshake { .. }));
    }

    #[tokio::test]
    async fn in_memory_connection_round_trip() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let frames = stream::iter(vec![Ok("one".to_string()), Ok("two".to_string())]);
        let mut conn = Connection::from_parts(tx, frames);

        conn.send(&SignalingMessage::Ice(IceCandidate::new("candidate:1", 0)))
            .unwrap();
        match rx.recv().await.unwrap() {
            Message::Text(text) => assert!(text.starts_with(r#"{"ice":"#)),
            other => panic!("unexpected frame {:?}", other),
        }

        let received: Vec<_> = conn
            .receive()
            .map(|r| r.unwrap())
            .collect::<Vec<_>>()
            .await;
        assert_eq!(received, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn close_queues_close_frame() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = SignalingSender::new(tx);
        sender.close();
        assert!(matches!(rx.recv().await, Some(Message::Close(None))));
        drop(rx);
        assert!(sender.is_closed());
        assert!(matches!(
            sender.send(&SignalingMessage::Error("x".into())),
            Err(SendError::Closed)
        ));
    }
}
