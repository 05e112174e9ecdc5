//! WebSocket transport for the client.
//!
//! Provides [`RelayConnection`] which handles socket I/O for relay events.
//! This is a thin layer that just sends/receives text frames - protocol logic
//! remains in the Sans-IO [`Coordinator`](crate::Coordinator).

use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc, task::AbortHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

type RelaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Relay URL could not be parsed.
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),

    /// Connection or handshake failed.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Handle to an open relay socket.
///
/// Provides channels for event transport. Encoded events are sent/received
/// via the channels, and two internal tasks handle the socket I/O. When the
/// relay closes the socket, or the connection is stopped, `from_relay` yields
/// `None`.
pub struct RelayConnection {
    /// Send encoded events to the relay.
    pub to_relay: mpsc::Sender<String>,
    /// Receive encoded events from the relay.
    pub from_relay: mpsc::Receiver<String>,
    /// Abort handle of the outgoing task.
    send_handle: AbortHandle,
    /// Abort handle of the incoming task.
    recv_handle: AbortHandle,
}

impl RelayConnection {
    /// Stop the connection. Both socket tasks are aborted.
    pub fn stop(&self) {
        self.send_handle.abort();
        self.recv_handle.abort();
    }
}

impl Drop for RelayConnection {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Connect to a relay over WebSocket (`ws://` or `wss://`).
///
/// Returns a [`RelayConnection`] with channels for event transport.
pub async fn connect(url: &str) -> Result<RelayConnection, TransportError> {
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(TransportError::InvalidUrl(url.to_string()));
    }

    let (socket, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;
    tracing::info!(%url, "connected to relay");

    let (to_relay_tx, to_relay_rx) = mpsc::channel::<String>(32);
    let (from_relay_tx, from_relay_rx) = mpsc::channel::<String>(32);

    let (sink, stream) = socket.split();
    let recv_handle = tokio::spawn(receive_frames(stream, from_relay_tx)).abort_handle();
    let send_handle =
        tokio::spawn(send_frames(sink, to_relay_rx, recv_handle.clone())).abort_handle();

    Ok(RelayConnection {
        to_relay: to_relay_tx,
        from_relay: from_relay_rx,
        send_handle,
        recv_handle,
    })
}

/// Forward text frames to `from_relay` until the relay closes.
async fn receive_frames(mut stream: SplitStream<RelaySocket>, from_relay: mpsc::Sender<String>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if from_relay.send(text.as_str().to_owned()).await.is_err() {
                    break;
                }
            },
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "relay closed the connection");
                break;
            },
            Ok(Message::Binary(_)) => tracing::debug!("ignoring binary frame"),
            Ok(_) => {},
            Err(e) => {
                tracing::warn!("relay read error: {e}");
                break;
            },
        }
    }
}

/// Send outgoing events until `to_relay` closes, then close the socket and
/// stop the incoming task.
async fn send_frames(
    mut sink: SplitSink<RelaySocket, Message>,
    mut to_relay: mpsc::Receiver<String>,
    recv_handle: AbortHandle,
) {
    while let Some(text) = to_relay.recv().await {
        if let Err(e) = sink.send(Message::text(text)).await {
            tracing::warn!("relay send error: {e}");
            break;
        }
    }

    let _ = sink.close().await;
    recv_handle.abort();
}
