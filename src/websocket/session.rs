//! One connection epoch: handshake, receive loop and outbound writer
//!
//! The session never reconnects on its own. When the transport fails it
//! reports the close and exits; the liveness monitor and the reachability
//! watcher decide what happens next.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

use super::{Epoch, StreamClient};
use crate::decoder::Payload;
use crate::error::FeedError;

/// Transport progress of a session as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Open,
    Closed,
}

/// Handle to the active connection, owned by the client
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) epoch: Epoch,
    pub(crate) phase: SessionPhase,
    pub(crate) outbound: mpsc::UnboundedSender<Message>,
    io_task: JoinHandle<()>,
    liveness_task: JoinHandle<()>,
}

impl Session {
    pub(crate) fn new(
        epoch: Epoch,
        outbound: mpsc::UnboundedSender<Message>,
        io_task: JoinHandle<()>,
        liveness_task: JoinHandle<()>,
    ) -> Self {
        Self {
            epoch,
            phase: SessionPhase::Connecting,
            outbound,
            io_task,
            liveness_task,
        }
    }

    /// Cancel both background tasks. Dropping the io task drops the socket.
    pub(crate) fn abort(self) {
        self.io_task.abort();
        self.liveness_task.abort();
    }
}

/// Connect, then pump frames until the transport fails or the task is aborted
pub(crate) async fn run(
    client: StreamClient,
    epoch: Epoch,
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    info!(%epoch, url = %url, "Connecting to price feed");

    let ws_stream = match connect_async(&url).await {
        Ok((ws_stream, response)) => {
            info!(%epoch, status = ?response.status(), "WebSocket connected");
            ws_stream
        }
        Err(e) => {
            let err = FeedError::from(e);
            warn!(%epoch, error = %err, "Failed to connect to price feed");
            client.on_closed(epoch);
            return;
        }
    };

    client.on_opened(epoch);
    let (mut sink, mut stream) = ws_stream.split();

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    debug!(%epoch, len = text.len(), "Received text message");
                    client.on_payload(epoch, Payload::Text(&text));
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!(%epoch, len = data.len(), "Received binary message");
                    client.on_payload(epoch, Payload::Binary(&data));
                }
                Some(Ok(Message::Ping(data))) => {
                    debug!(%epoch, "Received ping, sending pong");
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Pong(_))) => {
                    debug!(%epoch, "Received pong");
                    client.on_probe_ack(epoch);
                }
                Some(Ok(Message::Close(frame))) => {
                    warn!(%epoch, frame = ?frame, "Received close frame");
                    break;
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    let err = FeedError::from(e);
                    error!(%epoch, error = %err, "WebSocket error");
                    break;
                }
                None => {
                    warn!(%epoch, "WebSocket stream ended");
                    break;
                }
            },
            Some(message) = outbound.recv() => {
                if let Err(e) = sink.send(message).await {
                    let err = FeedError::Probe(e.to_string());
                    warn!(%epoch, error = %err, "Failed to send liveness probe");
                    client.on_probe_failed(epoch);
                }
            }
        }
    }

    client.on_closed(epoch);
}
