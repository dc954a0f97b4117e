use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMsg};

use crate::ChannelEvent;

/// Receives the transport events of one connection, in order.
pub trait ChannelSink: Send + Sync {
    fn emit(&self, event: ChannelEvent);
}

enum ChannelCommand {
    Send(String),
    Close,
}

/// Owner side of one websocket connection.
///
/// Dropping the handle closes the connection.
pub struct ChannelHandle {
    cmd_tx: UnboundedSender<ChannelCommand>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Queues a text frame. Frames queued before the handshake completes are sent once open.
    pub fn send(&self, text: impl Into<String>) {
        let _ = self.cmd_tx.send(ChannelCommand::Send(text.into()));
    }

    /// Asks the connection task to close; returns immediately.
    pub fn request_close(&self) {
        let _ = self.cmd_tx.send(ChannelCommand::Close);
    }

    /// Closes the connection and waits for its task to finish.
    pub async fn close(self) {
        self.request_close();
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Connects to `url` on the current tokio runtime.
///
/// The sink sees `Opened` after the handshake, then messages in arrival
/// order, and always a final `Closed`. A failed handshake yields `Errored`
/// followed by `Closed`.
pub fn spawn_channel(
    url: impl Into<String>,
    connect_timeout: Duration,
    sink: Arc<dyn ChannelSink>,
) -> ChannelHandle {
    let (cmd_tx, cmd_rx) = unbounded_channel();
    let task = tokio::spawn(run_channel(url.into(), connect_timeout, sink, cmd_rx));
    ChannelHandle { cmd_tx, task }
}

async fn run_channel(
    url: String,
    connect_timeout: Duration,
    sink: Arc<dyn ChannelSink>,
    mut cmd_rx: UnboundedReceiver<ChannelCommand>,
) {
    engine_info!("connecting channel to {url}");
    let stream = match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(err)) => {
            engine_warn!("channel handshake failed: {err}");
            sink.emit(ChannelEvent::Errored(err.to_string()));
            sink.emit(ChannelEvent::Closed);
            return;
        }
        Err(_) => {
            engine_warn!("channel handshake timed out after {connect_timeout:?}");
            sink.emit(ChannelEvent::Errored("connect timed out".to_string()));
            sink.emit(ChannelEvent::Closed);
            return;
        }
    };
    sink.emit(ChannelEvent::Opened);

    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(WsMsg::Text(text))) => {
                    sink.emit(ChannelEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(WsMsg::Binary(data))) => {
                    sink.emit(ChannelEvent::Message(String::from_utf8_lossy(&data).into_owned()));
                }
                Some(Ok(WsMsg::Close(frame))) => {
                    engine_debug!("server closed channel: {frame:?}");
                    break;
                }
                // ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    engine_warn!("channel read failed: {err}");
                    sink.emit(ChannelEvent::Errored(err.to_string()));
                    break;
                }
                None => break,
            },
            command = cmd_rx.recv() => match command {
                Some(ChannelCommand::Send(text)) => {
                    if let Err(err) = write.send(WsMsg::Text(text.into())).await {
                        engine_warn!("channel write failed: {err}");
                        sink.emit(ChannelEvent::Errored(err.to_string()));
                        break;
                    }
                }
                Some(ChannelCommand::Close) | None => {
                    engine_debug!("closing channel");
                    let _ = write.close().await;
                    break;
                }
            },
        }
    }
    sink.emit(ChannelEvent::Closed);
}
