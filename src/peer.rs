//! Messaging channel to the paired companion process
//!
//! A WebSocket client that reconnects on its own. The event loop sees the
//! link as a stream of [`PeerEvent`]s plus an outbound queue.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, WebSocketStream};

use crate::config::PeerConfig;
use crate::message::{Inbound, Outbound};

/// How long `close` waits for the Close frame to go out
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// Socket (re)connected
    Open,
    Message(Inbound),
    /// Socket closed; a reconnect may follow
    Closed,
}

/// Handle to the background connection task
pub struct PeerLink {
    pub events: mpsc::Receiver<PeerEvent>,
    pub outbox: mpsc::UnboundedSender<Outbound>,
    task: JoinHandle<()>,
}

enum PumpExit {
    Disconnected,
    Shutdown,
}

impl PeerLink {
    /// Start connecting to the companion at `url`
    pub fn spawn(url: String, config: &PeerConfig) -> Self {
        let (events_tx, events) = mpsc::channel(32);
        let (outbox, outbox_rx) = mpsc::unbounded_channel();

        let config = config.clone();
        let task = tokio::spawn(async move {
            run_link(url, config, events_tx, outbox_rx).await;
        });

        Self {
            events,
            outbox,
            task,
        }
    }

    /// Close the socket with a Close frame, falling back to aborting the task.
    ///
    /// The companion only sees a clean close once every other outbox sender
    /// has been dropped.
    pub async fn close(self) {
        let PeerLink {
            events,
            outbox,
            mut task,
        } = self;
        drop(outbox);

        if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
            log::debug!("Companion link did not close in time, aborting");
            task.abort();
        }
        drop(events);
    }
}

async fn run_link(
    url: String,
    config: PeerConfig,
    events_tx: mpsc::Sender<PeerEvent>,
    mut outbox_rx: mpsc::UnboundedReceiver<Outbound>,
) {
    let mut attempts = 0u32;

    loop {
        log::debug!("Connecting to companion: {}", url);

        match connect_async(&url).await {
            Ok((ws_stream, _)) => {
                attempts = 0;
                drop_unsent(&mut outbox_rx);

                if events_tx.send(PeerEvent::Open).await.is_err() {
                    return;
                }

                let exit = match pump(ws_stream, &events_tx, &mut outbox_rx).await {
                    Ok(exit) => exit,
                    Err(err) => {
                        log::warn!("Companion connection failed: {err:#}");
                        PumpExit::Disconnected
                    }
                };

                log::info!("Socket closed");
                if matches!(exit, PumpExit::Shutdown)
                    || events_tx.send(PeerEvent::Closed).await.is_err()
                {
                    return;
                }
            }
            Err(err) => {
                log::warn!("Connecting to companion at {url}: {err}");
            }
        }

        if !config.reconnect {
            break;
        }

        attempts += 1;
        if config.max_reconnect_attempts > 0 && attempts > config.max_reconnect_attempts {
            log::warn!("Giving up on companion after {} attempts", attempts - 1);
            break;
        }

        tokio::time::sleep(Duration::from_secs(config.reconnect_delay)).await;
    }
}

/// Discard messages queued while the socket was closed
fn drop_unsent(outbox_rx: &mut mpsc::UnboundedReceiver<Outbound>) {
    while let Ok(msg) = outbox_rx.try_recv() {
        log::warn!("Socket was not open, dropped {} message", msg.key());
    }
}

async fn pump<S>(
    ws_stream: WebSocketStream<S>,
    events_tx: &mpsc::Sender<PeerEvent>,
    outbox_rx: &mut mpsc::UnboundedReceiver<Outbound>,
) -> Result<PumpExit>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    log::trace!("Received frame: {}", text);
                    match serde_json::from_str::<Inbound>(&text) {
                        Ok(msg) => {
                            if events_tx.send(PeerEvent::Message(msg)).await.is_err() {
                                return Ok(PumpExit::Shutdown);
                            }
                        }
                        Err(err) => log::warn!("Dropping undecodable message: {err}"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Ok(PumpExit::Disconnected),
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err).context("reading from companion"),
            },
            out = outbox_rx.recv() => match out {
                Some(msg) => {
                    let text = serde_json::to_string(&msg).context("serializing message")?;
                    write
                        .send(Message::Text(text))
                        .await
                        .context("sending to companion")?;
                }
                None => {
                    let _ = write.close().await;
                    return Ok(PumpExit::Shutdown);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    const WAIT: Duration = Duration::from_secs(5);

    fn no_reconnect() -> PeerConfig {
        PeerConfig {
            reconnect: false,
            ..PeerConfig::default()
        }
    }

    async fn next_event(link: &mut PeerLink) -> Option<PeerEvent> {
        tokio::time::timeout(WAIT, link.events.recv()).await.unwrap()
    }

    #[tokio::test]
    async fn test_link_delivers_both_ways() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let frames = [
                r#"{"key": "add", "id": "light.bedroom", "name": "Bedroom", "state": "on"}"#,
                "not json",
                r#"{"key": "clear"}"#,
            ];
            for frame in frames {
                ws.send(Message::Text(frame.to_string())).await.unwrap();
            }
            let reply = ws.next().await.unwrap().unwrap();
            reply.into_text().unwrap()
        });

        let mut link = PeerLink::spawn(format!("ws://{addr}"), &no_reconnect());

        assert_eq!(next_event(&mut link).await, Some(PeerEvent::Open));
        assert_eq!(
            next_event(&mut link).await,
            Some(PeerEvent::Message(Inbound::Add {
                id: "light.bedroom".to_string(),
                name: "Bedroom".to_string(),
                state: "on".to_string(),
            }))
        );
        assert_eq!(
            next_event(&mut link).await,
            Some(PeerEvent::Message(Inbound::Clear))
        );

        link.outbox
            .send(Outbound::Port {
                value: "8123".to_string(),
            })
            .unwrap();

        let text = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"key": "port", "value": "8123"}));

        assert_eq!(next_event(&mut link).await, Some(PeerEvent::Closed));
        assert_eq!(next_event(&mut link).await, None);
    }

    #[tokio::test]
    async fn test_reconnect_drops_messages_queued_while_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}

            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let frame = ws.next().await.unwrap().unwrap();
            frame.into_text().unwrap()
        });

        let config = PeerConfig {
            reconnect: true,
            reconnect_delay: 1,
            max_reconnect_attempts: 0,
            ..PeerConfig::default()
        };
        let mut link = PeerLink::spawn(format!("ws://{addr}"), &config);

        assert_eq!(next_event(&mut link).await, Some(PeerEvent::Open));
        assert_eq!(next_event(&mut link).await, Some(PeerEvent::Closed));

        // Queued while the link waits to reconnect
        link.outbox
            .send(Outbound::Port {
                value: "stale".to_string(),
            })
            .unwrap();

        assert_eq!(next_event(&mut link).await, Some(PeerEvent::Open));
        link.outbox
            .send(Outbound::Port {
                value: "fresh".to_string(),
            })
            .unwrap();

        let text = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"key": "port", "value": "fresh"}));

        link.close().await;
    }

    #[tokio::test]
    async fn test_close_sends_close_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            matches!(ws.next().await, Some(Ok(Message::Close(_))))
        });

        let mut link = PeerLink::spawn(format!("ws://{addr}"), &no_reconnect());
        assert_eq!(next_event(&mut link).await, Some(PeerEvent::Open));

        tokio::time::timeout(WAIT, link.close()).await.unwrap();
        assert!(tokio::time::timeout(WAIT, server).await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_peer_without_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut link = PeerLink::spawn(format!("ws://{addr}"), &no_reconnect());
        assert_eq!(next_event(&mut link).await, None);
    }
}
