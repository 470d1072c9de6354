use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::api::events::{self, EngineFrame, PushEvent};
use crate::error::PushError;

const CLOSE_GRACE: Duration = Duration::from_secs(2);
// Bounds both the websocket upgrade and the wait for the engine handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub const HEARTBEAT_LOST: &str = "ping timeout";

#[derive(Debug, Clone)]
pub struct PushSettings {
    pub url: Url,
    pub namespace: String,
    pub reconnect_delay: Duration,
    pub reconnect_delay_max: Duration,
}

/// Owner of a running push task. Dropping it aborts the task; prefer
/// [`PushHandle::close`] to leave the namespace cleanly.
#[derive(Debug)]
pub struct PushHandle {
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl PushHandle {
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                log::warn!("push task did not stop in time, aborting");
                task.abort();
            }
        }
        log::info!("push channel closed");
    }
}

impl Drop for PushHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub struct PushChannel;

impl PushChannel {
    pub fn spawn(settings: PushSettings, events: mpsc::Sender<PushEvent>) -> PushHandle {
        let (tx, rx) = watch::channel(false);
        log::info!("connecting push channel {} (namespace {})", settings.url, settings.namespace);
        let task = tokio::spawn(run(settings, events, rx));
        PushHandle { shutdown: Some(tx), task: Some(task) }
    }
}

enum SessionEnd {
    Shutdown,
    Lost(String),
}

async fn run(settings: PushSettings, events: mpsc::Sender<PushEvent>, mut shutdown: watch::Receiver<bool>) {
    let mut delay = settings.reconnect_delay;
    loop {
        let mut connected = false;
        let outcome = session(&settings, &events, &mut shutdown, &mut connected).await;
        let event = match outcome {
            Ok(SessionEnd::Shutdown) => return,
            Ok(SessionEnd::Lost(reason)) => PushEvent::Disconnected(reason),
            Err(e) if connected => PushEvent::Disconnected(e.to_string()),
            Err(e) => PushEvent::ConnectError(e.to_string()),
        };
        if connected {
            delay = settings.reconnect_delay;
        }
        log::warn!("push channel down: {event:?}; retrying in {delay:?}");
        if events.send(event).await.is_err() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => return,
        }
        delay = (delay * 2).min(settings.reconnect_delay_max);
    }
}

async fn session(
    settings: &PushSettings,
    events: &mpsc::Sender<PushEvent>,
    shutdown: &mut watch::Receiver<bool>,
    connected: &mut bool,
) -> Result<SessionEnd, PushError> {
    let (ws, _) = tokio::select! {
        res = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(settings.url.as_str())) => match res {
            Ok(res) => res?,
            Err(_) => return Err(PushError::Protocol("connect timed out".into())),
        },
        _ = shutdown.changed() => return Ok(SessionEnd::Shutdown),
    };
    let (mut sink, mut stream) = ws.split();
    let ns = settings.namespace.as_str();

    // Until the handshake names a heartbeat, the handshake itself must arrive in time.
    let mut heartbeat: Option<Duration> = None;
    let mut deadline = Some(Instant::now() + CONNECT_TIMEOUT);

    loop {
        let msg = tokio::select! {
            msg = stream.next() => msg,
            _ = expire(deadline) => {
                log::warn!("push server went silent");
                let _ = sink.close().await;
                return if *connected {
                    Ok(SessionEnd::Lost(HEARTBEAT_LOST.into()))
                } else {
                    Err(PushError::Protocol(HEARTBEAT_LOST.into()))
                };
            }
            _ = shutdown.changed() => {
                if *connected {
                    let _ = sink.send(Message::Text(events::encode_disconnect(ns))).await;
                }
                let _ = sink.close().await;
                return Ok(SessionEnd::Shutdown);
            }
        };

        let text = match msg {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(frame))) => {
                let reason = frame.map(|f| f.reason.to_string()).unwrap_or_else(|| "transport close".into());
                return closed(*connected, reason);
            }
            // tungstenite answers websocket-level pings itself
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => return closed(*connected, "transport close".into()),
        };

        match events::decode_frame(&text)? {
            EngineFrame::Open(open) => {
                log::debug!("engine session {} open, joining {ns}", open.sid);
                heartbeat = open.heartbeat_timeout();
                deadline = heartbeat.map(|t| Instant::now() + t);
                sink.send(Message::Text(events::encode_connect(ns))).await?;
            }
            EngineFrame::Ping => {
                deadline = heartbeat.map(|t| Instant::now() + t);
                sink.send(Message::Text(events::PONG.into())).await?;
            }
            EngineFrame::Close => return closed(*connected, "transport close".into()),
            EngineFrame::Message(packet) if packet.namespace == ns => {
                match PushEvent::from_packet(&packet) {
                    Some(PushEvent::Connected) => {
                        *connected = true;
                        log::info!("push channel connected to {ns}");
                        if events.send(PushEvent::Connected).await.is_err() {
                            return Ok(SessionEnd::Shutdown);
                        }
                    }
                    Some(PushEvent::ConnectError(message)) => return Err(PushError::Protocol(message)),
                    Some(PushEvent::Disconnected(reason)) => return Ok(SessionEnd::Lost(reason)),
                    Some(event) => {
                        if events.send(event).await.is_err() {
                            return Ok(SessionEnd::Shutdown);
                        }
                    }
                    None => {}
                }
            }
            EngineFrame::Message(packet) => log::debug!("ignoring packet for namespace {}", packet.namespace),
            EngineFrame::Pong | EngineFrame::Upgrade | EngineFrame::Noop => {}
        }
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn closed(connected: bool, reason: String) -> Result<SessionEnd, PushError> {
    if connected { Ok(SessionEnd::Lost(reason)) } else { Err(PushError::Closed) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn settings(url: &str) -> PushSettings {
        PushSettings {
            url: Url::parse(url).unwrap(),
            namespace: "/notifications".into(),
            reconnect_delay: Duration::from_millis(10),
            reconnect_delay_max: Duration::from_millis(50),
        }
    }

    /// Minimal Socket.IO server: handshake, join, one event, then hang up.
    async fn serve_once(listener: &TcpListener) {
        let (tcp, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let (mut sink, mut stream) = ws.split();
        sink.send(Message::Text(r#"0{"sid":"s1","pingInterval":25000,"pingTimeout":20000}"#.into()))
            .await
            .unwrap();
        let join = stream.next().await.unwrap().unwrap();
        assert_eq!(join, Message::Text("40/notifications,".into()));
        sink.send(Message::Text(r#"40/notifications,{"sid":"n1"}"#.into())).await.unwrap();
        sink.send(Message::Text("2".into())).await.unwrap();
        let pong = stream.next().await.unwrap().unwrap();
        assert_eq!(pong, Message::Text("3".into()));
        sink.send(Message::Text(
            r#"42/notifications,["new_form",{"_id":"c1","nombre":"Carla","fecha":"2026-10-18T12:00:00Z"}]"#.into(),
        ))
        .await
        .unwrap();
        sink.send(Message::Text(r#"42/notifications,["form_deleted",{"formId":"c1"}]"#.into()))
            .await
            .unwrap();
        sink.send(Message::Text("41/notifications,".into())).await.unwrap();
    }

    #[tokio::test]
    async fn delivers_events_then_reports_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move { serve_once(&listener).await });

        let (tx, mut rx) = mpsc::channel(16);
        let handle = PushChannel::spawn(settings(&format!("ws://{addr}/socket.io/?EIO=4&transport=websocket")), tx);

        assert_eq!(rx.recv().await, Some(PushEvent::Connected));
        match rx.recv().await {
            Some(PushEvent::NewForm(rec)) => assert_eq!(rec.id, "c1"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(rx.recv().await, Some(PushEvent::FormDeleted("c1".into())));
        assert_eq!(rx.recv().await, Some(PushEvent::Disconnected(events::SERVER_DISCONNECT.into())));

        server.await.unwrap();
        handle.close().await;
    }

    #[tokio::test]
    async fn silent_server_is_dropped_after_heartbeat() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text(r#"0{"sid":"s1","pingInterval":100,"pingTimeout":100}"#.into()))
                .await
                .unwrap();
            let _join = ws.next().await;
            ws.send(Message::Text("40/notifications,".into())).await.unwrap();
            // Socket stays open, but no ping ever comes.
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(ws);
        });

        let (tx, mut rx) = mpsc::channel(16);
        let handle = PushChannel::spawn(settings(&format!("ws://{addr}/socket.io/?EIO=4&transport=websocket")), tx);

        assert_eq!(rx.recv().await, Some(PushEvent::Connected));
        let next = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("heartbeat should expire");
        assert_eq!(next, Some(PushEvent::Disconnected(HEARTBEAT_LOST.into())));

        handle.close().await;
        server.abort();
    }

    #[tokio::test]
    async fn unreachable_server_reports_connect_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::channel(16);
        let handle = PushChannel::spawn(settings(&format!("ws://{addr}/socket.io/")), tx);
        assert!(matches!(rx.recv().await, Some(PushEvent::ConnectError(_))));
        // It keeps retrying on its own.
        assert!(matches!(rx.recv().await, Some(PushEvent::ConnectError(_))));
        handle.close().await;
    }
}
