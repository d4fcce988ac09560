use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, error, info, warn};

use super::actor::{OUTBOUND_QUEUE_CAPACITY, RoomManagerHandle};
use super::types::{ConnectionId, OutboundMessage};

pub const DEFAULT_SIGNALING_PORT: u16 = 3001;
const COMMAND_CHANNEL_CAPACITY: usize = 1024;

/// Runtime knobs for the WebSocket transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    /// Log registry stats on this cadence; `None` disables
    pub stats_interval: Option<Duration>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
            stats_interval: Some(Duration::from_secs(60)),
        }
    }
}

pub struct SignalingServer {
    handle: RoomManagerHandle,
    settings: ServerSettings,
}

impl Default for SignalingServer {
    fn default() -> Self {
        Self::new(ServerSettings::default())
    }
}

impl SignalingServer {
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            handle: RoomManagerHandle::spawn(COMMAND_CHANNEL_CAPACITY),
            settings,
        }
    }

    pub fn handle(&self) -> RoomManagerHandle {
        self.handle.clone()
    }

    pub async fn run(&self, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener until accept fails
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        info!("Signaling server listening on {}", listener.local_addr()?);

        if let Some(every) = self.settings.stats_interval {
            tokio::spawn(report_stats(self.handle.clone(), every));
        }

        loop {
            let (stream, addr) = listener.accept().await?;
            let handle = self.handle.clone();
            let settings = self.settings;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, handle, settings).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

async fn report_stats(handle: RoomManagerHandle, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match handle.stats().await {
            Ok(stats) => info!(
                rooms = stats.rooms,
                participants = stats.participants,
                connections = stats.connections,
                "Registry stats"
            ),
            Err(e) => {
                warn!("Stopping stats reporter: {}", e);
                break;
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handle: RoomManagerHandle,
    settings: ServerSettings,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let connection = ConnectionId::next();
    info!("WebSocket connection from {} as {}", addr, connection);

    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_QUEUE_CAPACITY);
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();
    handle.register(connection, tx).await;

    let mut ping_interval = tokio::time::interval(settings.ping_interval);
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let ws_msg = Message::Text(msg.into_inner());
                    if ws_tx.send(ws_msg).await.is_err() {
                        break;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("No Pong received, disconnecting {}", addr);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + settings.pong_timeout);
                debug!("Ping sent to {}", addr);
            }

            _ = pong_timeout => {
                warn!("Pong timeout, disconnecting {}", addr);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        handle.inbound(connection, text.as_str()).await;
                    }
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!("Pong received from {}", addr);
                    }
                    Message::Close(_) => {
                        info!("Close received from {}", addr);
                        break;
                    }
                    Message::Binary(_) => {
                        debug!("Ignoring binary frame from {}", addr);
                    }
                    _ => {}
                }
            }
        }
    }

    handle.disconnect(connection).await;

    send_task.abort();
    info!("WebSocket disconnected: {} ({})", addr, connection);

    Ok(())
}
