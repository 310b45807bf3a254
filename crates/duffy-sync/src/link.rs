//! Paired-device TCP link
//!
//! Each device runs a [`LinkListener`] on its own address and a
//! [`TcpSyncChannel`] that dials the counterpart. Both directions carry
//! newline-delimited [`Frame`]s.
//!
//! ## Delivery
//!
//! - Interactive messages are written if a connection exists or can be
//!   opened within the connect timeout, and dropped otherwise.
//! - Background messages wait in a bounded outbox until the counterpart
//!   acknowledges them. The writer retries on a fixed tick; when the outbox
//!   is full the oldest entry is dropped.
//!
//! The listener acknowledges every frame after forwarding it. A frame
//! counts as written only once its acknowledgement has been read, so a
//! connection the counterpart closed (restart, crash) is noticed before a
//! queued message is given up. A frame whose acknowledgement was lost may
//! arrive twice; every [`SyncMessage`] is safe to apply again.
//!
//! Sends never block and never fail from the caller's point of view.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use duffy_core::config::LinkConfig;
use duffy_core::domain::SyncMessage;
use duffy_core::ports::ISyncChannel;

use crate::coordinator::CoordinatorHandle;
use crate::frame::{is_ack, Frame, ACK_LINE};
use crate::SyncError;

/// Receiver of messages decoded from the link, in arrival order
#[async_trait]
pub trait InboundSink: Send + Sync {
    async fn on_receive(&self, message: SyncMessage);
}

#[async_trait]
impl InboundSink for CoordinatorHandle {
    async fn on_receive(&self, message: SyncMessage) {
        if let Err(e) = self.deliver(message).await {
            warn!(kind = message.kind(), error = %e, "Dropping inbound message");
        }
    }
}

/// Outbound side of the link
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub peer: SocketAddr,
    /// Bounds both connecting and waiting for a frame's acknowledgement
    pub connect_timeout: Duration,
    pub retry_interval: Duration,
    pub outbox_capacity: usize,
}

impl LinkSettings {
    /// Parses the `link` configuration section
    ///
    /// # Errors
    ///
    /// Returns `SyncError::TransportUnavailable` if the peer address is invalid.
    pub fn from_config(config: &LinkConfig) -> Result<Self, SyncError> {
        let peer = config.peer.parse().map_err(|e| {
            SyncError::TransportUnavailable(format!("Invalid peer address '{}': {}", config.peer, e))
        })?;
        Ok(Self {
            peer,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms.max(1)),
            retry_interval: Duration::from_secs(config.retry_interval.max(1)),
            outbox_capacity: config.outbox_capacity.max(1),
        })
    }
}

// ============================================================================
// Outbound channel
// ============================================================================

#[derive(Debug)]
enum Outgoing {
    Interactive(SyncMessage),
    Background(SyncMessage),
}

/// `ISyncChannel` over TCP
///
/// Sends are handed to a writer task that owns the connection to the
/// counterpart. A disabled channel accepts every send and drops it.
pub struct TcpSyncChannel {
    enabled: bool,
    tx: Mutex<Option<mpsc::UnboundedSender<Outgoing>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl TcpSyncChannel {
    /// Starts the writer task; must be called inside a Tokio runtime
    pub fn connect(settings: LinkSettings) -> Self {
        info!(
            peer = %settings.peer,
            outbox_capacity = settings.outbox_capacity,
            "Starting paired-device link"
        );
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(LinkWriter::new(settings).run(rx));
        Self {
            enabled: true,
            tx: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
        }
    }

    /// A channel for devices without a paired counterpart
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            tx: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    /// Builds the channel described by the `link` section
    pub fn from_config(config: &LinkConfig) -> Result<Self, SyncError> {
        if !config.enabled {
            info!("Paired-device link disabled");
            return Ok(Self::disabled());
        }
        Ok(Self::connect(LinkSettings::from_config(config)?))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stops accepting sends and waits for the writer's final flush
    pub async fn shutdown(&self) {
        drop(lock(&self.tx).take());
        let writer = lock(&self.writer).take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                warn!(error = %e, "Link writer task failed");
            }
        }
    }

    fn submit(&self, outgoing: Outgoing) {
        if !self.enabled {
            debug!(message = ?outgoing, "Paired-device link not supported, dropping message");
            return;
        }
        let guard = lock(&self.tx);
        match guard.as_ref() {
            Some(tx) => {
                if let Err(e) = tx.send(outgoing) {
                    debug!(message = ?e.0, "Link writer stopped, dropping message");
                }
            }
            None => debug!(message = ?outgoing, "Link shut down, dropping message"),
        }
    }
}

impl ISyncChannel for TcpSyncChannel {
    fn send_interactive(&self, message: SyncMessage) {
        self.submit(Outgoing::Interactive(message));
    }

    fn send_background(&self, message: SyncMessage) {
        self.submit(Outgoing::Background(message));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct LinkWriter {
    settings: LinkSettings,
    stream: Option<BufReader<TcpStream>>,
    outbox: VecDeque<SyncMessage>,
}

impl LinkWriter {
    fn new(settings: LinkSettings) -> Self {
        Self {
            outbox: VecDeque::with_capacity(settings.outbox_capacity),
            settings,
            stream: None,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Outgoing>) {
        let mut retry = tokio::time::interval(self.settings.retry_interval);
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                outgoing = rx.recv() => match outgoing {
                    Some(Outgoing::Interactive(message)) => {
                        if !self.write(&Frame::interactive(&message)).await {
                            debug!(kind = message.kind(), "Paired device unreachable, dropping interactive message");
                        }
                    }
                    Some(Outgoing::Background(message)) => {
                        self.push_background(message);
                        self.flush().await;
                    }
                    None => {
                        self.flush().await;
                        if !self.outbox.is_empty() {
                            warn!(
                                undelivered = self.outbox.len(),
                                "Link closed with background messages still queued"
                            );
                        }
                        break;
                    }
                },
                _ = retry.tick() => {
                    if !self.outbox.is_empty() {
                        self.flush().await;
                    }
                }
            }
        }

        debug!("Link writer stopped");
    }

    fn push_background(&mut self, message: SyncMessage) {
        if self.outbox.len() >= self.settings.outbox_capacity {
            if let Some(dropped) = self.outbox.pop_front() {
                warn!(
                    kind = dropped.kind(),
                    capacity = self.settings.outbox_capacity,
                    "Background outbox full, dropping oldest message"
                );
            }
        }
        self.outbox.push_back(message);
    }

    /// Sends queued background messages until one fails
    async fn flush(&mut self) {
        while let Some(message) = self.outbox.front().copied() {
            if !self.write(&Frame::background(&message)).await {
                debug!(queued = self.outbox.len(), "Paired device unreachable, keeping outbox");
                return;
            }
            self.outbox.pop_front();
        }
    }

    /// Writes one frame; false when the counterpart could not be reached
    async fn write(&mut self, frame: &Frame) -> bool {
        let line = match frame.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Dropping frame that cannot be encoded");
                return true;
            }
        };

        // A second attempt covers a connection the counterpart closed
        for attempt in 0..2 {
            if !self.ensure_connected().await {
                return false;
            }
            let Some(stream) = self.stream.as_mut() else {
                return false;
            };
            match send_and_confirm(stream, &line, self.settings.connect_timeout).await {
                Ok(()) => return true,
                Err(reason) => {
                    debug!(attempt, reason = %reason, "Connection to paired device lost");
                    self.stream = None;
                }
            }
        }
        false
    }

    async fn ensure_connected(&mut self) -> bool {
        if self.stream.is_some() {
            return true;
        }

        let peer = self.settings.peer;
        match tokio::time::timeout(self.settings.connect_timeout, TcpStream::connect(peer)).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(error = %e, "Failed to set TCP_NODELAY");
                }
                info!(peer = %peer, "Connected to paired device");
                self.stream = Some(BufReader::new(stream));
                true
            }
            Ok(Err(e)) => {
                debug!(peer = %peer, error = %e, "Failed to connect to paired device");
                false
            }
            Err(_) => {
                debug!(
                    peer = %peer,
                    timeout_ms = self.settings.connect_timeout.as_millis() as u64,
                    "Timed out connecting to paired device"
                );
                false
            }
        }
    }
}

/// Writes `line` and waits for the counterpart's acknowledgement
async fn send_and_confirm(
    stream: &mut BufReader<TcpStream>,
    line: &str,
    timeout: Duration,
) -> Result<(), String> {
    stream
        .get_mut()
        .write_all(line.as_bytes())
        .await
        .map_err(|e| e.to_string())?;

    let mut reply = String::new();
    match tokio::time::timeout(timeout, stream.read_line(&mut reply)).await {
        Ok(Ok(0)) => Err("closed by paired device".to_string()),
        Ok(Ok(_)) if is_ack(&reply) => Ok(()),
        Ok(Ok(_)) => Err(format!("unexpected reply {:?}", reply.trim_end())),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("no acknowledgement".to_string()),
    }
}

// ============================================================================
// Inbound listener
// ============================================================================

/// Accepts connections from the counterpart and forwards decoded messages
pub struct LinkListener {
    listener: TcpListener,
    sink: Arc<dyn InboundSink>,
}

impl LinkListener {
    /// Binds the listening socket
    ///
    /// # Errors
    ///
    /// Returns `SyncError::TransportUnavailable` if the address is invalid
    /// or cannot be bound.
    pub async fn bind(endpoint: &str, sink: Arc<dyn InboundSink>) -> Result<Self, SyncError> {
        let addr: SocketAddr = endpoint.parse().map_err(|e| {
            SyncError::TransportUnavailable(format!("Invalid listen address '{}': {}", endpoint, e))
        })?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            SyncError::TransportUnavailable(format!("Failed to bind {}: {}", addr, e))
        })?;
        Ok(Self { listener, sink })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SyncError> {
        self.listener
            .local_addr()
            .map_err(|e| SyncError::TransportUnavailable(e.to_string()))
    }

    /// Accepts connections until `shutdown` is cancelled
    ///
    /// Should be spawned as a background task.
    pub async fn run(self, shutdown: CancellationToken) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(addr = %addr, "Link listener started");
        }

        loop {
            tokio::select! {
                result = self.listener.accept() => match result {
                    Ok((stream, peer)) => {
                        debug!(peer = %peer, "Paired device connected");
                        let sink = Arc::clone(&self.sink);
                        let shutdown = shutdown.child_token();
                        tokio::spawn(async move {
                            read_frames(stream, peer, sink.as_ref(), shutdown).await;
                        });
                    }
                    Err(e) => warn!(error = %e, "Failed to accept link connection"),
                },
                _ = shutdown.cancelled() => {
                    info!("Link listener shutting down");
                    break;
                }
            }
        }
    }
}

async fn read_frames(
    stream: TcpStream,
    peer: SocketAddr,
    sink: &dyn InboundSink,
    shutdown: CancellationToken,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    dispatch_line(&line, sink).await;
                    if let Err(e) = acknowledge(&mut write_half).await {
                        debug!(peer = %peer, error = %e, "Failed to acknowledge frame");
                        break;
                    }
                }
                Ok(None) => {
                    debug!(peer = %peer, "Paired device disconnected");
                    break;
                }
                Err(e) => {
                    debug!(peer = %peer, error = %e, "Link read failed");
                    break;
                }
            },
            _ = shutdown.cancelled() => break,
        }
    }
}

async fn acknowledge(write_half: &mut OwnedWriteHalf) -> std::io::Result<()> {
    write_half.write_all(ACK_LINE.as_bytes()).await
}

/// Decodes one frame and forwards its messages; returns how many were forwarded
pub async fn dispatch_line(line: &str, sink: &dyn InboundSink) -> usize {
    let frame = match Frame::parse(line) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Dropping malformed frame");
            return 0;
        }
    };
    let decoded = match frame.messages() {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(delivery = %frame.delivery, error = %e, "Dropping undecodable payload");
            return 0;
        }
    };

    for reason in &decoded.skipped {
        warn!(delivery = %frame.delivery, reason = %reason, "Skipped invalid payload entry");
    }

    let count = decoded.messages.len();
    for message in decoded.messages {
        debug!(delivery = %frame.delivery, kind = message.kind(), "Received sync message");
        sink.on_receive(message).await;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use duffy_core::domain::{DayKey, GoalValue};

    #[derive(Default)]
    struct RecordingSink {
        received: Mutex<Vec<SyncMessage>>,
    }

    #[async_trait]
    impl InboundSink for RecordingSink {
        async fn on_receive(&self, message: SyncMessage) {
            self.received.lock().unwrap().push(message);
        }
    }

    fn settings(peer: SocketAddr, capacity: usize) -> LinkSettings {
        LinkSettings {
            peer,
            connect_timeout: Duration::from_millis(200),
            retry_interval: Duration::from_secs(60),
            outbox_capacity: capacity,
        }
    }

    #[test]
    fn test_settings_from_config() {
        let config = LinkConfig {
            peer: "127.0.0.1:9999".to_string(),
            ..LinkConfig::default()
        };
        let settings = LinkSettings::from_config(&config).unwrap();
        assert_eq!(settings.peer.port(), 9999);

        let bad = LinkConfig {
            peer: "nowhere".to_string(),
            ..LinkConfig::default()
        };
        assert!(matches!(
            LinkSettings::from_config(&bad),
            Err(SyncError::TransportUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_skips_bad_entries_and_keeps_good_ones() {
        let sink = RecordingSink::default();
        let line = r#"{"delivery":"background","payload":{"stepsGoal":-3,"goalNotificationSent":"2024-06-01","unknown":1}}"#;

        let count = dispatch_line(line, &sink).await;

        assert_eq!(count, 1);
        assert_eq!(
            *sink.received.lock().unwrap(),
            vec![SyncMessage::GoalNotificationSent {
                day: DayKey::from_ymd(2024, 6, 1).unwrap()
            }]
        );
    }

    #[tokio::test]
    async fn test_dispatch_ignores_malformed_frames() {
        let sink = RecordingSink::default();
        assert_eq!(dispatch_line("not json", &sink).await, 0);
        assert_eq!(
            dispatch_line(r#"{"delivery":"interactive","payload":"x"}"#, &sink).await,
            0
        );
        assert!(sink.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outbox_drops_oldest_when_full() {
        // Nothing listens on a freshly released port
        let addr = {
            let spare = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            spare.local_addr().unwrap()
        };
        let mut writer = LinkWriter::new(settings(addr, 2));

        for steps in 1..=3 {
            writer.push_background(SyncMessage::StepsDataSnapshot {
                day: DayKey::from_ymd(2024, 6, 1).unwrap(),
                steps,
            });
        }
        writer.flush().await;

        let queued: Vec<u32> = writer
            .outbox
            .iter()
            .filter_map(|m| match m {
                SyncMessage::StepsDataSnapshot { steps, .. } => Some(*steps),
                _ => None,
            })
            .collect();
        assert_eq!(queued, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_unacknowledged_frame_stays_queued() {
        // Reads the frame, then hangs up without acknowledging
        let peer = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = peer.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = peer.accept().await.unwrap();
            let mut lines = BufReader::new(stream).lines();
            let _ = lines.next_line().await;
        });

        let mut writer = LinkWriter::new(settings(addr, 4));
        let message = SyncMessage::GoalNotificationSent {
            day: DayKey::from_ymd(2024, 6, 1).unwrap(),
        };
        writer.push_background(message);
        writer.flush().await;

        assert_eq!(writer.outbox.iter().copied().collect::<Vec<_>>(), vec![message]);
    }

    #[tokio::test]
    async fn test_disabled_channel_accepts_and_drops() {
        let channel = TcpSyncChannel::disabled();
        assert!(!channel.is_enabled());
        channel.send_interactive(SyncMessage::StepsGoalUpdate {
            goal: GoalValue::new(1),
        });
        channel.send_background(SyncMessage::StepsGoalUpdate {
            goal: GoalValue::new(1),
        });
        channel.shutdown().await;
    }

    #[tokio::test]
    async fn test_from_config_respects_enabled_flag() {
        let config = LinkConfig {
            enabled: false,
            ..LinkConfig::default()
        };
        let channel = TcpSyncChannel::from_config(&config).unwrap();
        assert!(!channel.is_enabled());
    }
}
