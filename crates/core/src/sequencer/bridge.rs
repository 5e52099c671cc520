use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rosc::{decoder, encoder, OscPacket};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::clip_state::ClipState;
use super::commands::{
    message, state_payloads, SequencerCommand, TRACKS_STATE_REQUEST, TRANSPORT_STATE_REQUEST,
};
use super::protocol::{
    parse_tracks, parse_transport, split_message, ClipGrid, ProtocolRevision, StateMessage,
    TransportSnapshot,
};
use super::SequencerError;
use crate::context::DirtyFlags;
use crate::messages::SequencerSettings;

const RECEIVE_BUFFER_SIZE: usize = 65536;

/// State owned by the bridge. Only the receiver task writes it.
#[derive(Debug, Default)]
struct SequencerState {
    transport: TransportSnapshot,
    grid: ClipGrid,
    raw_tracks: Option<String>,
}

/// Socket plus resolved destination, present once the bridge is started.
struct Link {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
}

/// Keeps every command handed to the bridge, for tests and dry runs.
#[derive(Clone, Default)]
pub struct CommandRecorder {
    sent: Arc<Mutex<Vec<SequencerCommand>>>,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SequencerCommand> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    fn record(&self, command: &SequencerCommand) {
        self.sent.lock().push(command.clone());
    }
}

/// Shutdown handle of one background task.
struct PollerHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    fn stop(self) {
        // Task already gone when the receiver is dropped
        let _ = self.shutdown.send(true);
        log::debug!("Stopping sequencer {} task", self.name);
        drop(self.task);
    }
}

/// Keeps the clip sequencer's transport and clip grid in sync.
///
/// Two pollers ask for state at fixed rates, a receiver parses the replies,
/// updates the shared snapshot and raises the dirty flags on change. Readers
/// only see copies taken under the lock.
pub struct SequencerBridge {
    settings: SequencerSettings,
    state: Arc<Mutex<SequencerState>>,
    dirty: Arc<DirtyFlags>,
    link: Mutex<Option<Arc<Link>>>,
    tasks: Mutex<Vec<PollerHandle>>,
    recorder: Option<CommandRecorder>,
}

impl SequencerBridge {
    pub fn new(settings: SequencerSettings, dirty: Arc<DirtyFlags>) -> Self {
        Self {
            settings,
            state: Arc::new(Mutex::new(SequencerState::default())),
            dirty,
            link: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            recorder: None,
        }
    }

    /// Bridge that also hands every sent command to `recorder`.
    pub fn with_recorder(
        settings: SequencerSettings,
        dirty: Arc<DirtyFlags>,
        recorder: CommandRecorder,
    ) -> Self {
        Self {
            settings,
            state: Arc::new(Mutex::new(SequencerState::default())),
            dirty,
            link: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            recorder: Some(recorder),
        }
    }

    pub fn revision(&self) -> ProtocolRevision {
        self.settings.protocol_revision
    }

    /// Bind the reply socket and start both pollers and the receiver.
    pub async fn start(&self) -> Result<(), SequencerError> {
        if self.is_running() {
            return Ok(());
        }

        let target_name = format!("{}:{}", self.settings.host, self.settings.send_port);
        let target = tokio::net::lookup_host(&target_name)
            .await
            .map_err(|e| SequencerError::Resolve(format!("{}: {}", target_name, e)))?
            .next()
            .ok_or_else(|| SequencerError::Resolve(target_name.clone()))?;

        let socket = UdpSocket::bind(("0.0.0.0", self.settings.receive_port))
            .await
            .map_err(|source| SequencerError::Bind {
                port: self.settings.receive_port,
                source,
            })?;
        let link = Arc::new(Link {
            socket: Arc::new(socket),
            target,
        });
        *self.link.lock() = Some(link.clone());

        log::info!(
            "Sequencer bridge sending to {} and receiving on {}",
            target,
            link.socket
                .local_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "?".to_string())
        );

        let transport_poller = spawn_poller(
            "transport poller",
            link.clone(),
            TRANSPORT_STATE_REQUEST,
            self.settings.transport_poll_hz,
        )?;
        let tracks_poller = spawn_poller(
            "tracks poller",
            link.clone(),
            TRACKS_STATE_REQUEST,
            self.settings.tracks_poll_hz,
        )?;
        let receiver = self.spawn_receiver(link);

        self.tasks
            .lock()
            .extend([transport_poller, tracks_poller, receiver]);
        Ok(())
    }

    /// Stop every background task. State stays readable.
    pub fn stop(&self) {
        for handle in self.tasks.lock().drain(..) {
            handle.stop();
        }
        *self.link.lock() = None;
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.lock().is_empty()
    }

    /// Address the reply socket is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.link
            .lock()
            .as_ref()
            .and_then(|link| link.socket.local_addr().ok())
    }

    /// Fire and forget. Does nothing while the bridge is stopped.
    pub fn send(&self, command: SequencerCommand) {
        if let Some(recorder) = &self.recorder {
            recorder.record(&command);
        }
        let link = self.link.lock().clone();
        match link {
            Some(link) => send_packet(&link, &command.to_packet()),
            None => log::trace!("Sequencer bridge not running, dropping {:?}", command),
        }
    }

    pub fn transport(&self) -> TransportSnapshot {
        self.state.lock().transport.clone()
    }

    pub fn grid(&self) -> ClipGrid {
        self.state.lock().grid.clone()
    }

    pub fn clip(&self, track: usize, clip: usize) -> ClipState {
        self.state.lock().grid.clip(track, clip)
    }

    /// Apply one state reply payload.
    ///
    /// Malformed payloads are dropped and the previous state is kept.
    pub fn handle_payload(&self, payload: &str) {
        self.writer().handle_payload(payload);
    }

    fn writer(&self) -> StateWriter {
        StateWriter {
            state: Arc::clone(&self.state),
            dirty: Arc::clone(&self.dirty),
            revision: self.revision(),
        }
    }

    fn spawn_receiver(&self, link: Arc<Link>) -> PollerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let writer = self.writer();

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    received = link.socket.recv_from(&mut buf) => {
                        match received {
                            Ok((size, _)) => writer.handle_datagram(&buf[..size]),
                            Err(e) => log::debug!("Sequencer receive failed: {}", e),
                        }
                    }
                }
            }
            log::debug!("Sequencer receiver stopped");
        });

        PollerHandle {
            name: "receiver",
            shutdown,
            task,
        }
    }
}

impl Drop for SequencerBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Write side of the shared state, held by the receiver task.
///
/// It holds no reference to the bridge, so dropping the bridge stops the tasks.
struct StateWriter {
    state: Arc<Mutex<SequencerState>>,
    dirty: Arc<DirtyFlags>,
    revision: ProtocolRevision,
}

impl StateWriter {
    fn handle_payload(&self, payload: &str) {
        if let Err(e) = self.apply_payload(payload) {
            log::debug!("Dropping sequencer state message: {}", e);
        }
    }

    fn apply_payload(&self, payload: &str) -> Result<(), SequencerError> {
        match split_message(payload)? {
            StateMessage::Transport(fields) => {
                let mut state = self.state.lock();
                let snapshot = parse_transport(&fields, self.revision, &state.grid)?;
                if snapshot.buttons_differ(&state.transport) {
                    self.dirty.mark_buttons();
                }
                state.transport = snapshot;
            }
            StateMessage::Tracks(fields) => {
                let mut state = self.state.lock();
                if state.raw_tracks.as_deref() == Some(payload) {
                    return Ok(());
                }
                let tracks = parse_tracks(&fields)?;
                state.grid = ClipGrid::from_raw(&tracks);
                state.raw_tracks = Some(payload.to_string());
                self.dirty.mark_pads();
            }
        }
        Ok(())
    }

    fn handle_datagram(&self, bytes: &[u8]) {
        match decoder::decode_udp(bytes) {
            Ok((_, packet)) => {
                for payload in state_payloads(packet) {
                    self.handle_payload(&payload);
                }
            }
            Err(e) => log::debug!("Undecodable sequencer datagram: {:?}", e),
        }
    }
}

fn spawn_poller(
    name: &'static str,
    link: Arc<Link>,
    address: &'static str,
    rate_hz: u32,
) -> Result<PollerHandle, SequencerError> {
    let request = message(address, Vec::new());
    let bytes = encoder::encode(&request).map_err(|e| SequencerError::Encode(format!("{:?}", e)))?;
    let period = Duration::from_secs_f64(1.0 / rate_hz.max(1) as f64);
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {
                    if let Err(e) = link.socket.try_send_to(&bytes, link.target) {
                        log::trace!("{} request failed: {}", address, e);
                    }
                }
            }
        }
    });

    log::info!("Started sequencer {} at {} Hz", name, rate_hz.max(1));
    Ok(PollerHandle {
        name,
        shutdown,
        task,
    })
}

fn send_packet(link: &Link, packet: &OscPacket) {
    match encoder::encode(packet) {
        Ok(bytes) => {
            if let Err(e) = link.socket.try_send_to(&bytes, link.target) {
                log::trace!("Sequencer command not sent: {}", e);
            }
        }
        Err(e) => log::debug!("Could not encode sequencer command: {:?}", e),
    }
}
