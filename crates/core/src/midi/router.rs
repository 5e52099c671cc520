use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

use super::midi::MidiMessage;

/// Ports whose name contains this are the controller itself and never offered as devices.
const CONTROLLER_PORT_MARKER: &str = "Ableton Push";

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("MIDI backend unavailable: {0}")]
    Init(String),
    #[error("MIDI port '{0}' not found")]
    PortNotFound(String),
    #[error("failed to connect to MIDI port '{port}': {reason}")]
    Connect { port: String, reason: String },
    #[error("failed to send MIDI: {0}")]
    Send(String),
    #[error("value {value} out of range for {what}")]
    OutOfRange { what: &'static str, value: usize },
}

/// Anything raw MIDI bytes can be written to.
pub trait MidiSink: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError>;

    fn name(&self) -> &str;
}

/// midir output connection paired with the port name it was opened for.
struct MidirSink {
    name: String,
    connection: MidiOutputConnection,
}

impl MidiSink for MidirSink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
        self.connection
            .send(bytes)
            .map_err(|e| MidiError::Send(e.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Names of MIDI input ports, excluding the controller's own ports.
pub fn available_input_ports() -> Vec<String> {
    match MidiInput::new("conductor_enumerate_in") {
        Ok(midi_in) => midi_in
            .ports()
            .iter()
            .filter_map(|p| midi_in.port_name(p).ok())
            .filter(|name| !name.contains(CONTROLLER_PORT_MARKER))
            .collect(),
        Err(e) => {
            log::warn!("Could not enumerate MIDI inputs: {}", e);
            Vec::new()
        }
    }
}

/// Names of MIDI output ports, excluding the controller's own ports.
pub fn available_output_ports() -> Vec<String> {
    match MidiOutput::new("conductor_enumerate_out") {
        Ok(midi_out) => midi_out
            .ports()
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .filter(|name| !name.contains(CONTROLLER_PORT_MARKER))
            .collect(),
        Err(e) => {
            log::warn!("Could not enumerate MIDI outputs: {}", e);
            Vec::new()
        }
    }
}

/// The single shared MIDI output.
///
/// Every writer goes through the same mutex so messages are never interleaved.
/// Channel messages sent with [`MidiRouter::send`] are moved to the configured
/// output channel; [`MidiRouter::send_on`] keeps the channel it is given.
#[derive(Clone)]
pub struct MidiRouter {
    sink: Arc<Mutex<Option<Box<dyn MidiSink>>>>,
    out_channel: Arc<AtomicU8>,
}

impl MidiRouter {
    pub fn new(out_channel: u8) -> Self {
        Self {
            sink: Arc::new(Mutex::new(None)),
            out_channel: Arc::new(AtomicU8::new(out_channel.min(15))),
        }
    }

    pub fn with_sink(out_channel: u8, sink: Box<dyn MidiSink>) -> Self {
        let router = Self::new(out_channel);
        *router.sink.lock() = Some(sink);
        router
    }

    /// Open the named output port, replacing the current one.
    pub fn open_port(&self, name: &str) -> Result<(), MidiError> {
        let midi_out =
            MidiOutput::new("conductor_out").map_err(|e| MidiError::Init(e.to_string()))?;
        let port = midi_out
            .ports()
            .into_iter()
            .find(|p| midi_out.port_name(p).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| MidiError::PortNotFound(name.to_string()))?;

        let connection =
            midi_out
                .connect(&port, "conductor-output")
                .map_err(|e| MidiError::Connect {
                    port: name.to_string(),
                    reason: e.to_string(),
                })?;

        *self.sink.lock() = Some(Box::new(MidirSink {
            name: name.to_string(),
            connection,
        }));
        log::info!("Will send MIDI to '{}'", name);
        Ok(())
    }

    pub fn close(&self) {
        if self.sink.lock().take().is_some() {
            log::info!("Won't send MIDI to any device");
        }
    }

    pub fn port_name(&self) -> Option<String> {
        self.sink.lock().as_ref().map(|s| s.name().to_string())
    }

    pub fn is_open(&self) -> bool {
        self.sink.lock().is_some()
    }

    pub fn out_channel(&self) -> u8 {
        self.out_channel.load(Ordering::Relaxed)
    }

    pub fn set_out_channel(&self, channel: u8) {
        self.out_channel.store(channel.min(15), Ordering::Relaxed);
    }

    /// Send on the configured output channel.
    pub fn send(&self, msg: &MidiMessage) {
        let msg = match msg.channel() {
            Some(_) => msg.with_channel(self.out_channel()),
            None => msg.clone(),
        };
        self.write(&msg);
    }

    /// Send on a fixed channel, bypassing the output channel remap.
    pub fn send_on(&self, msg: &MidiMessage, channel: u8) {
        self.write(&msg.with_channel(channel));
    }

    fn write(&self, msg: &MidiMessage) {
        let mut guard = self.sink.lock();
        if let Some(sink) = guard.as_mut() {
            if let Err(e) = sink.send(&msg.to_bytes()) {
                log::debug!("Dropping MIDI message {:?}: {}", msg, e);
            }
        }
    }
}

/// Which channels an input port lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFilter {
    All,
    Only(u8),
}

impl ChannelFilter {
    /// Settings store "all channels" as -1.
    pub fn from_setting(channel: i8) -> Self {
        if channel < 0 {
            ChannelFilter::All
        } else {
            ChannelFilter::Only(channel.min(15) as u8)
        }
    }

    pub fn accepts(&self, msg: &MidiMessage) -> bool {
        match (self, msg.channel()) {
            (_, None) => false,
            (ChannelFilter::All, Some(_)) => true,
            (ChannelFilter::Only(wanted), Some(channel)) => *wanted == channel,
        }
    }
}

/// Source tag for messages coming from one of the app's input ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputRole {
    /// Forwarded to the output and to the active modes
    Main,
    /// Only used to illuminate notes played elsewhere
    Notes,
}

/// An open input port delivering parsed messages into a channel.
pub struct MidiInputPort {
    name: String,
    _connection: MidiInputConnection<()>,
}

impl MidiInputPort {
    pub fn open(
        name: &str,
        role: InputRole,
        tx: mpsc::UnboundedSender<(InputRole, MidiMessage)>,
    ) -> Result<Self, MidiError> {
        let midi_in = MidiInput::new("conductor_in").map_err(|e| MidiError::Init(e.to_string()))?;
        let port = midi_in
            .ports()
            .into_iter()
            .find(|p| midi_in.port_name(p).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| MidiError::PortNotFound(name.to_string()))?;

        let connection = midi_in
            .connect(
                &port,
                "conductor-input",
                move |_timestamp, bytes, _| {
                    if let Some(msg) = MidiMessage::from_bytes(bytes) {
                        // Receiver gone means the app is shutting down
                        let _ = tx.send((role, msg));
                    }
                },
                (),
            )
            .map_err(|e| MidiError::Connect {
                port: name.to_string(),
                reason: e.to_string(),
            })?;

        log::info!("Receiving MIDI in from '{}'", name);
        Ok(Self {
            name: name.to_string(),
            _connection: connection,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Sink that keeps every message, for tests and dry runs.
#[derive(Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl MidiSink for RecordingSink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
        self.sent.lock().push(bytes.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_remaps_to_output_channel() {
        let sink = RecordingSink::new();
        let router = MidiRouter::with_sink(4, Box::new(sink.clone()));

        router.send(&MidiMessage::NoteOn {
            channel: 0,
            note: 60,
            velocity: 100,
        });

        assert_eq!(sink.sent(), vec![vec![0x94, 60, 100]]);
    }

    #[test]
    fn test_send_on_keeps_pinned_channel() {
        let sink = RecordingSink::new();
        let router = MidiRouter::with_sink(4, Box::new(sink.clone()));

        router.send_on(
            &MidiMessage::ControlChange {
                channel: 0,
                controller: 0,
                value: 1,
            },
            15,
        );

        assert_eq!(sink.sent(), vec![vec![0xBF, 0, 1]]);
    }

    #[test]
    fn test_send_without_port_is_noop() {
        let router = MidiRouter::new(0);
        router.send(&MidiMessage::Clock);
        assert!(!router.is_open());
    }

    #[test]
    fn test_channel_filter() {
        let note = MidiMessage::NoteOn {
            channel: 2,
            note: 60,
            velocity: 1,
        };
        assert!(ChannelFilter::from_setting(-1).accepts(&note));
        assert!(ChannelFilter::from_setting(2).accepts(&note));
        assert!(!ChannelFilter::from_setting(3).accepts(&note));
        assert!(!ChannelFilter::All.accepts(&MidiMessage::Clock));
    }
}
