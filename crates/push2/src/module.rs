//! Push2Device - connection to an Ableton Push 2 in user mode.

use std::collections::HashMap;

use conductor_core::{
    AftertouchMode, ControlEvent, DisplaySurface, MidiError, MidiSink, SurfaceCommand,
};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::display::TextLayout;
use crate::midi::{LedState, Push2Mapping};

/// Manufacturer id and device id prefixing every Push 2 sysex command.
const SYSEX_PREFIX: [u8; 6] = [0xF0, 0x00, 0x21, 0x1D, 0x01, 0x01];
const SYSEX_END: u8 = 0xF7;

const CMD_SET_PAD_PARAMETERS: u8 = 0x1B;
const CMD_SET_AFTERTOUCH_MODE: u8 = 0x1E;
const CMD_SET_VELOCITY_CURVE: u8 = 0x20;

/// Velocity curve entries carried by one sysex message.
const CURVE_CHUNK: usize = 16;

#[derive(Debug, Error)]
pub enum Push2Error {
    #[error("MIDI backend unavailable: {0}")]
    Init(String),
    #[error("Push 2 MIDI input not found")]
    InputNotFound,
    #[error("failed to connect to Push 2: {0}")]
    Connect(String),
}

/// midir output connection to the controller.
struct Push2Output {
    name: String,
    connection: MidiOutputConnection,
}

impl MidiSink for Push2Output {
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
        self.connection
            .send(bytes)
            .map_err(|e| MidiError::Send(e.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Ableton Push 2 controller.
///
/// Owns the MIDI connections, the LED buffer and the display layout. Input
/// arrives on the midir callback thread and is queued until the main loop
/// polls it.
pub struct Push2Device {
    /// MIDI input connection
    midi_input: Option<MidiInputConnection<mpsc::UnboundedSender<Vec<u8>>>>,

    /// MIDI output for LED feedback and configuration
    output: Option<Box<dyn MidiSink>>,

    midi_tx: mpsc::UnboundedSender<Vec<u8>>,
    midi_rx: mpsc::UnboundedReceiver<Vec<u8>>,

    leds: LedState,
    layout: TextLayout,

    /// Connection status
    status: HashMap<String, String>,
}

impl Push2Device {
    /// Create a device with no connections.
    pub fn new() -> Self {
        let (midi_tx, midi_rx) = mpsc::unbounded_channel();
        Self {
            midi_input: None,
            output: None,
            midi_tx,
            midi_rx,
            leds: LedState::new(),
            layout: TextLayout::new(),
            status: HashMap::new(),
        }
    }

    /// Create a device writing to the given sink instead of a hardware port.
    pub fn with_output(output: Box<dyn MidiSink>) -> Self {
        let mut device = Self::new();
        device.output = Some(output);
        device
    }

    /// Connect to the first ports whose name contains the Push 2 device name.
    pub fn connect(&mut self) -> Result<(), Push2Error> {
        self.connect_to(Push2Mapping::device_name())
    }

    /// Connect to the first ports whose name contains `marker`.
    ///
    /// A missing input port is an error; a missing output only disables LED
    /// feedback.
    pub fn connect_to(&mut self, marker: &str) -> Result<(), Push2Error> {
        let midi_in =
            MidiInput::new("conductor_push2_in").map_err(|e| Push2Error::Init(e.to_string()))?;

        let in_port = midi_in.ports().into_iter().find(|p| {
            midi_in
                .port_name(p)
                .map(|n| n.contains(marker))
                .unwrap_or(false)
        });
        let Some(in_port) = in_port else {
            self.status
                .insert("midi_input".to_string(), "not_found".to_string());
            return Err(Push2Error::InputNotFound);
        };

        let connection = midi_in
            .connect(
                &in_port,
                "push2-input",
                move |_timestamp, message, tx| {
                    // Receiver gone means the device was dropped
                    let _ = tx.send(message.to_vec());
                },
                self.midi_tx.clone(),
            )
            .map_err(|e| Push2Error::Connect(e.to_string()))?;
        self.midi_input = Some(connection);
        self.status
            .insert("midi_input".to_string(), "connected".to_string());

        let midi_out =
            MidiOutput::new("conductor_push2_out").map_err(|e| Push2Error::Init(e.to_string()))?;
        let out_port = midi_out.ports().into_iter().find_map(|p| {
            let name = midi_out.port_name(&p).ok()?;
            name.contains(marker).then_some((p, name))
        });

        match out_port {
            Some((port, name)) => {
                let connection = midi_out
                    .connect(&port, "push2-output")
                    .map_err(|e| Push2Error::Connect(e.to_string()))?;
                self.output = Some(Box::new(Push2Output { name, connection }));
                self.status
                    .insert("midi_output".to_string(), "connected".to_string());
            }
            None => {
                self.status
                    .insert("midi_output".to_string(), "not_found".to_string());
                tracing::warn!("Push 2 MIDI output not found - LED feedback disabled");
            }
        }

        // Everything has to be sent again to the freshly connected hardware
        self.leds.invalidate();

        tracing::info!("Push 2 MIDI connected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.midi_input.is_some()
    }

    /// Sender feeding raw messages into the input queue, as the hardware does.
    pub fn input_sender(&self) -> mpsc::UnboundedSender<Vec<u8>> {
        self.midi_tx.clone()
    }

    /// Drain queued input and translate it into control events.
    pub fn poll_events(&mut self) -> Vec<ControlEvent> {
        let mut events = Vec::new();
        while let Ok(message) = self.midi_rx.try_recv() {
            if let Some(event) = Push2Mapping::translate(&message) {
                events.push(event);
            }
        }
        events
    }

    pub fn leds(&mut self) -> &mut LedState {
        &mut self.leds
    }

    pub fn display(&mut self) -> &mut TextLayout {
        &mut self.layout
    }

    /// The display layout if it changed since the last call.
    pub fn take_display_update(&mut self) -> Option<&TextLayout> {
        if self.layout.take_dirty() {
            Some(&self.layout)
        } else {
            None
        }
    }

    /// Send LED state to Push 2 via MIDI.
    pub fn flush(&mut self) {
        let messages = self.leds.to_midi_messages();
        if let Some(ref mut output) = self.output {
            for message in messages {
                if let Err(e) = output.send(&message) {
                    tracing::debug!("LED update failed: {}", e);
                }
            }
        }
    }

    /// Apply a configuration change to the hardware.
    pub fn apply(&mut self, command: &SurfaceCommand) {
        if let SurfaceCommand::Reset = command {
            self.leds.clear();
            self.flush();
            self.leds.invalidate();
            self.layout.clear();
            tracing::info!("Push 2 surface reset");
            return;
        }

        let Some(ref mut output) = self.output else {
            return;
        };
        for message in sysex_messages(command) {
            if let Err(e) = output.send(&message) {
                tracing::warn!("Failed to configure Push 2: {}", e);
            }
        }
    }

    /// Turn off all LEDs and close connections.
    pub fn shutdown(&mut self) {
        tracing::info!("Shutting down Push 2");
        self.leds.clear();
        self.flush();

        // Close connections (dropped automatically)
        self.midi_input = None;
        self.output = None;
        self.status
            .insert("state".to_string(), "shutdown".to_string());
    }

    pub fn status(&self) -> HashMap<String, String> {
        self.status.clone()
    }
}

impl Default for Push2Device {
    fn default() -> Self {
        Self::new()
    }
}

fn sysex(command: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(SYSEX_PREFIX.len() + payload.len() + 2);
    message.extend_from_slice(&SYSEX_PREFIX);
    message.push(command);
    message.extend(payload.iter().map(|b| b & 0x7F));
    message.push(SYSEX_END);
    message
}

/// 14-bit value as two 7-bit bytes, least significant first.
fn split_14bit(value: u16) -> [u8; 2] {
    let value = value.min(0x3FFF);
    [(value & 0x7F) as u8, (value >> 7) as u8]
}

/// Sysex messages implementing a configuration command. Reset is not sysex.
fn sysex_messages(command: &SurfaceCommand) -> Vec<Vec<u8>> {
    match command {
        SurfaceCommand::SetAftertouchMode(mode) => {
            let value = match mode {
                AftertouchMode::Channel => 0,
                AftertouchMode::Polyphonic => 1,
            };
            vec![sysex(CMD_SET_AFTERTOUCH_MODE, &[value])]
        }
        SurfaceCommand::SetChannelAftertouchRange { start, end } => {
            let [start_lo, start_hi] = split_14bit(*start);
            let [end_lo, end_hi] = split_14bit(*end);
            vec![sysex(
                CMD_SET_PAD_PARAMETERS,
                &[0, 0, 0, 0, 0, 0, start_lo, start_hi, end_lo, end_hi],
            )]
        }
        SurfaceCommand::SetVelocityCurve(curve) => curve
            .chunks(CURVE_CHUNK)
            .enumerate()
            .map(|(i, chunk)| {
                let mut payload = Vec::with_capacity(CURVE_CHUNK + 1);
                payload.push((i * CURVE_CHUNK) as u8);
                payload.extend_from_slice(chunk);
                sysex(CMD_SET_VELOCITY_CURVE, &payload)
            })
            .collect(),
        SurfaceCommand::Reset => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::midi::router::RecordingSink;
    use conductor_core::{Button, Color, ControlSurface, PadColor};

    fn device() -> (Push2Device, RecordingSink) {
        let sink = RecordingSink::new();
        (Push2Device::with_output(Box::new(sink.clone())), sink)
    }

    #[test]
    fn test_poll_translates_queued_input() {
        let (mut device, _) = device();
        let tx = device.input_sender();
        tx.send(vec![0x90, 36, 100]).unwrap();
        tx.send(vec![0x90, 3, 127]).unwrap(); // encoder touch, dropped
        tx.send(vec![0xB0, 85, 127]).unwrap();

        let events = device.poll_events();
        assert_eq!(
            events,
            vec![
                ControlEvent::PadPressed {
                    row: 7,
                    col: 0,
                    velocity: 100
                },
                ControlEvent::ButtonPressed(Button::Play),
            ]
        );
        assert!(device.poll_events().is_empty());
    }

    #[test]
    fn test_flush_sends_led_changes() {
        let (mut device, sink) = device();
        device.flush();
        assert_eq!(sink.sent().len(), 64);
        sink.clear();

        device.leds().set_pad(0, 0, PadColor::new(Color::Red));
        device.leds().set_button(Button::Note, PadColor::new(Color::White));
        device.flush();
        assert_eq!(sink.sent().len(), 2);
    }

    #[test]
    fn test_velocity_curve_is_chunked() {
        let (mut device, sink) = device();
        let curve: Vec<u8> = (0..128).collect();
        device.apply(&SurfaceCommand::SetVelocityCurve(curve));

        let sent = sink.sent();
        assert_eq!(sent.len(), 8);
        assert_eq!(&sent[1][..8], &[0xF0, 0x00, 0x21, 0x1D, 0x01, 0x01, 0x20, 16]);
        assert_eq!(sent[1][8], 16);
        assert_eq!(*sent[1].last().unwrap(), 0xF7);
    }

    #[test]
    fn test_aftertouch_configuration() {
        let (mut device, sink) = device();
        device.apply(&SurfaceCommand::SetAftertouchMode(AftertouchMode::Polyphonic));
        device.apply(&SurfaceCommand::SetChannelAftertouchRange {
            start: 401,
            end: 800,
        });

        let sent = sink.sent();
        assert_eq!(sent[0], vec![0xF0, 0x00, 0x21, 0x1D, 0x01, 0x01, 0x1E, 1, 0xF7]);
        // 401 = 3 * 128 + 17, 800 = 6 * 128 + 32
        assert_eq!(&sent[1][13..17], &[17, 3, 32, 6]);
    }

    #[test]
    fn test_reset_blanks_and_resends() {
        let (mut device, sink) = device();
        device.leds().set_pad(1, 1, PadColor::new(Color::Blue));
        device.flush();
        sink.clear();

        device.apply(&SurfaceCommand::Reset);
        // The lit pad goes dark
        assert_eq!(sink.sent().len(), 1);
        sink.clear();

        device.flush();
        assert_eq!(sink.sent().len(), 64);
    }

    #[test]
    fn test_shutdown_darkens_and_reports() {
        let (mut device, sink) = device();
        device.leds().set_pad(0, 0, PadColor::new(Color::Red));
        device.flush();
        sink.clear();

        device.shutdown();
        assert_eq!(sink.sent().len(), 1);
        assert_eq!(
            device.status().get("state").map(String::as_str),
            Some("shutdown")
        );
    }

    #[test]
    fn test_missing_device_does_not_connect() {
        let mut device = Push2Device::new();
        tokio_test::assert_err!(device.connect_to("no such controller 7f3a"));
        assert!(!device.is_connected());
    }
}
