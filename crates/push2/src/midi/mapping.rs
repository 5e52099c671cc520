//! Push 2 MIDI mapping.
//!
//! Translates the raw MIDI the Push 2 sends in user mode into
//! [`ControlEvent`]s, and names the notes and CCs used for LED feedback.
//!
//! # Pad Layout (8x8 grid, notes 36-99)
//!
//! ```text
//! Row 0 (top):    92 93 94 95 96 97 98 99
//! Row 1:          84 ...
//! ...
//! Row 7 (bottom): 36 37 38 39 40 41 42 43
//! ```
//!
//! Rows are counted from the top everywhere outside this module, so the
//! note for `(row, col)` is `36 + (7 - row) * 8 + col`.

use conductor_core::{Button, ControlEvent, Encoder, MidiMessage};

/// Push 2 MIDI mapping constants and translation.
pub struct Push2Mapping;

impl Push2Mapping {
    // === Pads ===
    pub const FIRST_PAD_NOTE: u8 = 36;
    pub const LAST_PAD_NOTE: u8 = 99;

    // === Transport and mode buttons (CC) ===
    pub const METRONOME: u8 = 9;
    pub const MASTER: u8 = 28;
    pub const STOP: u8 = 29;
    pub const SETUP: u8 = 30;
    pub const SHIFT: u8 = 49;
    pub const SELECT: u8 = 48;
    pub const NOTE: u8 = 50;
    pub const SESSION: u8 = 51;
    pub const ADD_DEVICE: u8 = 52;
    pub const ADD_TRACK: u8 = 53;
    pub const OCTAVE_DOWN: u8 = 54;
    pub const OCTAVE_UP: u8 = 55;
    pub const ACCENT: u8 = 57;
    pub const USER: u8 = 59;
    pub const PAGE_LEFT: u8 = 62;
    pub const PAGE_RIGHT: u8 = 63;
    pub const PLAY: u8 = 85;
    pub const RECORD: u8 = 86;
    pub const DUPLICATE: u8 = 88;
    pub const DEVICE: u8 = 110;
    pub const DOUBLE_LOOP: u8 = 117;
    pub const DELETE: u8 = 118;

    // === Button rows (CC) ===
    pub const LOWER_ROW_1: u8 = 20;
    pub const UPPER_ROW_1: u8 = 102;
    /// Scene buttons count up from the bottom; `Button::Scene(0)` is the top one
    pub const SCENE_BOTTOM: u8 = 36;

    // === Encoders (CC) ===
    pub const TEMPO_ENCODER: u8 = 14;
    pub const SWING_ENCODER: u8 = 15;
    pub const TRACK_ENCODER_1: u8 = 71;
    pub const MASTER_ENCODER: u8 = 79;

    pub const SUSTAIN_PEDAL: u8 = 64;

    /// Note number of a pad, rows counted from the top.
    pub fn pad_note(row: u8, col: u8) -> u8 {
        Self::FIRST_PAD_NOTE + (7 - row.min(7)) * 8 + col.min(7)
    }

    /// Inverse of [`Push2Mapping::pad_note`].
    pub fn pad_for_note(note: u8) -> Option<(u8, u8)> {
        if !(Self::FIRST_PAD_NOTE..=Self::LAST_PAD_NOTE).contains(&note) {
            return None;
        }
        let index = note - Self::FIRST_PAD_NOTE;
        Some((7 - index / 8, index % 8))
    }

    /// CC number that drives a button and its LED.
    pub fn button_cc(button: Button) -> u8 {
        match button {
            Button::Play => Self::PLAY,
            Button::Record => Self::RECORD,
            Button::Stop => Self::STOP,
            Button::Note => Self::NOTE,
            Button::Session => Self::SESSION,
            Button::Setup => Self::SETUP,
            Button::User => Self::USER,
            Button::Master => Self::MASTER,
            Button::Accent => Self::ACCENT,
            Button::Shift => Self::SHIFT,
            Button::Select => Self::SELECT,
            Button::Delete => Self::DELETE,
            Button::DoubleLoop => Self::DOUBLE_LOOP,
            Button::Duplicate => Self::DUPLICATE,
            Button::Metronome => Self::METRONOME,
            Button::AddDevice => Self::ADD_DEVICE,
            Button::AddTrack => Self::ADD_TRACK,
            Button::Device => Self::DEVICE,
            Button::OctaveUp => Self::OCTAVE_UP,
            Button::OctaveDown => Self::OCTAVE_DOWN,
            Button::PageLeft => Self::PAGE_LEFT,
            Button::PageRight => Self::PAGE_RIGHT,
            Button::Upper(i) => Self::UPPER_ROW_1 + i.min(7),
            Button::Lower(i) => Self::LOWER_ROW_1 + i.min(7),
            Button::Scene(i) => Self::SCENE_BOTTOM + (7 - i.min(7)),
        }
    }

    /// Button that sends the given CC, if any.
    pub fn button_for_cc(cc: u8) -> Option<Button> {
        let button = match cc {
            Self::PLAY => Button::Play,
            Self::RECORD => Button::Record,
            Self::STOP => Button::Stop,
            Self::NOTE => Button::Note,
            Self::SESSION => Button::Session,
            Self::SETUP => Button::Setup,
            Self::USER => Button::User,
            Self::MASTER => Button::Master,
            Self::ACCENT => Button::Accent,
            Self::SHIFT => Button::Shift,
            Self::SELECT => Button::Select,
            Self::DELETE => Button::Delete,
            Self::DOUBLE_LOOP => Button::DoubleLoop,
            Self::DUPLICATE => Button::Duplicate,
            Self::METRONOME => Button::Metronome,
            Self::ADD_DEVICE => Button::AddDevice,
            Self::ADD_TRACK => Button::AddTrack,
            Self::DEVICE => Button::Device,
            Self::OCTAVE_UP => Button::OctaveUp,
            Self::OCTAVE_DOWN => Button::OctaveDown,
            Self::PAGE_LEFT => Button::PageLeft,
            Self::PAGE_RIGHT => Button::PageRight,
            102..=109 => Button::Upper(cc - Self::UPPER_ROW_1),
            20..=27 => Button::Lower(cc - Self::LOWER_ROW_1),
            36..=43 => Button::Scene(7 - (cc - Self::SCENE_BOTTOM)),
            _ => return None,
        };
        Some(button)
    }

    pub fn encoder_for_cc(cc: u8) -> Option<Encoder> {
        match cc {
            Self::TEMPO_ENCODER => Some(Encoder::Tempo),
            Self::SWING_ENCODER => Some(Encoder::Swing),
            71..=78 => Some(Encoder::Track(cc - Self::TRACK_ENCODER_1)),
            Self::MASTER_ENCODER => Some(Encoder::Master),
            _ => None,
        }
    }

    /// Encoders send 7-bit two's complement increments: 1 = +1, 127 = -1.
    pub fn decode_increment(value: u8) -> i8 {
        let value = value & 0x7F;
        if value < 64 {
            value as i8
        } else {
            (value as i16 - 128) as i8
        }
    }

    /// Translate one raw message from the controller into a control event.
    ///
    /// Encoder touch notes, touchstrip touch and anything else the modes do
    /// not consume are dropped.
    pub fn translate(bytes: &[u8]) -> Option<ControlEvent> {
        match MidiMessage::from_bytes(bytes)? {
            MidiMessage::NoteOn { note, velocity, .. } => {
                let (row, col) = Self::pad_for_note(note)?;
                if velocity > 0 {
                    Some(ControlEvent::PadPressed { row, col, velocity })
                } else {
                    Some(ControlEvent::PadReleased { row, col, velocity })
                }
            }
            MidiMessage::NoteOff { note, velocity, .. } => {
                let (row, col) = Self::pad_for_note(note)?;
                Some(ControlEvent::PadReleased { row, col, velocity })
            }
            MidiMessage::PolyAftertouch { note, value, .. } => {
                let pad = Self::pad_for_note(note)?;
                Some(ControlEvent::PadAftertouch {
                    pad: Some(pad),
                    value,
                })
            }
            MidiMessage::ChannelAftertouch { value, .. } => {
                Some(ControlEvent::PadAftertouch { pad: None, value })
            }
            MidiMessage::PitchBend { value, .. } => Some(ControlEvent::Touchstrip(value)),
            MidiMessage::ControlChange {
                controller, value, ..
            } => Self::translate_cc(controller, value),
            _ => None,
        }
    }

    fn translate_cc(cc: u8, value: u8) -> Option<ControlEvent> {
        if cc == Self::SUSTAIN_PEDAL {
            return Some(ControlEvent::SustainPedal(value >= 64));
        }

        if let Some(encoder) = Self::encoder_for_cc(cc) {
            let increment = Self::decode_increment(value);
            if increment == 0 {
                return None;
            }
            return Some(ControlEvent::EncoderRotated { encoder, increment });
        }

        let button = Self::button_for_cc(cc)?;
        if value > 0 {
            Some(ControlEvent::ButtonPressed(button))
        } else {
            Some(ControlEvent::ButtonReleased(button))
        }
    }

    /// Get the Push 2 device name for MIDI port matching.
    pub fn device_name() -> &'static str {
        "Ableton Push 2"
    }
}
