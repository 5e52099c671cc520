use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::modes::ModeId;
use crate::sequencer::protocol::ProtocolRevision;

/// Requests raised by modes while handling an event.
///
/// Modes never touch the mode stack or the device connections themselves; the
/// application applies these once dispatch has returned.
#[derive(Debug, Clone, PartialEq)]
pub enum AppRequest {
    SelectMode(ModeId),
    DeselectMode(ModeId),
    /// Activate if inactive, deactivate if active (modes outside any group)
    ToggleMode(ModeId),
    ToggleMelodicRhythmic,
    /// Open the settings mode or move to its next page
    RotateSettings,
    SelectTrack(usize),
    SaveSettings,
    /// Push aftertouch mode and ranges from the settings to the surface
    ReconfigureSurface,
    ResetSurface,
    ToggleDisplay,
    OpenMidiIn(Option<String>),
    OpenMidiOut(Option<String>),
    OpenNotesMidiIn(Option<String>),
}

/// Connection settings for the clip sequencer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SequencerSettings {
    pub enabled: bool,
    pub host: String,
    pub send_port: u16,
    pub receive_port: u16,
    pub transport_poll_hz: u32,
    pub tracks_poll_hz: u32,
    pub protocol_revision: ProtocolRevision,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            send_port: 9003,
            receive_port: 9004,
            transport_poll_hz: 10,
            tracks_poll_hz: 4,
            protocol_revision: ProtocolRevision::default(),
        }
    }
}

/// Settings configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    // MIDI devices
    pub midi_in_device: Option<String>,
    pub midi_out_device: Option<String>,
    pub notes_midi_in_device: Option<String>,
    /// -1 receives on every channel
    pub midi_in_channel: i8,
    pub midi_out_channel: u8,
    pub pyramidi_channel: u8,

    // General settings
    pub target_frame_rate: u32,
    pub use_push2_display: bool,

    // Performance settings
    pub root_midi_note: u8,
    /// Polyphonic aftertouch when set, channel aftertouch otherwise
    pub use_poly_at: bool,
    pub channel_at_range_start: u16,
    pub channel_at_range_end: u16,
    pub poly_at_max_range: u8,
    pub poly_at_curve_bending: u8,

    // Press thresholds
    pub track_select_quick_press_ms: u64,
    pub pad_quick_press_ms: u64,
    pub preset_quick_press_ms: u64,
    pub settings_quick_press_ms: u64,

    // Data files
    pub track_listing_path: PathBuf,
    pub instrument_definitions_dir: PathBuf,
    pub favourite_presets_path: PathBuf,

    pub sequencer: SequencerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            midi_in_device: None,
            midi_out_device: None,
            notes_midi_in_device: None,
            midi_in_channel: -1,
            midi_out_channel: 0,
            pyramidi_channel: 15,

            target_frame_rate: 60,
            use_push2_display: true,

            root_midi_note: 64,
            use_poly_at: true,
            channel_at_range_start: 401,
            channel_at_range_end: 800,
            poly_at_max_range: 40,
            poly_at_curve_bending: 50,

            track_select_quick_press_ms: 400,
            pad_quick_press_ms: 400,
            preset_quick_press_ms: 400,
            settings_quick_press_ms: 200,

            track_listing_path: PathBuf::from("track_listing.json"),
            instrument_definitions_dir: PathBuf::from("instrument_definitions"),
            favourite_presets_path: PathBuf::from("favourite_presets.json"),

            sequencer: SequencerSettings::default(),
        }
    }
}
