//! Text payloads of the clip sequencer's state replies.
//!
//! Every reply is a single comma-separated string. The first field names the
//! message, the remaining fields are positional:
//!
//! ```text
//! transport,<play>,<bpm>,<playhead>,<metronome>,<track>,<scene>[,<record>]
//! tracks,t,<count>,<clip>,<clip>,...,t,<count>,<clip>,...
//! ```

use serde::{Deserialize, Serialize};

use super::clip_state::ClipState;
use super::SequencerError;

const TRANSPORT_PREFIX: &str = "transport";
const TRACKS_PREFIX: &str = "tracks";
const TRACK_MARKER: &str = "t";

/// Which transport layout the sequencer speaks.
///
/// The wire format carries no version, so this has to be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolRevision {
    /// Seven fields; recording is derived from the clip grid
    #[default]
    DerivedRecording,
    /// Eight fields; the last one is the record flag
    ExplicitRecording,
}

impl ProtocolRevision {
    fn transport_fields(self) -> usize {
        match self {
            ProtocolRevision::DerivedRecording => 7,
            ProtocolRevision::ExplicitRecording => 8,
        }
    }
}

/// Latest transport state reported by the sequencer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportSnapshot {
    pub is_playing: bool,
    pub is_recording: bool,
    pub metronome_on: bool,
    pub bpm: f64,
    /// Passed through for display only
    pub playhead_raw: String,
    pub selected_track: i32,
    pub selected_scene: i32,
}

impl TransportSnapshot {
    /// Whether the fields that drive button LEDs differ.
    pub fn buttons_differ(&self, other: &TransportSnapshot) -> bool {
        self.is_playing != other.is_playing
            || self.is_recording != other.is_recording
            || self.metronome_on != other.metronome_on
            || self.selected_scene != other.selected_scene
    }
}

/// Clip states of every track, `tracks[track][scene]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipGrid {
    tracks: Vec<Vec<ClipState>>,
}

impl ClipGrid {
    pub fn from_raw(tracks: &[Vec<&str>]) -> Self {
        Self {
            tracks: tracks
                .iter()
                .map(|clips| clips.iter().map(|flags| ClipState::parse(flags)).collect())
                .collect(),
        }
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn num_clips(&self, track: usize) -> usize {
        self.tracks.get(track).map(Vec::len).unwrap_or(0)
    }

    /// State of a slot; slots outside the grid read as empty.
    pub fn clip(&self, track: usize, clip: usize) -> ClipState {
        self.tracks
            .get(track)
            .and_then(|clips| clips.get(clip))
            .copied()
            .unwrap_or(ClipState {
                empty: true,
                ..ClipState::default()
            })
    }

    pub fn any_recording(&self) -> bool {
        self.tracks.iter().flatten().any(|clip| clip.recording)
    }
}

/// A state reply split into its fields, not yet interpreted.
#[derive(Debug, PartialEq)]
pub enum StateMessage<'a> {
    Transport(Vec<&'a str>),
    Tracks(Vec<&'a str>),
}

/// Split a payload and identify it by its prefix.
pub fn split_message(payload: &str) -> Result<StateMessage<'_>, SequencerError> {
    let fields: Vec<&str> = payload.trim().split(',').collect();
    match fields.first().copied() {
        Some(TRANSPORT_PREFIX) => Ok(StateMessage::Transport(fields)),
        Some(TRACKS_PREFIX) => Ok(StateMessage::Tracks(fields)),
        Some(other) => Err(SequencerError::Malformed(format!(
            "unknown message '{}'",
            other
        ))),
        None => Err(SequencerError::Malformed("empty message".to_string())),
    }
}

/// Interpret a transport message.
///
/// With [`ProtocolRevision::DerivedRecording`] the record state comes from `grid`.
pub fn parse_transport(
    fields: &[&str],
    revision: ProtocolRevision,
    grid: &ClipGrid,
) -> Result<TransportSnapshot, SequencerError> {
    if fields.len() < revision.transport_fields() {
        return Err(SequencerError::Malformed(format!(
            "transport message has {} fields, expected {}",
            fields.len(),
            revision.transport_fields()
        )));
    }

    let bpm = fields[2]
        .trim()
        .parse::<f64>()
        .map_err(|_| SequencerError::Malformed(format!("invalid bpm '{}'", fields[2])))?;
    let selected_track = parse_int(fields[5], "track")?;
    let selected_scene = parse_int(fields[6], "scene")?;

    let is_recording = match revision {
        ProtocolRevision::DerivedRecording => grid.any_recording(),
        ProtocolRevision::ExplicitRecording => fields[7] == "r",
    };

    Ok(TransportSnapshot {
        is_playing: fields[1] == "p",
        is_recording,
        metronome_on: fields[4] == "p",
        bpm,
        playhead_raw: fields[3].to_string(),
        selected_track,
        selected_scene,
    })
}

fn parse_int(field: &str, what: &str) -> Result<i32, SequencerError> {
    field
        .trim()
        .parse::<i32>()
        .map_err(|_| SequencerError::Malformed(format!("invalid {} '{}'", what, field)))
}

/// Split a tracks message into per-track clip flag strings.
///
/// The count following each `t` marker is skipped.
pub fn parse_tracks<'a>(fields: &[&'a str]) -> Result<Vec<Vec<&'a str>>, SequencerError> {
    let mut tracks: Vec<Vec<&'a str>> = Vec::new();
    let mut iter = fields.iter().skip(1);

    while let Some(field) = iter.next() {
        if *field == TRACK_MARKER {
            if iter.next().is_none() {
                return Err(SequencerError::Malformed(
                    "track marker without clip count".to_string(),
                ));
            }
            tracks.push(Vec::new());
        } else {
            match tracks.last_mut() {
                Some(track) => track.push(*field),
                None => {
                    return Err(SequencerError::Malformed(format!(
                        "clip state '{}' before first track marker",
                        field
                    )))
                }
            }
        }
    }

    Ok(tracks)
}
