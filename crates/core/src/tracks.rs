//! Track listing and per-instrument definition files.
//!
//! `track_listing.json` is an array of instrument short names, one per track.
//! Each short name refers to `<definitions_dir>/<short name>.json`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::surface::Color;

/// Number of tracks addressable from the pad grid.
pub const NUM_TRACKS: usize = 64;

/// Short name of a track with no instrument assigned.
pub const NO_INSTRUMENT: &str = "-";

/// Colors handed out to tracks whose definition has none.
const TRACK_COLORS: [Color; 8] = [
    Color::Orange,
    Color::Yellow,
    Color::Turquoise,
    Color::Lime,
    Color::Red,
    Color::Pink,
    Color::Purple,
    Color::Blue,
];

#[derive(Debug, Error)]
pub enum TrackListingError {
    #[error("could not read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("could not parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Pad layout an instrument is played with by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Melodic,
    Rhythmic,
}

/// A named group of MIDI CC controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcSection {
    pub section: String,
    /// `(name, cc number)` pairs
    pub controls: Vec<(String, u8)>,
    #[serde(default)]
    pub control_value_label_maps: HashMap<String, HashMap<String, String>>,
}

/// Contents of one instrument definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentDefinition {
    pub instrument_name: String,
    pub midi_channel: Option<u8>,
    pub color: Option<Color>,
    pub n_banks: u8,
    pub bank_names: Vec<String>,
    pub default_layout: Layout,
    pub illuminate_local_notes: bool,
    pub midi_cc: Option<Vec<CcSection>>,
}

impl Default for InstrumentDefinition {
    fn default() -> Self {
        Self {
            instrument_name: NO_INSTRUMENT.to_string(),
            midi_channel: None,
            color: None,
            n_banks: 1,
            bank_names: Vec::new(),
            default_layout: Layout::Melodic,
            illuminate_local_notes: true,
            midi_cc: None,
        }
    }
}

/// Everything the modes need to know about one track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    /// `1A` .. `16D`
    pub track_name: String,
    pub instrument_short_name: String,
    pub definition: InstrumentDefinition,
    pub color: Color,
}

impl TrackInfo {
    fn placeholder(index: usize) -> Self {
        Self {
            track_name: track_name(index),
            instrument_short_name: NO_INSTRUMENT.to_string(),
            definition: InstrumentDefinition::default(),
            color: Color::Orange,
        }
    }
}

/// Name shown for a track: 16 per bank, banks A to D.
pub fn track_name(index: usize) -> String {
    let bank = ["A", "B", "C", "D"].get(index / 16).copied().unwrap_or("?");
    format!("{}{}", (index % 16) + 1, bank)
}

/// The ordered list of tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackListing {
    tracks: Vec<TrackInfo>,
}

impl TrackListing {
    /// 64 tracks without instruments.
    pub fn placeholders() -> Self {
        Self {
            tracks: (0..NUM_TRACKS).map(TrackInfo::placeholder).collect(),
        }
    }

    /// Load the listing and every referenced definition.
    ///
    /// A missing listing yields placeholders; a missing definition file leaves
    /// that track with default instrument data.
    pub fn load(listing_path: &Path, definitions_dir: &Path) -> Result<Self, TrackListingError> {
        if !listing_path.exists() {
            log::info!(
                "No track listing at {}, using {} empty tracks",
                listing_path.display(),
                NUM_TRACKS
            );
            return Ok(Self::placeholders());
        }

        let short_names: Vec<String> = read_json(listing_path)?;
        let mut cache: HashMap<String, InstrumentDefinition> = HashMap::new();
        let mut tracks = Vec::with_capacity(short_names.len());

        for (index, short_name) in short_names.into_iter().enumerate() {
            let definition = match cache.get(&short_name) {
                Some(definition) => definition.clone(),
                None => {
                    let definition = load_definition(definitions_dir, &short_name)?;
                    cache.insert(short_name.clone(), definition.clone());
                    definition
                }
            };

            let color = definition.color.unwrap_or(if short_name == NO_INSTRUMENT {
                Color::DarkGray
            } else {
                TRACK_COLORS[index % TRACK_COLORS.len()]
            });

            tracks.push(TrackInfo {
                track_name: track_name(index),
                instrument_short_name: short_name,
                definition,
                color,
            });
        }

        log::info!("Created {} tracks", tracks.len());
        Ok(Self { tracks })
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrackInfo> {
        self.tracks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackInfo> {
        self.tracks.iter()
    }

    /// Color of a track, black when out of range.
    pub fn color(&self, index: usize) -> Color {
        self.get(index).map(|t| t.color).unwrap_or(Color::Black)
    }

    /// Distinct instrument short names, in first-seen order.
    pub fn instrument_short_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for track in &self.tracks {
            if !names.contains(&track.instrument_short_name) {
                names.push(track.instrument_short_name.clone());
            }
        }
        names
    }
}

impl Default for TrackListing {
    fn default() -> Self {
        Self::placeholders()
    }
}

fn load_definition(
    definitions_dir: &Path,
    short_name: &str,
) -> Result<InstrumentDefinition, TrackListingError> {
    let path = definitions_dir.join(format!("{}.json", short_name));
    if !path.exists() {
        log::debug!("No instrument definition for '{}'", short_name);
        return Ok(InstrumentDefinition::default());
    }
    read_json(&path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, TrackListingError> {
    let content = fs::read_to_string(path).map_err(|e| TrackListingError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| TrackListingError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
