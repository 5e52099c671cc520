//! Track select / mute sub-protocol of the external step sequencer.
//!
//! Plain Control Change messages on one reserved channel:
//! - controller 0, value `track + 1` selects a track (1-based on the wire)
//! - controller `track + 1`, value 0/1 mutes/unmutes a track

use super::midi::MidiMessage;
use super::router::{MidiError, MidiRouter};

/// Controller number reserved for track selection.
pub const TRACK_SELECT_CONTROLLER: u8 = 0;

/// Default reserved channel (16 in 1-based numbering).
pub const DEFAULT_CHANNEL: u8 = 15;

/// Highest track index whose 1-based wire value still fits in a data byte.
pub const MAX_TRACK_INDEX: usize = 126;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSelectProtocol {
    channel: u8,
}

impl TrackSelectProtocol {
    pub fn new(channel: u8) -> Self {
        Self {
            channel: channel.min(15),
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn select_track_message(&self, index: usize) -> Result<MidiMessage, MidiError> {
        Ok(MidiMessage::ControlChange {
            channel: self.channel,
            controller: TRACK_SELECT_CONTROLLER,
            value: wire_track(index)?,
        })
    }

    pub fn track_mute_message(&self, index: usize, muted: bool) -> Result<MidiMessage, MidiError> {
        Ok(MidiMessage::ControlChange {
            channel: self.channel,
            controller: wire_track(index)?,
            value: if muted { 0 } else { 1 },
        })
    }

    pub fn select_track(&self, router: &MidiRouter, index: usize) -> Result<(), MidiError> {
        let msg = self.select_track_message(index)?;
        router.send_on(&msg, self.channel);
        Ok(())
    }

    pub fn set_track_mute(
        &self,
        router: &MidiRouter,
        index: usize,
        muted: bool,
    ) -> Result<(), MidiError> {
        let msg = self.track_mute_message(index, muted)?;
        router.send_on(&msg, self.channel);
        Ok(())
    }
}

impl Default for TrackSelectProtocol {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL)
    }
}

fn wire_track(index: usize) -> Result<u8, MidiError> {
    if index > MAX_TRACK_INDEX {
        return Err(MidiError::OutOfRange {
            what: "track index",
            value: index,
        });
    }
    Ok(index as u8 + 1)
}
