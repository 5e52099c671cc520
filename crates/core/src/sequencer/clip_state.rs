//! Clip state flags as sent by the clip sequencer.
//!
//! On the wire a clip's state is a short string of flag characters that may
//! co-occur (`"Ewr"`, `"pW"`, ...). The string is decoded once on arrival and
//! the rest of the crate only looks at the named booleans.

/// Decoded flags of one clip slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipState {
    /// `E`: no content in the slot
    pub empty: bool,
    /// `c`/`C`: cued to start
    pub cued: bool,
    /// `w`/`W`: waiting for a quantized boundary to start or stop
    pub waiting: bool,
    /// `p`: playing
    pub playing: bool,
    /// `r`: recording or overdubbing
    pub recording: bool,
}

/// What a clip slot should look like, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClipDisplay {
    Empty,
    HasContent,
    Cued,
    Waiting,
    Playing,
    Recording,
}

impl ClipState {
    pub fn parse(flags: &str) -> Self {
        let mut state = ClipState::default();
        for flag in flags.chars() {
            match flag {
                'E' => state.empty = true,
                'c' | 'C' => state.cued = true,
                'w' | 'W' => state.waiting = true,
                'p' => state.playing = true,
                'r' => state.recording = true,
                _ => {}
            }
        }
        state
    }

    /// Highest-precedence look for the flags present.
    ///
    /// Later flags in [`ClipDisplay`] order override earlier ones, so `Empty`
    /// only wins when nothing else is set.
    pub fn display(&self) -> ClipDisplay {
        if self.recording {
            ClipDisplay::Recording
        } else if self.playing {
            ClipDisplay::Playing
        } else if self.waiting {
            ClipDisplay::Waiting
        } else if self.cued {
            ClipDisplay::Cued
        } else if self.empty {
            ClipDisplay::Empty
        } else {
            ClipDisplay::HasContent
        }
    }

    pub fn has_content(&self) -> bool {
        !self.empty
    }
}
