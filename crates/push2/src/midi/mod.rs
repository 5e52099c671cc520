//! Push 2 MIDI handling.
//!
//! Handles pad/encoder input and LED feedback.

mod led_feedback;
mod mapping;

pub use led_feedback::{button_brightness, palette_index, LedState};
pub use mapping::Push2Mapping;
