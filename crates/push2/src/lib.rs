//! Ableton Push 2 adapter for the conductor controller front-end.
//!
//! This crate provides:
//! - Translation of raw Push 2 MIDI into hardware-agnostic control events
//! - An LED buffer implementing [`conductor_core::ControlSurface`]
//! - A text-cell display layout implementing [`conductor_core::DisplaySurface`]
//! - Pad configuration (aftertouch mode, channel pressure range, velocity curve)
//!
//! # Pad Layout
//!
//! The 8x8 pad grid sends notes 36-99, bottom-left to top-right. Rows are
//! exposed counted from the top so row 0 is the row next to the display.

pub mod display;
pub mod midi;
pub mod module;

pub use display::TextLayout;
pub use midi::{LedState, Push2Mapping};
pub use module::{Push2Device, Push2Error};
