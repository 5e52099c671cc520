//! Push 2 display subsystem.
//!
//! The display is composed as a grid of text cells, one column per track
//! encoder.

mod layout;

pub use layout::{Cell, TextLayout, CELL_WIDTH};
