//! Interfaces the mode layer paints through.
//!
//! The hardware adapter owns palettes, LED buffers and display pixels; modes
//! only talk in terms of named colors and text cells.

use serde::{Deserialize, Serialize};

use crate::controls::Button;

/// Named colors understood by every surface.
///
/// Serialized lowercase so instrument definition files can name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    Black,
    White,
    Gray,
    DarkGray,
    Red,
    Orange,
    Yellow,
    Lime,
    Green,
    Turquoise,
    Blue,
    Purple,
    Pink,
}

impl Color {
    pub const ALL: [Color; 13] = [
        Color::Black,
        Color::White,
        Color::Gray,
        Color::DarkGray,
        Color::Red,
        Color::Orange,
        Color::Yellow,
        Color::Lime,
        Color::Green,
        Color::Turquoise,
        Color::Blue,
        Color::Purple,
        Color::Pink,
    ];
}

/// LED animation, synced to the surface's internal clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Animation {
    #[default]
    Static,
    Pulsing,
    Blinking,
}

/// Color and animation for a single pad or button LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PadColor {
    pub color: Color,
    pub dim: bool,
    pub animation: Animation,
}

impl PadColor {
    pub const fn new(color: Color) -> Self {
        Self {
            color,
            dim: false,
            animation: Animation::Static,
        }
    }

    pub const fn off() -> Self {
        Self::new(Color::Black)
    }

    pub const fn dimmed(color: Color) -> Self {
        Self {
            color,
            dim: true,
            animation: Animation::Static,
        }
    }

    pub const fn with_animation(color: Color, animation: Animation) -> Self {
        Self {
            color,
            dim: false,
            animation,
        }
    }

    pub fn is_off(&self) -> bool {
        self.color == Color::Black
    }
}

impl From<Color> for PadColor {
    fn from(color: Color) -> Self {
        PadColor::new(color)
    }
}

/// How pad pressure is reported back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AftertouchMode {
    Polyphonic,
    Channel,
}

/// One-off configuration changes for the surface hardware.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    SetAftertouchMode(AftertouchMode),
    /// Pressure range (raw sensor units) mapped onto channel aftertouch 0-127
    SetChannelAftertouchRange { start: u16, end: u16 },
    /// Pressure-to-value lookup table, 128 entries
    SetVelocityCurve(Vec<u8>),
    /// Blank every LED and the display, then repaint
    Reset,
}

/// Pads and button LEDs.
pub trait ControlSurface {
    /// Set a pad, rows counted from the top.
    fn set_pad(&mut self, row: u8, col: u8, color: PadColor);

    fn set_button(&mut self, button: Button, color: PadColor);

    fn set_all_pads(&mut self, color: PadColor) {
        for row in 0..8 {
            for col in 0..8 {
                self.set_pad(row, col, color);
            }
        }
    }

    fn set_pads(&mut self, colors: &[[PadColor; 8]; 8]) {
        for (row, line) in colors.iter().enumerate() {
            for (col, color) in line.iter().enumerate() {
                self.set_pad(row as u8, col as u8, *color);
            }
        }
    }
}

/// Number of text columns, one above each track encoder.
pub const DISPLAY_COLUMNS: usize = 8;

/// Number of text lines per column.
pub const DISPLAY_LINES: usize = 4;

/// The small display, addressed as a grid of text cells.
pub trait DisplaySurface {
    fn clear(&mut self);

    /// Write text into one cell, replacing what was there.
    fn text(&mut self, column: usize, line: usize, text: &str, color: Color);

    /// Fill a column's background, e.g. to mark the selected item.
    fn highlight(&mut self, column: usize, color: Color);
}
