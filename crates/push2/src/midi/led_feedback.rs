//! LED feedback for Push 2 pads and buttons.
//!
//! Buffers the color state of every LED and generates MIDI messages for the
//! ones that changed since the last flush.

use std::collections::HashMap;

use conductor_core::{Animation, Button, Color, ControlSurface, PadColor};

use super::mapping::Push2Mapping;

/// Push 2 pad color palette indices.
///
/// The Push 2 uses a velocity-based color palette. These are entries of the
/// factory palette, each with a darker neighbour for dimmed LEDs.
pub mod colors {
    pub const OFF: u8 = 0;
    pub const ORANGE: u8 = 3;
    pub const ORANGE_DIM: u8 = 4;
    pub const YELLOW: u8 = 8;
    pub const YELLOW_DIM: u8 = 9;
    pub const LIME: u8 = 11;
    pub const LIME_DIM: u8 = 12;
    pub const TURQUOISE: u8 = 15;
    pub const TURQUOISE_DIM: u8 = 16;
    pub const PURPLE: u8 = 22;
    pub const PURPLE_DIM: u8 = 23;
    pub const PINK: u8 = 25;
    pub const PINK_DIM: u8 = 26;
    pub const WHITE: u8 = 122;
    pub const GRAY: u8 = 123;
    pub const DARK_GRAY: u8 = 124;
    pub const BLUE: u8 = 125;
    pub const BLUE_DIM: u8 = 46;
    pub const GREEN: u8 = 126;
    pub const GREEN_DIM: u8 = 20;
    pub const RED: u8 = 127;
    pub const RED_DIM: u8 = 6;
}

/// Brightness values for the white-only buttons.
pub mod brightness {
    pub const OFF: u8 = 0;
    pub const DIM: u8 = 20;
    pub const HALF: u8 = 64;
    pub const FULL: u8 = 127;
}

/// MIDI channels selecting an LED animation, synced to the Push 2 clock.
pub mod animation {
    pub const STATIC: u8 = 0;
    /// Half-note pulse
    pub const PULSING: u8 = 10;
    /// Quarter-note blink
    pub const BLINKING: u8 = 14;
}

/// Palette index for a color on an RGB LED.
pub fn palette_index(color: PadColor) -> u8 {
    use colors::*;
    match (color.color, color.dim) {
        (Color::Black, _) => OFF,
        (Color::White, false) => WHITE,
        (Color::White, true) | (Color::Gray, _) => GRAY,
        (Color::DarkGray, _) => DARK_GRAY,
        (Color::Red, false) => RED,
        (Color::Red, true) => RED_DIM,
        (Color::Orange, false) => ORANGE,
        (Color::Orange, true) => ORANGE_DIM,
        (Color::Yellow, false) => YELLOW,
        (Color::Yellow, true) => YELLOW_DIM,
        (Color::Lime, false) => LIME,
        (Color::Lime, true) => LIME_DIM,
        (Color::Green, false) => GREEN,
        (Color::Green, true) => GREEN_DIM,
        (Color::Turquoise, false) => TURQUOISE,
        (Color::Turquoise, true) => TURQUOISE_DIM,
        (Color::Blue, false) => BLUE,
        (Color::Blue, true) => BLUE_DIM,
        (Color::Purple, false) => PURPLE,
        (Color::Purple, true) => PURPLE_DIM,
        (Color::Pink, false) => PINK,
        (Color::Pink, true) => PINK_DIM,
    }
}

/// Brightness for a color on a white-only button LED.
pub fn button_brightness(color: PadColor) -> u8 {
    match color.color {
        Color::Black => brightness::OFF,
        Color::DarkGray => brightness::DIM,
        _ if color.dim => brightness::DIM,
        Color::Gray => brightness::HALF,
        _ => brightness::FULL,
    }
}

fn animation_channel(kind: Animation) -> u8 {
    match kind {
        Animation::Static => animation::STATIC,
        Animation::Pulsing => animation::PULSING,
        Animation::Blinking => animation::BLINKING,
    }
}

/// Whether a button has an RGB LED rather than a white one.
fn is_rgb_button(button: Button) -> bool {
    matches!(
        button,
        Button::Upper(_) | Button::Lower(_) | Button::Scene(_) | Button::Play | Button::Record
    )
}

/// LED state for all Push 2 pads and buttons.
pub struct LedState {
    /// 8x8 grid of pad colors, rows counted from the top
    pads: [[PadColor; 8]; 8],

    /// Dirty flags for each pad (needs update)
    dirty: [[bool; 8]; 8],

    buttons: HashMap<Button, PadColor>,

    /// Buttons to resend, in the order they changed
    dirty_buttons: Vec<Button>,
}

impl LedState {
    /// Create a new LED state with all LEDs off.
    pub fn new() -> Self {
        Self {
            pads: [[PadColor::off(); 8]; 8],
            dirty: [[true; 8]; 8],
            buttons: HashMap::new(),
            dirty_buttons: Vec::new(),
        }
    }

    /// Set the color of a pad by row and column.
    pub fn set_pad_color(&mut self, row: usize, col: usize, color: PadColor) {
        if row < 8 && col < 8 && self.pads[row][col] != color {
            self.pads[row][col] = color;
            self.dirty[row][col] = true;
        }
    }

    pub fn pad_color(&self, row: usize, col: usize) -> Option<PadColor> {
        self.pads.get(row).and_then(|line| line.get(col)).copied()
    }

    pub fn set_button_color(&mut self, button: Button, color: PadColor) {
        let previous = self.buttons.insert(button, color);
        if previous != Some(color) && !self.dirty_buttons.contains(&button) {
            self.dirty_buttons.push(button);
        }
    }

    pub fn button_color(&self, button: Button) -> PadColor {
        self.buttons.get(&button).copied().unwrap_or_default()
    }

    /// Buttons whose LED is currently on.
    pub fn lit_buttons(&self) -> Vec<Button> {
        self.buttons
            .iter()
            .filter(|(_, color)| !color.is_off())
            .map(|(button, _)| *button)
            .collect()
    }

    /// Turn every LED off.
    pub fn clear(&mut self) {
        for row in 0..8 {
            for col in 0..8 {
                self.set_pad_color(row, col, PadColor::off());
            }
        }
        let lit: Vec<Button> = self.buttons.keys().copied().collect();
        for button in lit {
            self.set_button_color(button, PadColor::off());
        }
    }

    /// Resend everything on the next flush, e.g. after the hardware was reset.
    pub fn invalidate(&mut self) {
        self.dirty = [[true; 8]; 8];
        self.dirty_buttons = self.buttons.keys().copied().collect();
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty_buttons.is_empty() || self.dirty.iter().flatten().any(|d| *d)
    }

    /// Generate MIDI messages for all dirty LEDs.
    pub fn to_midi_messages(&mut self) -> Vec<[u8; 3]> {
        let mut messages = Vec::new();

        for row in 0..8 {
            for col in 0..8 {
                if self.dirty[row][col] {
                    messages.push(Self::pad_message(row, col, self.pads[row][col]));
                    self.dirty[row][col] = false;
                }
            }
        }

        for button in self.dirty_buttons.drain(..) {
            let color = self.buttons.get(&button).copied().unwrap_or_default();
            messages.push(Self::button_message(button, color));
        }

        messages
    }

    fn pad_message(row: usize, col: usize, color: PadColor) -> [u8; 3] {
        // Note On message with velocity = color
        [
            0x90 | animation_channel(color.animation),
            Push2Mapping::pad_note(row as u8, col as u8),
            palette_index(color),
        ]
    }

    fn button_message(button: Button, color: PadColor) -> [u8; 3] {
        let value = if is_rgb_button(button) {
            palette_index(color)
        } else {
            button_brightness(color)
        };
        [
            0xB0 | animation_channel(color.animation),
            Push2Mapping::button_cc(button),
            value,
        ]
    }
}

impl Default for LedState {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlSurface for LedState {
    fn set_pad(&mut self, row: u8, col: u8, color: PadColor) {
        self.set_pad_color(row as usize, col as usize, color);
    }

    fn set_button(&mut self, button: Button, color: PadColor) {
        self.set_button_color(button, color);
    }
}
