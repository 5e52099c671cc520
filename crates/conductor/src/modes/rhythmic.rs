//! Drum pad layout: four 4x4 banks of 16 consecutive notes.
//!
//! The left half counts up from note 36 in the bottom-left corner, the right
//! half continues from note 68. Quadrants are colored to tell kits apart.

use conductor_core::{
    Button, Color, ControlEvent, ControlSurface, EventResult, Mode, ModeContext, ModeId, PadColor,
    Settings, XorGroup,
};

use super::notes::{PadInstrument, NOTE_ON_COLOR};
use super::{PADS, RHYTHMIC};

const LEFT_BASE: u8 = 36;
const RIGHT_BASE: u8 = 68;

/// Note of a pad, rows counted from the top.
pub fn pad_note(row: u8, col: u8) -> Option<u8> {
    if row > 7 || col > 7 {
        return None;
    }
    let from_bottom = 7 - row;
    let (base, col) = if col < 4 {
        (LEFT_BASE, col)
    } else {
        (RIGHT_BASE, col - 4)
    };
    Some(base + from_bottom * 4 + col)
}

pub struct RhythmicMode {
    instrument: PadInstrument,
}

impl RhythmicMode {
    pub fn new() -> Self {
        Self {
            instrument: PadInstrument::new(),
        }
    }

    fn note_for(row: u8, col: u8, _settings: &Settings) -> Option<u8> {
        pad_note(row, col)
    }

    fn quadrant_color(&self, row: u8, col: u8) -> Color {
        match (row >= 4, col >= 4) {
            (true, false) if self.instrument.fixed_velocity => Color::Blue,
            (true, false) => Color::Yellow,
            (true, true) => Color::Turquoise,
            (false, false) => Color::Orange,
            (false, true) => Color::Pink,
        }
    }
}

impl Default for RhythmicMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for RhythmicMode {
    fn id(&self) -> ModeId {
        RHYTHMIC
    }

    fn xor_group(&self) -> Option<XorGroup> {
        Some(PADS)
    }

    fn activate(&mut self, ctx: &mut ModeContext) {
        self.instrument.activate(ctx);
    }

    fn deactivate(&mut self, _ctx: &mut ModeContext) {
        self.instrument.deactivate();
    }

    fn on_event(&mut self, event: &ControlEvent, ctx: &mut ModeContext) -> EventResult {
        self.instrument.on_event(event, ctx, Self::note_for)
    }

    fn tick(&mut self, ctx: &mut ModeContext) {
        self.instrument.tick(ctx);
    }

    fn paint_pads(&self, _ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        for row in 0..8 {
            for col in 0..8 {
                let playing = pad_note(row, col)
                    .map(|note| self.instrument.notes.contains(note))
                    .unwrap_or(false);
                let color = if playing {
                    NOTE_ON_COLOR
                } else {
                    self.quadrant_color(row, col)
                };
                surface.set_pad(row, col, PadColor::new(color));
            }
        }
    }

    fn paint_buttons(&self, _ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        surface.set_button(Button::Accent, self.instrument.accent_color(false));
    }

    fn on_track_selected(&mut self, _ctx: &mut ModeContext) {
        self.instrument.notes.clear();
    }
}

#[cfg(test)]
mod tests {
    use conductor_core::MidiMessage;

    use super::*;
    use crate::modes::testing::{context, sent, Canvas};

    #[test]
    fn test_note_matrix() {
        assert_eq!(pad_note(7, 0), Some(36));
        assert_eq!(pad_note(7, 3), Some(39));
        assert_eq!(pad_note(7, 4), Some(68));
        assert_eq!(pad_note(0, 0), Some(64));
        assert_eq!(pad_note(0, 7), Some(99));
        assert_eq!(pad_note(1, 4), Some(92));
        assert_eq!(pad_note(8, 0), None);
    }

    #[test]
    fn test_quadrant_colors() {
        let (mut ctx, _) = context();
        let mut mode = RhythmicMode::new();

        let mut canvas = Canvas::default();
        mode.paint_pads(&ctx, &mut canvas);
        assert_eq!(canvas.pad(7, 0), PadColor::new(Color::Yellow));
        assert_eq!(canvas.pad(7, 7), PadColor::new(Color::Turquoise));
        assert_eq!(canvas.pad(0, 0), PadColor::new(Color::Orange));
        assert_eq!(canvas.pad(0, 7), PadColor::new(Color::Pink));

        mode.on_event(&ControlEvent::ButtonPressed(Button::Accent), &mut ctx);
        let mut canvas = Canvas::default();
        mode.paint_pads(&ctx, &mut canvas);
        assert_eq!(canvas.pad(7, 0), PadColor::new(Color::Blue));
        mode.paint_buttons(&ctx, &mut canvas);
        assert_eq!(canvas.button(Button::Accent), PadColor::new(Color::White));
    }

    #[test]
    fn test_pad_plays_drum_note() {
        let (mut ctx, sink) = context();
        let mut mode = RhythmicMode::new();

        mode.on_event(
            &ControlEvent::PadPressed {
                row: 6,
                col: 5,
                velocity: 70,
            },
            &mut ctx,
        );
        assert_eq!(
            sent(&sink),
            vec![MidiMessage::NoteOn {
                channel: 0,
                note: 73,
                velocity: 70
            }]
        );

        let mut canvas = Canvas::default();
        mode.paint_pads(&ctx, &mut canvas);
        assert_eq!(canvas.pad(6, 5), PadColor::new(NOTE_ON_COLOR));
    }

    #[test]
    fn test_track_change_clears_notes() {
        let (mut ctx, _) = context();
        let mut mode = RhythmicMode::new();
        mode.on_event(
            &ControlEvent::PadPressed {
                row: 7,
                col: 0,
                velocity: 70,
            },
            &mut ctx,
        );
        mode.on_track_selected(&mut ctx);

        let mut canvas = Canvas::default();
        mode.paint_pads(&ctx, &mut canvas);
        assert_eq!(canvas.pad(7, 0), PadColor::new(Color::Yellow));
    }
}
