//! Chromatic pad layout in fourths.
//!
//! The bottom-left pad plays the root note. Each pad to the right is a
//! semitone up and each row up is a fourth (5 semitones) up.

use conductor_core::{
    Button, Color, ControlEvent, ControlSurface, EventResult, Mode, ModeContext, ModeId, PadColor,
    Settings, XorGroup,
};

use super::notes::{PadInstrument, NOTE_ON_COLOR};
use super::{MELODIC, PADS};

/// Which semitones above the root are white keys.
const SCALE_PATTERN: [bool; 12] = [
    true, false, true, false, true, true, false, true, false, true, false, true,
];

const ROW_INTERVAL: i32 = 5;

/// Note of a pad for the given root, `None` outside the MIDI range.
pub fn pad_note(root: u8, row: u8, col: u8) -> Option<u8> {
    let note = i32::from(root) + (7 - i32::from(row)) * ROW_INTERVAL + i32::from(col);
    u8::try_from(note).ok().filter(|n| *n <= 127)
}

fn relative(note: u8, root: u8) -> usize {
    (i32::from(note) - i32::from(root)).rem_euclid(12) as usize
}

pub fn is_root(note: u8, root: u8) -> bool {
    relative(note, root) == 0
}

pub fn is_black_key(note: u8, root: u8) -> bool {
    !SCALE_PATTERN[relative(note, root)]
}

pub struct MelodicMode {
    instrument: PadInstrument,
}

impl MelodicMode {
    pub fn new() -> Self {
        Self {
            instrument: PadInstrument::new(),
        }
    }

    fn note_for(row: u8, col: u8, settings: &Settings) -> Option<u8> {
        pad_note(settings.root_midi_note, row, col)
    }

    fn shift_octave(ctx: &mut ModeContext, up: bool) {
        let root = i32::from(ctx.settings().root_midi_note);
        let shifted = if up { root + 12 } else { root - 12 };
        ctx.settings_mut().root_midi_note = shifted.clamp(0, 127) as u8;
        ctx.mark_pads();
    }
}

impl Default for MelodicMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for MelodicMode {
    fn id(&self) -> ModeId {
        MELODIC
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
        match event {
            ControlEvent::ButtonPressed(Button::OctaveUp) => {
                Self::shift_octave(ctx, true);
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(Button::OctaveDown) => {
                Self::shift_octave(ctx, false);
                EventResult::Handled
            }
            _ => self.instrument.on_event(event, ctx, Self::note_for),
        }
    }

    fn tick(&mut self, ctx: &mut ModeContext) {
        self.instrument.tick(ctx);
    }

    fn paint_pads(&self, ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        let root = ctx.settings().root_midi_note;
        let root_color = ctx
            .state
            .selected_track_info()
            .map(|track| track.color)
            .unwrap_or(Color::Yellow);

        for row in 0..8 {
            for col in 0..8 {
                let color = match pad_note(root, row, col) {
                    None => Color::Black,
                    Some(note) if self.instrument.notes.contains(note) => NOTE_ON_COLOR,
                    Some(note) if is_root(note, root) => root_color,
                    Some(note) if is_black_key(note, root) => Color::Black,
                    Some(_) => Color::White,
                };
                surface.set_pad(row, col, PadColor::new(color));
            }
        }
    }

    fn paint_buttons(&self, _ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        surface.set_button(Button::OctaveDown, PadColor::new(Color::White));
        surface.set_button(Button::OctaveUp, PadColor::new(Color::White));
        surface.set_button(Button::Accent, self.instrument.accent_color(true));
    }

    fn on_track_selected(&mut self, _ctx: &mut ModeContext) {
        self.instrument.notes.clear();
    }
}
