//! Note machinery shared by the pad layouts that play an instrument.
//!
//! The melodic and rhythmic modes differ only in how a pad maps to a note and
//! how pads are colored. Sending notes, aftertouch, pitch bend and sustain,
//! tracking the notes being played and the delayed aftertouch configuration
//! all live here.

use std::time::Instant;

use conductor_core::input::SETTLE_WINDOW;
use conductor_core::{
    AftertouchMode, Animation, Button, Color, ControlEvent, EventResult, MidiMessage, ModeContext,
    PadColor, Settings, SurfaceCommand,
};

/// Pads sounding a note are lit with this color.
pub const NOTE_ON_COLOR: Color = Color::Green;

/// Velocity sent for every pad while accent is on.
pub const FIXED_VELOCITY: u8 = 127;

/// Sustain pedal controller.
const SUSTAIN_CONTROLLER: u8 = 64;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// `C-1` for note 0, `E4` for note 64.
pub fn note_name(note: u8) -> String {
    format!(
        "{}{}",
        NOTE_NAMES[(note % 12) as usize],
        i32::from(note / 12) - 1
    )
}

/// Pressure-to-value table for polyphonic aftertouch.
///
/// Pressures below `max_range` follow a power curve bent by `bending`
/// (0 linear-ish, 100 steep); everything above maps to 127.
pub fn poly_at_curve(max_range: u8, bending: u8) -> Vec<u8> {
    let exponent = 3.0 * f64::from(bending.min(100)) / 100.0;
    (0..128u8)
        .map(|i| {
            if i < max_range {
                let x = f64::from(i) / f64::from(max_range);
                (127.0 * x.powf(exponent)) as u8
            } else {
                127
            }
        })
        .collect()
}

/// Commands bringing the pads in line with the performance settings.
pub fn surface_configuration(settings: &Settings) -> Vec<SurfaceCommand> {
    let mode = if settings.use_poly_at {
        AftertouchMode::Polyphonic
    } else {
        AftertouchMode::Channel
    };
    vec![
        SurfaceCommand::SetAftertouchMode(mode),
        SurfaceCommand::SetChannelAftertouchRange {
            start: settings.channel_at_range_start,
            end: settings.channel_at_range_end,
        },
        SurfaceCommand::SetVelocityCurve(poly_at_curve(
            settings.poly_at_max_range,
            settings.poly_at_curve_bending,
        )),
    ]
}

/// Who is playing a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSource {
    Pads,
    MidiIn,
}

#[derive(Debug, Default, Clone)]
pub struct NotesBeingPlayed {
    notes: Vec<(u8, NoteSource)>,
}

impl NotesBeingPlayed {
    pub fn add(&mut self, note: u8, source: NoteSource) {
        self.notes.push((note, source));
    }

    /// Remove every entry of `note` from `source`.
    pub fn remove(&mut self, note: u8, source: NoteSource) {
        self.notes.retain(|entry| *entry != (note, source));
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn contains(&self, note: u8) -> bool {
        self.notes.iter().any(|(n, _)| *n == note)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Aftertouch parameters applied to the pads with a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AftertouchParams {
    range_start: u16,
    range_end: u16,
    max_range: u8,
    bending: u8,
}

impl AftertouchParams {
    fn of(settings: &Settings) -> Self {
        Self {
            range_start: settings.channel_at_range_start,
            range_end: settings.channel_at_range_end,
            max_range: settings.poly_at_max_range,
            bending: settings.poly_at_curve_bending,
        }
    }
}

/// State of a pad layout that plays notes.
#[derive(Debug, Default)]
pub struct PadInstrument {
    pub notes: NotesBeingPlayed,
    /// Accent: every pad plays at full velocity
    pub fixed_velocity: bool,
    applied: Option<AftertouchParams>,
    edited_at: Option<Instant>,
}

impl PadInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the pads for playing.
    pub fn activate(&mut self, ctx: &mut ModeContext) {
        for command in surface_configuration(ctx.settings()) {
            ctx.send_surface(command);
        }
        self.applied = Some(AftertouchParams::of(ctx.settings()));
        self.edited_at = None;
    }

    pub fn deactivate(&mut self) {
        self.notes.clear();
    }

    /// Push aftertouch range and curve edits once they have settled.
    pub fn tick(&mut self, ctx: &mut ModeContext) {
        let current = AftertouchParams::of(ctx.settings());
        if self.applied != Some(current) {
            self.applied = Some(current);
            self.edited_at = Some(ctx.now);
        }

        let Some(edited_at) = self.edited_at else {
            return;
        };
        if ctx.now.saturating_duration_since(edited_at) > SETTLE_WINDOW {
            ctx.send_surface(SurfaceCommand::SetChannelAftertouchRange {
                start: current.range_start,
                end: current.range_end,
            });
            ctx.send_surface(SurfaceCommand::SetVelocityCurve(poly_at_curve(
                current.max_range,
                current.bending,
            )));
            self.edited_at = None;
            log::debug!("Applied aftertouch settings {:?}", current);
        }
    }

    /// Handle everything that plays or illuminates notes.
    ///
    /// `note_for` maps a pad to its note, `None` for pads outside the note range.
    pub fn on_event<F>(
        &mut self,
        event: &ControlEvent,
        ctx: &mut ModeContext,
        note_for: F,
    ) -> EventResult
    where
        F: Fn(u8, u8, &Settings) -> Option<u8>,
    {
        match event {
            ControlEvent::PadPressed { row, col, velocity } => {
                let Some(note) = note_for(*row, *col, ctx.settings()) else {
                    return EventResult::Handled;
                };
                self.notes.add(note, NoteSource::Pads);
                let velocity = if self.fixed_velocity {
                    FIXED_VELOCITY
                } else {
                    *velocity
                };
                ctx.midi.send(&MidiMessage::NoteOn {
                    channel: 0,
                    note,
                    velocity,
                });
                ctx.mark_pads();
                EventResult::Handled
            }
            ControlEvent::PadReleased { row, col, velocity } => {
                let Some(note) = note_for(*row, *col, ctx.settings()) else {
                    return EventResult::Handled;
                };
                self.notes.remove(note, NoteSource::Pads);
                ctx.midi.send(&MidiMessage::NoteOff {
                    channel: 0,
                    note,
                    velocity: *velocity,
                });
                ctx.mark_pads();
                EventResult::Handled
            }
            ControlEvent::PadAftertouch { pad, value } => {
                let msg = match pad {
                    Some((row, col)) => match note_for(*row, *col, ctx.settings()) {
                        Some(note) => MidiMessage::PolyAftertouch {
                            channel: 0,
                            note,
                            value: *value,
                        },
                        None => return EventResult::Handled,
                    },
                    None => MidiMessage::ChannelAftertouch {
                        channel: 0,
                        value: *value,
                    },
                };
                ctx.midi.send(&msg);
                EventResult::Handled
            }
            ControlEvent::Touchstrip(value) => {
                ctx.midi.send(&MidiMessage::PitchBend {
                    channel: 0,
                    value: *value,
                });
                EventResult::Handled
            }
            ControlEvent::SustainPedal(on) => {
                ctx.midi.send(&MidiMessage::ControlChange {
                    channel: 0,
                    controller: SUSTAIN_CONTROLLER,
                    value: if *on { 127 } else { 0 },
                });
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(Button::Accent) => {
                self.fixed_velocity = !self.fixed_velocity;
                ctx.mark_buttons();
                ctx.mark_pads();
                EventResult::Handled
            }
            ControlEvent::MidiIn(msg) => self.on_midi_in(msg, ctx),
            _ => EventResult::Ignored,
        }
    }

    fn on_midi_in(&mut self, msg: &MidiMessage, ctx: &mut ModeContext) -> EventResult {
        let illuminate = ctx
            .state
            .selected_track_info()
            .map(|track| track.definition.illuminate_local_notes)
            .unwrap_or(true);
        if !illuminate {
            return EventResult::Ignored;
        }

        match *msg {
            MidiMessage::NoteOn { note, velocity, .. } if velocity > 0 => {
                self.notes.add(note, NoteSource::MidiIn);
            }
            MidiMessage::NoteOn { note, .. } | MidiMessage::NoteOff { note, .. } => {
                self.notes.remove(note, NoteSource::MidiIn);
            }
            _ => return EventResult::Ignored,
        }
        ctx.mark_pads();
        EventResult::Handled
    }

    /// Accent button color; `pulse` makes the active state animate.
    pub fn accent_color(&self, pulse: bool) -> PadColor {
        match (self.fixed_velocity, pulse) {
            (true, true) => PadColor::with_animation(Color::White, Animation::Pulsing),
            (true, false) => PadColor::new(Color::White),
            (false, _) => PadColor::new(Color::DarkGray),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_name() {
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(64), "E4");
        assert_eq!(note_name(127), "G9");
    }

    #[test]
    fn test_curve_saturates_above_range() {
        let curve = poly_at_curve(40, 50);
        assert_eq!(curve.len(), 128);
        assert_eq!(curve[0], 0);
        assert!(curve[20] > 0 && curve[20] < 127);
        assert!(curve[39] < 127);
        assert!(curve[40..].iter().all(|v| *v == 127));
        assert!(curve.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_curve_with_zero_range_is_flat() {
        assert!(poly_at_curve(0, 50).iter().all(|v| *v == 127));
    }

    #[test]
    fn test_notes_being_played_by_source() {
        let mut notes = NotesBeingPlayed::default();
        notes.add(60, NoteSource::Pads);
        notes.add(60, NoteSource::MidiIn);

        notes.remove(60, NoteSource::Pads);
        assert!(notes.contains(60));

        notes.remove(60, NoteSource::MidiIn);
        assert!(!notes.contains(60));
        assert!(notes.is_empty());
    }

    #[test]
    fn test_surface_configuration_follows_settings() {
        let settings = Settings {
            use_poly_at: false,
            ..Settings::default()
        };
        let commands = surface_configuration(&settings);
        assert_eq!(
            commands[0],
            SurfaceCommand::SetAftertouchMode(AftertouchMode::Channel)
        );
        assert_eq!(
            commands[1],
            SurfaceCommand::SetChannelAftertouchRange { start: 401, end: 800 }
        );
    }
}
