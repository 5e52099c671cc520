//! Muting and unmuting the 64 tracks of the step sequencer from the pads.
//!
//! The sequencer reports nothing back over this protocol, so whether a track
//! has content and whether it plays is tracked locally from the presses.

use std::time::Duration;

use conductor_core::{
    AppRequest, Animation, Button, Color, ControlEvent, ControlSurface, EventResult, Mode,
    ModeContext, ModeId, PadColor, PressDurationClassifier, PressKind, XorGroup,
};

use super::{PADS, PYRAMID_TRIGGERING};

const NUM_TRACKS: usize = 64;

/// Button held to turn a pad press into a track selection.
const SELECT_MODIFIER: Button = Button::Master;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TrackState {
    has_content: bool,
    is_playing: bool,
}

fn track_for_pad(row: u8, col: u8) -> usize {
    usize::from(row) * 8 + usize::from(col)
}

pub struct PyramidTriggeringMode {
    tracks: [TrackState; NUM_TRACKS],
    presses: PressDurationClassifier<(u8, u8)>,
    modifier_held: bool,
}

impl PyramidTriggeringMode {
    pub fn new(quick_press: Duration) -> Self {
        Self {
            tracks: [TrackState::default(); NUM_TRACKS],
            presses: PressDurationClassifier::new(quick_press),
            modifier_held: false,
        }
    }

    fn reset_presses(&mut self) {
        self.presses.clear();
        self.modifier_held = false;
    }

    fn set_playing(&mut self, ctx: &ModeContext, track: usize, playing: bool) {
        self.tracks[track].is_playing = playing;
        if let Err(e) = ctx.pyramidi().set_track_mute(&ctx.midi, track, !playing) {
            log::warn!("Could not change mute state of track {}: {}", track, e);
        }
    }

    fn on_pad_released(&mut self, row: u8, col: u8, ctx: &mut ModeContext) {
        // A release without a recorded press counts as a tap
        let kind = self.presses.on_release(&(row, col), ctx.now);
        let track = track_for_pad(row, col);
        let state = self.tracks[track];

        match kind {
            PressKind::Hold => {
                self.tracks[track].has_content = !state.has_content;
                if state.is_playing {
                    self.set_playing(ctx, track, false);
                }
            }
            PressKind::Tap if !state.has_content => self.tracks[track].has_content = true,
            PressKind::Tap => self.set_playing(ctx, track, !state.is_playing),
        }
        ctx.mark_pads();
    }

    fn trigger_row(&mut self, ctx: &ModeContext, scene_row: u8) {
        for track in 0..NUM_TRACKS {
            if self.tracks[track].has_content {
                self.set_playing(ctx, track, track / 8 == usize::from(scene_row));
            }
        }
    }
}

impl Mode for PyramidTriggeringMode {
    fn id(&self) -> ModeId {
        PYRAMID_TRIGGERING
    }

    fn xor_group(&self) -> Option<XorGroup> {
        Some(PADS)
    }

    fn activate(&mut self, _ctx: &mut ModeContext) {
        self.reset_presses();
    }

    fn deactivate(&mut self, _ctx: &mut ModeContext) {
        self.reset_presses();
    }

    fn on_event(&mut self, event: &ControlEvent, ctx: &mut ModeContext) -> EventResult {
        match *event {
            ControlEvent::PadPressed { row, col, .. } => {
                if self.modifier_held {
                    ctx.request(AppRequest::SelectTrack(track_for_pad(row, col)));
                } else {
                    self.presses.on_press((row, col), ctx.now);
                    ctx.mark_pads();
                }
                EventResult::Handled
            }
            ControlEvent::PadReleased { row, col, .. } => {
                if !self.modifier_held {
                    self.on_pad_released(row, col, ctx);
                }
                EventResult::Handled
            }
            ControlEvent::PadAftertouch { .. } => EventResult::Handled,
            ControlEvent::ButtonPressed(Button::Scene(row)) => {
                self.trigger_row(ctx, row);
                ctx.mark_pads();
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(SELECT_MODIFIER) => {
                self.modifier_held = true;
                ctx.mark_buttons();
                EventResult::Handled
            }
            ControlEvent::ButtonReleased(SELECT_MODIFIER) => {
                self.modifier_held = false;
                ctx.mark_buttons();
                EventResult::Handled
            }
            _ => EventResult::Ignored,
        }
    }

    fn paint_pads(&self, ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        for row in 0..8 {
            for col in 0..8 {
                let track = track_for_pad(row, col);
                let state = self.tracks[track];
                let color = ctx.state.tracks.color(track);
                let led = if self.presses.is_pressed(&(row, col)) {
                    PadColor::new(Color::Green)
                } else if state.is_playing {
                    PadColor::new(color)
                } else if state.has_content {
                    PadColor::dimmed(color)
                } else {
                    PadColor::dimmed(Color::DarkGray)
                };
                surface.set_pad(row, col, led);
            }
        }
    }

    fn paint_buttons(&self, _ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        for row in 0..8 {
            surface.set_button(Button::Scene(row), PadColor::new(Color::White));
        }
        surface.set_button(
            SELECT_MODIFIER,
            if self.modifier_held {
                PadColor::with_animation(Color::White, Animation::Pulsing)
            } else {
                PadColor::new(Color::DarkGray)
            },
        );
    }

    fn on_track_selected(&mut self, ctx: &mut ModeContext) {
        self.reset_presses();
        ctx.dirty.mark_all();
    }
}
