//! Clip launcher for the external clip sequencer.
//!
//! Pads show the 8x8 clip grid (one pad column per sequencer track, one pad
//! row per scene) as last polled by the sequencer bridge. Everything sent from
//! here is fire-and-forget; the next poll shows the result.

use std::time::Duration;

use conductor_core::{
    Animation, Button, ClipDisplay, Color, ControlEvent, ControlSurface, DisplaySurface, Encoder,
    EventResult, Mode, ModeContext, ModeId, PadColor, PressDurationClassifier, PressKind,
    SequencerCommand, XorGroup,
};

use super::{CLIP_TRIGGERING, PADS, SETTINGS};

/// Sequencer track and clip slot shown on a pad.
fn clip_for_pad(row: u8, col: u8) -> (i32, i32) {
    (i32::from(col), i32::from(row))
}

pub fn clip_color(display: ClipDisplay) -> PadColor {
    match display {
        ClipDisplay::Empty => PadColor::dimmed(Color::White),
        ClipDisplay::HasContent => PadColor::new(Color::White),
        ClipDisplay::Cued => PadColor::new(Color::Yellow),
        ClipDisplay::Waiting => PadColor::with_animation(Color::Orange, Animation::Blinking),
        ClipDisplay::Playing => PadColor::new(Color::Green),
        ClipDisplay::Recording => PadColor::new(Color::Red),
    }
}

pub struct ClipTriggeringMode {
    presses: PressDurationClassifier<(u8, u8)>,
    /// Modifier buttons currently held
    double_held: bool,
    duplicate_held: bool,
    select_held: bool,
}

impl ClipTriggeringMode {
    pub fn new(quick_press: Duration) -> Self {
        Self {
            presses: PressDurationClassifier::new(quick_press),
            double_held: false,
            duplicate_held: false,
            select_held: false,
        }
    }

    fn reset_modifiers(&mut self) {
        self.presses.clear();
        self.double_held = false;
        self.duplicate_held = false;
        self.select_held = false;
    }

    fn set_modifier(&mut self, button: Button, held: bool) -> bool {
        match button {
            Button::DoubleLoop => self.double_held = held,
            Button::Duplicate => self.duplicate_held = held,
            Button::Select => self.select_held = held,
            _ => return false,
        }
        true
    }

    fn on_pad_pressed(&mut self, row: u8, col: u8, ctx: &mut ModeContext) {
        let (track, clip) = clip_for_pad(row, col);
        if self.select_held {
            ctx.sequencer.send(SequencerCommand::SelectTrack(track));
        } else if self.double_held {
            ctx.sequencer.send(SequencerCommand::DoubleClip { track, clip });
        } else {
            self.presses.on_press((row, col), ctx.now);
        }
    }

    fn on_pad_released(&mut self, row: u8, col: u8, ctx: &mut ModeContext) {
        // Pads pressed together with a modifier were already handled
        if !self.presses.is_pressed(&(row, col)) {
            return;
        }
        let (track, clip) = clip_for_pad(row, col);
        let command = match self.presses.on_release(&(row, col), ctx.now) {
            PressKind::Tap => SequencerCommand::PlayStopClip { track, clip },
            PressKind::Hold => SequencerCommand::ClearClip { track, clip },
        };
        ctx.sequencer.send(command);
    }

    /// True once a pad has been down long enough that releasing it clears the clip.
    fn is_clearing(&self, row: u8, col: u8, ctx: &ModeContext) -> bool {
        self.presses
            .pressed_since(&(row, col))
            .map(|start| ctx.now.saturating_duration_since(start) >= self.presses.threshold())
            .unwrap_or(false)
    }
}

impl Mode for ClipTriggeringMode {
    fn id(&self) -> ModeId {
        CLIP_TRIGGERING
    }

    fn xor_group(&self) -> Option<XorGroup> {
        Some(PADS)
    }

    fn activate(&mut self, _ctx: &mut ModeContext) {
        self.reset_modifiers();
    }

    fn deactivate(&mut self, _ctx: &mut ModeContext) {
        self.reset_modifiers();
    }

    fn on_event(&mut self, event: &ControlEvent, ctx: &mut ModeContext) -> EventResult {
        match *event {
            ControlEvent::PadPressed { row, col, .. } => {
                self.on_pad_pressed(row, col, ctx);
                EventResult::Handled
            }
            ControlEvent::PadReleased { row, col, .. } => {
                self.on_pad_released(row, col, ctx);
                EventResult::Handled
            }
            // Pressure on clip pads means nothing
            ControlEvent::PadAftertouch { .. } => EventResult::Handled,
            ControlEvent::ButtonPressed(Button::Scene(row)) => {
                let scene = i32::from(row);
                if self.duplicate_held {
                    ctx.sequencer.send(SequencerCommand::DuplicateScene(scene));
                } else {
                    ctx.sequencer.send(SequencerCommand::PlayScene(scene));
                }
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(Button::Play) => {
                ctx.sequencer.send(SequencerCommand::ToggleGlobalPlay);
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(Button::Record) => {
                ctx.sequencer.send(SequencerCommand::ToggleGlobalRecord);
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(Button::Metronome) => {
                ctx.sequencer.send(SequencerCommand::ToggleMetronome);
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(button) => {
                let handled = self.set_modifier(button, true);
                if handled {
                    ctx.mark_buttons();
                }
                EventResult::from(handled)
            }
            ControlEvent::ButtonReleased(button) => {
                let handled = self.set_modifier(button, false);
                if handled {
                    ctx.mark_buttons();
                }
                EventResult::from(handled)
            }
            // Settings owns the encoders while it is open
            ControlEvent::EncoderRotated { .. } if ctx.state.is_mode_active(SETTINGS) => {
                EventResult::Ignored
            }
            ControlEvent::EncoderRotated {
                encoder: Encoder::Tempo,
                increment,
            } => {
                let bpm = ctx.sequencer.transport().bpm + f64::from(increment);
                ctx.sequencer.send(SequencerCommand::SetBpm(bpm.max(0.0) as f32));
                EventResult::Handled
            }
            _ => EventResult::Ignored,
        }
    }

    fn tick(&mut self, ctx: &mut ModeContext) {
        let clearing = self
            .presses
            .held()
            .any(|&(row, col)| self.is_clearing(row, col, ctx));
        if clearing {
            ctx.mark_pads();
        }
    }

    fn paint_pads(&self, ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        let grid = ctx.sequencer.grid();
        for row in 0..8 {
            for col in 0..8 {
                let color = if self.is_clearing(row, col, ctx) {
                    PadColor::new(Color::Red)
                } else if self.presses.is_pressed(&(row, col)) {
                    PadColor::new(Color::Green)
                } else {
                    clip_color(grid.clip(usize::from(col), usize::from(row)).display())
                };
                surface.set_pad(row, col, color);
            }
        }
    }

    fn paint_buttons(&self, ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        let transport = ctx.sequencer.transport();

        let lit = |on: bool, color: Color| {
            if on {
                PadColor::new(color)
            } else {
                PadColor::new(Color::White)
            }
        };
        surface.set_button(Button::Play, lit(transport.is_playing, Color::Green));
        surface.set_button(Button::Record, lit(transport.is_recording, Color::Red));
        surface.set_button(
            Button::Metronome,
            if transport.metronome_on {
                PadColor::new(Color::White)
            } else {
                PadColor::new(Color::DarkGray)
            },
        );

        for row in 0..8u8 {
            let led = if i32::from(row) == transport.selected_scene {
                PadColor::with_animation(Color::Green, Animation::Pulsing)
            } else {
                PadColor::new(Color::White)
            };
            surface.set_button(Button::Scene(row), led);
        }

        let modifier = |held: bool| {
            if held {
                PadColor::new(Color::White)
            } else {
                PadColor::new(Color::DarkGray)
            }
        };
        surface.set_button(Button::DoubleLoop, modifier(self.double_held));
        surface.set_button(Button::Duplicate, modifier(self.duplicate_held));
        surface.set_button(Button::Select, modifier(self.select_held));
    }

    fn paint_display(&self, ctx: &ModeContext, display: &mut dyn DisplaySurface) {
        let transport = ctx.sequencer.transport();
        display.text(0, 0, "TEMPO", Color::White);
        display.text(0, 1, &format!("{:.1}", transport.bpm), Color::White);
        display.text(1, 0, "PLAYHEAD", Color::White);
        display.text(1, 1, &transport.playhead_raw, Color::White);
    }

    fn on_track_selected(&mut self, _ctx: &mut ModeContext) {
        self.reset_modifiers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::testing::{context, sequencer_context, Canvas};

    const QUICK: Duration = Duration::from_millis(400);

    #[test]
    fn test_clip_colors_follow_flag_precedence() {
        let (ctx, _) = context();
        ctx.sequencer.handle_payload("tracks,t,3,Ewr,pW,c,t,1,");
        let mode = ClipTriggeringMode::new(QUICK);

        let mut canvas = Canvas::default();
        mode.paint_pads(&ctx, &mut canvas);

        assert_eq!(canvas.pad(0, 0), PadColor::new(Color::Red));
        assert_eq!(canvas.pad(1, 0), PadColor::new(Color::Green));
        assert_eq!(canvas.pad(2, 0), PadColor::new(Color::Yellow));
        assert_eq!(canvas.pad(0, 1), PadColor::new(Color::White));
        // Outside the grid
        assert_eq!(canvas.pad(5, 6), PadColor::dimmed(Color::White));
    }

    fn pad(row: u8, col: u8, pressed: bool) -> ControlEvent {
        if pressed {
            ControlEvent::PadPressed {
                row,
                col,
                velocity: 100,
            }
        } else {
            ControlEvent::PadReleased {
                row,
                col,
                velocity: 0,
            }
        }
    }

    fn button(button: Button, pressed: bool) -> ControlEvent {
        if pressed {
            ControlEvent::ButtonPressed(button)
        } else {
            ControlEvent::ButtonReleased(button)
        }
    }

    #[test]
    fn test_tap_plays_and_hold_clears() {
        let (mut ctx, recorder) = sequencer_context();
        let mut mode = ClipTriggeringMode::new(QUICK);

        mode.on_event(&pad(2, 1, true), &mut ctx);
        let mut canvas = Canvas::default();
        mode.paint_pads(&ctx, &mut canvas);
        assert_eq!(canvas.pad(2, 1), PadColor::new(Color::Green));
        assert!(recorder.sent().is_empty());

        ctx.now += Duration::from_millis(50);
        assert!(mode.on_event(&pad(2, 1, false), &mut ctx).is_handled());
        assert_eq!(
            recorder.sent(),
            vec![SequencerCommand::PlayStopClip { track: 1, clip: 2 }]
        );

        // Released exactly at the threshold counts as a hold
        recorder.clear();
        mode.on_event(&pad(5, 3, true), &mut ctx);
        ctx.now += QUICK;
        mode.on_event(&pad(5, 3, false), &mut ctx);
        assert_eq!(
            recorder.sent(),
            vec![SequencerCommand::ClearClip { track: 3, clip: 5 }]
        );
    }

    #[test]
    fn test_long_press_turns_pad_red() {
        let (mut ctx, _) = sequencer_context();
        ctx.dirty.take_pads();
        let mut mode = ClipTriggeringMode::new(QUICK);

        mode.on_event(&pad(0, 4, true), &mut ctx);
        ctx.now += QUICK - Duration::from_millis(1);
        mode.tick(&mut ctx);
        assert!(!ctx.dirty.take_pads());

        ctx.now += Duration::from_millis(1);
        mode.tick(&mut ctx);
        assert!(ctx.dirty.take_pads());
        let mut canvas = Canvas::default();
        mode.paint_pads(&ctx, &mut canvas);
        assert_eq!(canvas.pad(0, 4), PadColor::new(Color::Red));
    }

    #[test]
    fn test_modifier_pad_commands() {
        let (mut ctx, recorder) = sequencer_context();
        let mut mode = ClipTriggeringMode::new(QUICK);

        mode.on_event(&button(Button::DoubleLoop, true), &mut ctx);
        mode.on_event(&pad(3, 6, true), &mut ctx);
        mode.on_event(&pad(3, 6, false), &mut ctx);
        mode.on_event(&button(Button::DoubleLoop, false), &mut ctx);

        mode.on_event(&button(Button::Select, true), &mut ctx);
        mode.on_event(&pad(7, 2, true), &mut ctx);
        mode.on_event(&pad(7, 2, false), &mut ctx);
        mode.on_event(&button(Button::Select, false), &mut ctx);

        assert_eq!(
            recorder.sent(),
            vec![
                SequencerCommand::DoubleClip { track: 6, clip: 3 },
                SequencerCommand::SelectTrack(2),
            ]
        );
    }

    #[test]
    fn test_scene_buttons() {
        let (mut ctx, recorder) = sequencer_context();
        let mut mode = ClipTriggeringMode::new(QUICK);

        mode.on_event(&button(Button::Scene(3), true), &mut ctx);
        mode.on_event(&button(Button::Duplicate, true), &mut ctx);
        mode.on_event(&button(Button::Scene(1), true), &mut ctx);

        assert_eq!(
            recorder.sent(),
            vec![
                SequencerCommand::PlayScene(3),
                SequencerCommand::DuplicateScene(1),
            ]
        );
    }

    #[test]
    fn test_tempo_encoder_nudges_bpm() {
        let (mut ctx, recorder) = sequencer_context();
        ctx.sequencer.handle_payload("transport,p,120.0,0.5,n,0,0");
        let mut mode = ClipTriggeringMode::new(QUICK);
        let tempo = ControlEvent::EncoderRotated {
            encoder: Encoder::Tempo,
            increment: 2,
        };

        assert!(mode.on_event(&tempo, &mut ctx).is_handled());
        assert_eq!(recorder.sent(), vec![SequencerCommand::SetBpm(122.0)]);

        recorder.clear();
        ctx.state.active_modes = vec![CLIP_TRIGGERING, SETTINGS];
        assert!(!mode.on_event(&tempo, &mut ctx).is_handled());
        assert!(recorder.sent().is_empty());
    }

    #[test]
    fn test_modifiers_are_tracked() {
        let (mut ctx, _) = context();
        let mut mode = ClipTriggeringMode::new(QUICK);

        assert!(mode
            .on_event(&ControlEvent::ButtonPressed(Button::DoubleLoop), &mut ctx)
            .is_handled());
        mode.on_event(
            &ControlEvent::PadPressed {
                row: 0,
                col: 0,
                velocity: 100,
            },
            &mut ctx,
        );
        // Doubling happens on press, nothing waits for the release
        assert!(!mode.presses.is_pressed(&(0, 0)));

        mode.on_event(&ControlEvent::ButtonReleased(Button::DoubleLoop), &mut ctx);
        assert!(!mode.double_held);
        assert!(!mode
            .on_event(&ControlEvent::ButtonPressed(Button::Shift), &mut ctx)
            .is_handled());
    }

    #[test]
    fn test_transport_buttons() {
        let (ctx, _) = context();
        ctx.sequencer.handle_payload("transport,p,120.0,0.5,p,0,2");
        let mode = ClipTriggeringMode::new(QUICK);

        let mut canvas = Canvas::default();
        mode.paint_buttons(&ctx, &mut canvas);
        assert_eq!(canvas.button(Button::Play), PadColor::new(Color::Green));
        assert_eq!(canvas.button(Button::Record), PadColor::new(Color::White));
        assert_eq!(canvas.button(Button::Metronome), PadColor::new(Color::White));
        assert_eq!(canvas.button(Button::Scene(2)).animation, Animation::Pulsing);

        let mut canvas = Canvas::default();
        mode.paint_display(&ctx, &mut canvas);
        assert_eq!(canvas.text_at(0, 1), "120.0");
    }
}
