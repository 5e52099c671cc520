//! Buttons that switch between modes. Always active.

use conductor_core::{
    AppRequest, Animation, Button, Color, ControlEvent, ControlSurface, EventResult, Mode,
    ModeContext, ModeId, PadColor,
};

use super::{
    CLIP_TRIGGERING, MAIN_CONTROLS, MIDI_CC, PRESET_SELECTION, PYRAMID_TRIGGERING, SETTINGS,
};

/// Buttons toggling a mode on and off, lit while the mode is active.
const MODE_TOGGLES: [(Button, ModeId); 4] = [
    (Button::Session, CLIP_TRIGGERING),
    (Button::AddTrack, PYRAMID_TRIGGERING),
    (Button::AddDevice, PRESET_SELECTION),
    (Button::Device, MIDI_CC),
];

const OFF: PadColor = PadColor::new(Color::DarkGray);
const ON: PadColor = PadColor::new(Color::White);

#[derive(Default)]
pub struct MainControlsMode;

impl MainControlsMode {
    pub fn new() -> Self {
        Self
    }
}

impl Mode for MainControlsMode {
    fn id(&self) -> ModeId {
        MAIN_CONTROLS
    }

    fn on_event(&mut self, event: &ControlEvent, ctx: &mut ModeContext) -> EventResult {
        let ControlEvent::ButtonPressed(button) = event else {
            return EventResult::Ignored;
        };

        let request = match button {
            Button::Note => AppRequest::ToggleMelodicRhythmic,
            Button::Setup => AppRequest::RotateSettings,
            Button::User => AppRequest::ToggleDisplay,
            other => match MODE_TOGGLES.iter().find(|(b, _)| b == other) {
                Some((_, id)) => AppRequest::ToggleMode(*id),
                None => return EventResult::Ignored,
            },
        };
        ctx.request(request);
        ctx.mark_buttons();
        EventResult::Handled
    }

    fn paint_buttons(&self, ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        surface.set_button(Button::Note, ON);
        surface.set_button(
            Button::User,
            if ctx.state.display_enabled { ON } else { OFF },
        );
        surface.set_button(
            Button::Setup,
            if ctx.state.is_mode_active(SETTINGS) {
                PadColor::with_animation(Color::White, Animation::Pulsing)
            } else {
                OFF
            },
        );
        for (button, id) in MODE_TOGGLES {
            surface.set_button(button, if ctx.state.is_mode_active(id) { ON } else { OFF });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::testing::{context, Canvas};

    #[test]
    fn test_buttons_raise_requests() {
        let (mut ctx, _) = context();
        let mut mode = MainControlsMode::new();

        for button in [Button::Note, Button::Setup, Button::User, Button::Device] {
            assert!(mode
                .on_event(&ControlEvent::ButtonPressed(button), &mut ctx)
                .is_handled());
        }
        assert!(!mode
            .on_event(&ControlEvent::ButtonPressed(Button::Play), &mut ctx)
            .is_handled());

        assert_eq!(
            ctx.take_requests(),
            vec![
                AppRequest::ToggleMelodicRhythmic,
                AppRequest::RotateSettings,
                AppRequest::ToggleDisplay,
                AppRequest::ToggleMode(MIDI_CC),
            ]
        );
    }

    #[test]
    fn test_buttons_reflect_state() {
        let (mut ctx, _) = context();
        ctx.state.display_enabled = false;
        ctx.state.active_modes = vec![MAIN_CONTROLS, SETTINGS, CLIP_TRIGGERING];

        let mut canvas = Canvas::default();
        MainControlsMode::new().paint_buttons(&ctx, &mut canvas);

        assert_eq!(canvas.button(Button::User), OFF);
        assert_eq!(
            canvas.button(Button::Setup),
            PadColor::with_animation(Color::White, Animation::Pulsing)
        );
        assert_eq!(canvas.button(Button::Session), ON);
        assert_eq!(canvas.button(Button::Device), OFF);
    }
}
