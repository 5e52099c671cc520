//! Selecting one of the 64 tracks with the lower-row and scene buttons.
//!
//! A quick press on a lower-row button selects that column's track in the
//! first row. Holding it and pressing a scene button selects the same column
//! in the scene's row. A scene button alone keeps the column of the current
//! track and changes the row.

use std::time::Duration;

use conductor_core::{
    AppRequest, Animation, Button, Color, ControlEvent, ControlSurface, DisplaySurface,
    EventResult, Mode, ModeContext, ModeId, PadColor, PressDurationClassifier, PressKind,
};

use super::TRACK_SELECTION;

/// Display line holding the instrument names.
const NAMES_LINE: usize = 3;

pub struct TrackSelectionMode {
    presses: PressDurationClassifier<u8>,
    /// Lower-row button being held, waiting for a release or a scene button
    held_column: Option<u8>,
}

impl TrackSelectionMode {
    pub fn new(quick_press: Duration) -> Self {
        Self {
            presses: PressDurationClassifier::new(quick_press),
            held_column: None,
        }
    }

    fn select(ctx: &mut ModeContext, index: usize) {
        ctx.request(AppRequest::SelectTrack(index));
        ctx.mark_buttons();
        ctx.mark_pads();
    }
}

impl Mode for TrackSelectionMode {
    fn id(&self) -> ModeId {
        TRACK_SELECTION
    }

    fn deactivate(&mut self, _ctx: &mut ModeContext) {
        self.presses.clear();
        self.held_column = None;
    }

    fn on_event(&mut self, event: &ControlEvent, ctx: &mut ModeContext) -> EventResult {
        match *event {
            ControlEvent::ButtonPressed(Button::Lower(col)) => {
                self.presses.on_press(col, ctx.now);
                self.held_column = Some(col);
                ctx.mark_buttons();
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(Button::Scene(row)) => {
                let index = match self.held_column.take() {
                    Some(col) => {
                        // The held button must not select again on release
                        self.presses.clear();
                        usize::from(col) + 8 * usize::from(row)
                    }
                    None => ctx.state.selected_track % 8 + 8 * usize::from(row),
                };
                Self::select(ctx, index);
                EventResult::Handled
            }
            ControlEvent::ButtonReleased(Button::Lower(col)) => {
                if self.held_column != Some(col) {
                    return EventResult::Ignored;
                }
                self.held_column = None;
                if self.presses.on_release(&col, ctx.now) == PressKind::Tap {
                    Self::select(ctx, usize::from(col));
                } else {
                    ctx.mark_buttons();
                }
                EventResult::Handled
            }
            _ => EventResult::Ignored,
        }
    }

    fn paint_buttons(&self, ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        let tracks = &ctx.state.tracks;
        let selected = ctx.state.selected_track;

        for col in 0..8u8 {
            surface.set_button(
                Button::Lower(col),
                PadColor::new(tracks.color(usize::from(col))),
            );
        }

        let column = match self.held_column {
            Some(col) => usize::from(col),
            None => selected % 8,
        };
        let color = tracks.color(column);
        for row in 0..8u8 {
            let track = column + 8 * usize::from(row);
            let led = if track == selected {
                PadColor::with_animation(color, Animation::Pulsing)
            } else {
                PadColor::new(color)
            };
            surface.set_button(Button::Scene(row), led);
        }
    }

    fn paint_display(&self, ctx: &ModeContext, display: &mut dyn DisplaySurface) {
        let selected_column = ctx.state.selected_track % 8;
        for column in 0..8 {
            let Some(track) = ctx.state.tracks.get(column) else {
                continue;
            };
            if column == selected_column {
                display.highlight(column, track.color);
                display.text(column, NAMES_LINE, &track.instrument_short_name, Color::Black);
            } else {
                display.text(column, NAMES_LINE, &track.instrument_short_name, track.color);
            }
        }
    }

    fn on_track_selected(&mut self, _ctx: &mut ModeContext) {
        self.held_column = None;
    }
}
