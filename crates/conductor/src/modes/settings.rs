//! Settings pages shown over the display while the Setup button is lit.
//!
//! Pressing Setup again moves to the next page; leaving the last page closes
//! the settings. Every encoder event is consumed while the settings are open.
//!
//! Pages:
//! - performance: root note, aftertouch mode, channel aftertouch range,
//!   polyphonic aftertouch range and curve
//! - MIDI: devices and channels, surface reset
//! - about: save settings, version, frame rate

use std::time::Instant;

use conductor_core::input::SETTLE_WINDOW;
use conductor_core::{
    AftertouchMode, AppRequest, Animation, BoundaryPolicy, Button, Color, Commit, ControlEvent,
    ControlSurface, DeferredSelector, DisplaySurface, Encoder, EventResult, Mode, ModeContext,
    ModeId, PadColor, Settings, SurfaceCommand,
};

use super::notes::note_name;
use super::{MELODIC, SETTINGS};

const NUM_PAGES: usize = 3;

const PERFORMANCE_PAGE: usize = 0;
const MIDI_PAGE: usize = 1;
const ABOUT_PAGE: usize = 2;

const TITLE_LINE: usize = 0;
const VALUE_LINE: usize = 1;

/// Encoder increment needed to flip the aftertouch mode.
const AFTERTOUCH_SWITCH_THRESHOLD: i8 = 3;

const CHANNEL_AT_MIN: i32 = 401;
const CHANNEL_AT_MAX: i32 = 2000;

/// Values waiting for the settle window before taking effect.
const PENDING_COLOR: Color = Color::Orange;
const DISABLED_COLOR: Color = Color::Gray;

const OFF: PadColor = PadColor::new(Color::DarkGray);
const ON: PadColor = PadColor::new(Color::White);

pub struct SettingsMode {
    page: usize,
    midi_in: DeferredSelector<String>,
    midi_out: DeferredSelector<String>,
    notes_midi_in: DeferredSelector<String>,
    /// Last edit of an aftertouch range or curve
    at_edited_at: Option<Instant>,
}

impl SettingsMode {
    pub fn new() -> Self {
        Self {
            page: PERFORMANCE_PAGE,
            midi_in: DeferredSelector::new(Vec::new()),
            midi_out: DeferredSelector::new(Vec::new()),
            notes_midi_in: DeferredSelector::new(Vec::new()),
            at_edited_at: None,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Advance to the next page, returns true when the rotation wrapped.
    pub fn next_page(&mut self) -> bool {
        self.page += 1;
        if self.page >= NUM_PAGES {
            self.page = PERFORMANCE_PAGE;
            return true;
        }
        false
    }

    /// Refresh device lists and align committed entries with the open ports.
    fn sync_devices(&mut self, ctx: &ModeContext) {
        // A pending index would name a different port in the new list
        let inputs = &ctx.state.available_in_ports;
        if self.midi_in.items() != inputs.as_slice() {
            for selector in [&mut self.midi_in, &mut self.notes_midi_in] {
                selector.cancel();
                selector.set_items(inputs.clone());
            }
        }
        let outputs = &ctx.state.available_out_ports;
        if self.midi_out.items() != outputs.as_slice() {
            self.midi_out.cancel();
            self.midi_out.set_items(outputs.clone());
        }

        let commit = |selector: &mut DeferredSelector<String>, port: Option<String>| {
            if !selector.is_pending() {
                let index = port.and_then(|name| selector.position_of(&name));
                selector.force_commit(index);
            }
        };
        commit(&mut self.midi_in, ctx.state.midi_in_port.clone());
        commit(&mut self.midi_out, ctx.midi.port_name());
        commit(&mut self.notes_midi_in, ctx.state.notes_midi_in_port.clone());
    }

    fn at_edits_pending(&self, now: Instant) -> bool {
        self.at_edited_at
            .map(|edited| now.saturating_duration_since(edited) <= SETTLE_WINDOW)
            .unwrap_or(false)
    }

    fn set_poly_at(ctx: &mut ModeContext, enabled: bool) {
        if ctx.settings().use_poly_at == enabled {
            return;
        }
        ctx.settings_mut().use_poly_at = enabled;
        ctx.send_surface(SurfaceCommand::SetAftertouchMode(if enabled {
            AftertouchMode::Polyphonic
        } else {
            AftertouchMode::Channel
        }));
    }

    fn set_root(ctx: &mut ModeContext, delta: i32) {
        let root = i32::from(ctx.settings().root_midi_note) + delta;
        ctx.settings_mut().root_midi_note = root.clamp(0, 127) as u8;
        ctx.mark_pads();
    }

    fn on_performance_encoder(&mut self, index: u8, increment: i8, ctx: &mut ModeContext) {
        let delta = i32::from(increment);
        match index {
            0 => Self::set_root(ctx, delta),
            1 => {
                if increment >= AFTERTOUCH_SWITCH_THRESHOLD {
                    Self::set_poly_at(ctx, true);
                } else if increment <= -AFTERTOUCH_SWITCH_THRESHOLD {
                    Self::set_poly_at(ctx, false);
                }
            }
            2..=5 => {
                edit_aftertouch(ctx.settings_mut(), index, delta);
                self.at_edited_at = Some(ctx.now);
            }
            _ => {}
        }
    }

    fn set_in_channel(ctx: &mut ModeContext, channel: i32, policy: BoundaryPolicy) {
        ctx.settings_mut().midi_in_channel = bounded(channel, -1, 15, policy) as i8;
    }

    fn set_out_channel(ctx: &mut ModeContext, channel: i32, policy: BoundaryPolicy) {
        let channel = bounded(channel, 0, 15, policy) as u8;
        ctx.settings_mut().midi_out_channel = channel;
        ctx.midi.set_out_channel(channel);
    }

    fn set_pyramidi_channel(ctx: &mut ModeContext, channel: i32) {
        ctx.settings_mut().pyramidi_channel = channel.clamp(0, 15) as u8;
    }

    fn on_midi_encoder(&mut self, index: u8, increment: i8, ctx: &mut ModeContext) {
        let delta = isize::from(increment);
        let settings = ctx.settings();
        let in_channel = i32::from(settings.midi_in_channel);
        let out_channel = i32::from(settings.midi_out_channel);
        let pyramidi_channel = i32::from(settings.pyramidi_channel);
        let step = i32::from(increment);

        match index {
            0 => self.midi_in.nudge(delta, ctx.now),
            1 => Self::set_in_channel(ctx, in_channel + step, BoundaryPolicy::Clamp),
            2 => self.midi_out.nudge(delta, ctx.now),
            3 => Self::set_out_channel(ctx, out_channel + step, BoundaryPolicy::Clamp),
            4 => Self::set_pyramidi_channel(ctx, pyramidi_channel + step),
            5 => self.notes_midi_in.nudge(delta, ctx.now),
            _ => {}
        }
    }

    fn on_upper_button(&mut self, index: u8, ctx: &mut ModeContext) -> bool {
        match (self.page, index) {
            (PERFORMANCE_PAGE, 0) => Self::set_root(ctx, 1),
            (PERFORMANCE_PAGE, 1) => {
                let enabled = !ctx.settings().use_poly_at;
                Self::set_poly_at(ctx, enabled);
            }
            (MIDI_PAGE, 0) => self.midi_in.nudge_with(1, BoundaryPolicy::Wrap, ctx.now),
            (MIDI_PAGE, 1) => {
                let channel = i32::from(ctx.settings().midi_in_channel) + 1;
                Self::set_in_channel(ctx, channel, BoundaryPolicy::Wrap);
            }
            (MIDI_PAGE, 2) => self.midi_out.nudge_with(1, BoundaryPolicy::Wrap, ctx.now),
            (MIDI_PAGE, 3) => {
                let channel = i32::from(ctx.settings().midi_out_channel) + 1;
                Self::set_out_channel(ctx, channel, BoundaryPolicy::Wrap);
            }
            (MIDI_PAGE, 4) => {
                let channel = i32::from(ctx.settings().pyramidi_channel) + 1;
                Self::set_pyramidi_channel(ctx, channel);
            }
            (MIDI_PAGE, 5) => self
                .notes_midi_in
                .nudge_with(1, BoundaryPolicy::Wrap, ctx.now),
            (MIDI_PAGE, 6) => ctx.request(AppRequest::ResetSurface),
            (ABOUT_PAGE, 0) => ctx.request(AppRequest::SaveSettings),
            _ => return false,
        }
        true
    }

    fn device_label(selector: &DeferredSelector<String>) -> (String, Color) {
        let label = match selector.display_index() {
            Some(index) => format!("{} {}", index + 1, selector.items()[index]),
            None => "None".to_string(),
        };
        let color = if selector.is_pending() {
            PENDING_COLOR
        } else if selector.committed().is_none() {
            DISABLED_COLOR
        } else {
            Color::White
        };
        (label, color)
    }

    fn paint_performance(&self, ctx: &ModeContext, display: &mut dyn DisplaySurface) {
        let settings = ctx.settings();
        let root_color = if ctx.state.is_mode_active(MELODIC) {
            Color::White
        } else {
            DISABLED_COLOR
        };
        let at_color = if self.at_edits_pending(ctx.now) {
            PENDING_COLOR
        } else {
            Color::White
        };

        let root = format!(
            "{} ({})",
            note_name(settings.root_midi_note),
            settings.root_midi_note
        );
        let aftertouch = if settings.use_poly_at {
            "polyAT"
        } else {
            "channel"
        };
        let entries = [
            ("ROOT NOTE", root, root_color),
            ("AFTERTOUCH", aftertouch.to_string(), Color::White),
            ("cAT START", settings.channel_at_range_start.to_string(), at_color),
            ("cAT END", settings.channel_at_range_end.to_string(), at_color),
            ("pAT RANGE", settings.poly_at_max_range.to_string(), at_color),
            ("pAT CURVE", settings.poly_at_curve_bending.to_string(), at_color),
        ];
        for (column, (title, value, color)) in entries.iter().enumerate() {
            display.text(column, TITLE_LINE, title, Color::White);
            display.text(column, VALUE_LINE, value, *color);
        }
    }

    fn paint_midi(&self, ctx: &ModeContext, display: &mut dyn DisplaySurface) {
        let settings = ctx.settings();

        let (in_device, in_color) = Self::device_label(&self.midi_in);
        let (out_device, out_color) = Self::device_label(&self.midi_out);
        let (notes_device, notes_color) = Self::device_label(&self.notes_midi_in);
        let in_channel = if settings.midi_in_channel < 0 {
            "All".to_string()
        } else {
            (settings.midi_in_channel + 1).to_string()
        };
        let in_channel_color = if self.midi_in.committed().is_some() {
            Color::White
        } else {
            DISABLED_COLOR
        };
        let out_channel_color = if self.midi_out.committed().is_some() {
            Color::White
        } else {
            DISABLED_COLOR
        };

        let entries = [
            ("IN DEVICE", in_device, in_color),
            ("IN CH", in_channel, in_channel_color),
            ("OUT DEVICE", out_device, out_color),
            (
                "OUT CH",
                (settings.midi_out_channel + 1).to_string(),
                out_channel_color,
            ),
            (
                "PYRAMIDI CH",
                (settings.pyramidi_channel + 1).to_string(),
                Color::White,
            ),
            ("NOTES IN", notes_device, notes_color),
            ("RESET MIDI", String::new(), Color::White),
        ];
        for (column, (title, value, color)) in entries.iter().enumerate() {
            display.text(column, TITLE_LINE, title, Color::White);
            display.text(column, VALUE_LINE, value, *color);
        }
    }

    fn paint_about(&self, ctx: &ModeContext, display: &mut dyn DisplaySurface) {
        display.text(0, TITLE_LINE, "SAVE", Color::White);
        display.text(1, TITLE_LINE, "VERSION", Color::White);
        display.text(
            1,
            VALUE_LINE,
            concat!("Conductor ", env!("CARGO_PKG_VERSION")),
            Color::White,
        );
        display.text(2, TITLE_LINE, "FPS", Color::White);
        display.text(
            2,
            VALUE_LINE,
            &format!("{:.0}", ctx.state.measured_fps),
            Color::White,
        );
    }
}

impl Default for SettingsMode {
    fn default() -> Self {
        Self::new()
    }
}

/// Change one aftertouch range or curve parameter, keeping it in bounds.
fn edit_aftertouch(settings: &mut Settings, index: u8, delta: i32) {
    match index {
        2 => {
            let end = i32::from(settings.channel_at_range_end);
            let start = (i32::from(settings.channel_at_range_start) + delta)
                .clamp(CHANNEL_AT_MIN, (end - 1).max(CHANNEL_AT_MIN));
            settings.channel_at_range_start = start as u16;
        }
        3 => {
            let start = i32::from(settings.channel_at_range_start);
            let end = (i32::from(settings.channel_at_range_end) + delta)
                .clamp(start + 1, CHANNEL_AT_MAX.max(start + 1));
            settings.channel_at_range_end = end as u16;
        }
        4 => {
            settings.poly_at_max_range =
                (i32::from(settings.poly_at_max_range) + delta).clamp(0, 127) as u8;
        }
        5 => {
            settings.poly_at_curve_bending =
                (i32::from(settings.poly_at_curve_bending) + delta).clamp(0, 100) as u8;
        }
        _ => {}
    }
}

/// Keep `value` in `[min, max]`, clamping or wrapping to the other end.
fn bounded(value: i32, min: i32, max: i32, policy: BoundaryPolicy) -> i32 {
    match policy {
        BoundaryPolicy::Clamp => value.clamp(min, max),
        BoundaryPolicy::Wrap if value > max => min,
        BoundaryPolicy::Wrap if value < min => max,
        BoundaryPolicy::Wrap => value,
    }
}

impl Mode for SettingsMode {
    fn id(&self) -> ModeId {
        SETTINGS
    }

    fn activate(&mut self, ctx: &mut ModeContext) {
        self.page = PERFORMANCE_PAGE;
        self.sync_devices(ctx);
        ctx.mark_buttons();
    }

    fn deactivate(&mut self, ctx: &mut ModeContext) {
        // Selections still settling are applied right away
        let now = ctx.now + SETTLE_WINDOW + SETTLE_WINDOW;
        self.commit_devices(ctx, now);
        ctx.mark_buttons();
    }

    fn on_event(&mut self, event: &ControlEvent, ctx: &mut ModeContext) -> EventResult {
        match *event {
            ControlEvent::ButtonPressed(Button::Setup) => {
                if self.next_page() {
                    ctx.request(AppRequest::DeselectMode(SETTINGS));
                }
                ctx.mark_buttons();
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(Button::Upper(index)) => {
                let handled = self.on_upper_button(index, ctx);
                if handled {
                    ctx.mark_buttons();
                }
                EventResult::from(handled)
            }
            ControlEvent::EncoderRotated {
                encoder: Encoder::Track(index),
                increment,
            } => {
                match self.page {
                    PERFORMANCE_PAGE => self.on_performance_encoder(index, increment, ctx),
                    MIDI_PAGE => self.on_midi_encoder(index, increment, ctx),
                    _ => {}
                }
                EventResult::Handled
            }
            ControlEvent::EncoderRotated { .. } => EventResult::Handled,
            _ => EventResult::Ignored,
        }
    }

    fn tick(&mut self, ctx: &mut ModeContext) {
        let now = ctx.now;
        self.sync_devices(ctx);
        self.commit_devices(ctx, now);
    }

    fn paint_buttons(&self, _ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        for index in 0..8u8 {
            let led = match (self.page, index) {
                (PERFORMANCE_PAGE, 0 | 1) => ON,
                (MIDI_PAGE, 0..=5) => ON,
                (MIDI_PAGE, 6) => PadColor::with_animation(Color::Green, Animation::Pulsing),
                (ABOUT_PAGE, 0) => PadColor::new(Color::Green),
                _ => OFF,
            };
            surface.set_button(Button::Upper(index), led);
        }
    }

    fn paint_display(&self, ctx: &ModeContext, display: &mut dyn DisplaySurface) {
        display.clear();
        match self.page {
            PERFORMANCE_PAGE => self.paint_performance(ctx, display),
            MIDI_PAGE => self.paint_midi(ctx, display),
            _ => self.paint_about(ctx, display),
        }
    }
}

impl SettingsMode {
    /// Turn settled device selections into requests for the app.
    ///
    /// A port that is no longer listed fails the commit and closes the role,
    /// so the selector and the open ports stay in agreement.
    fn commit_devices(&mut self, ctx: &mut ModeContext, now: Instant) {
        let inputs = ctx.state.available_in_ports.clone();
        let outputs = ctx.state.available_out_ports.clone();
        let selectors: [(_, &[String], fn(Option<String>) -> AppRequest); 3] = [
            (&mut self.midi_in, &inputs, AppRequest::OpenMidiIn),
            (&mut self.midi_out, &outputs, AppRequest::OpenMidiOut),
            (&mut self.notes_midi_in, &inputs, AppRequest::OpenNotesMidiIn),
        ];
        for (selector, available, request) in selectors {
            let mut chosen = None;
            let commit = selector.tick(now, |item| match item {
                Some(name) if !available.contains(name) => {
                    Err(format!("{} is no longer connected", name))
                }
                item => {
                    chosen = Some(item.cloned());
                    Ok(())
                }
            });
            match (commit, chosen) {
                (Some(Commit::Applied(_)), Some(item)) => ctx.request(request(item)),
                (Some(Commit::Failed), _) => ctx.request(request(None)),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::modes::testing::{context, Canvas};

    fn rotate(index: u8, increment: i8) -> ControlEvent {
        ControlEvent::EncoderRotated {
            encoder: Encoder::Track(index),
            increment,
        }
    }

    fn press(button: Button) -> ControlEvent {
        ControlEvent::ButtonPressed(button)
    }

    fn opened(ports: &[&str]) -> (ModeContext, SettingsMode) {
        let (mut ctx, _) = context();
        ctx.state.available_in_ports = ports.iter().map(|p| p.to_string()).collect();
        ctx.state.available_out_ports = ports.iter().map(|p| p.to_string()).collect();
        let mut mode = SettingsMode::new();
        mode.activate(&mut ctx);
        (ctx, mode)
    }

    #[test]
    fn test_setup_rotates_pages_then_closes() {
        let (mut ctx, mut mode) = opened(&[]);

        mode.on_event(&press(Button::Setup), &mut ctx);
        assert_eq!(mode.page(), MIDI_PAGE);
        mode.on_event(&press(Button::Setup), &mut ctx);
        assert_eq!(mode.page(), ABOUT_PAGE);
        assert!(ctx.take_requests().is_empty());

        mode.on_event(&press(Button::Setup), &mut ctx);
        assert_eq!(mode.page(), PERFORMANCE_PAGE);
        assert_eq!(ctx.take_requests(), vec![AppRequest::DeselectMode(SETTINGS)]);
    }

    #[test]
    fn test_performance_encoders() {
        let (mut ctx, mut mode) = opened(&[]);

        mode.on_event(&rotate(0, -100), &mut ctx);
        assert_eq!(ctx.settings().root_midi_note, 0);

        mode.on_event(&rotate(2, -50), &mut ctx);
        assert_eq!(ctx.settings().channel_at_range_start, 401);
        for _ in 0..4 {
            mode.on_event(&rotate(3, -127), &mut ctx);
        }
        assert_eq!(ctx.settings().channel_at_range_end, 402);
        mode.on_event(&rotate(5, 127), &mut ctx);
        assert_eq!(ctx.settings().poly_at_curve_bending, 100);

        let mut canvas = Canvas::default();
        mode.paint_display(&ctx, &mut canvas);
        assert_eq!(canvas.text_at(0, VALUE_LINE), "C-1 (0)");
        assert_eq!(canvas.text_at(3, VALUE_LINE), "402");
    }

    #[test]
    fn test_aftertouch_mode_needs_big_turn() {
        let (mut ctx, mut mode) = opened(&[]);
        ctx.take_surface_commands();

        mode.on_event(&rotate(1, -2), &mut ctx);
        assert!(ctx.settings().use_poly_at);
        mode.on_event(&rotate(1, -3), &mut ctx);
        assert!(!ctx.settings().use_poly_at);
        assert_eq!(
            ctx.take_surface_commands(),
            vec![SurfaceCommand::SetAftertouchMode(AftertouchMode::Channel)]
        );

        mode.on_event(&press(Button::Upper(1)), &mut ctx);
        assert!(ctx.settings().use_poly_at);
    }

    #[test]
    fn test_device_selection_commits_after_settling() {
        let (mut ctx, mut mode) = opened(&["IAC", "Synth"]);
        mode.on_event(&press(Button::Setup), &mut ctx);

        mode.on_event(&rotate(0, 1), &mut ctx);
        mode.on_event(&rotate(0, 1), &mut ctx);
        mode.on_event(&rotate(0, 1), &mut ctx);
        mode.tick(&mut ctx);
        assert!(ctx.take_requests().is_empty());

        let mut canvas = Canvas::default();
        mode.paint_display(&ctx, &mut canvas);
        assert_eq!(canvas.text_at(0, VALUE_LINE), "2 Synth");

        ctx.now += Duration::from_millis(1100);
        mode.tick(&mut ctx);
        assert_eq!(
            ctx.take_requests(),
            vec![AppRequest::OpenMidiIn(Some("Synth".to_string()))]
        );
        mode.tick(&mut ctx);
        assert!(ctx.take_requests().is_empty());
    }

    #[test]
    fn test_failed_open_shows_none() {
        let (mut ctx, mut mode) = opened(&["IAC", "Synth"]);
        mode.on_event(&press(Button::Setup), &mut ctx);

        mode.on_event(&rotate(0, 2), &mut ctx);
        ctx.now += Duration::from_millis(1100);
        mode.tick(&mut ctx);
        assert_eq!(
            ctx.take_requests(),
            vec![AppRequest::OpenMidiIn(Some("Synth".to_string()))]
        );
        assert_eq!(mode.midi_in.display_item().map(String::as_str), Some("Synth"));

        // The app could not open the port and left the role closed
        ctx.state.midi_in_port = None;
        mode.tick(&mut ctx);
        assert_eq!(mode.midi_in.display_item(), None);
        let mut canvas = Canvas::default();
        mode.paint_display(&ctx, &mut canvas);
        assert_eq!(canvas.text_at(0, VALUE_LINE), "None");
    }

    #[test]
    fn test_unplugged_port_fails_commit() {
        let (mut ctx, mut mode) = opened(&["IAC", "Synth"]);
        ctx.state.midi_in_port = Some("IAC".to_string());
        mode.tick(&mut ctx);
        mode.on_event(&press(Button::Setup), &mut ctx);
        mode.on_event(&rotate(0, 1), &mut ctx);

        // Synth goes away between the last tick and closing the settings
        ctx.state.available_in_ports = vec!["IAC".to_string()];
        mode.deactivate(&mut ctx);

        assert_eq!(ctx.take_requests(), vec![AppRequest::OpenMidiIn(None)]);
        assert_eq!(mode.midi_in.display_item(), None);
    }

    #[test]
    fn test_port_list_change_cancels_pending() {
        let (mut ctx, mut mode) = opened(&["IAC", "Synth"]);
        mode.on_event(&press(Button::Setup), &mut ctx);
        mode.on_event(&rotate(0, 2), &mut ctx);
        assert!(mode.midi_in.is_pending());

        ctx.state.available_in_ports = vec!["Drums".to_string(), "IAC".to_string()];
        mode.tick(&mut ctx);
        assert!(!mode.midi_in.is_pending());

        ctx.now += Duration::from_secs(2);
        mode.tick(&mut ctx);
        assert!(ctx.take_requests().is_empty());
    }

    #[test]
    fn test_device_button_wraps_to_none() {
        let (mut ctx, mut mode) = opened(&["IAC"]);
        ctx.state.notes_midi_in_port = Some("IAC".to_string());
        mode.tick(&mut ctx);
        mode.on_event(&press(Button::Setup), &mut ctx);

        mode.on_event(&press(Button::Upper(5)), &mut ctx);
        ctx.now += Duration::from_secs(2);
        mode.tick(&mut ctx);
        assert_eq!(ctx.take_requests(), vec![AppRequest::OpenNotesMidiIn(None)]);
    }

    #[test]
    fn test_channels() {
        let (mut ctx, mut mode) = opened(&[]);
        mode.on_event(&press(Button::Setup), &mut ctx);

        mode.on_event(&rotate(1, -5), &mut ctx);
        assert_eq!(ctx.settings().midi_in_channel, -1);
        mode.on_event(&press(Button::Upper(1)), &mut ctx);
        assert_eq!(ctx.settings().midi_in_channel, 0);

        ctx.settings_mut().midi_out_channel = 15;
        mode.on_event(&press(Button::Upper(3)), &mut ctx);
        assert_eq!(ctx.settings().midi_out_channel, 0);
        mode.on_event(&rotate(3, 4), &mut ctx);
        assert_eq!(ctx.midi.out_channel(), 4);

        mode.on_event(&rotate(4, 10), &mut ctx);
        assert_eq!(ctx.settings().pyramidi_channel, 15);

        mode.on_event(&press(Button::Upper(6)), &mut ctx);
        assert_eq!(ctx.take_requests(), vec![AppRequest::ResetSurface]);
    }

    #[test]
    fn test_about_page() {
        let (mut ctx, mut mode) = opened(&[]);
        ctx.state.measured_fps = 59.6;
        mode.on_event(&press(Button::Setup), &mut ctx);
        mode.on_event(&press(Button::Setup), &mut ctx);

        assert!(mode.on_event(&press(Button::Upper(0)), &mut ctx).is_handled());
        assert_eq!(ctx.take_requests(), vec![AppRequest::SaveSettings]);
        assert!(!mode.on_event(&press(Button::Upper(4)), &mut ctx).is_handled());

        let mut canvas = Canvas::default();
        mode.paint_display(&ctx, &mut canvas);
        assert_eq!(canvas.text_at(2, VALUE_LINE), "60");

        let mut canvas = Canvas::default();
        mode.paint_buttons(&ctx, &mut canvas);
        assert_eq!(canvas.button(Button::Upper(0)), PadColor::new(Color::Green));
        assert_eq!(canvas.button(Button::Upper(1)), OFF);
    }
}
