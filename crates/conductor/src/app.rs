//! The controller application: owns the modes, the surface and the MIDI ports
//! and drives them from a fixed-rate frame loop.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use conductor_core::midi::router::{available_input_ports, available_output_ports};
use conductor_core::{
    AppRequest, AppState, Button, ChannelFilter, ConfigManager, ControlEvent, ControlSurface,
    DirtyFlags, DisplaySurface, InputRole, Layout, MidiInputPort, MidiMessage, MidiRouter,
    ModeContext, ModeManager, PadColor, SequencerBridge, Settings, SurfaceCommand, TrackListing,
};
use conductor_push2::{Push2Device, TextLayout};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::modes::{self, notes, MAIN_CONTROLS, MELODIC, RHYTHMIC, SETTINGS, TRACK_SELECTION};

/// One frame worth of LED colors, painted from scratch by the active modes.
struct Frame {
    pads: [[PadColor; 8]; 8],
    buttons: HashMap<Button, PadColor>,
}

impl Frame {
    fn new() -> Self {
        Self {
            pads: [[PadColor::off(); 8]; 8],
            buttons: HashMap::new(),
        }
    }
}

impl ControlSurface for Frame {
    fn set_pad(&mut self, row: u8, col: u8, color: PadColor) {
        if let Some(pad) = self
            .pads
            .get_mut(usize::from(row))
            .and_then(|line| line.get_mut(usize::from(col)))
        {
            *pad = color;
        }
    }

    fn set_button(&mut self, button: Button, color: PadColor) {
        self.buttons.insert(button, color);
    }
}

/// Frames counted over roughly one second.
struct FrameCounter {
    frames: u32,
    since: Instant,
}

impl FrameCounter {
    fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            since: now,
        }
    }

    /// Count a frame, returns the rate once a second has passed.
    fn frame_done(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.since);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.since = now;
        Some(fps)
    }
}

pub struct App {
    manager: ModeManager,
    ctx: ModeContext,
    push: Push2Device,
    config: ConfigManager,
    midi_in: Option<MidiInputPort>,
    notes_midi_in: Option<MidiInputPort>,
    midi_in_tx: mpsc::UnboundedSender<(InputRole, MidiMessage)>,
    midi_in_rx: mpsc::UnboundedReceiver<(InputRole, MidiMessage)>,
    fps: FrameCounter,
}

impl App {
    /// `settings` may differ from the saved ones by command line overrides.
    pub fn new(
        config: ConfigManager,
        settings: Settings,
        tracks: TrackListing,
        push: Push2Device,
        midi: MidiRouter,
        sequencer: Arc<SequencerBridge>,
        dirty: Arc<DirtyFlags>,
    ) -> Self {
        let mut manager = ModeManager::new();
        modes::register_all(&mut manager, &settings);
        midi.set_out_channel(settings.midi_out_channel);

        let ctx = ModeContext::new(AppState::new(settings, tracks), midi, sequencer, dirty);
        let (midi_in_tx, midi_in_rx) = mpsc::unbounded_channel();
        let now = ctx.now;

        Self {
            manager,
            ctx,
            push,
            config,
            midi_in: None,
            notes_midi_in: None,
            midi_in_tx,
            midi_in_rx,
            fps: FrameCounter::new(now),
        }
    }

    /// Open the saved devices and bring up the initial modes.
    pub fn start(&mut self) {
        let settings = self.ctx.settings().clone();
        if let Some(name) = settings.midi_out_device {
            self.ctx.request(AppRequest::OpenMidiOut(Some(name)));
        }
        if let Some(name) = settings.midi_in_device {
            self.ctx.request(AppRequest::OpenMidiIn(Some(name)));
        }
        if let Some(name) = settings.notes_midi_in_device {
            self.ctx.request(AppRequest::OpenNotesMidiIn(Some(name)));
        }

        self.manager.activate(MAIN_CONTROLS, &mut self.ctx);
        self.manager.activate(TRACK_SELECTION, &mut self.ctx);
        self.manager.activate(MELODIC, &mut self.ctx);
        self.ctx.request(AppRequest::ReconfigureSurface);
        self.ctx.request(AppRequest::SelectTrack(0));
        self.apply_pending();

        log::info!(
            "Started with {} tracks, modes: {:?}",
            self.ctx.state.tracks.len(),
            self.manager.active_modes()
        );
    }

    /// Run frames until Ctrl+C.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Cannot listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            log::info!("Received Ctrl+C, shutting down");
        })
        .await
    }

    /// Run frames until `shutdown` completes.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        tokio::pin!(shutdown);
        let rate = self.ctx.settings().target_frame_rate.max(1);
        let mut frames = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(rate)));
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!("Main loop running at {} frames per second", rate);

        loop {
            tokio::select! {
                _ = frames.tick() => self.frame(Instant::now()),

                Some((role, msg)) = self.midi_in_rx.recv() => {
                    self.ctx.now = Instant::now();
                    self.handle_midi_in(role, msg);
                }

                _ = &mut shutdown => break,
            }
        }

        self.shutdown();
        Ok(())
    }

    /// One pass of the main loop.
    pub fn frame(&mut self, now: Instant) {
        self.ctx.now = now;

        for event in self.push.poll_events() {
            self.handle_event(&event);
        }

        self.manager.tick_all(&mut self.ctx);
        self.apply_pending();

        if self.ctx.dirty.take_pads() {
            self.repaint_pads();
        }
        if self.ctx.dirty.take_buttons() {
            self.repaint_buttons();
        }
        if self.ctx.state.display_enabled {
            self.repaint_display();
        }
        self.push.flush();

        if let Some(fps) = self.fps.frame_done(now) {
            log::debug!("{:.1} frames per second", fps);
            self.ctx.state.measured_fps = fps;
        }
    }

    pub fn handle_event(&mut self, event: &ControlEvent) {
        if !self.manager.dispatch(event, &mut self.ctx) {
            log::trace!("Unhandled event {:?}", event);
        }
        self.apply_pending();
    }

    /// Messages from the main input are filtered by channel and echoed to the
    /// output; the notes input only reaches the modes.
    pub fn handle_midi_in(&mut self, role: InputRole, msg: MidiMessage) {
        if role == InputRole::Main {
            let filter = ChannelFilter::from_setting(self.ctx.settings().midi_in_channel);
            if !filter.accepts(&msg) {
                return;
            }
            self.ctx.midi.send(&msg);
        }
        self.handle_event(&ControlEvent::MidiIn(msg));
    }

    /// Apply requests until none are left, then configure the surface.
    fn apply_pending(&mut self) {
        loop {
            let requests = self.ctx.take_requests();
            if requests.is_empty() {
                break;
            }
            for request in requests {
                self.apply_request(request);
            }
        }
        for command in self.ctx.take_surface_commands() {
            self.push.apply(&command);
        }
    }

    fn apply_request(&mut self, request: AppRequest) {
        log::debug!("Applying {:?}", request);
        match request {
            AppRequest::SelectMode(id) => self.manager.activate(id, &mut self.ctx),
            AppRequest::DeselectMode(id) => self.manager.deactivate(id, &mut self.ctx),
            AppRequest::ToggleMode(id) => self.manager.toggle(id, &mut self.ctx),
            AppRequest::ToggleMelodicRhythmic => {
                let next = if self.manager.is_active(MELODIC) {
                    RHYTHMIC
                } else {
                    MELODIC
                };
                self.manager.activate(next, &mut self.ctx);
            }
            AppRequest::RotateSettings => {
                // While open, the settings mode rotates its own pages
                if self.manager.is_active(SETTINGS) {
                    self.manager.deactivate(SETTINGS, &mut self.ctx);
                } else {
                    self.refresh_ports();
                    self.manager.activate(SETTINGS, &mut self.ctx);
                }
            }
            AppRequest::SelectTrack(index) => self.select_track(index),
            AppRequest::SaveSettings => self.save_settings(),
            AppRequest::ReconfigureSurface => self.reconfigure_surface(),
            AppRequest::ResetSurface => {
                self.push.apply(&SurfaceCommand::Reset);
                self.reconfigure_surface();
                self.ctx.dirty.mark_all();
            }
            AppRequest::ToggleDisplay => {
                self.ctx.state.display_enabled = !self.ctx.state.display_enabled;
                if !self.ctx.state.display_enabled {
                    self.push.display().clear();
                }
                self.ctx.mark_buttons();
            }
            AppRequest::OpenMidiOut(name) => self.open_midi_out(name),
            AppRequest::OpenMidiIn(name) => self.open_midi_in(InputRole::Main, name),
            AppRequest::OpenNotesMidiIn(name) => self.open_midi_in(InputRole::Notes, name),
        }
    }

    fn select_track(&mut self, index: usize) {
        let Some(track) = self.ctx.state.tracks.get(index) else {
            log::warn!("No track {}, keeping track {}", index, self.ctx.state.selected_track);
            return;
        };
        let layout = track.definition.default_layout;
        log::info!("Selected track {} ({})", index, track.instrument_short_name);

        self.ctx.state.selected_track = index;
        if let Err(e) = self.ctx.pyramidi().select_track(&self.ctx.midi, index) {
            log::warn!("Could not send track selection: {}", e);
        }

        // Only switch layouts when a note layout owns the pads
        if self.manager.is_active(MELODIC) || self.manager.is_active(RHYTHMIC) {
            let wanted = match layout {
                Layout::Melodic => MELODIC,
                Layout::Rhythmic => RHYTHMIC,
            };
            self.manager.activate(wanted, &mut self.ctx);
        }

        self.manager.notify_track_selected(&mut self.ctx);
        self.ctx.dirty.mark_all();
    }

    fn save_settings(&mut self) {
        let mut settings = self.ctx.state.settings.clone();
        settings.midi_out_device = self.ctx.midi.port_name();
        settings.midi_in_device = self.ctx.state.midi_in_port.clone();
        settings.notes_midi_in_device = self.ctx.state.notes_midi_in_port.clone();
        self.ctx.state.settings = settings.clone();

        if let Err(e) = self.config.update_settings(settings) {
            log::error!("Could not save settings: {}", e);
        }
    }

    fn reconfigure_surface(&mut self) {
        for command in notes::surface_configuration(self.ctx.settings()) {
            self.push.apply(&command);
        }
    }

    fn refresh_ports(&mut self) {
        self.ctx.state.available_in_ports = available_input_ports();
        self.ctx.state.available_out_ports = available_output_ports();
        log::debug!(
            "MIDI ports in: {:?}, out: {:?}",
            self.ctx.state.available_in_ports,
            self.ctx.state.available_out_ports
        );
    }

    fn open_midi_out(&mut self, name: Option<String>) {
        self.ctx.midi.close();
        match name {
            Some(name) => match self.ctx.midi.open_port(&name) {
                Ok(()) => self.ctx.state.settings.midi_out_device = Some(name),
                Err(e) => log::warn!("Could not open MIDI out '{}': {}", name, e),
            },
            None => {
                log::info!("MIDI out closed");
                self.ctx.state.settings.midi_out_device = None;
            }
        }
    }

    /// A device that fails to open stays in the settings so it is tried
    /// again on the next start.
    fn open_midi_in(&mut self, role: InputRole, name: Option<String>) {
        // The old connection must be gone before the port is opened again
        match role {
            InputRole::Main => self.midi_in = None,
            InputRole::Notes => self.notes_midi_in = None,
        }

        let port = match name.as_deref() {
            Some(name) => match MidiInputPort::open(name, role, self.midi_in_tx.clone()) {
                Ok(port) => Some(port),
                Err(e) => {
                    log::warn!("Could not open MIDI in '{}': {}", name, e);
                    None
                }
            },
            None => None,
        };
        let opened = port.as_ref().map(|p| p.name().to_string());
        let keep_setting = name.is_some() && opened.is_none();

        let state = &mut self.ctx.state;
        match role {
            InputRole::Main => {
                self.midi_in = port;
                state.midi_in_port = opened.clone();
                if !keep_setting {
                    state.settings.midi_in_device = opened;
                }
            }
            InputRole::Notes => {
                self.notes_midi_in = port;
                state.notes_midi_in_port = opened.clone();
                if !keep_setting {
                    state.settings.notes_midi_in_device = opened;
                }
            }
        }
    }

    fn repaint_pads(&mut self) {
        let mut frame = Frame::new();
        self.manager.paint_pads(&self.ctx, &mut frame);
        let leds = self.push.leds();
        for (row, line) in frame.pads.iter().enumerate() {
            for (col, color) in line.iter().enumerate() {
                leds.set_pad_color(row, col, *color);
            }
        }
    }

    /// Buttons no active mode painted are switched off.
    fn repaint_buttons(&mut self) {
        let mut frame = Frame::new();
        self.manager.paint_buttons(&self.ctx, &mut frame);
        let leds = self.push.leds();
        for button in leds.lit_buttons() {
            if !frame.buttons.contains_key(&button) {
                leds.set_button_color(button, PadColor::off());
            }
        }
        for (button, color) in frame.buttons {
            leds.set_button_color(button, color);
        }
    }

    fn repaint_display(&mut self) {
        let mut layout = TextLayout::new();
        self.manager.paint_display(&self.ctx, &mut layout);
        self.push.display().update_from(&layout);
        if let Some(layout) = self.push.take_display_update() {
            for line in layout.render_lines() {
                log::trace!("| {}", line);
            }
        }
    }

    fn shutdown(&mut self) {
        self.push.shutdown();
        self.ctx.sequencer.stop();
        self.midi_in = None;
        self.notes_midi_in = None;
        self.ctx.midi.close();
        log::info!("Shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use conductor_core::midi::router::RecordingSink;
    use conductor_core::{Color, SequencerSettings};
    use tempfile::TempDir;

    use super::*;
    use crate::modes::{CLIP_TRIGGERING, PRESET_SELECTION};

    struct Harness {
        app: App,
        midi: RecordingSink,
        _dir: TempDir,
    }

    fn harness(settings: Settings) -> Harness {
        let dir = TempDir::new().unwrap();
        let mut settings = settings;
        settings.favourite_presets_path = dir.path().join("favourites.json");
        let mut config = ConfigManager::new(Some(dir.path().join("settings.json")));
        config.update_settings(settings.clone()).unwrap();

        let midi = RecordingSink::new();
        let dirty = Arc::new(DirtyFlags::default());
        let bridge = Arc::new(SequencerBridge::new(
            SequencerSettings::default(),
            dirty.clone(),
        ));
        let mut app = App::new(
            config,
            settings,
            TrackListing::placeholders(),
            Push2Device::with_output(Box::new(RecordingSink::new())),
            MidiRouter::with_sink(0, Box::new(midi.clone())),
            bridge,
            dirty,
        );
        app.start();
        Harness {
            app,
            midi,
            _dir: dir,
        }
    }

    fn sent(sink: &RecordingSink) -> Vec<MidiMessage> {
        sink.sent()
            .iter()
            .filter_map(|bytes| MidiMessage::from_bytes(bytes))
            .collect()
    }

    fn press(app: &mut App, button: Button) {
        app.handle_event(&ControlEvent::ButtonPressed(button));
        app.handle_event(&ControlEvent::ButtonReleased(button));
    }

    #[tokio::test]
    async fn test_shutdown_future_outlives_frames() {
        let h = harness(Settings::default());
        // Many frames pass before the deadline; the loop must keep the same timer
        let deadline = tokio::time::sleep(Duration::from_millis(150));
        let finished =
            tokio::time::timeout(Duration::from_secs(3), h.app.run_until(deadline)).await;
        assert!(matches!(finished, Ok(Ok(()))));
    }

    #[test]
    fn test_start_selects_first_track() {
        let h = harness(Settings::default());
        let active = h.app.manager.active_modes();
        assert!(active.contains(&MAIN_CONTROLS));
        assert!(active.contains(&TRACK_SELECTION));
        assert!(active.contains(&MELODIC));
        assert_eq!(
            sent(&h.midi),
            vec![MidiMessage::ControlChange {
                channel: 15,
                controller: 0,
                value: 1
            }]
        );
    }

    #[test]
    fn test_select_track_out_of_range_is_ignored() {
        let mut h = harness(Settings::default());
        h.midi.clear();
        h.app.apply_request(AppRequest::SelectTrack(200));
        assert_eq!(h.app.ctx.state.selected_track, 0);
        assert!(sent(&h.midi).is_empty());

        h.app.apply_request(AppRequest::SelectTrack(9));
        assert_eq!(h.app.ctx.state.selected_track, 9);
    }

    #[test]
    fn test_note_button_swaps_layouts() {
        let mut h = harness(Settings::default());
        press(&mut h.app, Button::Note);
        assert!(h.app.manager.is_active(RHYTHMIC));
        assert!(!h.app.manager.is_active(MELODIC));
        press(&mut h.app, Button::Note);
        assert!(h.app.manager.is_active(MELODIC));
    }

    #[test]
    fn test_pad_modes_exclude_each_other() {
        let mut h = harness(Settings::default());
        press(&mut h.app, Button::Session);
        assert!(h.app.manager.is_active(CLIP_TRIGGERING));
        assert!(!h.app.manager.is_active(MELODIC));

        press(&mut h.app, Button::AddDevice);
        assert!(h.app.manager.is_active(PRESET_SELECTION));
        assert!(!h.app.manager.is_active(CLIP_TRIGGERING));

        // Leaving restores the previous pad mode
        press(&mut h.app, Button::AddDevice);
        assert!(h.app.manager.is_active(CLIP_TRIGGERING));
    }

    #[test]
    fn test_setup_rotates_settings_pages() {
        let mut h = harness(Settings::default());
        press(&mut h.app, Button::Setup);
        assert!(h.app.manager.is_active(SETTINGS));

        press(&mut h.app, Button::Setup);
        press(&mut h.app, Button::Setup);
        assert!(h.app.manager.is_active(SETTINGS));

        press(&mut h.app, Button::Setup);
        assert!(!h.app.manager.is_active(SETTINGS));
    }

    #[test]
    fn test_midi_in_channel_filter() {
        let mut settings = Settings::default();
        settings.midi_in_channel = 2;
        settings.midi_out_channel = 5;
        let mut h = harness(settings);
        h.midi.clear();

        let note = |channel| MidiMessage::NoteOn {
            channel,
            note: 60,
            velocity: 90,
        };
        h.app.handle_midi_in(InputRole::Main, note(2));
        h.app.handle_midi_in(InputRole::Main, note(3));
        h.app.handle_midi_in(InputRole::Notes, note(2));

        // Forwarded on the output channel
        assert_eq!(sent(&h.midi), vec![note(5)]);
    }

    #[test]
    fn test_unpainted_buttons_are_switched_off() {
        let mut h = harness(Settings::default());
        let now = Instant::now();
        press(&mut h.app, Button::Session);
        h.app.frame(now);
        assert!(!h.app.push.leds().button_color(Button::Play).is_off());

        press(&mut h.app, Button::Session);
        h.app.frame(now + Duration::from_millis(20));
        assert!(h.app.push.leds().button_color(Button::Play).is_off());
        assert_eq!(
            h.app.push.leds().button_color(Button::Note),
            PadColor::new(Color::White)
        );
    }

    #[test]
    fn test_save_settings_persists() {
        let mut h = harness(Settings::default());
        h.app.ctx.state.settings.root_midi_note = 48;
        h.app.apply_request(AppRequest::SaveSettings);

        let path = h.app.config.config_path().to_path_buf();
        let mut reloaded = ConfigManager::new(Some(path));
        assert_eq!(reloaded.load().unwrap().root_midi_note, 48);
    }

    #[test]
    fn test_toggle_display() {
        let mut h = harness(Settings::default());
        let shown = h.app.ctx.state.display_enabled;
        press(&mut h.app, Button::User);
        assert_eq!(h.app.ctx.state.display_enabled, !shown);
    }

    #[test]
    fn test_frame_counter() {
        let start = Instant::now();
        let mut counter = FrameCounter::new(start);
        for i in 1..60 {
            assert_eq!(counter.frame_done(start + Duration::from_millis(i * 16)), None);
        }
        let fps = counter.frame_done(start + Duration::from_secs(1)).unwrap();
        assert!((fps - 60.0).abs() < 0.01);
    }
}
