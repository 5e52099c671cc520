use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::messages::{AppRequest, Settings};
use crate::modes::ModeId;
use crate::midi::pyramidi::TrackSelectProtocol;
use crate::midi::router::MidiRouter;
use crate::sequencer::SequencerBridge;
use crate::surface::SurfaceCommand;
use crate::tracks::{TrackInfo, TrackListing};

/// Repaint flags, set from any thread and consumed by the main loop.
#[derive(Debug)]
pub struct DirtyFlags {
    pads: AtomicBool,
    buttons: AtomicBool,
}

impl Default for DirtyFlags {
    fn default() -> Self {
        // Everything needs painting once at startup
        Self {
            pads: AtomicBool::new(true),
            buttons: AtomicBool::new(true),
        }
    }
}

impl DirtyFlags {
    pub fn mark_pads(&self) {
        self.pads.store(true, Ordering::Release);
    }

    pub fn mark_buttons(&self) {
        self.buttons.store(true, Ordering::Release);
    }

    pub fn mark_all(&self) {
        self.mark_pads();
        self.mark_buttons();
    }

    /// Read and clear.
    pub fn take_pads(&self) -> bool {
        self.pads.swap(false, Ordering::AcqRel)
    }

    /// Read and clear.
    pub fn take_buttons(&self) -> bool {
        self.buttons.swap(false, Ordering::AcqRel)
    }
}

/// Application state shared with every mode.
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub tracks: TrackListing,
    pub selected_track: usize,
    pub display_enabled: bool,
    pub measured_fps: f32,
    pub midi_in_port: Option<String>,
    pub notes_midi_in_port: Option<String>,
    pub available_in_ports: Vec<String>,
    pub available_out_ports: Vec<String>,
    /// Mirror of the mode stack, lowest priority first
    pub active_modes: Vec<ModeId>,
}

impl AppState {
    pub fn new(settings: Settings, tracks: TrackListing) -> Self {
        Self {
            display_enabled: settings.use_push2_display,
            settings,
            tracks,
            selected_track: 0,
            measured_fps: 0.0,
            midi_in_port: None,
            notes_midi_in_port: None,
            available_in_ports: Vec::new(),
            available_out_ports: Vec::new(),
            active_modes: Vec::new(),
        }
    }

    pub fn selected_track_info(&self) -> Option<&TrackInfo> {
        self.tracks.get(self.selected_track)
    }

    pub fn selected_track_color(&self) -> crate::surface::Color {
        self.tracks.color(self.selected_track)
    }

    pub fn is_mode_active(&self, id: ModeId) -> bool {
        self.active_modes.contains(&id)
    }
}

/// Everything a mode may read or use while handling an event.
pub struct ModeContext {
    pub state: AppState,
    pub midi: MidiRouter,
    pub sequencer: Arc<SequencerBridge>,
    pub dirty: Arc<DirtyFlags>,
    /// Time the current frame started
    pub now: Instant,
    requests: Vec<AppRequest>,
    surface_commands: Vec<SurfaceCommand>,
}

impl ModeContext {
    pub fn new(
        state: AppState,
        midi: MidiRouter,
        sequencer: Arc<SequencerBridge>,
        dirty: Arc<DirtyFlags>,
    ) -> Self {
        Self {
            state,
            midi,
            sequencer,
            dirty,
            now: Instant::now(),
            requests: Vec::new(),
            surface_commands: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.state.settings
    }

    /// Queue a change to be applied once dispatch has finished.
    pub fn request(&mut self, request: AppRequest) {
        self.requests.push(request);
    }

    pub fn take_requests(&mut self) -> Vec<AppRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn send_surface(&mut self, command: SurfaceCommand) {
        self.surface_commands.push(command);
    }

    pub fn take_surface_commands(&mut self) -> Vec<SurfaceCommand> {
        std::mem::take(&mut self.surface_commands)
    }

    pub fn pyramidi(&self) -> TrackSelectProtocol {
        TrackSelectProtocol::new(self.state.settings.pyramidi_channel)
    }

    pub fn mark_pads(&self) {
        self.dirty.mark_pads();
    }

    pub fn mark_buttons(&self) {
        self.dirty.mark_buttons();
    }
}
