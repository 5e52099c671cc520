//! Every way the pads, buttons and encoders can be interpreted.
//!
//! Modes are registered once at startup in [`register_all`]; the app then
//! moves them in and out of the active stack.

pub mod clip_triggering;
pub mod main_controls;
pub mod melodic;
pub mod midi_cc;
pub mod notes;
pub mod preset_selection;
pub mod pyramid_triggering;
pub mod rhythmic;
pub mod settings;
pub mod track_selection;

use std::time::Duration;

use conductor_core::{ModeId, ModeManager, Settings, XorGroup};

pub use clip_triggering::ClipTriggeringMode;
pub use main_controls::MainControlsMode;
pub use melodic::MelodicMode;
pub use midi_cc::MidiCcMode;
pub use preset_selection::PresetSelectionMode;
pub use pyramid_triggering::PyramidTriggeringMode;
pub use rhythmic::RhythmicMode;
pub use settings::SettingsMode;
pub use track_selection::TrackSelectionMode;

pub const MAIN_CONTROLS: ModeId = ModeId("main_controls");
pub const TRACK_SELECTION: ModeId = ModeId("track_selection");
pub const MELODIC: ModeId = ModeId("melodic");
pub const RHYTHMIC: ModeId = ModeId("rhythmic");
pub const CLIP_TRIGGERING: ModeId = ModeId("clip_triggering");
pub const PYRAMID_TRIGGERING: ModeId = ModeId("pyramid_triggering");
pub const PRESET_SELECTION: ModeId = ModeId("preset_selection");
pub const MIDI_CC: ModeId = ModeId("midi_cc");
pub const SETTINGS: ModeId = ModeId("settings");

/// Modes owning the 64 pads. Exactly one is active at a time.
pub const PADS: XorGroup = XorGroup("pads");

/// Register every mode. Nothing is activated here.
pub fn register_all(manager: &mut ModeManager, settings: &Settings) {
    let ms = Duration::from_millis;

    manager.register_mode(Box::new(MainControlsMode::new()));
    manager.register_mode(Box::new(TrackSelectionMode::new(ms(
        settings.track_select_quick_press_ms,
    ))));
    manager.register_mode(Box::new(MelodicMode::new()));
    manager.register_mode(Box::new(RhythmicMode::new()));
    manager.register_mode(Box::new(ClipTriggeringMode::new(ms(
        settings.pad_quick_press_ms,
    ))));
    manager.register_mode(Box::new(PyramidTriggeringMode::new(ms(
        settings.pad_quick_press_ms,
    ))));
    manager.register_mode(Box::new(PresetSelectionMode::new(
        settings.favourite_presets_path.clone(),
        ms(settings.preset_quick_press_ms),
    )));
    manager.register_mode(Box::new(MidiCcMode::new()));
    manager.register_mode(Box::new(SettingsMode::new()));

    manager.set_group_default(PADS, MELODIC);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Arc;

    use conductor_core::midi::router::RecordingSink;
    use conductor_core::{
        AppState, Button, Color, CommandRecorder, ControlSurface, DirtyFlags, DisplaySurface,
        MidiMessage, MidiRouter, ModeContext, PadColor, SequencerBridge, SequencerSettings,
        Settings, TrackListing,
    };

    /// Context with a recording MIDI output and an idle sequencer bridge.
    pub fn context() -> (ModeContext, RecordingSink) {
        context_with(Settings::default())
    }

    pub fn context_with(settings: Settings) -> (ModeContext, RecordingSink) {
        let sink = RecordingSink::new();
        let dirty = Arc::new(DirtyFlags::default());
        let bridge = Arc::new(SequencerBridge::new(
            SequencerSettings::default(),
            dirty.clone(),
        ));
        let ctx = ModeContext::new(
            AppState::new(settings, TrackListing::placeholders()),
            MidiRouter::with_sink(0, Box::new(sink.clone())),
            bridge,
            dirty,
        );
        (ctx, sink)
    }

    /// Context whose sequencer bridge records every command it is given.
    pub fn sequencer_context() -> (ModeContext, CommandRecorder) {
        let recorder = CommandRecorder::new();
        let dirty = Arc::new(DirtyFlags::default());
        let bridge = Arc::new(SequencerBridge::with_recorder(
            SequencerSettings::default(),
            dirty.clone(),
            recorder.clone(),
        ));
        let ctx = ModeContext::new(
            AppState::new(Settings::default(), TrackListing::placeholders()),
            MidiRouter::with_sink(0, Box::new(RecordingSink::new())),
            bridge,
            dirty,
        );
        (ctx, recorder)
    }

    /// Every message the sink received, parsed.
    pub fn sent(sink: &RecordingSink) -> Vec<MidiMessage> {
        sink.sent()
            .iter()
            .filter_map(|bytes| MidiMessage::from_bytes(bytes))
            .collect()
    }

    /// Surface that remembers the last color of every control.
    #[derive(Default)]
    pub struct Canvas {
        pub pads: HashMap<(u8, u8), PadColor>,
        pub buttons: HashMap<Button, PadColor>,
        pub text: HashMap<(usize, usize), String>,
        pub highlights: HashMap<usize, Color>,
    }

    impl Canvas {
        pub fn pad(&self, row: u8, col: u8) -> PadColor {
            self.pads.get(&(row, col)).copied().unwrap_or_default()
        }

        pub fn button(&self, button: Button) -> PadColor {
            self.buttons.get(&button).copied().unwrap_or_default()
        }

        pub fn text_at(&self, column: usize, line: usize) -> &str {
            self.text.get(&(column, line)).map(String::as_str).unwrap_or("")
        }
    }

    impl ControlSurface for Canvas {
        fn set_pad(&mut self, row: u8, col: u8, color: PadColor) {
            self.pads.insert((row, col), color);
        }

        fn set_button(&mut self, button: Button, color: PadColor) {
            self.buttons.insert(button, color);
        }
    }

    impl DisplaySurface for Canvas {
        fn clear(&mut self) {
            self.text.clear();
            self.highlights.clear();
        }

        fn text(&mut self, column: usize, line: usize, text: &str, _color: Color) {
            self.text.insert((column, line), text.to_string());
        }

        fn highlight(&mut self, column: usize, color: Color) {
            self.highlights.insert(column, color);
        }
    }
}
