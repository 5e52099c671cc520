pub use config::{ConfigError, ConfigManager, ConfigSchema};
pub use context::{AppState, DirtyFlags, ModeContext};
pub use controls::{Button, ControlEvent, Encoder, EventKind, EventResult};
pub use input::{BoundaryPolicy, Commit, DeferredSelector, PressDurationClassifier, PressKind};
pub use messages::{AppRequest, SequencerSettings, Settings};
pub use midi::midi::MidiMessage;
pub use midi::pyramidi::TrackSelectProtocol;
pub use midi::router::{ChannelFilter, InputRole, MidiError, MidiInputPort, MidiRouter, MidiSink};
pub use modes::{Mode, ModeId, ModeManager, Propagation, XorGroup};
pub use sequencer::{
    ClipDisplay, ClipGrid, ClipState, CommandRecorder, ProtocolRevision, SequencerBridge,
    SequencerCommand, SequencerError, TransportSnapshot,
};
pub use surface::{
    AftertouchMode, Animation, Color, ControlSurface, DisplaySurface, PadColor, SurfaceCommand,
};
pub use tracks::{InstrumentDefinition, Layout, TrackInfo, TrackListing, TrackListingError};

mod config;
pub mod context;
pub mod controls;
pub mod input;
pub mod messages;
pub mod midi;
pub mod modes;
pub mod sequencer;
pub mod surface;
pub mod tracks;
