//! Hardware-agnostic names for everything a mode can react to.

use crate::midi::midi::MidiMessage;

/// Named buttons of the control surface.
///
/// Indexed rows are 0-based: `Upper(0)` is the leftmost button above the
/// display, `Scene(0)` is the top scene-launch button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Play,
    Record,
    Stop,
    Note,
    Session,
    Setup,
    User,
    Master,
    Accent,
    Shift,
    Select,
    Delete,
    DoubleLoop,
    Duplicate,
    Metronome,
    AddDevice,
    AddTrack,
    Device,
    OctaveUp,
    OctaveDown,
    PageLeft,
    PageRight,
    Upper(u8),
    Lower(u8),
    Scene(u8),
}

impl Button {
    pub fn upper_row() -> impl Iterator<Item = Button> {
        (0..8).map(Button::Upper)
    }

    pub fn lower_row() -> impl Iterator<Item = Button> {
        (0..8).map(Button::Lower)
    }

    pub fn scene_column() -> impl Iterator<Item = Button> {
        (0..8).map(Button::Scene)
    }
}

/// Endless rotary encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoder {
    Tempo,
    Swing,
    /// One of the eight encoders above the display, 0-based from the left
    Track(u8),
    Master,
}

/// A single input event from the control surface or an incoming MIDI port.
///
/// Pad rows are counted from the top of the grid.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    PadPressed { row: u8, col: u8, velocity: u8 },
    PadReleased { row: u8, col: u8, velocity: u8 },
    /// Polyphonic aftertouch carries the pad, channel aftertouch does not
    PadAftertouch { pad: Option<(u8, u8)>, value: u8 },
    ButtonPressed(Button),
    ButtonReleased(Button),
    EncoderRotated { encoder: Encoder, increment: i8 },
    /// Touchstrip position as a signed pitch-bend value
    Touchstrip(i16),
    SustainPedal(bool),
    MidiIn(MidiMessage),
}

/// Payload-free discriminant of [`ControlEvent`], used to configure propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PadPressed,
    PadReleased,
    PadAftertouch,
    ButtonPressed,
    ButtonReleased,
    EncoderRotated,
    Touchstrip,
    SustainPedal,
    MidiIn,
}

impl ControlEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ControlEvent::PadPressed { .. } => EventKind::PadPressed,
            ControlEvent::PadReleased { .. } => EventKind::PadReleased,
            ControlEvent::PadAftertouch { .. } => EventKind::PadAftertouch,
            ControlEvent::ButtonPressed(_) => EventKind::ButtonPressed,
            ControlEvent::ButtonReleased(_) => EventKind::ButtonReleased,
            ControlEvent::EncoderRotated { .. } => EventKind::EncoderRotated,
            ControlEvent::Touchstrip(_) => EventKind::Touchstrip,
            ControlEvent::SustainPedal(_) => EventKind::SustainPedal,
            ControlEvent::MidiIn(_) => EventKind::MidiIn,
        }
    }
}

/// Outcome of handing an event to one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// The mode consumed the event
    Handled,
    Ignored,
}

impl EventResult {
    pub fn is_handled(self) -> bool {
        self == EventResult::Handled
    }
}

impl From<bool> for EventResult {
    fn from(handled: bool) -> Self {
        if handled {
            EventResult::Handled
        } else {
            EventResult::Ignored
        }
    }
}
