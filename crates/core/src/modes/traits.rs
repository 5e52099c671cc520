use std::fmt;

use crate::context::ModeContext;
use crate::controls::{ControlEvent, EventResult};
use crate::surface::{ControlSurface, DisplaySurface};

/// Unique mode identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModeId(pub &'static str);

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Name of a set of modes of which at most one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XorGroup(pub &'static str);

impl fmt::Display for XorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// One way of interpreting the control surface.
///
/// Modes are constructed once and live for the whole run. They are activated
/// and deactivated any number of times; only active modes receive events and
/// paint. Changes to the mode stack or to device connections are requested
/// through [`ModeContext::request`], never performed directly.
pub trait Mode: Send {
    fn id(&self) -> ModeId;

    /// Exclusivity group, `None` for modes toggled on their own.
    fn xor_group(&self) -> Option<XorGroup> {
        None
    }

    fn activate(&mut self, _ctx: &mut ModeContext) {}

    /// Called when leaving the active set. Clear the controls this mode lit.
    fn deactivate(&mut self, _ctx: &mut ModeContext) {}

    fn on_event(&mut self, event: &ControlEvent, ctx: &mut ModeContext) -> EventResult;

    /// Delayed actions, run once per frame while active.
    fn tick(&mut self, _ctx: &mut ModeContext) {}

    fn paint_pads(&self, _ctx: &ModeContext, _surface: &mut dyn ControlSurface) {}

    fn paint_buttons(&self, _ctx: &ModeContext, _surface: &mut dyn ControlSurface) {}

    fn paint_display(&self, _ctx: &ModeContext, _display: &mut dyn DisplaySurface) {}

    /// A different track was selected. Called on every mode, active or not.
    fn on_track_selected(&mut self, _ctx: &mut ModeContext) {}
}
