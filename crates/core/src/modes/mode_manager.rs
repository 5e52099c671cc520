use std::collections::HashMap;

use super::mode_stack::ModeStack;
use super::traits::{Mode, ModeId, XorGroup};
use super::xor_group::{XorGroupController, XorTransition};
use crate::context::ModeContext;
use crate::controls::{ControlEvent, EventKind};
use crate::surface::{ControlSurface, DisplaySurface};

/// How an event kind travels through the active modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Stop at the first mode that handles it
    ShortCircuit,
    /// Every active mode sees it
    Broadcast,
}

/// Owns every mode, the active stack and the exclusivity groups.
pub struct ModeManager {
    modes: HashMap<ModeId, Box<dyn Mode>>,
    registration_order: Vec<ModeId>,
    stack: ModeStack,
    xor: XorGroupController,
    propagation: HashMap<EventKind, Propagation>,
}

impl ModeManager {
    pub fn new() -> Self {
        let mut propagation = HashMap::new();
        // Incoming notes light up whatever layout is showing them
        propagation.insert(EventKind::MidiIn, Propagation::Broadcast);

        Self {
            modes: HashMap::new(),
            registration_order: Vec::new(),
            stack: ModeStack::new(),
            xor: XorGroupController::new(),
            propagation,
        }
    }

    /// Register a new mode with the manager
    pub fn register_mode(&mut self, mode: Box<dyn Mode>) {
        let id = mode.id();
        if self.modes.insert(id, mode).is_some() {
            log::warn!("Mode {} registered twice, replacing", id);
        } else {
            self.registration_order.push(id);
        }
    }

    pub fn set_group_default(&mut self, group: XorGroup, id: ModeId) {
        self.xor.set_default(group, id);
    }

    pub fn set_propagation(&mut self, kind: EventKind, propagation: Propagation) {
        self.propagation.insert(kind, propagation);
    }

    pub fn propagation(&self, kind: EventKind) -> Propagation {
        self.propagation
            .get(&kind)
            .copied()
            .unwrap_or(Propagation::ShortCircuit)
    }

    pub fn is_registered(&self, id: ModeId) -> bool {
        self.modes.contains_key(&id)
    }

    pub fn is_active(&self, id: ModeId) -> bool {
        self.stack.contains(id)
    }

    /// Active modes, lowest priority first.
    pub fn active_modes(&self) -> Vec<ModeId> {
        self.stack.iter().collect()
    }

    pub fn group_of(&self, id: ModeId) -> Option<XorGroup> {
        self.modes.get(&id).and_then(|mode| mode.xor_group())
    }

    /// Activate a mode. Grouped modes go through their group.
    pub fn activate(&mut self, id: ModeId, ctx: &mut ModeContext) {
        if self.group_of(id).is_some() {
            self.select_for_group(id, ctx);
            return;
        }
        self.push_and_activate(id, ctx);
    }

    /// Deactivate a mode. Grouped modes go through their group.
    pub fn deactivate(&mut self, id: ModeId, ctx: &mut ModeContext) {
        if self.group_of(id).is_some() {
            self.deselect_for_group(id, ctx);
            return;
        }
        self.remove_and_deactivate(id, ctx);
    }

    pub fn toggle(&mut self, id: ModeId, ctx: &mut ModeContext) {
        if self.is_active(id) {
            self.deactivate(id, ctx);
        } else {
            self.activate(id, ctx);
        }
    }

    /// Make `id` the only active member of its group.
    pub fn select_for_group(&mut self, id: ModeId, ctx: &mut ModeContext) {
        let Some(group) = self.require_group(id) else {
            return;
        };
        let transition = self.xor.select(id, group, &self.stack);
        self.execute(transition, ctx);
    }

    /// Deactivate `id` and restore the previous member of its group.
    pub fn deselect_for_group(&mut self, id: ModeId, ctx: &mut ModeContext) {
        let Some(group) = self.require_group(id) else {
            return;
        };
        let transition = self.xor.deselect(id, group, &self.stack);
        self.execute(transition, ctx);
    }

    fn require_group(&self, id: ModeId) -> Option<XorGroup> {
        if !self.is_registered(id) {
            log::error!("Unknown mode {}", id);
            return None;
        }
        let group = self.group_of(id);
        debug_assert!(
            group.is_some(),
            "mode {} has no xor group and must be toggled on its own",
            id
        );
        if group.is_none() {
            log::error!("Mode {} has no xor group, ignoring group selection", id);
        }
        group
    }

    fn execute(&mut self, transition: XorTransition, ctx: &mut ModeContext) {
        if let Some(id) = transition.deactivate {
            self.remove_and_deactivate(id, ctx);
        }
        if let Some(id) = transition.activate {
            self.push_and_activate(id, ctx);
        }
    }

    fn push_and_activate(&mut self, id: ModeId, ctx: &mut ModeContext) {
        let Some(mode) = self.modes.get_mut(&id) else {
            log::error!("Unknown mode {}", id);
            return;
        };
        if self.stack.push(id) {
            ctx.state.active_modes = self.stack.iter().collect();
            mode.activate(ctx);
            ctx.dirty.mark_all();
            log::debug!("Activated mode {}", id);
        }
    }

    fn remove_and_deactivate(&mut self, id: ModeId, ctx: &mut ModeContext) {
        let Some(mode) = self.modes.get_mut(&id) else {
            log::error!("Unknown mode {}", id);
            return;
        };
        if self.stack.remove(id) {
            ctx.state.active_modes = self.stack.iter().collect();
            mode.deactivate(ctx);
            ctx.dirty.mark_all();
            log::debug!("Deactivated mode {}", id);
        }
    }

    /// Hand an event to the active modes, highest priority first.
    ///
    /// Returns whether any mode handled it.
    pub fn dispatch(&mut self, event: &ControlEvent, ctx: &mut ModeContext) -> bool {
        let propagation = self.propagation(event.kind());
        let mut handled = false;

        for id in self.stack.dispatch_order() {
            let Some(mode) = self.modes.get_mut(&id) else {
                continue;
            };
            if mode.on_event(event, ctx).is_handled() {
                handled = true;
                if propagation == Propagation::ShortCircuit {
                    break;
                }
            }
        }

        handled
    }

    /// Run delayed actions of every active mode.
    pub fn tick_all(&mut self, ctx: &mut ModeContext) {
        for id in self.stack.dispatch_order() {
            if let Some(mode) = self.modes.get_mut(&id) {
                mode.tick(ctx);
            }
        }
    }

    /// Paint pads in activation order so higher-priority modes paint last.
    pub fn paint_pads(&self, ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        for id in self.stack.iter() {
            if let Some(mode) = self.modes.get(&id) {
                mode.paint_pads(ctx, surface);
            }
        }
    }

    pub fn paint_buttons(&self, ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        for id in self.stack.iter() {
            if let Some(mode) = self.modes.get(&id) {
                mode.paint_buttons(ctx, surface);
            }
        }
    }

    pub fn paint_display(&self, ctx: &ModeContext, display: &mut dyn DisplaySurface) {
        for id in self.stack.iter() {
            if let Some(mode) = self.modes.get(&id) {
                mode.paint_display(ctx, display);
            }
        }
    }

    /// Tell every registered mode, active or not, about a track change.
    pub fn notify_track_selected(&mut self, ctx: &mut ModeContext) {
        for id in &self.registration_order {
            if let Some(mode) = self.modes.get_mut(id) {
                mode.on_track_selected(ctx);
            }
        }
    }
}

impl Default for ModeManager {
    fn default() -> Self {
        Self::new()
    }
}
