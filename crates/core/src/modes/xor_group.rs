use std::collections::HashMap;

use super::mode_stack::ModeStack;
use super::traits::{ModeId, XorGroup};

/// Stack changes needed to honor a group selection, in execution order.
///
/// The caller removes and deactivates `deactivate` first, then appends and
/// activates `activate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XorTransition {
    pub deactivate: Option<ModeId>,
    pub activate: Option<ModeId>,
}

impl XorTransition {
    pub fn is_noop(&self) -> bool {
        self.deactivate.is_none() && self.activate.is_none()
    }
}

/// Keeps at most one mode per group active and remembers the member to
/// restore when the current one is deselected.
#[derive(Debug, Clone, Default)]
pub struct XorGroupController {
    current: HashMap<XorGroup, ModeId>,
    previous: HashMap<XorGroup, ModeId>,
    defaults: HashMap<XorGroup, ModeId>,
}

impl XorGroupController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode activated when a group would otherwise be left empty.
    pub fn set_default(&mut self, group: XorGroup, id: ModeId) {
        self.defaults.insert(group, id);
    }

    pub fn default_for(&self, group: XorGroup) -> Option<ModeId> {
        self.defaults.get(&group).copied()
    }

    pub fn current(&self, group: XorGroup) -> Option<ModeId> {
        self.current.get(&group).copied()
    }

    pub fn previous(&self, group: XorGroup) -> Option<ModeId> {
        self.previous.get(&group).copied()
    }

    /// Plan making `id` the active member of `group`.
    ///
    /// The member it replaces becomes the one restored on deselect.
    pub fn select(&mut self, id: ModeId, group: XorGroup, stack: &ModeStack) -> XorTransition {
        if stack.contains(id) {
            self.current.insert(group, id);
            return XorTransition::default();
        }

        let replaced = self
            .current
            .get(&group)
            .copied()
            .filter(|current| *current != id && stack.contains(*current));
        if let Some(replaced) = replaced {
            self.previous.insert(group, replaced);
        }
        self.current.insert(group, id);

        XorTransition {
            deactivate: replaced,
            activate: Some(id),
        }
    }

    /// Plan removing `id` from `group` and restoring the previous member, or
    /// the group default when there is none.
    ///
    /// Restoring consumes the remembered member. Deselecting the default with
    /// nothing to restore leaves it active.
    pub fn deselect(&mut self, id: ModeId, group: XorGroup, stack: &ModeStack) -> XorTransition {
        if !stack.contains(id) {
            return XorTransition::default();
        }

        let restore = self
            .previous
            .remove(&group)
            .filter(|previous| *previous != id)
            .or_else(|| self.default_for(group).filter(|default| *default != id));

        match restore {
            Some(restore) => {
                self.current.insert(group, restore);
                XorTransition {
                    deactivate: Some(id),
                    activate: Some(restore),
                }
            }
            None => {
                log::debug!("Not deselecting {}, nothing to restore in group {}", id, group);
                XorTransition::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PADS: XorGroup = XorGroup("pads");
    const MELODIC: ModeId = ModeId("melodic");
    const RHYTHMIC: ModeId = ModeId("rhythmic");
    const CLIPS: ModeId = ModeId("clips");

    /// Apply a plan the way the mode manager does.
    fn apply(stack: &mut ModeStack, transition: XorTransition) {
        if let Some(id) = transition.deactivate {
            stack.remove(id);
        }
        if let Some(id) = transition.activate {
            stack.push(id);
        }
    }

    fn controller() -> XorGroupController {
        let mut xor = XorGroupController::new();
        xor.set_default(PADS, MELODIC);
        xor
    }

    #[test]
    fn test_select_replaces_current() {
        let mut xor = controller();
        let mut stack = ModeStack::new();

        let transition = xor.select(MELODIC, PADS, &stack);
        apply(&mut stack, transition);
        let plan = xor.select(RHYTHMIC, PADS, &stack);
        assert_eq!(plan.deactivate, Some(MELODIC));
        assert_eq!(plan.activate, Some(RHYTHMIC));
        apply(&mut stack, plan);

        assert!(!stack.contains(MELODIC));
        assert!(stack.contains(RHYTHMIC));
        assert_eq!(xor.previous(PADS), Some(MELODIC));
    }

    #[test]
    fn test_select_active_is_noop() {
        let mut xor = controller();
        let mut stack = ModeStack::new();
        let transition = xor.select(RHYTHMIC, PADS, &stack);
        apply(&mut stack, transition);
        assert!(xor.select(RHYTHMIC, PADS, &stack).is_noop());
    }

    #[test]
    fn test_deselect_restores_previous() {
        let mut xor = controller();
        let mut stack = ModeStack::new();

        let transition = xor.select(RHYTHMIC, PADS, &stack);
        apply(&mut stack, transition);
        let transition = xor.select(CLIPS, PADS, &stack);
        apply(&mut stack, transition);
        let transition = xor.deselect(CLIPS, PADS, &stack);
        apply(&mut stack, transition);

        assert_eq!(stack.iter().collect::<Vec<_>>(), vec![RHYTHMIC]);
        assert_eq!(xor.current(PADS), Some(RHYTHMIC));
    }

    #[test]
    fn test_deselect_without_history_uses_default() {
        let mut xor = controller();
        let mut stack = ModeStack::new();

        let transition = xor.select(CLIPS, PADS, &stack);
        apply(&mut stack, transition);
        let transition = xor.deselect(CLIPS, PADS, &stack);
        apply(&mut stack, transition);

        assert_eq!(stack.iter().collect::<Vec<_>>(), vec![MELODIC]);
    }

    #[test]
    fn test_history_is_consumed() {
        let mut xor = controller();
        let mut stack = ModeStack::new();

        let transition = xor.select(RHYTHMIC, PADS, &stack);
        apply(&mut stack, transition);
        let transition = xor.select(CLIPS, PADS, &stack);
        apply(&mut stack, transition);
        let transition = xor.deselect(CLIPS, PADS, &stack);
        apply(&mut stack, transition);
        let transition = xor.deselect(RHYTHMIC, PADS, &stack);
        apply(&mut stack, transition);

        assert_eq!(stack.iter().collect::<Vec<_>>(), vec![MELODIC]);
    }

    #[test]
    fn test_deselect_default_keeps_it() {
        let mut xor = controller();
        let mut stack = ModeStack::new();

        let transition = xor.select(MELODIC, PADS, &stack);
        apply(&mut stack, transition);
        assert!(xor.deselect(MELODIC, PADS, &stack).is_noop());
        assert!(xor.deselect(CLIPS, PADS, &stack).is_noop());
    }

    #[test]
    fn test_exactly_one_member_after_each_select() {
        let mut xor = controller();
        let mut stack = ModeStack::new();
        let members = [MELODIC, RHYTHMIC, CLIPS];

        for id in [CLIPS, MELODIC, MELODIC, RHYTHMIC, CLIPS, RHYTHMIC] {
            let transition = xor.select(id, PADS, &stack);
            apply(&mut stack, transition);
            let active = members.iter().filter(|m| stack.contains(**m)).count();
            assert_eq!(active, 1);
        }
    }
}
