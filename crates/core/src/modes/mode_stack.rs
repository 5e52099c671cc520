use super::traits::ModeId;

/// Active modes in activation order.
///
/// The last activated mode has the highest priority and receives events
/// first. A mode appears at most once. Whoever adds or removes a mode is
/// responsible for calling its `activate`/`deactivate`.
#[derive(Debug, Clone, Default)]
pub struct ModeStack {
    active: Vec<ModeId>,
}

impl ModeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mode. Returns false if it was already active.
    pub fn push(&mut self, id: ModeId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.active.push(id);
        true
    }

    /// Remove a mode. Returns false if it was not active.
    pub fn remove(&mut self, id: ModeId) -> bool {
        let before = self.active.len();
        self.active.retain(|active| *active != id);
        self.active.len() != before
    }

    pub fn contains(&self, id: ModeId) -> bool {
        self.active.contains(&id)
    }

    /// Activation order, lowest priority first. Used for painting.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = ModeId> + '_ {
        self.active.iter().copied()
    }

    /// Highest priority first. Used for dispatch.
    pub fn dispatch_order(&self) -> Vec<ModeId> {
        self.active.iter().rev().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ModeId = ModeId("a");
    const B: ModeId = ModeId("b");
    const C: ModeId = ModeId("c");

    #[test]
    fn test_push_is_unique() {
        let mut stack = ModeStack::new();
        assert!(stack.push(A));
        assert!(!stack.push(A));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_dispatch_order_is_reverse_activation() {
        let mut stack = ModeStack::new();
        stack.push(A);
        stack.push(B);
        stack.push(C);
        assert_eq!(stack.dispatch_order(), vec![C, B, A]);

        assert!(stack.remove(B));
        assert!(!stack.remove(B));
        assert_eq!(stack.iter().collect::<Vec<_>>(), vec![A, C]);
    }

    #[test]
    fn test_reactivated_mode_moves_to_top() {
        let mut stack = ModeStack::new();
        stack.push(A);
        stack.push(B);
        stack.remove(A);
        stack.push(A);
        assert_eq!(stack.dispatch_order(), vec![A, B]);
    }
}
