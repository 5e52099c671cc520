//! Debounced "scroll through a list, settle, then apply" selection.
//!
//! Encoders produce a burst of small deltas while the user spins them. Opening
//! an OS device for every intermediate position is slow and can fail, so the
//! selection is only committed once input has been idle for the settle window.

use std::fmt::Display;
use std::time::{Duration, Instant};

/// Idle time after the last change before a pending selection is applied.
pub const SETTLE_WINDOW: Duration = Duration::from_secs(1);

/// How a pending index behaves at the ends of the list.
///
/// Index -1 stands for "none" in both policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Stop at -1 and at the last item
    Clamp,
    /// Past the last item go to -1, below -1 go to the last item
    Wrap,
}

/// Result of a commit performed by [`DeferredSelector::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// The item at this index is now committed, `None` meaning no item
    Applied(Option<usize>),
    /// The commit action failed; the selection fell back to no item
    Failed,
}

#[derive(Debug, Clone)]
pub struct DeferredSelector<T> {
    items: Vec<T>,
    committed: Option<usize>,
    pending: Option<isize>,
    last_change: Option<Instant>,
    settle_window: Duration,
}

impl<T> DeferredSelector<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self::with_settle_window(items, SETTLE_WINDOW)
    }

    pub fn with_settle_window(items: Vec<T>, settle_window: Duration) -> Self {
        Self {
            items,
            committed: None,
            pending: None,
            last_change: None,
            settle_window,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Replace the option list. A committed index that no longer exists is dropped.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        if let Some(idx) = self.committed {
            if idx >= self.items.len() {
                self.committed = None;
            }
        }
        if let Some(pending) = self.pending {
            self.pending = Some(pending.min(self.items.len() as isize - 1));
        }
    }

    pub fn committed_index(&self) -> Option<usize> {
        self.committed
    }

    /// Committed item. Stale while a selection is pending.
    pub fn committed(&self) -> Option<&T> {
        self.committed.and_then(|idx| self.items.get(idx))
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Pending index, -1 meaning "none".
    pub fn pending_index(&self) -> Option<isize> {
        self.pending
    }

    /// Index to show to the user: pending if any, else committed.
    pub fn display_index(&self) -> Option<usize> {
        match self.pending {
            Some(pending) if pending >= 0 => Some(pending as usize),
            Some(_) => None,
            None => self.committed,
        }
    }

    pub fn display_item(&self) -> Option<&T> {
        self.display_index().and_then(|idx| self.items.get(idx))
    }

    /// Move the pending selection with clamping at both ends.
    pub fn nudge(&mut self, delta: isize, now: Instant) {
        self.nudge_with(delta, BoundaryPolicy::Clamp, now);
    }

    pub fn nudge_with(&mut self, delta: isize, policy: BoundaryPolicy, now: Instant) {
        let start = self
            .pending
            .unwrap_or_else(|| self.committed.map(|idx| idx as isize).unwrap_or(-1));
        let last = self.items.len() as isize - 1;
        let target = start + delta;

        let next = match policy {
            BoundaryPolicy::Clamp => target.clamp(-1, last.max(-1)),
            BoundaryPolicy::Wrap => {
                if target > last {
                    -1
                } else if target < -1 {
                    last
                } else {
                    target
                }
            }
        };

        self.pending = Some(next);
        self.last_change = Some(now);
    }

    /// Commit the pending selection once the settle window has elapsed.
    ///
    /// `apply` receives the item to activate (`None` to deactivate). It runs at
    /// most once per settle period no matter how many nudges happened.
    pub fn tick<E, F>(&mut self, now: Instant, apply: F) -> Option<Commit>
    where
        E: Display,
        F: FnOnce(Option<&T>) -> Result<(), E>,
    {
        let pending = self.pending?;
        let last_change = self.last_change?;
        if now.saturating_duration_since(last_change) <= self.settle_window {
            return None;
        }

        self.pending = None;
        let index = usize::try_from(pending)
            .ok()
            .filter(|idx| *idx < self.items.len());

        match apply(index.and_then(|idx| self.items.get(idx))) {
            Ok(()) => {
                self.committed = index;
                Some(Commit::Applied(index))
            }
            Err(e) => {
                log::warn!("Deferred selection could not be applied: {}", e);
                self.committed = None;
                Some(Commit::Failed)
            }
        }
    }

    /// Set the committed index directly, e.g. from saved settings.
    pub fn force_commit(&mut self, index: Option<usize>) {
        self.committed = index.filter(|idx| *idx < self.items.len());
        self.pending = None;
    }

    /// Drop any pending change without applying it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl<T: PartialEq> DeferredSelector<T> {
    pub fn position_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }
}
