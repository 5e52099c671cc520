use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Outcome of a press/release pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    Tap,
    Hold,
}

/// Turns press/release pairs into [`PressKind`]s by dwell time.
///
/// Thresholds are per instance; modes pick their own.
#[derive(Debug, Clone)]
pub struct PressDurationClassifier<K> {
    threshold: Duration,
    pressed_at: HashMap<K, Instant>,
}

impl<K: Hash + Eq> PressDurationClassifier<K> {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            pressed_at: HashMap::new(),
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Record a press. A press without a matching release is overwritten.
    pub fn on_press(&mut self, control: K, now: Instant) {
        self.pressed_at.insert(control, now);
    }

    /// Classify and forget a press. Releases without a recorded press count as taps.
    pub fn on_release(&mut self, control: &K, now: Instant) -> PressKind {
        match self.pressed_at.remove(control) {
            Some(start) if now.saturating_duration_since(start) >= self.threshold => PressKind::Hold,
            _ => PressKind::Tap,
        }
    }

    pub fn is_pressed(&self, control: &K) -> bool {
        self.pressed_at.contains_key(control)
    }

    pub fn pressed_since(&self, control: &K) -> Option<Instant> {
        self.pressed_at.get(control).copied()
    }

    /// Any control currently held down, in no particular order.
    pub fn held(&self) -> impl Iterator<Item = &K> {
        self.pressed_at.keys()
    }

    pub fn clear(&mut self) {
        self.pressed_at.clear();
    }
}
