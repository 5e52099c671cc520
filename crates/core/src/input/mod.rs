pub mod deferred;
pub mod press;

pub use deferred::{BoundaryPolicy, Commit, DeferredSelector, SETTLE_WINDOW};
pub use press::{PressDurationClassifier, PressKind};
