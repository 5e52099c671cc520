pub mod mode_manager;
pub mod mode_stack;
pub mod traits;
pub mod xor_group;

pub use mode_manager::{ModeManager, Propagation};
pub use mode_stack::ModeStack;
pub use traits::{Mode, ModeId, XorGroup};
pub use xor_group::{XorGroupController, XorTransition};
