mod plan;
mod shuffle;
mod view;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{SessionComposer, SessionPlan};
pub use shuffle::ShuffleMode;
pub use view::{PresentedQuestion, SessionView};
