//! Recording session management

pub mod artifact;
pub mod recorder;
pub mod state;

pub use artifact::RecordedArtifact;
pub use recorder::{Recorder, SessionEvent};
pub use state::{SessionState, SessionTimeline, StateSnapshot};
