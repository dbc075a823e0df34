//! Core runtime of the bridge
//!
//! This module holds the stateful part of the daemon:
//! - Per-channel error deduplication
//! - Routing of measurements and error transitions to the publish sink
//! - The polling supervisor driving device sessions
pub mod error_state;
pub mod reporter;
pub mod supervisor;

pub use error_state::{ErrorStateTracker, NotificationEvent};
pub use reporter::{Reporter, READ_ERROR};
pub use supervisor::{PollOutcome, SessionEnd, Supervisor, SupervisorConfig, SupervisorState};
