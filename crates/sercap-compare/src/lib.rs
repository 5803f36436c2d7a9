//! Interactive whole-file equality checking.

pub mod compare;
pub mod session;

pub use compare::{compare_files, Verdict};
pub use session::{run_session, SessionError, SessionOutcome, EXIT_SENTINEL};
