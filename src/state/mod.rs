// Session state module.
// The repository session state machine behind the single screen.

pub mod session;

pub use session::{FetchOutcome, MutationOutcome, RepoSession, SessionPhase};
