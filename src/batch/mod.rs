//! Sequential batch execution over terrain units
//!
//! [`BatchExecutor::run`] walks a provider's planned sequence one unit at a
//! time, isolating failures per unit. [`MassEditSession`] wraps a whole
//! operation in the confirm-then-run state machine.

pub mod outcome;
pub mod executor;
pub mod session;

pub use outcome::{RunOutcome, RunReport, UnitError, UnitFailure, UnitOutcome, UnitRecord};
pub use executor::{BatchExecutor, RunOptions};
pub use session::{MassEditSession, RunState};
