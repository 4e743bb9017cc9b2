//! bot-dispatch - Order matching and dispatch for conversational bots.
//!
//! Orders are declared as headers plus rows of argument patterns. The
//! engine compiles them into matchers and resolves free-text input to the
//! order it invokes, or explains why the arguments were rejected.

pub mod config;
pub mod error;
pub mod logging;
pub mod order;
pub mod registry;

pub use error::{DispatchError, Result};
pub use order::{compile, CommandSpec, CompileOptions, CompiledHeaderSet, MatchOutcome};
pub use registry::{Dispatch, OrderRegistry};
