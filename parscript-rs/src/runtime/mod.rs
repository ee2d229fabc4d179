//! Native runtime backends.
//!
//! A [`Runtime`] is the raw interpreter: it evaluates R source in the
//! global environment and reads and writes global variables.  It knows
//! nothing about bindings, tags or results; that is the engine's job.
//!
//! The production backend is `embedded::EmbeddedR`, the real R shared
//! library behind the `r` cargo feature.  Tests plug in the simulated
//! interpreter from the `parscript-testutil` crate through
//! [`Interpreter::standalone`](crate::Interpreter::standalone) or
//! [`Interpreter::create_with`](crate::Interpreter::create_with).

#[cfg(feature = "r")]
pub mod embedded;

use std::sync::Arc;

use crate::error::RuntimeError;
use crate::rexp::Rexp;
use crate::router::Console;

/// The operations the engine needs from an R interpreter.
///
/// All calls happen on one thread at a time; the interpreter handle
/// serialises access.
pub trait Runtime: Send {
    /// Install the console that receives all output of later evaluations.
    fn register_console(&mut self, console: Arc<dyn Console>);

    /// Parse `code` and evaluate every expression in the global
    /// environment, returning the value of the last one.
    ///
    /// A parse error runs nothing.  An evaluation error stops at the failing
    /// expression after R has printed it and run its `options(error=)`
    /// handler.
    fn parse_and_eval(&mut self, code: &str) -> Result<Rexp, RuntimeError>;

    /// Bind `name` in the global environment.
    fn assign(&mut self, name: &str, value: &Rexp) -> Result<(), RuntimeError>;

    /// Read a global variable; `None` when it is not bound.
    fn get(&mut self, name: &str) -> Result<Option<Rexp>, RuntimeError>;

    /// Remove a global variable; unbound names are ignored.
    fn remove(&mut self, name: &str) -> Result<(), RuntimeError>;
}
