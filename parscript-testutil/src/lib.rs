//! Test support for `parscript`.
//!
//! [`SimRuntime`] implements [`parscript::runtime::Runtime`] with an
//! in-process interpreter for the subset of R that task scripts and the
//! engine's own setup statements use.  It reproduces R's console behaviour,
//! so engine tests run on hosts without an R installation.

pub mod sim;

pub use sim::SimRuntime;
