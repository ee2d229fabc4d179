//! Run R scripts for host task executions.
//!
//! A [`ScriptEngine`] injects a task's [`Bindings`] into the R global
//! environment, evaluates the script and reads `result`, `selected` and
//! `variables` back.  R's error stream doubles as a side channel: a
//! `stop()` and `set_progress()` reach the host as tagged console text that
//! the [`router`] picks out before forwarding the rest.
//!
//! ```no_run
//! use parscript::{Bindings, EngineConfig, ScriptContext, ScriptEngine};
//!
//! let engine = ScriptEngine::create(EngineConfig::from_env())?;
//! let mut context = ScriptContext::new(Bindings::new().with_arguments(["a", "b"]));
//! let value = engine.eval("result = length(args)", Some(&mut context))?;
//! println!("{value}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bindings;
pub mod codec;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod factory;
pub mod interpreter;
pub mod rexp;
pub mod router;
pub mod runtime;
pub mod value;

pub use bindings::{Binding, Bindings, DataSpace, ProgressSink, TaskResult, UriSpace, VariablesMap};
pub use config::EngineConfig;
pub use context::{HostWriter, ScriptContext};
pub use engine::ScriptEngine;
pub use error::{ConversionError, InitError, RuntimeError, ScriptError};
pub use factory::EngineFactory;
pub use interpreter::Interpreter;
pub use rexp::Rexp;
pub use value::Value;
