//! Process-wide interpreter handle.
//!
//! R supports a single session per process, so the handle is a lazily
//! created singleton that is never torn down.  Each execution locks it
//! through [`Interpreter::session`] for its whole duration.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::config::EngineConfig;
use crate::error::{InitError, RuntimeError};
use crate::rexp::Rexp;
use crate::router::OutputRouter;
use crate::runtime::Runtime;

static SHARED: Mutex<Option<Arc<Interpreter>>> = Mutex::new(None);

/// A live interpreter with its console router.
pub struct Interpreter {
    runtime: Mutex<Box<dyn Runtime>>,
    router: Arc<OutputRouter>,
}

impl Interpreter {
    /// The shared interpreter, starting the default backend on first use.
    ///
    /// Later calls return the existing instance and ignore `config`.
    pub fn create(config: &EngineConfig) -> Result<Arc<Self>, InitError> {
        Self::create_with(config, default_runtime)
    }

    /// Like [`create`](Self::create) with a caller-supplied backend.  The
    /// factory only runs if no shared interpreter exists yet.
    pub fn create_with<F>(config: &EngineConfig, start: F) -> Result<Arc<Self>, InitError>
    where
        F: FnOnce(&EngineConfig) -> Result<Box<dyn Runtime>, InitError>,
    {
        let mut shared = SHARED.lock();
        if let Some(existing) = shared.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let runtime = start(config)?;
        let interpreter = Arc::new(Self::standalone(runtime, config));
        *shared = Some(Arc::clone(&interpreter));
        tracing::info!("interpreter started (forked: {})", config.forked);
        Ok(interpreter)
    }

    /// The shared interpreter, if one was created.
    pub fn shared() -> Option<Arc<Self>> {
        SHARED.lock().clone()
    }

    /// A private handle that is not registered as the process-wide one.
    pub fn standalone(mut runtime: Box<dyn Runtime>, config: &EngineConfig) -> Self {
        let router = Arc::new(OutputRouter::new(!config.forked));
        runtime.register_console(router.clone());
        Interpreter {
            runtime: Mutex::new(runtime),
            router,
        }
    }

    pub fn router(&self) -> &OutputRouter {
        &self.router
    }

    /// Lock the interpreter for one execution.
    pub fn session(&self) -> Session<'_> {
        Session {
            runtime: self.runtime.lock(),
        }
    }
}

fn default_runtime(config: &EngineConfig) -> Result<Box<dyn Runtime>, InitError> {
    #[cfg(feature = "r")]
    {
        Ok(Box::new(crate::runtime::embedded::EmbeddedR::start(config)?))
    }
    #[cfg(not(feature = "r"))]
    {
        let _ = config;
        Err(InitError::NotAvailable(
            "built without the `r` feature".into(),
        ))
    }
}

/// Exclusive access to the interpreter; released on drop.
pub struct Session<'a> {
    runtime: MutexGuard<'a, Box<dyn Runtime>>,
}

impl Session<'_> {
    pub fn parse_and_eval(&mut self, code: &str) -> Result<Rexp, RuntimeError> {
        tracing::trace!("eval: {code}");
        self.runtime.parse_and_eval(code)
    }

    pub fn assign(&mut self, name: &str, value: &Rexp) -> Result<(), RuntimeError> {
        self.runtime.assign(name, value)
    }

    pub fn get(&mut self, name: &str) -> Result<Option<Rexp>, RuntimeError> {
        self.runtime.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.runtime.remove(name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::context::HostWriter;
    use crate::router::{Channel, Console};

    /// Globals in a map; each line of code prefixed `out:` or `err:` is
    /// written to that console channel.
    #[derive(Default)]
    struct Scripted {
        globals: BTreeMap<String, Rexp>,
        console: Option<Arc<dyn Console>>,
    }

    impl Runtime for Scripted {
        fn register_console(&mut self, console: Arc<dyn Console>) {
            self.console = Some(console);
        }

        fn parse_and_eval(&mut self, code: &str) -> Result<Rexp, RuntimeError> {
            for line in code.lines() {
                let (channel, text) = match line.split_once(':') {
                    Some(("out", text)) => (Channel::Output, text),
                    Some(("err", text)) => (Channel::Error, text),
                    _ => return Err(RuntimeError::Parse(line.to_owned())),
                };
                if let Some(console) = &self.console {
                    console.write_console(text, channel);
                }
            }
            Ok(Rexp::Null)
        }

        fn assign(&mut self, name: &str, value: &Rexp) -> Result<(), RuntimeError> {
            self.globals.insert(name.to_owned(), value.clone());
            Ok(())
        }

        fn get(&mut self, name: &str) -> Result<Option<Rexp>, RuntimeError> {
            Ok(self.globals.get(name).cloned())
        }

        fn remove(&mut self, name: &str) -> Result<(), RuntimeError> {
            self.globals.remove(name);
            Ok(())
        }
    }

    fn scripted() -> Interpreter {
        let config = EngineConfig::default().with_forked(true);
        Interpreter::standalone(Box::new(Scripted::default()), &config)
    }

    #[test]
    fn session_round_trips_variables() {
        let interp = scripted();
        let mut s = interp.session();
        s.assign("x", &Rexp::integer(5)).unwrap();
        assert_eq!(s.get("x").unwrap(), Some(Rexp::integer(5)));
        s.remove("x").unwrap();
        assert_eq!(s.get("x").unwrap(), None);
    }

    #[test]
    fn console_output_reaches_router() {
        let interp = scripted();
        let (out, out_buf) = HostWriter::capture();
        let (err, err_buf) = HostWriter::capture();
        interp.router().begin_run(out, err, None);
        interp
            .session()
            .parse_and_eval("out:hello\nerr:note")
            .unwrap();
        interp.router().end_run();
        assert_eq!(out_buf.contents(), "hello");
        assert_eq!(err_buf.contents(), "note");
    }

    #[test]
    fn errors_pass_through_the_session() {
        let interp = scripted();
        let err = interp.session().parse_and_eval("bogus").unwrap_err();
        assert!(matches!(err, RuntimeError::Parse(ref line) if line == "bogus"));
    }

    #[test]
    fn get_of_unbound_name_is_none() {
        let interp = scripted();
        assert_eq!(interp.session().get("never").unwrap(), None);
    }
}
