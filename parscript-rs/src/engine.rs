//! The execution bridge: one script run against the shared interpreter.
//!
//! A run goes through these phases, all under one interpreter session:
//!
//! 1. **bind**: reset per-run state, install the console helpers, inject
//!    the bindings into R's global environment;
//! 2. **evaluate**: run the script; an evaluation error is recorded, not
//!    raised;
//! 3. **reconcile**: read `result`, `selected` and `variables` back into
//!    the bindings, even when the script stopped;
//! 4. **decide**: a stop message fails the run, then an evaluation error
//!    with no explicit `result`, otherwise the result is returned;
//! 5. **cleanup**: move R back to the safe directory and detach the host
//!    writers.
//!
//! Failures while binding, reconciling or cleaning up are written to the
//! host error writer and never change the outcome.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bindings::{
    Binding, Bindings, DataSpace, GLOBALSPACE_BINDING, INPUTSPACE_BINDING, LOCALSPACE_BINDING,
    OUTPUTSPACE_BINDING, RESULT_BINDING, SELECTED_BINDING, USERSPACE_BINDING,
};
use crate::codec;
use crate::config::EngineConfig;
use crate::context::{HostWriter, ScriptContext};
use crate::error::{self, InitError, RuntimeError, ScriptError};
use crate::factory::EngineFactory;
use crate::interpreter::{Interpreter, Session};
use crate::rexp::Rexp;
use crate::router::{PROGRESS_TAG, STOP_TAG};
use crate::value::Value;

// ── R-side names ──────────────────────────────────────────────────────────────

const ARGS_VAR: &str = "args";
const RESULTS_VAR: &str = "results";
const VARIABLES_VAR: &str = "variables";
const SET_PROGRESS_FN: &str = "set_progress";
const RESULT_VAR: &str = "result";
const SELECTED_VAR: &str = "selected";

/// Binding key → R variable for each data space.
const SPACES: [(&str, &str); 5] = [
    (LOCALSPACE_BINDING, "localspace"),
    (USERSPACE_BINDING, "userspace"),
    (GLOBALSPACE_BINDING, "globalspace"),
    (INPUTSPACE_BINDING, "inputspace"),
    (OUTPUTSPACE_BINDING, "outputspace"),
];

/// Globals removed before each run so nothing leaks from the previous one.
const PER_RUN_VARS: [&str; 11] = [
    RESULT_VAR,
    SELECTED_VAR,
    ARGS_VAR,
    RESULTS_VAR,
    VARIABLES_VAR,
    SET_PROGRESS_FN,
    "localspace",
    "userspace",
    "globalspace",
    "inputspace",
    "outputspace",
];

/// `options(error=)` handler printing the stop tag and R's error message.
fn stop_handler() -> String {
    format!(
        "options(error = function() cat(sprintf('{STOP_TAG}%s', geterrmessage()), sep = '', file = stderr()))"
    )
}

fn set_progress_def() -> String {
    format!(
        "{SET_PROGRESS_FN} = function(x) {{ message('{PROGRESS_TAG}=', as.integer(x), appendLF = FALSE) }}"
    )
}

/// Quote `s` as an R string literal.
fn r_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

// ── Space paths ───────────────────────────────────────────────────────────────

fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Local path named by a `file:` URI or a plain path; `None` for other
/// schemes and malformed URIs.
fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let rest = match uri.strip_prefix("file:") {
        Some(rest) => {
            let rest = rest.strip_prefix("//").unwrap_or(rest);
            rest.strip_prefix("localhost").unwrap_or(rest)
        }
        None if uri.contains("://") => return None,
        None => return Some(PathBuf::from(uri)),
    };
    let decoded = percent_decode(rest)?;
    // file:///C:/dir
    let b = decoded.as_bytes();
    if b.len() >= 3 && b[0] == b'/' && b[1].is_ascii_alphabetic() && b[2] == b':' {
        return Some(PathBuf::from(&decoded[1..]));
    }
    Some(PathBuf::from(decoded))
}

/// Path as R should see it: forward slashes, no verbatim prefix.
fn r_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    let s = s.strip_prefix(r"\\?\").unwrap_or(&s);
    s.replace('\\', "/")
}

/// Canonical forward-slash path of a space, or its raw URI when it does not
/// resolve to an existing local path.
fn resolve_space(space: &dyn DataSpace) -> String {
    let uri = space.real_uri();
    match uri_to_path(&uri).and_then(|p| p.canonicalize().ok()) {
        Some(path) => r_path(&path),
        None => {
            tracing::debug!("space {uri} does not resolve to a local path, using it as is");
            uri
        }
    }
}

fn is_writable_dir(path: &str) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false)
}

// ── ScriptEngine ──────────────────────────────────────────────────────────────

/// Runs R scripts for task executions.
pub struct ScriptEngine {
    interpreter: Arc<Interpreter>,
    config: EngineConfig,
}

impl ScriptEngine {
    /// An engine backed by the process-wide interpreter, started if needed.
    pub fn create(config: EngineConfig) -> Result<Self, InitError> {
        let interpreter = Interpreter::create(&config)?;
        Ok(ScriptEngine {
            interpreter,
            config,
        })
    }

    pub fn with_interpreter(interpreter: Arc<Interpreter>, config: EngineConfig) -> Self {
        ScriptEngine {
            interpreter,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn interpreter(&self) -> &Arc<Interpreter> {
        &self.interpreter
    }

    pub fn factory(&self) -> EngineFactory {
        EngineFactory
    }

    pub fn create_bindings(&self) -> Bindings {
        Bindings::new()
    }

    /// Read the whole script from `reader`, then [`eval`](Self::eval) it.
    pub fn eval_reader(
        &self,
        mut reader: impl Read,
        context: Option<&mut ScriptContext>,
    ) -> Result<Value, ScriptError> {
        let mut script = String::new();
        reader.read_to_string(&mut script)?;
        self.eval(&script, context)
    }

    /// Run `script` with the bindings and writers of `context`.
    ///
    /// On return the bindings hold `result` (and `selected` when the script
    /// set it), and the variables map has been merged with the script's
    /// `variables`, whatever the outcome.
    pub fn eval(
        &self,
        script: &str,
        context: Option<&mut ScriptContext>,
    ) -> Result<Value, ScriptError> {
        let context = context.ok_or(ScriptError::MissingContext)?;
        let writer = context.writer.clone();
        let error_writer = context.error_writer.clone();
        let bindings = context
            .bindings
            .as_mut()
            .ok_or(ScriptError::MissingBindings)?;

        let router = self.interpreter.router();
        let mut run = Run {
            session: self.interpreter.session(),
            error_writer: &error_writer,
        };
        router.begin_run(writer, error_writer.clone(), bindings.progress().cloned());
        tracing::debug!("script run started");

        run.bind(bindings, &self.config);
        let evaluated = run.evaluate(script);
        let stop = router.stop_message();
        let explicit_result = run.reconcile(bindings, evaluated.as_ref().ok());

        let outcome = match (stop, evaluated) {
            (Some(message), _) => {
                tracing::debug!("script stopped: {}", message.trim_end());
                Err(ScriptError::Stopped(message))
            }
            (None, Err(e)) if !explicit_result => Err(ScriptError::Evaluation(match e {
                RuntimeError::Evaluation(message) => message,
                other => other.to_string(),
            })),
            (None, _) => Ok(bindings
                .value(RESULT_BINDING)
                .cloned()
                .unwrap_or(Value::Bool(true))),
        };

        run.cleanup(&self.config);
        router.end_run();
        tracing::debug!("script run finished (ok: {})", outcome.is_ok());
        outcome
    }
}

// ── Run ───────────────────────────────────────────────────────────────────────

/// One execution holding the interpreter session.
struct Run<'a> {
    session: Session<'a>,
    error_writer: &'a HostWriter,
}

impl Run<'_> {
    /// Write an absorbed failure to the host error writer.
    fn report(&self, what: &str, err: &dyn std::error::Error) {
        let text = format!("{what}: {}\n", error::report(err));
        tracing::warn!("{}", text.trim_end());
        if let Err(e) = self.error_writer.write_str(&text) {
            tracing::warn!("host error writer failed: {e}");
        }
    }

    fn exec(&mut self, what: &str, code: &str) {
        if let Err(e) = self.session.parse_and_eval(code) {
            self.report(what, &e);
        }
    }

    fn assign(&mut self, name: &str, value: &Rexp) {
        if let Err(e) = self.session.assign(name, value) {
            self.report(&format!("unable to set '{name}'"), &e);
        }
    }

    fn assign_value(&mut self, name: &str, value: &Value) {
        match codec::to_foreign(value) {
            Ok(rexp) => self.assign(name, &rexp),
            Err(e) => self.report(&format!("unable to convert '{name}'"), &e),
        }
    }

    fn bind(&mut self, bindings: &Bindings, config: &EngineConfig) {
        for name in PER_RUN_VARS {
            if let Err(e) = self.session.remove(name) {
                self.report(&format!("unable to clear '{name}'"), &e);
            }
        }
        self.exec(
            "unable to set the warning level",
            &format!("options(warn = {})", config.warn_level),
        );
        self.exec("unable to install the stop handler", &stop_handler());

        if let Some(args) = bindings.arguments() {
            self.assign(ARGS_VAR, &Rexp::character(args.iter().map(String::as_str)));
        }

        if let Some(results) = bindings.results() {
            let entries: Vec<(&str, Rexp)> = results
                .iter()
                .map(|r| {
                    let value = match r.value() {
                        Ok(v) => codec::to_foreign(v).unwrap_or_else(|e| {
                            self.report(
                                &format!("unable to convert the result of '{}'", r.task_name()),
                                &e,
                            );
                            Rexp::Null
                        }),
                        Err(reason) => {
                            tracing::debug!("result of '{}' unavailable: {reason}", r.task_name());
                            Rexp::Null
                        }
                    };
                    (r.task_name(), value)
                })
                .collect();
            self.assign(RESULTS_VAR, &Rexp::named_list(entries));
        }

        if bindings.progress().is_some() {
            self.exec("unable to define set_progress", &set_progress_def());
        }

        for (key, var) in SPACES {
            let Some(space) = bindings.space(key) else {
                continue;
            };
            let path = resolve_space(space.as_ref());
            self.assign(var, &Rexp::string(path.as_str()));
            if key == LOCALSPACE_BINDING && is_writable_dir(&path) {
                self.exec(
                    "unable to move to the local space",
                    &format!("setwd({})", r_string(&path)),
                );
            }
        }

        if let Some(variables) = bindings.variables() {
            self.assign_value(VARIABLES_VAR, &Value::Map(variables.snapshot()));
        }
    }

    fn evaluate(&mut self, script: &str) -> Result<Rexp, RuntimeError> {
        let evaluated = self.session.parse_and_eval(script);
        match &evaluated {
            // R already printed the error on its console.
            Err(RuntimeError::Evaluation(message)) => {
                tracing::debug!("evaluation failed: {message}");
            }
            Err(e) => self.report("unable to evaluate the script", e),
            Ok(_) => {}
        }
        evaluated
    }

    /// Store `result` / `selected` in the bindings and merge `variables`.
    /// Returns whether the script set an explicit `result`.
    fn reconcile(&mut self, bindings: &mut Bindings, evaluated: Option<&Rexp>) -> bool {
        let explicit = match self.session.get(RESULT_VAR) {
            Ok(Some(r)) => match codec::to_host(&r) {
                Ok(v) if !v.is_null() => Some(v),
                Ok(_) => None,
                Err(e) => {
                    self.report("unable to convert 'result'", &e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.report("unable to read 'result'", &e);
                None
            }
        };
        let has_explicit = explicit.is_some();

        let result = explicit
            .or_else(|| {
                evaluated.and_then(|r| match codec::to_host(r) {
                    Ok(v) if !v.is_null() => Some(v),
                    Ok(_) => None,
                    Err(e) => {
                        tracing::debug!("last value not convertible: {e}");
                        None
                    }
                })
            })
            .unwrap_or(Value::Bool(true));
        bindings.insert(RESULT_BINDING, Binding::Value(result));

        // An unreadable `selected` counts as unset.
        match self.session.get(SELECTED_VAR).map(|r| r.map(|r| codec::to_host(&r))) {
            Ok(Some(Ok(v))) if !v.is_null() => {
                bindings.insert(SELECTED_BINDING, Binding::Value(v));
            }
            Ok(Some(Err(e))) => tracing::debug!("ignoring 'selected': {e}"),
            Err(e) => tracing::debug!("ignoring 'selected': {e}"),
            _ => {}
        }

        if let Some(variables) = bindings.variables() {
            match self.session.get(VARIABLES_VAR) {
                Ok(Some(r)) => match codec::as_map(&r) {
                    Ok(map) => variables.merge(map),
                    Err(e) => self.report("unable to read back 'variables'", &e),
                },
                Ok(None) => tracing::debug!("'variables' was removed by the script"),
                Err(e) => self.report("unable to read back 'variables'", &e),
            }
        }
        has_explicit
    }

    fn cleanup(&mut self, config: &EngineConfig) {
        let safe = r_path(&config.safe_dir);
        self.exec(
            "unable to reset the working directory",
            &format!("setwd({})", r_string(&safe)),
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::UriSpace;

    #[test]
    fn r_string_escapes_quotes_and_backslashes() {
        assert_eq!(r_string("a'b"), r"'a\'b'");
        assert_eq!(r_string(r"C:\tmp"), r"'C:\\tmp'");
    }

    #[test]
    fn file_uris() {
        assert_eq!(uri_to_path("file:///tmp/a%20b"), Some(PathBuf::from("/tmp/a b")));
        assert_eq!(uri_to_path("file://localhost/srv"), Some(PathBuf::from("/srv")));
        assert_eq!(uri_to_path("file:///C:/work"), Some(PathBuf::from("C:/work")));
        assert_eq!(uri_to_path("/plain/path"), Some(PathBuf::from("/plain/path")));
        assert_eq!(uri_to_path("sftp://host/dir"), None);
        assert_eq!(uri_to_path("file:///bad%zz"), None);
    }

    #[test]
    fn resolve_existing_space() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_space(&UriSpace::from_path(dir.path()));
        assert_eq!(resolved, r_path(&dir.path().canonicalize().unwrap()));
        assert!(!resolved.contains('\\'));
    }

    #[test]
    fn unresolvable_space_keeps_raw_uri() {
        let space = UriSpace::new("sftp://example.org/data");
        assert_eq!(resolve_space(&space), "sftp://example.org/data");
        let missing = UriSpace::new("file:///no/such/dir/for/parscript");
        assert_eq!(resolve_space(&missing), "file:///no/such/dir/for/parscript");
    }

    #[test]
    fn helper_definitions_use_tags() {
        assert!(stop_handler().contains("'<PARError> %s'"));
        assert!(set_progress_def().contains("'<PARProgress>='"));
    }
}
