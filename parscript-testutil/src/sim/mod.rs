//! In-process interpreter for a practical subset of R.
//!
//! Covers what task scripts typically do: assignments, vectors and named
//! lists, `$`/`[`/`[[` access and replacement, closures, `if`/`for`,
//! string formatting, console output, warnings and errors.  The console
//! behaviour matches R run non-interactively:
//!
//! - an error prints `Error: msg` (or `Error in f() : msg`) on the error
//!   channel, then calls the `options(error=)` handler;
//! - `options(warn=1)` prints `Warning: msg` as soon as the warning occurs,
//!   `warn=0` defers it to the end of the top-level call, `warn>=2`
//!   turns it into an error;
//! - `message()` and `cat(file=stderr())` write to the error channel.
//!
//! The working directory is tracked per runtime; `setwd()` never changes
//! the directory of the host process.

mod builtins;
mod ops;
mod parse;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parscript::error::RuntimeError;
use parscript::rexp::Rexp;
use parscript::router::{Channel, Console};
use parscript::runtime::Runtime;

use parse::{Arg, BinOp, Expr, FunctionDef, UnaryOp};

/// Closure call depth at which evaluation gives up.
const MAX_FRAMES: usize = 48;

/// A value bound in an environment.
#[derive(Clone)]
enum Obj {
    Data(Rexp),
    Closure(Arc<FunctionDef>),
}

impl Obj {
    fn null() -> Self {
        Obj::Data(Rexp::Null)
    }

    fn into_rexp(self) -> Rexp {
        match self {
            Obj::Data(r) => r,
            Obj::Closure(_) => Rexp::Unsupported("closure".into()),
        }
    }
}

/// An R error condition.
struct Condition {
    message: String,
    /// Name of the function the error was raised in; `None` at top level.
    call: Option<String>,
}

/// Non-local exits out of the evaluator.
enum Unwind {
    Error(Condition),
    Return(Obj),
}

type Eval<T> = Result<T, Unwind>;

struct Frame {
    name: String,
    vars: HashMap<String, Obj>,
}

/// Simulated R interpreter.
pub struct SimRuntime {
    globals: BTreeMap<String, Obj>,
    frames: Vec<Frame>,
    options: BTreeMap<String, Obj>,
    console: Option<Arc<dyn Console>>,
    wd: PathBuf,
    last_error: String,
    pending_warnings: Vec<String>,
    in_error_handler: bool,
}

impl Default for SimRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRuntime {
    pub fn new() -> Self {
        let mut options = BTreeMap::new();
        options.insert("warn".to_owned(), Obj::Data(Rexp::double(0.0)));
        SimRuntime {
            globals: BTreeMap::new(),
            frames: Vec::new(),
            options,
            console: None,
            wd: std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir()),
            last_error: String::new(),
            pending_warnings: Vec::new(),
            in_error_handler: false,
        }
    }

    /// Current value of `getwd()`.
    pub fn working_dir(&self) -> &Path {
        &self.wd
    }

    // ── Console ───────────────────────────────────────────────────────────────

    fn write(&self, text: &str, channel: Channel) {
        if let Some(console) = &self.console {
            console.write_console(text, channel);
        }
    }

    fn fail(&self, message: impl Into<String>) -> Unwind {
        Unwind::Error(Condition {
            message: message.into(),
            call: self.frames.last().map(|f| f.name.clone()),
        })
    }

    fn op<T>(&self, result: ops::OpResult<T>) -> Eval<T> {
        result.map_err(|m| self.fail(m))
    }

    fn warn_level(&self) -> i32 {
        match self.options.get("warn") {
            Some(Obj::Data(r)) => ops::as_integer(r)
                .ok()
                .and_then(|v| v.first().copied().flatten())
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Raise a warning according to `options(warn=)`.
    fn warning(&mut self, message: &str) -> Eval<()> {
        let call = self.frames.last().map(|f| f.name.clone());
        match self.warn_level() {
            l if l < 0 => Ok(()),
            0 => {
                self.pending_warnings.push(match call {
                    Some(f) => format!("In {f}() : {message}"),
                    None => message.to_owned(),
                });
                Ok(())
            }
            1 => {
                let text = match call {
                    Some(f) => format!("Warning in {f}() : {message}\n"),
                    None => format!("Warning: {message}\n"),
                };
                self.write(&text, Channel::Error);
                Ok(())
            }
            _ => Err(self.fail(format!("(converted from warning) {message}"))),
        }
    }

    fn flush_warnings(&mut self) {
        let pending = std::mem::take(&mut self.pending_warnings);
        match pending.as_slice() {
            [] => {}
            [one] => self.write(&format!("Warning message:\n{one} \n"), Channel::Error),
            many => {
                let mut text = String::from("Warning messages:\n");
                for (i, w) in many.iter().enumerate() {
                    text.push_str(&format!("{}: {w}\n", i + 1));
                }
                self.write(&text, Channel::Error);
            }
        }
    }

    /// Print an uncaught error and run the `options(error=)` handler.
    /// Returns the printed text without its trailing newline.
    fn report_error(&mut self, cond: Condition) -> String {
        self.frames.clear();
        let text = match &cond.call {
            Some(f) => format!("Error in {f}() : {}\n", cond.message),
            None => format!("Error: {}\n", cond.message),
        };
        self.write(&text, Channel::Error);
        self.last_error = text.clone();

        if !self.in_error_handler {
            if let Some(Obj::Closure(handler)) = self.options.get("error").cloned() {
                self.in_error_handler = true;
                if let Err(Unwind::Error(inner)) = self.call_closure("", &handler, Vec::new()) {
                    self.write(
                        &format!("Error during wrapup: {}\n", inner.message),
                        Channel::Error,
                    );
                }
                self.frames.clear();
                self.in_error_handler = false;
            }
        }
        text.trim_end().to_owned()
    }

    // ── Environments ──────────────────────────────────────────────────────────

    fn lookup(&self, name: &str) -> Option<&Obj> {
        self.frames
            .last()
            .and_then(|f| f.vars.get(name))
            .or_else(|| self.globals.get(name))
    }

    fn set_var(&mut self, name: &str, value: Obj, global: bool) {
        if !global {
            if let Some(frame) = self.frames.last_mut() {
                frame.vars.insert(name.to_owned(), value);
                return;
            }
        }
        self.globals.insert(name.to_owned(), value);
    }

    fn remove_var(&mut self, name: &str) -> bool {
        match self.frames.last_mut() {
            Some(frame) => frame.vars.remove(name).is_some(),
            None => self.globals.remove(name).is_some(),
        }
    }

    // ── Evaluation ────────────────────────────────────────────────────────────

    fn data(&self, obj: Obj) -> Eval<Rexp> {
        match obj {
            Obj::Data(r) => Ok(r),
            Obj::Closure(_) => Err(self.fail("object of type 'closure' is not subsettable")),
        }
    }

    fn eval_data(&mut self, expr: &Expr) -> Eval<Rexp> {
        let obj = self.eval(expr)?;
        self.data(obj)
    }

    fn eval(&mut self, expr: &Expr) -> Eval<Obj> {
        match expr {
            Expr::Const(r) => Ok(Obj::Data(r.clone())),
            Expr::Ident(name) => self
                .lookup(name)
                .cloned()
                .ok_or_else(|| self.fail(format!("object '{name}' not found"))),
            Expr::Call(func, args) => self.eval_call(func, args),
            Expr::Index(target, idx) => {
                let (x, i) = (self.eval_data(target)?, self.eval_data(idx)?);
                self.op(ops::subset(&x, &i)).map(Obj::Data)
            }
            Expr::Element(target, idx) => {
                let (x, i) = (self.eval_data(target)?, self.eval_data(idx)?);
                self.op(ops::element(&x, &i)).map(Obj::Data)
            }
            Expr::Dollar(target, name) => {
                let x = self.eval_data(target)?;
                self.op(ops::dollar(&x, name)).map(Obj::Data)
            }
            Expr::Unary(op, inner) => {
                let x = self.eval_data(inner)?;
                let r = match op {
                    UnaryOp::Neg => ops::negate(&x),
                    UnaryOp::Not => ops::not(&x),
                };
                self.op(r).map(Obj::Data)
            }
            Expr::Binary(op @ (BinOp::AndAnd | BinOp::OrOr), a, b) => {
                let lhs = self.eval_data(a)?;
                let l = self.op(ops::condition(&lhs))?;
                if (*op == BinOp::AndAnd) != l {
                    return Ok(Obj::Data(Rexp::logical(l)));
                }
                let rhs = self.eval_data(b)?;
                let r = self.op(ops::condition(&rhs))?;
                Ok(Obj::Data(Rexp::logical(r)))
            }
            Expr::Binary(op, a, b) => {
                let (x, y) = (self.eval_data(a)?, self.eval_data(b)?);
                self.op(ops::binary(*op, &x, &y)).map(Obj::Data)
            }
            Expr::Assign {
                target,
                value,
                global,
            } => {
                let v = self.eval(value)?;
                self.assign_to(target, v.clone(), *global)?;
                Ok(v)
            }
            Expr::Function(def) => Ok(Obj::Closure(def.clone())),
            Expr::Block(stmts) => {
                let mut last = Obj::null();
                for stmt in stmts {
                    last = self.eval(stmt)?;
                }
                Ok(last)
            }
            Expr::If(cond, then, otherwise) => {
                let c = self.eval_data(cond)?;
                if self.op(ops::condition(&c))? {
                    self.eval(then)
                } else if let Some(e) = otherwise {
                    self.eval(e)
                } else {
                    Ok(Obj::null())
                }
            }
            Expr::For(var, seq, body) => {
                let seq = self.eval_data(seq)?;
                for item in ops::split(&seq) {
                    self.set_var(var, Obj::Data(item), false);
                    self.eval(body)?;
                }
                Ok(Obj::null())
            }
        }
    }

    /// Replacement assignment: `x <- v`, `x$a <- v`, `x[[i]] <- v`,
    /// `x[i] <- v`, recursively for nested targets.
    fn assign_to(&mut self, target: &Expr, value: Obj, global: bool) -> Eval<()> {
        match target {
            Expr::Ident(name) => {
                self.set_var(name, value, global);
                Ok(())
            }
            Expr::Dollar(inner, name) => {
                let current = self.eval_data(inner)?;
                let v = self.data(value)?;
                let updated = self.op(ops::set_named(current, name, v))?;
                self.assign_to(inner, Obj::Data(updated), global)
            }
            Expr::Element(inner, idx) => {
                let i = self.eval_data(idx)?;
                let current = self.eval_data(inner)?;
                let v = self.data(value)?;
                let updated = self.op(ops::set_element(current, &i, v))?;
                self.assign_to(inner, Obj::Data(updated), global)
            }
            Expr::Index(inner, idx) => {
                let i = self.eval_data(idx)?;
                let current = self.eval_data(inner)?;
                let v = self.data(value)?;
                let updated = self.op(ops::set_subset(current, &i, v))?;
                self.assign_to(inner, Obj::Data(updated), global)
            }
            _ => Err(self.fail("invalid assignment target")),
        }
    }

    fn eval_args(&mut self, args: &[Arg]) -> Eval<Vec<(Option<String>, Obj)>> {
        args.iter()
            .map(|a| Ok((a.name.clone(), self.eval(&a.value)?)))
            .collect()
    }

    fn eval_call(&mut self, func: &Expr, args: &[Arg]) -> Eval<Obj> {
        let name = match func {
            Expr::Ident(name) => {
                // Non-function bindings do not shadow functions in call position.
                if let Some(Obj::Closure(def)) = self.lookup(name).cloned() {
                    let values = self.eval_args(args)?;
                    return self.call_closure(name, &def, values);
                }
                name
            }
            other => match self.eval(other)? {
                Obj::Closure(def) => {
                    let values = self.eval_args(args)?;
                    return self.call_closure("FUN", &def, values);
                }
                Obj::Data(_) => return Err(self.fail("attempt to apply non-function")),
            },
        };
        if name == "rm" {
            return self.builtin_rm(args);
        }
        let values = self.eval_args(args)?;
        self.call_builtin(name, values)
    }

    fn call_closure(
        &mut self,
        name: &str,
        def: &FunctionDef,
        args: Vec<(Option<String>, Obj)>,
    ) -> Eval<Obj> {
        let mut vars = HashMap::new();
        let mut positional = Vec::new();
        for (arg_name, value) in args {
            match arg_name {
                Some(n) if def.params.iter().any(|p| p.name == n) => {
                    vars.insert(n, value);
                }
                Some(n) => return Err(self.fail(format!("unused argument ({n} = ...)"))),
                None => positional.push(value),
            }
        }
        let mut positional = positional.into_iter();
        for p in &def.params {
            if !vars.contains_key(&p.name) {
                if let Some(v) = positional.next() {
                    vars.insert(p.name.clone(), v);
                }
            }
        }
        if positional.next().is_some() {
            return Err(self.fail("unused argument"));
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(self.fail("evaluation nested too deeply: infinite recursion"));
        }

        self.frames.push(Frame {
            name: name.to_owned(),
            vars,
        });
        let result = self.run_frame(def);
        self.frames.pop();
        match result {
            Err(Unwind::Return(v)) => Ok(v),
            other => other,
        }
    }

    fn run_frame(&mut self, def: &FunctionDef) -> Eval<Obj> {
        for p in &def.params {
            let bound = self
                .frames
                .last()
                .is_some_and(|f| f.vars.contains_key(&p.name));
            if let (false, Some(default)) = (bound, &p.default) {
                let v = self.eval(default)?;
                self.set_var(&p.name, v, false);
            }
        }
        self.eval(&def.body)
    }
}

impl Runtime for SimRuntime {
    fn register_console(&mut self, console: Arc<dyn Console>) {
        self.console = Some(console);
    }

    fn parse_and_eval(&mut self, code: &str) -> Result<Rexp, RuntimeError> {
        let exprs = parse::parse_program(code).map_err(RuntimeError::Parse)?;
        let mut last = Obj::null();
        for expr in &exprs {
            self.frames.clear();
            let outcome = match self.eval(expr) {
                Err(Unwind::Return(_)) => Err(Condition {
                    message: "no function to return from, jumping to top level".into(),
                    call: None,
                }),
                Err(Unwind::Error(cond)) => Err(cond),
                Ok(v) => Ok(v),
            };
            match outcome {
                Ok(v) => {
                    last = v;
                    self.flush_warnings();
                }
                Err(cond) => {
                    let message = self.report_error(cond);
                    self.flush_warnings();
                    return Err(RuntimeError::Evaluation(message));
                }
            }
        }
        Ok(last.into_rexp())
    }

    fn assign(&mut self, name: &str, value: &Rexp) -> Result<(), RuntimeError> {
        self.globals.insert(name.to_owned(), Obj::Data(value.clone()));
        Ok(())
    }

    fn get(&mut self, name: &str) -> Result<Option<Rexp>, RuntimeError> {
        Ok(self.globals.get(name).cloned().map(Obj::into_rexp))
    }

    fn remove(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.globals.remove(name);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Console recording every write with its channel.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<(Channel, String)>>);

    impl Recorder {
        fn text(&self, channel: Channel) -> String {
            self.0
                .lock()
                .iter()
                .filter(|(c, _)| *c == channel)
                .map(|(_, t)| t.as_str())
                .collect()
        }

        fn chunks(&self, channel: Channel) -> Vec<String> {
            self.0
                .lock()
                .iter()
                .filter(|(c, _)| *c == channel)
                .map(|(_, t)| t.clone())
                .collect()
        }
    }

    impl Console for Recorder {
        fn write_console(&self, text: &str, channel: Channel) {
            self.0.lock().push((channel, text.to_owned()));
        }
        fn flush_console(&self) {}
        fn show_message(&self, message: &str) {
            self.0.lock().push((Channel::Error, message.to_owned()));
        }
    }

    fn runtime() -> (SimRuntime, Arc<Recorder>) {
        let console = Arc::new(Recorder::default());
        let mut rt = SimRuntime::new();
        rt.register_console(console.clone());
        (rt, console)
    }

    fn eval(rt: &mut SimRuntime, code: &str) -> Rexp {
        rt.parse_and_eval(code).expect("evaluation failed")
    }

    #[test]
    fn assignment_and_lookup() {
        let (mut rt, _) = runtime();
        eval(&mut rt, "x <- 1:3\ny = x * 2L");
        assert_eq!(
            rt.get("y").unwrap(),
            Some(Rexp::Integer(vec![Some(2), Some(4), Some(6)]))
        );
        assert_eq!(rt.get("nope").unwrap(), None);
    }

    #[test]
    fn last_value_is_returned() {
        let (mut rt, _) = runtime();
        assert_eq!(eval(&mut rt, "a = 1; a + 1"), Rexp::double(2.0));
        assert_eq!(eval(&mut rt, ""), Rexp::Null);
    }

    #[test]
    fn host_assigned_values_are_visible() {
        let (mut rt, _) = runtime();
        rt.assign("args", &Rexp::character(["one", "two", "three"]))
            .unwrap();
        assert_eq!(eval(&mut rt, "result = args[3]"), Rexp::string("three"));
    }

    #[test]
    fn dollar_assignment_updates_list() {
        let (mut rt, _) = runtime();
        rt.assign("variables", &Rexp::named_list([("a", Rexp::integer(1))]))
            .unwrap();
        eval(&mut rt, "variables$toto = 'goodValue'\nvariables[['a']] <- NULL");
        assert_eq!(
            rt.get("variables").unwrap(),
            Some(Rexp::named_list([("toto", Rexp::string("goodValue"))]))
        );
    }

    #[test]
    fn closures_and_defaults() {
        let (mut rt, _) = runtime();
        let code = "add = function(x, y = 10) {\n  x + y\n}\nadd(1) + add(1, y = 2)";
        assert_eq!(eval(&mut rt, code), Rexp::double(14.0));
    }

    #[test]
    fn return_exits_function() {
        let (mut rt, _) = runtime();
        let code = "f = function(x) { if (x > 0) return('pos'); 'neg' }\nc(f(1), f(-1))";
        assert_eq!(eval(&mut rt, code), Rexp::character(["pos", "neg"]));
    }

    #[test]
    fn for_loop_accumulates() {
        let (mut rt, _) = runtime();
        assert_eq!(
            eval(&mut rt, "s = 0\nfor (i in 1:4) s = s + i\ns"),
            Rexp::double(10.0)
        );
    }

    #[test]
    fn stop_prints_error_and_runs_handler() {
        let (mut rt, console) = runtime();
        eval(
            &mut rt,
            "options(error = function() cat(sprintf('<PARError> %s', geterrmessage()), sep='', file=stderr()))",
        );
        let err = rt.parse_and_eval("x = 1\nstop('bad input')\nx = 2").unwrap_err();
        assert!(matches!(err, RuntimeError::Evaluation(ref m) if m == "Error: bad input"));
        assert_eq!(
            console.chunks(Channel::Error),
            ["Error: bad input\n", "<PARError> Error: bad input\n"]
        );
        // evaluation stopped at the failing expression
        assert_eq!(rt.get("x").unwrap(), Some(Rexp::double(1.0)));
    }

    #[test]
    fn runaway_recursion_is_an_error() {
        let (mut rt, _) = runtime();
        let err = rt.parse_and_eval("f = function(n) f(n + 1)\nf(0)").unwrap_err();
        assert!(matches!(err, RuntimeError::Evaluation(ref m) if m.contains("nested too deeply")));
    }

    #[test]
    fn stop_inside_function_names_the_call() {
        let (mut rt, console) = runtime();
        let _ = rt.parse_and_eval("check = function() stop('nope')\ncheck()");
        assert_eq!(console.text(Channel::Error), "Error in check() : nope\n");
    }

    #[test]
    fn runtime_errors_are_reported() {
        let (mut rt, console) = runtime();
        let err = rt.parse_and_eval("undefined_thing + 1").unwrap_err();
        assert!(matches!(err, RuntimeError::Evaluation(_)));
        assert_eq!(
            console.text(Channel::Error),
            "Error: object 'undefined_thing' not found\n"
        );
    }

    #[test]
    fn parse_error_runs_nothing() {
        let (mut rt, console) = runtime();
        let err = rt.parse_and_eval("x = 1\ny = (").unwrap_err();
        assert!(matches!(err, RuntimeError::Parse(_)));
        assert_eq!(rt.get("x").unwrap(), None);
        assert_eq!(console.text(Channel::Error), "");
    }

    #[test]
    fn warning_levels() {
        let (mut rt, console) = runtime();
        eval(&mut rt, "options(warn = 1)\nwarning('attention')");
        assert_eq!(console.text(Channel::Error), "Warning: attention\n");

        let (mut rt, console) = runtime();
        eval(&mut rt, "warning('later'); x = 1");
        assert_eq!(console.text(Channel::Error), "Warning message:\nlater \n");

        let (mut rt, _) = runtime();
        let err = rt
            .parse_and_eval("options(warn = 2)\nwarning('fatal')")
            .unwrap_err();
        assert!(
            matches!(err, RuntimeError::Evaluation(ref m) if m.contains("(converted from warning) fatal"))
        );
    }

    #[test]
    fn message_without_newline() {
        let (mut rt, console) = runtime();
        eval(
            &mut rt,
            "set_progress = function(x) { message('<PARProgress>=', as.integer(x), appendLF = FALSE) }\nset_progress(42.7)",
        );
        assert_eq!(console.chunks(Channel::Error), ["<PARProgress>=42"]);
    }

    #[test]
    fn print_and_cat_use_output_channel() {
        let (mut rt, console) = runtime();
        eval(&mut rt, "print(c('a', 'b'))\ncat('x', 1, TRUE, '\\n')");
        assert_eq!(console.text(Channel::Output), "[1] \"a\" \"b\"\nx 1 TRUE \n");
    }

    #[test]
    fn setwd_requires_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (mut rt, _) = runtime();
        let path = dir.path().to_string_lossy().replace('\\', "/");
        eval(&mut rt, &format!("setwd('{path}')"));
        assert_eq!(rt.working_dir(), dir.path());
        assert!(rt.parse_and_eval("setwd('/no/such/dir/anywhere')").is_err());
        assert_eq!(rt.working_dir(), dir.path());
    }

    #[test]
    fn rm_by_symbol_and_list() {
        let (mut rt, _) = runtime();
        eval(&mut rt, "a = 1; b = 2; c1 = 3\nrm(a)\nrm(list = c('b'))");
        assert_eq!(eval(&mut rt, "ls()"), Rexp::character(["c1"]));
    }

    #[test]
    fn closures_read_back_as_unsupported() {
        let (mut rt, _) = runtime();
        eval(&mut rt, "f = function() 1");
        assert_eq!(
            rt.get("f").unwrap(),
            Some(Rexp::Unsupported("closure".into()))
        );
    }

    #[test]
    fn remove_unbinds() {
        let (mut rt, _) = runtime();
        rt.assign("result", &Rexp::integer(1)).unwrap();
        rt.remove("result").unwrap();
        rt.remove("never_bound").unwrap();
        assert_eq!(rt.get("result").unwrap(), None);
    }
}
