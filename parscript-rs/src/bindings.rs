//! Binding set handed to a script execution.
//!
//! A [`Bindings`] maps well-known names to host objects.  The engine reads
//! the ones it recognises (see the `*_BINDING` constants), writes the script
//! result back under [`RESULT_BINDING`] / [`SELECTED_BINDING`], and mutates
//! the shared [`VariablesMap`] in place.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::value::Value;

// ── Well-known binding names ──────────────────────────────────────────────────

pub const ARGUMENTS_BINDING: &str = "args";
pub const RESULTS_BINDING: &str = "results";
pub const VARIABLES_BINDING: &str = "variables";
pub const PROGRESS_BINDING: &str = "progress";
pub const RESULT_BINDING: &str = "result";
pub const SELECTED_BINDING: &str = "selected";

pub const LOCALSPACE_BINDING: &str = "localspace";
pub const USERSPACE_BINDING: &str = "user";
pub const GLOBALSPACE_BINDING: &str = "global";
pub const INPUTSPACE_BINDING: &str = "input";
pub const OUTPUTSPACE_BINDING: &str = "output";

// ── VariablesMap ──────────────────────────────────────────────────────────────

/// Job variables shared between the host and a script.
///
/// Cloning yields another handle to the same map, so the host can keep one
/// and observe the changes a script made even if the script failed.
#[derive(Debug, Clone, Default)]
pub struct VariablesMap(Arc<Mutex<BTreeMap<String, Value>>>);

impl VariablesMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.lock().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.lock().insert(name.into(), value.into());
    }

    /// Overwrite entries with `other`'s; keys absent from `other` are kept.
    pub fn merge(&self, other: BTreeMap<String, Value>) {
        self.0.lock().extend(other);
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

impl From<BTreeMap<String, Value>> for VariablesMap {
    fn from(map: BTreeMap<String, Value>) -> Self {
        VariablesMap(Arc::new(Mutex::new(map)))
    }
}

// ── ProgressSink ──────────────────────────────────────────────────────────────

/// Task progress (0–100) updated by the script through `set_progress()`.
///
/// Backed by an atomic so the host may poll it from another thread while
/// the script runs.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink(Arc<AtomicI32>);

impl ProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> i32 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, value: i32) {
        self.0.store(value, Ordering::SeqCst);
    }
}

// ── TaskResult ────────────────────────────────────────────────────────────────

/// Result of a previously executed task, exposed to the script as
/// `results$<task name>`.
#[derive(Debug, Clone)]
pub struct TaskResult {
    task_name: String,
    outcome: Result<Value, String>,
}

impl TaskResult {
    pub fn ok(task_name: impl Into<String>, value: impl Into<Value>) -> Self {
        TaskResult {
            task_name: task_name.into(),
            outcome: Ok(value.into()),
        }
    }

    /// A result whose value cannot be retrieved (the task failed, or its
    /// value could not be deserialized).
    pub fn failed(task_name: impl Into<String>, reason: impl Into<String>) -> Self {
        TaskResult {
            task_name: task_name.into(),
            outcome: Err(reason.into()),
        }
    }

    /// Readable task name used as the key in `results`.
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn value(&self) -> Result<&Value, &str> {
        self.outcome.as_ref().map_err(String::as_str)
    }
}

// ── DataSpace ─────────────────────────────────────────────────────────────────

/// A data space (scratch, user, global, input, output) as seen by the
/// engine: something that can tell where it lives.
pub trait DataSpace: Send + Sync {
    /// Real location, normally a `file:` URI.
    fn real_uri(&self) -> String;
}

/// A data space at a fixed URI.
#[derive(Debug, Clone)]
pub struct UriSpace {
    uri: String,
}

impl UriSpace {
    pub fn new(uri: impl Into<String>) -> Self {
        UriSpace { uri: uri.into() }
    }

    /// Data space rooted at a local directory.  Bytes outside the URI
    /// path alphabet, `%` included, are percent-encoded.
    pub fn from_path(path: &std::path::Path) -> Self {
        let mut uri = String::from("file://");
        let s = path.to_string_lossy().replace('\\', "/");
        if !s.starts_with('/') {
            uri.push('/');
        }
        for b in s.bytes() {
            match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' | b':' => {
                    uri.push(char::from(b))
                }
                _ => uri.push_str(&format!("%{b:02X}")),
            }
        }
        UriSpace { uri }
    }
}

impl DataSpace for UriSpace {
    fn real_uri(&self) -> String {
        self.uri.clone()
    }
}

// ── Binding / Bindings ────────────────────────────────────────────────────────

/// A host object stored in a [`Bindings`] set.
#[derive(Clone)]
pub enum Binding {
    Value(Value),
    Arguments(Vec<String>),
    Results(Vec<TaskResult>),
    Variables(VariablesMap),
    Progress(ProgressSink),
    Space(Arc<dyn DataSpace>),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Binding::Arguments(a) => f.debug_tuple("Arguments").field(a).finish(),
            Binding::Results(r) => f.debug_tuple("Results").field(r).finish(),
            Binding::Variables(v) => f.debug_tuple("Variables").field(v).finish(),
            Binding::Progress(p) => f.debug_tuple("Progress").field(p).finish(),
            Binding::Space(s) => f.debug_tuple("Space").field(&s.real_uri()).finish(),
        }
    }
}

/// Named host objects for one execution, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(String, Binding)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a binding; a replaced binding keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, binding: Binding) -> Option<Binding> {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, binding)),
            None => {
                self.entries.push((name, binding));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, b)| b)
    }

    pub fn remove(&mut self, name: &str) -> Option<Binding> {
        let pos = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.entries.iter().map(|(k, b)| (k.as_str(), b))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Builders ──────────────────────────────────────────────────────────────

    pub fn with_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(
            ARGUMENTS_BINDING,
            Binding::Arguments(args.into_iter().map(Into::into).collect()),
        );
        self
    }

    pub fn with_results(mut self, results: Vec<TaskResult>) -> Self {
        self.insert(RESULTS_BINDING, Binding::Results(results));
        self
    }

    pub fn with_variables(mut self, variables: VariablesMap) -> Self {
        self.insert(VARIABLES_BINDING, Binding::Variables(variables));
        self
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.insert(PROGRESS_BINDING, Binding::Progress(progress));
        self
    }

    pub fn with_space(mut self, name: &str, space: impl DataSpace + 'static) -> Self {
        self.insert(name, Binding::Space(Arc::new(space)));
        self
    }

    // ── Typed accessors ───────────────────────────────────────────────────────

    pub fn arguments(&self) -> Option<&[String]> {
        match self.get(ARGUMENTS_BINDING)? {
            Binding::Arguments(args) => Some(args),
            _ => None,
        }
    }

    pub fn results(&self) -> Option<&[TaskResult]> {
        match self.get(RESULTS_BINDING)? {
            Binding::Results(results) => Some(results),
            _ => None,
        }
    }

    pub fn variables(&self) -> Option<&VariablesMap> {
        match self.get(VARIABLES_BINDING)? {
            Binding::Variables(vars) => Some(vars),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<&ProgressSink> {
        match self.get(PROGRESS_BINDING)? {
            Binding::Progress(p) => Some(p),
            _ => None,
        }
    }

    pub fn space(&self, name: &str) -> Option<&Arc<dyn DataSpace>> {
        match self.get(name)? {
            Binding::Space(s) => Some(s),
            _ => None,
        }
    }

    /// A plain value binding, e.g. the script `result`.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            Binding::Value(v) => Some(v),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut b = Bindings::new();
        b.insert("a", Binding::Value(Value::Int(1)));
        b.insert("b", Binding::Value(Value::Int(2)));
        let old = b.insert("a", Binding::Value(Value::Int(3)));
        assert!(matches!(old, Some(Binding::Value(Value::Int(1)))));
        let names: Vec<_> = b.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(b.value("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn typed_accessors() {
        let vars = VariablesMap::new();
        let b = Bindings::new()
            .with_arguments(["x", "y"])
            .with_variables(vars.clone())
            .with_progress(ProgressSink::new());
        assert_eq!(b.arguments().unwrap(), ["x", "y"]);
        assert!(b.variables().is_some());
        assert!(b.progress().is_some());
        assert!(b.results().is_none());
        assert!(b.value(ARGUMENTS_BINDING).is_none());
    }

    #[test]
    fn variables_are_shared_between_clones() {
        let vars = VariablesMap::new();
        let other = vars.clone();
        other.set("k", "v");
        assert_eq!(vars.get("k"), Some(Value::from("v")));
    }

    #[test]
    fn merge_overwrites_and_keeps() {
        let vars = VariablesMap::new();
        vars.set("keep", 1i64);
        vars.set("change", "old");
        let mut update = BTreeMap::new();
        update.insert("change".to_owned(), Value::from("new"));
        update.insert("added".to_owned(), Value::Bool(true));
        vars.merge(update);
        assert_eq!(vars.get("keep"), Some(Value::Int(1)));
        assert_eq!(vars.get("change"), Some(Value::from("new")));
        assert_eq!(vars.len(), 3);
    }

    #[test]
    fn progress_sink_is_shared() {
        let p = ProgressSink::new();
        let q = p.clone();
        q.set(42);
        assert_eq!(p.get(), 42);
    }

    #[test]
    fn task_result_value() {
        assert_eq!(TaskResult::ok("t1", 5i64).value(), Ok(&Value::Int(5)));
        assert_eq!(TaskResult::failed("t2", "boom").value(), Err("boom"));
    }

    #[test]
    fn uri_space_from_path() {
        let s = UriSpace::from_path(std::path::Path::new("/tmp/scratch"));
        assert_eq!(s.real_uri(), "file:///tmp/scratch");
    }

    #[test]
    fn uri_space_escapes_reserved_bytes() {
        let s = UriSpace::from_path(std::path::Path::new("/tmp/job%41 dir/é#"));
        assert_eq!(s.real_uri(), "file:///tmp/job%2541%20dir/%C3%A9%23");
    }
}
