//! The process-wide interpreter.  Kept in its own test binary so nothing
//! else has started it first.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parscript::runtime::Runtime;
use parscript::{
    Bindings, EngineConfig, EngineFactory, HostWriter, InitError, Interpreter, ScriptContext,
    Value,
};
use parscript_testutil::SimRuntime;

static STARTS: AtomicUsize = AtomicUsize::new(0);

fn start_sim(_: &EngineConfig) -> Result<Box<dyn Runtime>, InitError> {
    STARTS.fetch_add(1, Ordering::SeqCst);
    Ok(Box::new(SimRuntime::new()))
}

#[test]
fn shared_interpreter_starts_once_and_serves_every_engine() {
    let safe = tempfile::tempdir().unwrap();
    let config = EngineConfig::default()
        .with_forked(true)
        .with_safe_dir(safe.path());

    assert!(Interpreter::shared().is_none());
    let first = Interpreter::create_with(&config, start_sim).unwrap();
    let second = Interpreter::create_with(&config, start_sim).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(STARTS.load(Ordering::SeqCst), 1);

    // create() now finds the running interpreter instead of starting R
    let engine = EngineFactory.script_engine(config.clone()).unwrap();
    assert!(Arc::ptr_eq(engine.interpreter(), &first));

    let (out, _) = HostWriter::capture();
    let (err, _) = HostWriter::capture();
    let mut context = ScriptContext::with_writers(Bindings::new(), out, err);
    engine.eval("shared = 'yes'", Some(&mut context)).unwrap();

    let other = EngineFactory.script_engine(config).unwrap();
    let mut context = ScriptContext::with_writers(
        Bindings::new(),
        HostWriter::capture().0,
        HostWriter::capture().0,
    );
    // globals other than the per-run names survive between runs
    let value = other.eval("result = shared", Some(&mut context)).unwrap();
    assert_eq!(value, Value::Str("yes".into()));
}
