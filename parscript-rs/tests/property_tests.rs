use std::collections::BTreeMap;

use proptest::prelude::*;

use parscript::codec::{as_map, to_foreign, to_host};
use parscript::router::{classify, Channel, Console, OutputRouter, Signal, PROGRESS_TAG, STOP_TAG};
use parscript::runtime::Runtime;
use parscript::{HostWriter, ProgressSink, Value};
use parscript_testutil::SimRuntime;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        ((i32::MIN + 1)..=i32::MAX).prop_map(|n| Value::Int(n.into())),
        (-1e12f64..1e12f64).prop_map(Value::Float),
        "\\PC{0,12}".prop_map(Value::Str),
    ]
}

/// Keys include the empty string and bare positions, which R would
/// otherwise confuse with unnamed elements.
fn key() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z][a-z0-9_]{0,5}",
        1 => "[0-9]{1,2}",
        1 => Just(String::new()),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::btree_map(key(), inner, 0..6).prop_map(Value::Map),
        ]
    })
}

fn has_empty_key(v: &Value) -> bool {
    match v {
        Value::Map(m) => m.iter().any(|(k, v)| k.is_empty() || has_empty_key(v)),
        Value::List(items) => items.iter().any(has_empty_key),
        _ => false,
    }
}

proptest! {
    /// Every host value either survives a trip through R unchanged or is
    /// rejected because R cannot carry one of its keys.
    #[test]
    fn codec_round_trip(v in value()) {
        match to_foreign(&v) {
            Ok(rexp) => {
                prop_assert!(!has_empty_key(&v));
                prop_assert_eq!(to_host(&rexp).unwrap(), v);
            }
            Err(_) => prop_assert!(has_empty_key(&v)),
        }
    }
}

proptest! {
    /// Variables maps come back as maps with the same entries.
    #[test]
    fn variables_map_round_trip(m in prop::collection::btree_map(key(), scalar(), 0..8)) {
        match to_foreign(&Value::Map(m.clone())) {
            Ok(rexp) => prop_assert_eq!(as_map(&rexp).unwrap(), m),
            Err(_) => prop_assert!(m.contains_key("")),
        }
    }
}

proptest! {
    /// Integers R cannot hold are rejected, never truncated.
    #[test]
    fn wide_integers_are_rejected(n in prop_oneof![i64::MIN..=i64::from(i32::MIN), (i64::from(i32::MAX) + 1)..=i64::MAX]) {
        prop_assert!(to_foreign(&Value::Int(n)).is_err());
        let nested = Value::Map(BTreeMap::from([("n".to_owned(), Value::Int(n))]));
        prop_assert!(to_foreign(&nested).is_err());
    }
}

proptest! {
    #[test]
    fn stop_tag_captures_the_rest(s in "\\PC*") {
        let text = format!("{STOP_TAG}{s}");
        prop_assert_eq!(classify(&text), Signal::Stop(s.as_str()));
    }
}

proptest! {
    #[test]
    fn progress_tag_parses_any_integer(n in any::<i32>()) {
        let text = format!("{PROGRESS_TAG}={n}");
        prop_assert_eq!(classify(&text), Signal::Progress(n));
    }
}

proptest! {
    /// Untagged error text reaches the host error writer verbatim.
    #[test]
    fn diagnostics_are_forwarded_verbatim(s in "[^<]\\PC*") {
        let router = OutputRouter::new(false);
        let (out, out_buf) = HostWriter::capture();
        let (err, err_buf) = HostWriter::capture();
        let progress = ProgressSink::new();
        router.begin_run(out, err, Some(progress.clone()));
        router.write_console(&s, Channel::Error);
        router.end_run();
        prop_assert_eq!(err_buf.contents(), s);
        prop_assert_eq!(out_buf.contents(), "");
        prop_assert_eq!(progress.get(), 0);
        prop_assert!(router.stop_message().is_none());
    }
}

proptest! {
    /// The simulated interpreter reports bad input as an error, never a panic.
    #[test]
    fn sim_does_not_panic(s in "[ -~\n]{0,64}") {
        let mut rt = SimRuntime::new();
        let _ = rt.parse_and_eval(&s);
    }
}
