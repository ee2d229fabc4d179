//! Conversion between host [`Value`]s and R [`Rexp`]s.
//!
//! # Mapping
//!
//! | Host                         | R                                 |
//! |------------------------------|-----------------------------------|
//! | `Null`                       | `NULL` (or `NA` inside a vector)  |
//! | `Bool` / `Int` / `Float` / `Str` | length-1 logical / integer / double / character |
//! | `List` of one scalar kind, length ≠ 1 | atomic vector            |
//! | any other `List`             | unnamed `list()`                  |
//! | `Map` (non-empty keys)       | named `list()`                    |
//!
//! In the other direction a length-1 atomic vector is a scalar and any
//! other atomic vector is a `List`.  Host lists of length one therefore
//! travel as `list(x)` so they come back as lists.

use std::collections::BTreeMap;

use crate::error::ConversionError;
use crate::rexp::Rexp;
use crate::value::Value;

/// Convert a host value to its R representation.
pub fn to_foreign(value: &Value) -> Result<Rexp, ConversionError> {
    match value {
        Value::Null => Ok(Rexp::Null),
        Value::Bool(b) => Ok(Rexp::logical(*b)),
        Value::Int(n) => Ok(Rexp::integer(r_int(*n)?)),
        Value::Float(x) => Ok(Rexp::double(*x)),
        Value::Str(s) => Ok(Rexp::string(s.as_str())),
        Value::List(items) => list_to_foreign(items),
        Value::Map(map) => {
            let mut names = Vec::with_capacity(map.len());
            let mut values = Vec::with_capacity(map.len());
            for (key, item) in map {
                if key.is_empty() {
                    return Err(ConversionError::EmptyKey);
                }
                values.push(to_foreign(item).map_err(|e| e.in_entry(key.as_str()))?);
                names.push(key.clone());
            }
            Ok(Rexp::List {
                values,
                names: Some(names),
            })
        }
    }
}

/// Convert an R value to a host value.
///
/// `NA` elements become [`Value::Null`].
pub fn to_host(rexp: &Rexp) -> Result<Value, ConversionError> {
    match rexp {
        Rexp::Null => Ok(Value::Null),
        Rexp::Logical(v) => Ok(atomic(v, |b| Value::Bool(*b))),
        Rexp::Integer(v) => Ok(atomic(v, |n| Value::Int(i64::from(*n)))),
        Rexp::Double(v) => Ok(atomic(v, |x| Value::Float(*x))),
        Rexp::Character(v) => Ok(atomic(v, |s| Value::Str(s.clone()))),
        Rexp::List {
            values,
            names: Some(names),
        } => named_to_host(values, names).map(Value::Map),
        Rexp::List { values, names: None } => values
            .iter()
            .enumerate()
            .map(|(i, v)| to_host(v).map_err(|e| e.in_entry((i + 1).to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Rexp::Unsupported(type_name) => Err(ConversionError::Unsupported(type_name.clone())),
    }
}

/// Convert a named list to a host map.
///
/// Used for the job variables, which must stay a map on both sides.
pub fn as_map(rexp: &Rexp) -> Result<BTreeMap<String, Value>, ConversionError> {
    match rexp {
        Rexp::List {
            values,
            names: Some(names),
        } => named_to_host(values, names),
        // `list()` with every element removed loses its names attribute.
        Rexp::List { values, names: None } if values.is_empty() => Ok(BTreeMap::new()),
        other => Err(ConversionError::NotAMap(other.type_name().to_owned())),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn r_int(n: i64) -> Result<i32, ConversionError> {
    match i32::try_from(n) {
        Ok(i) if i != i32::MIN => Ok(i),
        _ => Err(ConversionError::IntegerOutOfRange(n)),
    }
}

/// The atomic vector kind a scalar belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Logical,
    Integer,
    Double,
    Character,
}

fn kind_of(value: &Value) -> Option<Kind> {
    match value {
        Value::Bool(_) => Some(Kind::Logical),
        Value::Int(_) => Some(Kind::Integer),
        Value::Float(_) => Some(Kind::Double),
        Value::Str(_) => Some(Kind::Character),
        _ => None,
    }
}

/// Common atomic kind of a list, or `None` when it needs a generic list.
/// `Null` elements fit any kind (they become `NA`).
fn common_kind(items: &[Value]) -> Option<Kind> {
    let mut kind = None;
    for item in items {
        if item.is_null() {
            continue;
        }
        let k = kind_of(item)?;
        match kind {
            None => kind = Some(k),
            Some(prev) if prev != k => return None,
            Some(_) => {}
        }
    }
    Some(kind.unwrap_or(Kind::Logical))
}

fn list_to_foreign(items: &[Value]) -> Result<Rexp, ConversionError> {
    let kind = if items.len() == 1 {
        None
    } else {
        common_kind(items)
    };
    let Some(kind) = kind else {
        let values = items
            .iter()
            .enumerate()
            .map(|(i, v)| to_foreign(v).map_err(|e| e.in_entry((i + 1).to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Rexp::list(values));
    };

    Ok(match kind {
        Kind::Logical => Rexp::Logical(items.iter().map(Value::as_bool).collect()),
        Kind::Integer => Rexp::Integer(
            items
                .iter()
                .map(|v| match v {
                    Value::Int(n) => r_int(*n).map(Some),
                    _ => Ok(None),
                })
                .collect::<Result<_, _>>()?,
        ),
        Kind::Double => Rexp::Double(
            items
                .iter()
                .map(|v| match v {
                    Value::Float(x) => Some(*x),
                    _ => None,
                })
                .collect(),
        ),
        Kind::Character => Rexp::Character(
            items
                .iter()
                .map(|v| v.as_str().map(str::to_owned))
                .collect(),
        ),
    })
}

fn atomic<T>(items: &[Option<T>], conv: impl Fn(&T) -> Value) -> Value {
    let convert = |item: &Option<T>| item.as_ref().map_or(Value::Null, &conv);
    match items {
        [single] => convert(single),
        _ => Value::List(items.iter().map(convert).collect()),
    }
}

fn named_to_host(
    values: &[Rexp],
    names: &[String],
) -> Result<BTreeMap<String, Value>, ConversionError> {
    let mut map = BTreeMap::new();
    for (i, value) in values.iter().enumerate() {
        let key = match names.get(i) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => (i + 1).to_string(),
        };
        let converted = to_host(value).map_err(|e| e.in_entry(key.as_str()))?;
        map.insert(key, converted);
    }
    Ok(map)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(v: Value) {
        let r = to_foreign(&v).expect("to_foreign failed");
        assert_eq!(to_host(&r).expect("to_host failed"), v, "via {r:?}");
    }

    #[test]
    fn scalars_are_length_one_vectors() {
        assert_eq!(to_foreign(&Value::Bool(true)).unwrap(), Rexp::logical(true));
        assert_eq!(to_foreign(&Value::Int(7)).unwrap(), Rexp::integer(7));
        assert_eq!(to_foreign(&Value::Float(0.5)).unwrap(), Rexp::double(0.5));
        assert_eq!(to_foreign(&Value::from("a")).unwrap(), Rexp::string("a"));
        assert_eq!(to_foreign(&Value::Null).unwrap(), Rexp::Null);
    }

    #[test]
    fn homogeneous_list_is_atomic_vector() {
        let v = Value::from(vec!["one", "two", "three"]);
        assert_eq!(
            to_foreign(&v).unwrap(),
            Rexp::character(["one", "two", "three"])
        );
    }

    #[test]
    fn nulls_become_na() {
        let v = Value::List(vec![Value::Int(1), Value::Null, Value::Int(3)]);
        assert_eq!(
            to_foreign(&v).unwrap(),
            Rexp::Integer(vec![Some(1), None, Some(3)])
        );
        roundtrip(v);
    }

    #[test]
    fn empty_list_is_empty_vector() {
        assert_eq!(to_foreign(&Value::List(vec![])).unwrap(), Rexp::Logical(vec![]));
        roundtrip(Value::List(vec![]));
    }

    #[test]
    fn singleton_list_stays_a_list() {
        let v = Value::List(vec![Value::from("only")]);
        assert_eq!(to_foreign(&v).unwrap(), Rexp::list(vec![Rexp::string("only")]));
        roundtrip(v);
    }

    #[test]
    fn mixed_list_is_generic() {
        let v = Value::List(vec![Value::Int(1), Value::from("x"), Value::Float(2.5)]);
        assert!(matches!(to_foreign(&v).unwrap(), Rexp::List { names: None, .. }));
        roundtrip(v);
    }

    #[test]
    fn map_is_named_list() {
        let mut m = BTreeMap::new();
        m.insert("a".to_owned(), Value::Int(1));
        m.insert("b".to_owned(), Value::from(vec![true, false]));
        let r = to_foreign(&Value::Map(m.clone())).unwrap();
        assert_eq!(r.names().unwrap(), ["a", "b"]);
        roundtrip(Value::Map(m));
    }

    #[test]
    fn nested_roundtrip() {
        let mut inner = BTreeMap::new();
        inner.insert("xs".to_owned(), Value::from(vec![1.5, 2.5]));
        inner.insert("empty".to_owned(), Value::Map(BTreeMap::new()));
        let mut outer = BTreeMap::new();
        outer.insert("inner".to_owned(), Value::Map(inner));
        outer.insert("flag".to_owned(), Value::Bool(false));
        roundtrip(Value::Map(outer));
    }

    #[test]
    fn out_of_range_int_fails() {
        assert!(matches!(
            to_foreign(&Value::Int(i64::from(i32::MAX) + 1)),
            Err(ConversionError::IntegerOutOfRange(_))
        ));
        assert!(matches!(
            to_foreign(&Value::Int(i64::from(i32::MIN))),
            Err(ConversionError::IntegerOutOfRange(_))
        ));
    }

    #[test]
    fn nested_failure_names_the_entry() {
        let mut m = BTreeMap::new();
        m.insert("big".to_owned(), Value::Int(1 << 40));
        let err = to_foreign(&Value::Map(m)).unwrap_err();
        assert!(err.to_string().starts_with("entry 'big'"));
    }

    #[test]
    fn empty_key_is_rejected() {
        let m = BTreeMap::from([
            (String::new(), Value::Int(1)),
            ("1".to_owned(), Value::Int(2)),
        ]);
        assert!(matches!(
            to_foreign(&Value::Map(m)),
            Err(ConversionError::EmptyKey)
        ));

        let nested = BTreeMap::from([(
            "outer".to_owned(),
            Value::Map(BTreeMap::from([(String::new(), Value::Bool(true))])),
        )]);
        let err = to_foreign(&Value::Map(nested)).unwrap_err();
        assert_eq!(err.to_string(), "entry 'outer': map keys must not be empty");
    }

    #[test]
    fn positional_looking_keys_round_trip() {
        roundtrip(Value::Map(BTreeMap::from([
            ("1".to_owned(), Value::Int(2)),
            ("2".to_owned(), Value::from("b")),
        ])));
    }

    #[test]
    fn na_scalars_are_null() {
        assert_eq!(to_host(&Rexp::Double(vec![None])).unwrap(), Value::Null);
        assert_eq!(to_host(&Rexp::Character(vec![None])).unwrap(), Value::Null);
        assert_eq!(
            to_host(&Rexp::Logical(vec![Some(true), None])).unwrap(),
            Value::List(vec![Value::Bool(true), Value::Null])
        );
    }

    #[test]
    fn unsupported_fails() {
        assert!(matches!(
            to_host(&Rexp::Unsupported("closure".into())),
            Err(ConversionError::Unsupported(t)) if t == "closure"
        ));
    }

    #[test]
    fn unnamed_elements_are_keyed_by_position() {
        let r = Rexp::List {
            values: vec![Rexp::integer(1), Rexp::integer(2)],
            names: Some(vec!["a".into(), String::new()]),
        };
        let map = as_map(&r).unwrap();
        assert_eq!(map["a"], Value::Int(1));
        assert_eq!(map["2"], Value::Int(2));
    }

    #[test]
    fn as_map_rejects_vectors() {
        assert!(matches!(
            as_map(&Rexp::string("x")),
            Err(ConversionError::NotAMap(t)) if t == "character"
        ));
        assert!(as_map(&Rexp::list(vec![])).unwrap().is_empty());
    }
}
