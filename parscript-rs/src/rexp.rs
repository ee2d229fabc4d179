//! R-side value representation.
//!
//! [`Rexp`] mirrors the handful of SEXP types a task script can produce:
//! atomic vectors (each element may be `NA`), generic lists with optional
//! names, and `NULL`.  Anything else (closures, environments, …) is carried
//! as [`Rexp::Unsupported`] with its R type name so the codec can report it.

/// An R expression value.
#[derive(Debug, Clone, PartialEq)]
pub enum Rexp {
    Null,
    Logical(Vec<Option<bool>>),
    Integer(Vec<Option<i32>>),
    Double(Vec<Option<f64>>),
    Character(Vec<Option<String>>),
    /// Generic vector (`list(...)`); `names` is `None` for unnamed lists.
    List {
        values: Vec<Rexp>,
        names: Option<Vec<String>>,
    },
    /// An object with no host equivalent, tagged with its `typeof()`.
    Unsupported(String),
}

impl Rexp {
    pub fn character<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rexp::Character(items.into_iter().map(|s| Some(s.into())).collect())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Rexp::Character(vec![Some(s.into())])
    }

    pub fn logical(b: bool) -> Self {
        Rexp::Logical(vec![Some(b)])
    }

    pub fn integer(n: i32) -> Self {
        Rexp::Integer(vec![Some(n)])
    }

    pub fn double(x: f64) -> Self {
        Rexp::Double(vec![Some(x)])
    }

    /// Build a named list from `(name, value)` pairs.
    pub fn named_list<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Rexp)>,
        S: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<Rexp>) =
            entries.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        Rexp::List {
            values,
            names: Some(names),
        }
    }

    pub fn list(values: Vec<Rexp>) -> Self {
        Rexp::List {
            values,
            names: None,
        }
    }

    /// `length()` in R terms.
    pub fn len(&self) -> usize {
        match self {
            Rexp::Null | Rexp::Unsupported(_) => 0,
            Rexp::Logical(v) => v.len(),
            Rexp::Integer(v) => v.len(),
            Rexp::Double(v) => v.len(),
            Rexp::Character(v) => v.len(),
            Rexp::List { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Rexp::Null)
    }

    /// `typeof()` in R terms.
    pub fn type_name(&self) -> &str {
        match self {
            Rexp::Null => "NULL",
            Rexp::Logical(_) => "logical",
            Rexp::Integer(_) => "integer",
            Rexp::Double(_) => "double",
            Rexp::Character(_) => "character",
            Rexp::List { .. } => "list",
            Rexp::Unsupported(t) => t,
        }
    }

    /// Element names, if this is a named list.
    pub fn names(&self) -> Option<&[String]> {
        match self {
            Rexp::List {
                names: Some(names), ..
            } => Some(names),
            _ => None,
        }
    }

    /// Look up a named list element (`x$name`); first match wins, as in R.
    pub fn get_named(&self, name: &str) -> Option<&Rexp> {
        match self {
            Rexp::List {
                values,
                names: Some(names),
            } => names
                .iter()
                .position(|n| n == name)
                .and_then(|i| values.get(i)),
            _ => None,
        }
    }

    /// First element as a string, if this is a non-NA character vector.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Rexp::Character(v) => v.first()?.as_deref(),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_list_lookup() {
        let l = Rexp::named_list([("a", Rexp::integer(1)), ("b", Rexp::string("x"))]);
        assert_eq!(l.get_named("b"), Some(&Rexp::string("x")));
        assert_eq!(l.get_named("zz"), None);
        assert_eq!(l.names().unwrap(), ["a", "b"]);
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn unnamed_list_has_no_names() {
        let l = Rexp::list(vec![Rexp::Null]);
        assert!(l.names().is_none());
        assert!(l.get_named("a").is_none());
    }

    #[test]
    fn type_names() {
        assert_eq!(Rexp::Null.type_name(), "NULL");
        assert_eq!(Rexp::double(1.0).type_name(), "double");
        assert_eq!(Rexp::Unsupported("closure".into()).type_name(), "closure");
    }

    #[test]
    fn as_string_skips_na() {
        assert_eq!(Rexp::string("hi").as_string(), Some("hi"));
        assert_eq!(Rexp::Character(vec![None]).as_string(), None);
        assert_eq!(Rexp::integer(3).as_string(), None);
    }
}
