//! Vector semantics: coercion, recycling arithmetic, indexing, printing.
//!
//! Every function works on [`Rexp`] values and reports failures as the
//! message R would print after `Error: `.

use parscript::rexp::Rexp;

use super::parse::BinOp;

pub type OpResult<T> = Result<T, String>;

/// Coercion rank used by `c()`: logical < integer < double < character < list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Mode {
    Logical,
    Integer,
    Double,
    Character,
    List,
}

fn mode(x: &Rexp) -> Option<Mode> {
    match x {
        Rexp::Logical(_) => Some(Mode::Logical),
        Rexp::Integer(_) => Some(Mode::Integer),
        Rexp::Double(_) => Some(Mode::Double),
        Rexp::Character(_) => Some(Mode::Character),
        Rexp::List { .. } => Some(Mode::List),
        Rexp::Null | Rexp::Unsupported(_) => None,
    }
}

fn recycle<A, B, R>(a: &[A], b: &[B], f: impl Fn(&A, &B) -> R) -> Vec<R> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let n = a.len().max(b.len());
    (0..n).map(|i| f(&a[i % a.len()], &b[i % b.len()])).collect()
}

// ── Coercion ──────────────────────────────────────────────────────────────────

/// Format a double the way R prints it with default options (7 significant
/// digits, trailing zeros dropped).
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        return "NaN".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Inf".into() } else { "-Inf".into() };
    }
    if x == 0.0 {
        return "0".into();
    }
    let magnitude = x.abs().log10().floor() as i32;
    if x.fract() == 0.0 && magnitude < 15 {
        return format!("{}", x as i64);
    }
    if !(-5..15).contains(&magnitude) {
        let s = format!("{:.6e}", x);
        let (mantissa, exp) = s.split_once('e').unwrap_or((s.as_str(), "0"));
        let mantissa = trim_zeros(mantissa);
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exp.abs());
    }
    let decimals = (6 - magnitude).clamp(0, 15) as usize;
    trim_zeros(&format!("{x:.decimals$}")).to_owned()
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn parse_logical(s: &str) -> Option<bool> {
    match s {
        "TRUE" | "true" | "T" | "True" => Some(true),
        "FALSE" | "false" | "F" | "False" => Some(false),
        _ => None,
    }
}

/// `as.character()`.
pub fn as_character(x: &Rexp) -> OpResult<Vec<Option<String>>> {
    Ok(match x {
        Rexp::Null => Vec::new(),
        Rexp::Logical(v) => v
            .iter()
            .map(|b| b.map(|b| if b { "TRUE" } else { "FALSE" }.to_owned()))
            .collect(),
        Rexp::Integer(v) => v.iter().map(|n| n.map(|n| n.to_string())).collect(),
        Rexp::Double(v) => v.iter().map(|x| x.map(format_number)).collect(),
        Rexp::Character(v) => v.clone(),
        Rexp::List { values, .. } => values
            .iter()
            .map(|v| {
                if v.len() == 1 && mode(v) != Some(Mode::List) {
                    Ok(as_character(v)?.swap_remove(0))
                } else {
                    Ok(Some(deparse(v)))
                }
            })
            .collect::<OpResult<_>>()?,
        Rexp::Unsupported(t) => {
            return Err(format!(
                "cannot coerce type '{t}' to vector of type 'character'"
            ))
        }
    })
}

/// `as.double()`; unparsable strings become `NA`.
pub fn as_double(x: &Rexp) -> OpResult<Vec<Option<f64>>> {
    Ok(match x {
        Rexp::Character(v) => v
            .iter()
            .map(|s| s.as_deref().and_then(|s| s.trim().parse().ok()))
            .collect(),
        Rexp::List { values, .. } => values
            .iter()
            .map(|v| match v.len() {
                1 => Ok(as_double(v)?[0]),
                _ => Err("'list' object cannot be coerced to type 'double'".to_owned()),
            })
            .collect::<OpResult<_>>()?,
        other => numeric(other)?,
    })
}

/// `as.integer()`; doubles truncate toward zero.
pub fn as_integer(x: &Rexp) -> OpResult<Vec<Option<i32>>> {
    Ok(as_double(x)?
        .into_iter()
        .map(|d| {
            d.filter(|d| d.is_finite())
                .map(f64::trunc)
                .filter(|d| *d > f64::from(i32::MIN) && *d <= f64::from(i32::MAX))
                .map(|d| d as i32)
        })
        .collect())
}

/// `as.logical()`.
pub fn as_logical(x: &Rexp) -> OpResult<Vec<Option<bool>>> {
    Ok(match x {
        Rexp::Null => Vec::new(),
        Rexp::Logical(v) => v.clone(),
        Rexp::Integer(v) => v.iter().map(|n| n.map(|n| n != 0)).collect(),
        Rexp::Double(v) => v
            .iter()
            .map(|d| d.filter(|d| !d.is_nan()).map(|d| d != 0.0))
            .collect(),
        Rexp::Character(v) => v
            .iter()
            .map(|s| s.as_deref().and_then(parse_logical))
            .collect(),
        Rexp::List { values, .. } => values
            .iter()
            .map(|v| match v.len() {
                1 => Ok(as_logical(v)?[0]),
                _ => Err("'list' object cannot be coerced to type 'logical'".to_owned()),
            })
            .collect::<OpResult<_>>()?,
        Rexp::Unsupported(t) => {
            return Err(format!("cannot coerce type '{t}' to vector of type 'logical'"))
        }
    })
}

/// Numeric view for arithmetic; strings are rejected.
fn numeric(x: &Rexp) -> OpResult<Vec<Option<f64>>> {
    match x {
        Rexp::Null => Ok(Vec::new()),
        Rexp::Logical(v) => Ok(v
            .iter()
            .map(|b| b.map(|b| if b { 1.0 } else { 0.0 }))
            .collect()),
        Rexp::Integer(v) => Ok(v.iter().map(|n| n.map(f64::from)).collect()),
        Rexp::Double(v) => Ok(v.clone()),
        _ => Err("non-numeric argument to binary operator".into()),
    }
}

fn integer_like(x: &Rexp) -> Option<Vec<Option<i32>>> {
    match x {
        Rexp::Logical(v) => Some(v.iter().map(|b| b.map(i32::from)).collect()),
        Rexp::Integer(v) => Some(v.clone()),
        _ => None,
    }
}

/// The condition of an `if`: a single non-NA logical.
pub fn condition(x: &Rexp) -> OpResult<bool> {
    if x.is_empty() {
        return Err("argument is of length zero".into());
    }
    if let Rexp::Character(v) = x {
        if v[0].as_deref().and_then(parse_logical).is_none() {
            return Err("argument is not interpretable as logical".into());
        }
    }
    as_logical(x)?[0].ok_or_else(|| "missing value where TRUE/FALSE needed".to_owned())
}

// ── Operators ─────────────────────────────────────────────────────────────────

pub fn negate(x: &Rexp) -> OpResult<Rexp> {
    if let Some(v) = integer_like(x) {
        return Ok(Rexp::Integer(v.into_iter().map(|n| n.map(|n| -n)).collect()));
    }
    match x {
        Rexp::Double(v) => Ok(Rexp::Double(v.iter().map(|d| d.map(|d| -d)).collect())),
        _ => Err("invalid argument to unary operator".into()),
    }
}

pub fn not(x: &Rexp) -> OpResult<Rexp> {
    if matches!(x, Rexp::Character(_)) {
        return Err("invalid argument type".into());
    }
    Ok(Rexp::Logical(
        as_logical(x)?.into_iter().map(|b| b.map(|b| !b)).collect(),
    ))
}

pub fn binary(op: BinOp, a: &Rexp, b: &Rexp) -> OpResult<Rexp> {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Pow => arith(op, a, b),
        BinOp::Range => range(a, b),
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            compare(op, a, b)
        }
        BinOp::And | BinOp::Or | BinOp::AndAnd | BinOp::OrOr => logic(op, a, b),
    }
}

fn arith(op: BinOp, a: &Rexp, b: &Rexp) -> OpResult<Rexp> {
    if let (Some(xa), Some(xb)) = (integer_like(a), integer_like(b)) {
        let checked = match op {
            BinOp::Add => Some(i32::checked_add as fn(i32, i32) -> Option<i32>),
            BinOp::Sub => Some(i32::checked_sub as fn(i32, i32) -> Option<i32>),
            BinOp::Mul => Some(i32::checked_mul as fn(i32, i32) -> Option<i32>),
            _ => None,
        };
        if let Some(f) = checked {
            // Overflow is NA, as in R.
            return Ok(Rexp::Integer(recycle(&xa, &xb, |x, y| match (x, y) {
                (Some(x), Some(y)) => f(*x, *y).filter(|n| *n != i32::MIN),
                _ => None,
            })));
        }
    }
    let (xa, xb) = (numeric(a)?, numeric(b)?);
    let f = |x: f64, y: f64| match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => x / y,
        _ => x.powf(y),
    };
    Ok(Rexp::Double(recycle(&xa, &xb, |x, y| match (x, y) {
        (Some(x), Some(y)) => Some(f(*x, *y)),
        _ => None,
    })))
}

fn range(a: &Rexp, b: &Rexp) -> OpResult<Rexp> {
    let from = numeric(a)?
        .first()
        .copied()
        .flatten()
        .ok_or("NA/NaN argument")?;
    let to = numeric(b)?
        .first()
        .copied()
        .flatten()
        .ok_or("NA/NaN argument")?;
    let n = (to - from).abs().floor() as usize + 1;
    let step = if to >= from { 1.0 } else { -1.0 };
    let seq = (0..n).map(|i| from + step * i as f64);
    let fits = |d: f64| d > f64::from(i32::MIN) && d <= f64::from(i32::MAX);
    if from.fract() == 0.0 && fits(from) && fits(to) {
        Ok(Rexp::Integer(seq.map(|d| Some(d as i32)).collect()))
    } else {
        Ok(Rexp::Double(seq.map(Some).collect()))
    }
}

fn compare(op: BinOp, a: &Rexp, b: &Rexp) -> OpResult<Rexp> {
    use std::cmp::Ordering;

    let test = |ord: Ordering| match op {
        BinOp::Eq => ord == Ordering::Equal,
        BinOp::Ne => ord != Ordering::Equal,
        BinOp::Lt => ord == Ordering::Less,
        BinOp::Le => ord != Ordering::Greater,
        BinOp::Gt => ord == Ordering::Greater,
        _ => ord != Ordering::Less,
    };
    if matches!(a, Rexp::List { .. }) || matches!(b, Rexp::List { .. }) {
        return Err("comparison of these types is not implemented".into());
    }
    if matches!(a, Rexp::Character(_)) || matches!(b, Rexp::Character(_)) {
        let (xa, xb) = (as_character(a)?, as_character(b)?);
        return Ok(Rexp::Logical(recycle(&xa, &xb, |x, y| match (x, y) {
            (Some(x), Some(y)) => Some(test(x.cmp(y))),
            _ => None,
        })));
    }
    let (xa, xb) = (numeric(a)?, numeric(b)?);
    Ok(Rexp::Logical(recycle(&xa, &xb, |x, y| match (x, y) {
        (Some(x), Some(y)) => x.partial_cmp(y).map(&test),
        _ => None,
    })))
}

fn logic(op: BinOp, a: &Rexp, b: &Rexp) -> OpResult<Rexp> {
    let (xa, xb) = (as_logical(a)?, as_logical(b)?);
    let and = matches!(op, BinOp::And | BinOp::AndAnd);
    Ok(Rexp::Logical(recycle(&xa, &xb, |x, y| match (x, y, and) {
        (Some(false), _, true) | (_, Some(false), true) => Some(false),
        (Some(true), _, false) | (_, Some(true), false) => Some(true),
        (Some(x), Some(y), _) => Some(if and { *x && *y } else { *x || *y }),
        _ => None,
    })))
}

// ── Construction ──────────────────────────────────────────────────────────────

/// Split a vector into its elements; atomic elements become length-1 vectors.
pub fn split(x: &Rexp) -> Vec<Rexp> {
    match x {
        Rexp::Null | Rexp::Unsupported(_) => Vec::new(),
        Rexp::Logical(v) => v.iter().map(|b| Rexp::Logical(vec![*b])).collect(),
        Rexp::Integer(v) => v.iter().map(|n| Rexp::Integer(vec![*n])).collect(),
        Rexp::Double(v) => v.iter().map(|d| Rexp::Double(vec![*d])).collect(),
        Rexp::Character(v) => v.iter().map(|s| Rexp::Character(vec![s.clone()])).collect(),
        Rexp::List { values, .. } => values.clone(),
    }
}

/// `c(...)`: concatenate, coercing to the highest mode present.
pub fn combine(parts: &[Rexp]) -> OpResult<Rexp> {
    let top = parts.iter().filter_map(mode).max();
    Ok(match top {
        None => Rexp::Null,
        Some(Mode::List) => {
            let mut values = Vec::new();
            let mut names = Vec::new();
            let mut any_names = false;
            for part in parts {
                match part {
                    Rexp::List {
                        values: v,
                        names: n,
                    } => {
                        values.extend(v.iter().cloned());
                        match n {
                            Some(n) => {
                                any_names = true;
                                names.extend(n.iter().cloned());
                            }
                            None => names.extend(v.iter().map(|_| String::new())),
                        }
                    }
                    other => {
                        let items = split(other);
                        names.extend(items.iter().map(|_| String::new()));
                        values.extend(items);
                    }
                }
            }
            Rexp::List {
                values,
                names: any_names.then_some(names),
            }
        }
        Some(Mode::Character) => Rexp::Character(flatten(parts, as_character)?),
        Some(Mode::Double) => Rexp::Double(flatten(parts, as_double)?),
        Some(Mode::Integer) => Rexp::Integer(flatten(parts, as_integer)?),
        Some(Mode::Logical) => Rexp::Logical(flatten(parts, as_logical)?),
    })
}

fn flatten<T>(parts: &[Rexp], f: fn(&Rexp) -> OpResult<Vec<T>>) -> OpResult<Vec<T>> {
    let mut out = Vec::new();
    for part in parts {
        if !matches!(part, Rexp::Unsupported(_)) {
            out.extend(f(part)?);
        }
    }
    Ok(out)
}

/// `unlist()`: recursively flatten lists into an atomic vector.
pub fn unlist(x: &Rexp) -> OpResult<Rexp> {
    match x {
        Rexp::List { values, .. } => {
            let flat = values.iter().map(unlist).collect::<OpResult<Vec<_>>>()?;
            combine(&flat)
        }
        other => Ok(other.clone()),
    }
}

// ── Indexing ──────────────────────────────────────────────────────────────────

/// Resolve an index vector to 0-based positions; `None` selects `NA`.
fn positions(x: &Rexp, idx: &Rexp) -> OpResult<Vec<Option<usize>>> {
    let len = x.len();
    match idx {
        Rexp::Null => Ok(Vec::new()),
        Rexp::Character(keys) => {
            let names = x.names().unwrap_or(&[]);
            Ok(keys
                .iter()
                .map(|k| k.as_ref().and_then(|k| names.iter().position(|n| n == k)))
                .collect())
        }
        Rexp::Logical(mask) => {
            if mask.is_empty() {
                return Ok(Vec::new());
            }
            let n = len.max(mask.len());
            Ok((0..n)
                .filter_map(|i| match mask[i % mask.len()] {
                    Some(true) => Some(Some(i)),
                    Some(false) => None,
                    None => Some(None),
                })
                .collect())
        }
        Rexp::Integer(_) | Rexp::Double(_) => {
            let nums = numeric(idx)?;
            let negative = nums.iter().any(|d| matches!(d, Some(d) if *d < 0.0));
            let positive = nums.iter().any(|d| matches!(d, Some(d) if *d > 0.0));
            if negative && positive {
                return Err("can't mix positive and negative subscripts".into());
            }
            if negative {
                let drop: Vec<usize> = nums
                    .iter()
                    .flatten()
                    .map(|d| (-d.trunc()) as usize - 1)
                    .collect();
                return Ok((0..len).filter(|i| !drop.contains(i)).map(Some).collect());
            }
            Ok(nums
                .iter()
                .filter(|d| !matches!(d, Some(d) if d.trunc() == 0.0))
                .map(|d| d.map(|d| d.trunc() as usize - 1))
                .collect())
        }
        other => Err(format!("invalid subscript type '{}'", other.type_name())),
    }
}

macro_rules! gather {
    ($v:expr, $pos:expr, $ctor:path) => {
        $ctor(
            $pos.iter()
                .map(|p| p.and_then(|i| $v.get(i).cloned().flatten()))
                .collect(),
        )
    };
}

/// `x[i]`
pub fn subset(x: &Rexp, idx: &Rexp) -> OpResult<Rexp> {
    let pos = positions(x, idx)?;
    Ok(match x {
        Rexp::Null => Rexp::Null,
        Rexp::Logical(v) => gather!(v, pos, Rexp::Logical),
        Rexp::Integer(v) => gather!(v, pos, Rexp::Integer),
        Rexp::Double(v) => gather!(v, pos, Rexp::Double),
        Rexp::Character(v) => gather!(v, pos, Rexp::Character),
        Rexp::List { values, names } => Rexp::List {
            values: pos
                .iter()
                .map(|p| p.and_then(|i| values.get(i).cloned()).unwrap_or(Rexp::Null))
                .collect(),
            names: names.as_ref().map(|n| {
                pos.iter()
                    .map(|p| p.and_then(|i| n.get(i).cloned()).unwrap_or_default())
                    .collect()
            }),
        },
        Rexp::Unsupported(t) => return Err(format!("object of type '{t}' is not subsettable")),
    })
}

fn single_position(x: &Rexp, idx: &Rexp) -> OpResult<Option<usize>> {
    if idx.len() != 1 {
        return Err(if idx.is_empty() {
            "subscript of length 0".into()
        } else {
            "attempt to select more than one element".into()
        });
    }
    match idx {
        Rexp::Character(_) => Ok(positions(x, idx)?[0]),
        _ => {
            let d = numeric(idx)?[0].ok_or("subscript out of bounds")?;
            if d < 1.0 {
                return Err("invalid subscript".into());
            }
            Ok(Some(d.trunc() as usize - 1))
        }
    }
}

/// `x[[i]]`
pub fn element(x: &Rexp, idx: &Rexp) -> OpResult<Rexp> {
    if let Rexp::Unsupported(t) = x {
        return Err(format!("object of type '{t}' is not subsettable"));
    }
    if x.is_null() {
        return Ok(Rexp::Null);
    }
    let pos = single_position(x, idx)?;
    match (x, pos) {
        (Rexp::List { values, .. }, Some(i)) if i < values.len() => Ok(values[i].clone()),
        (Rexp::List { .. }, None) if matches!(idx, Rexp::Character(_)) => Ok(Rexp::Null),
        (Rexp::List { .. }, _) => Err("subscript out of bounds".into()),
        (_, Some(i)) if i < x.len() => Ok(split(x).swap_remove(i)),
        _ => Err("subscript out of bounds".into()),
    }
}

/// `x$name`
pub fn dollar(x: &Rexp, name: &str) -> OpResult<Rexp> {
    match x {
        Rexp::Null => Ok(Rexp::Null),
        Rexp::List { .. } => Ok(x.get_named(name).cloned().unwrap_or(Rexp::Null)),
        _ => Err("$ operator is invalid for atomic vectors".into()),
    }
}

/// `x$name <- value` and `x[["name"]] <- value`; assigning `NULL` removes.
pub fn set_named(x: Rexp, name: &str, value: Rexp) -> OpResult<Rexp> {
    let (mut values, mut names) = match x {
        Rexp::Null => (Vec::new(), Vec::new()),
        Rexp::List { values, names } => {
            let names = names.unwrap_or_else(|| vec![String::new(); values.len()]);
            (values, names)
        }
        _ => return Err("$ operator is invalid for atomic vectors".into()),
    };
    let existing = names.iter().position(|n| n == name);
    match (existing, value) {
        (Some(i), Rexp::Null) => {
            values.remove(i);
            names.remove(i);
        }
        (None, Rexp::Null) => {}
        (Some(i), v) => values[i] = v,
        (None, v) => {
            values.push(v);
            names.push(name.to_owned());
        }
    }
    Ok(Rexp::List {
        values,
        names: Some(names),
    })
}

/// `x[[i]] <- value`
pub fn set_element(x: Rexp, idx: &Rexp, value: Rexp) -> OpResult<Rexp> {
    if let Some(name) = idx.as_string() {
        if matches!(x, Rexp::Null | Rexp::List { .. }) {
            return set_named(x, name, value);
        }
        return Err("subscript out of bounds".into());
    }
    let i = single_position(&x, idx)?.ok_or("subscript out of bounds")?;
    replace_at(x, &[i], &[value])
}

/// `x[i] <- value`
pub fn set_subset(x: Rexp, idx: &Rexp, value: Rexp) -> OpResult<Rexp> {
    let pos = positions(&x, idx)?
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or("NAs are not allowed in subscripted assignments")?;
    if pos.is_empty() {
        return Ok(x);
    }
    let items = split(&value);
    if items.is_empty() {
        return Err("replacement has length zero".into());
    }
    replace_at(x, &pos, &items)
}

fn replace_at(x: Rexp, pos: &[usize], items: &[Rexp]) -> OpResult<Rexp> {
    let is_list = matches!(x, Rexp::List { .. });
    let names = x.names().map(<[String]>::to_vec);
    let mut elems = split(&x);
    let fill = if is_list { Rexp::Null } else { Rexp::Logical(vec![None]) };
    for (k, &i) in pos.iter().enumerate() {
        if elems.len() <= i {
            elems.resize(i + 1, fill.clone());
        }
        elems[i] = items[k % items.len()].clone();
    }
    if is_list {
        let names = names.map(|mut n| {
            n.resize(elems.len(), String::new());
            n
        });
        return Ok(Rexp::List {
            values: elems,
            names,
        });
    }
    if elems.iter().any(|e| e.len() != 1) {
        return Err("more elements supplied than there are to replace".into());
    }
    combine(&elems)
}

// ── Printing ──────────────────────────────────────────────────────────────────

fn quoted(s: &Option<String>) -> String {
    match s {
        Some(s) => format!("{s:?}"),
        None => "NA".into(),
    }
}

/// Render a value as `print()` shows it.
pub fn print_repr(x: &Rexp) -> String {
    fn atomic(items: Vec<String>, empty: &str) -> String {
        if items.is_empty() {
            format!("{empty}(0)\n")
        } else {
            format!("[1] {}\n", items.join(" "))
        }
    }
    let na = |s: Option<String>| s.unwrap_or_else(|| "NA".into());
    match x {
        Rexp::Null => "NULL\n".into(),
        Rexp::Character(v) => atomic(v.iter().map(quoted).collect(), "character"),
        Rexp::Logical(_) | Rexp::Integer(_) | Rexp::Double(_) => {
            let empty = match x {
                Rexp::Logical(_) => "logical",
                Rexp::Integer(_) => "integer",
                _ => "numeric",
            };
            let items = as_character(x).unwrap_or_default();
            atomic(items.into_iter().map(na).collect(), empty)
        }
        Rexp::List { values, names } => {
            if values.is_empty() {
                return "list()\n".into();
            }
            let mut out = String::new();
            for (i, v) in values.iter().enumerate() {
                match names.as_ref().map(|n| n[i].as_str()) {
                    Some(n) if !n.is_empty() => out.push_str(&format!("${n}\n")),
                    _ => out.push_str(&format!("[[{}]]\n", i + 1)),
                }
                out.push_str(&print_repr(v));
                out.push('\n');
            }
            out
        }
        Rexp::Unsupported(t) => format!("<{t}>\n"),
    }
}

/// A compact source-like rendering, used when a list element must be shown
/// as a single string.
pub fn deparse(x: &Rexp) -> String {
    let atoms = |items: Vec<String>| {
        if items.len() == 1 {
            items.into_iter().next().unwrap_or_default()
        } else {
            format!("c({})", items.join(", "))
        }
    };
    match x {
        Rexp::Null => "NULL".into(),
        Rexp::Character(v) => atoms(v.iter().map(quoted).collect()),
        Rexp::List { values, names } => {
            let items: Vec<String> = values
                .iter()
                .enumerate()
                .map(|(i, v)| match names.as_ref().map(|n| n[i].as_str()) {
                    Some(n) if !n.is_empty() => format!("{n} = {}", deparse(v)),
                    _ => deparse(v),
                })
                .collect();
            format!("list({})", items.join(", "))
        }
        Rexp::Unsupported(t) => format!("<{t}>"),
        other => atoms(
            as_character(other)
                .unwrap_or_default()
                .into_iter()
                .map(|s| s.unwrap_or_else(|| "NA".into()))
                .collect(),
        ),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
