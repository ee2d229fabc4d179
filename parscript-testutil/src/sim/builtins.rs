//! Builtin functions of the simulated runtime.

use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;

use parscript::rexp::Rexp;
use parscript::router::Channel;

use super::ops::{self, OpResult};
use super::parse::{Arg, Expr};
use super::{Condition, Eval, Obj, SimRuntime, Unwind};

/// Connection numbers returned by `stdout()` / `stderr()`.
const STDOUT_CONN: i32 = 1;
const STDERR_CONN: i32 = 2;

/// Evaluated call arguments, consumed by name or position.
struct Args(Vec<(Option<String>, Obj)>);

impl Args {
    fn named(&mut self, name: &str) -> Option<Obj> {
        let i = self.0.iter().position(|(n, _)| n.as_deref() == Some(name))?;
        Some(self.0.remove(i).1)
    }

    fn positional(&mut self) -> Option<Obj> {
        let i = self.0.iter().position(|(n, _)| n.is_none())?;
        Some(self.0.remove(i).1)
    }

    /// Argument matched by name, else the next positional one.
    fn arg(&mut self, name: &str) -> Option<Obj> {
        self.named(name).or_else(|| self.positional())
    }

    /// All remaining positional (unnamed) arguments.
    fn dots(&mut self) -> Vec<Obj> {
        let (dots, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.0)
            .into_iter()
            .partition(|(n, _)| n.is_none());
        self.0 = rest;
        dots.into_iter().map(|(_, v)| v).collect()
    }
}

fn na_string(s: Option<String>) -> String {
    s.unwrap_or_else(|| "NA".into())
}

fn strings(x: &Rexp) -> OpResult<Vec<String>> {
    Ok(ops::as_character(x)?.into_iter().map(na_string).collect())
}

impl SimRuntime {
    fn datas(&self, objs: Vec<Obj>) -> Eval<Vec<Rexp>> {
        objs.into_iter().map(|o| self.data(o)).collect()
    }

    fn required(&self, obj: Option<Obj>, fname: &str, what: &str) -> Eval<Rexp> {
        match obj {
            Some(o) => self.data(o),
            None => Err(self.fail(format!(
                "argument \"{what}\" is missing, with no default (in {fname})"
            ))),
        }
    }

    fn optional_data(&self, obj: Option<Obj>) -> Eval<Option<Rexp>> {
        obj.map(|o| self.data(o)).transpose()
    }

    fn flag(&self, obj: Option<Obj>, default: bool) -> Eval<bool> {
        match self.optional_data(obj)? {
            Some(r) => self.op(ops::condition(&r)),
            None => Ok(default),
        }
    }

    fn string_arg(&self, obj: Option<Obj>, default: &str) -> Eval<String> {
        match self.optional_data(obj)? {
            Some(r) => Ok(self
                .op(strings(&r))?
                .into_iter()
                .next()
                .unwrap_or_default()),
            None => Ok(default.to_owned()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        if p.is_absolute() {
            p
        } else {
            self.wd.join(p)
        }
    }

    pub(super) fn call_builtin(
        &mut self,
        name: &str,
        items: Vec<(Option<String>, Obj)>,
    ) -> Eval<Obj> {
        let mut args = Args(items);
        let value = match name {
            // ── Construction ──────────────────────────────────────────────────
            "c" => {
                let objs = std::mem::take(&mut args.0).into_iter().map(|(_, v)| v);
                let parts = self.datas(objs.collect())?;
                self.op(ops::combine(&parts))?
            }
            "list" => {
                let any_named = args.0.iter().any(|(n, _)| n.is_some());
                let mut names = Vec::new();
                let mut values = Vec::new();
                for (n, v) in std::mem::take(&mut args.0) {
                    names.push(n.unwrap_or_default());
                    values.push(self.data(v)?);
                }
                Rexp::List {
                    values,
                    names: any_named.then_some(names),
                }
            }
            "unlist" => {
                let x = self.required(args.arg("x"), name, "x")?;
                self.op(ops::unlist(&x))?
            }
            "seq_len" => {
                let n = self.required(args.arg("length.out"), name, "length.out")?;
                let n = self.op(ops::as_integer(&n))?.first().copied().flatten().unwrap_or(0);
                Rexp::Integer((1..=n.max(0)).map(Some).collect())
            }
            "seq_along" => {
                let x = self.required(args.arg("along.with"), name, "along.with")?;
                Rexp::Integer((1..=x.len() as i32).map(Some).collect())
            }
            "rev" => {
                let x = self.required(args.arg("x"), name, "x")?;
                let mut items = ops::split(&x);
                items.reverse();
                self.op(ops::combine(&items))?
            }

            // ── Inspection ────────────────────────────────────────────────────
            "length" => {
                let x = self.required(args.arg("x"), name, "x")?;
                Rexp::integer(x.len() as i32)
            }
            "names" => match self.required(args.arg("x"), name, "x")? {
                Rexp::List {
                    names: Some(names), ..
                } => Rexp::character(names),
                _ => Rexp::Null,
            },
            "is.null" => match args.arg("x") {
                Some(Obj::Data(Rexp::Null)) => Rexp::logical(true),
                Some(_) => Rexp::logical(false),
                None => return Err(self.fail("argument \"x\" is missing, with no default")),
            },
            "is.na" => {
                let x = self.required(args.arg("x"), name, "x")?;
                let na = match &x {
                    Rexp::Logical(v) => v.iter().map(|b| Some(b.is_none())).collect(),
                    Rexp::Integer(v) => v.iter().map(|n| Some(n.is_none())).collect(),
                    Rexp::Double(v) => v.iter().map(|d| Some(d.is_none())).collect(),
                    Rexp::Character(v) => v.iter().map(|s| Some(s.is_none())).collect(),
                    Rexp::List { values, .. } => values
                        .iter()
                        .map(|v| Some(v.len() == 1 && matches!(ops::as_character(v), Ok(s) if s[0].is_none())))
                        .collect(),
                    _ => Vec::new(),
                };
                Rexp::Logical(na)
            }
            "typeof" => match args.arg("x") {
                Some(Obj::Closure(_)) => Rexp::string("closure"),
                Some(Obj::Data(x)) => Rexp::string(x.type_name()),
                None => return Err(self.fail("argument \"x\" is missing, with no default")),
            },
            "exists" => {
                let n = self.string_arg(args.arg("x"), "")?;
                Rexp::logical(self.lookup(&n).is_some())
            }
            "nchar" => {
                let x = self.required(args.arg("x"), name, "x")?;
                let v = self.op(ops::as_character(&x))?;
                Rexp::Integer(
                    v.iter()
                        .map(|s| Some(s.as_ref().map_or(2, |s| s.chars().count() as i32)))
                        .collect(),
                )
            }

            // ── Coercion ──────────────────────────────────────────────────────
            "as.integer" => {
                let x = self.required(args.arg("x"), name, "x")?;
                Rexp::Integer(self.op(ops::as_integer(&x))?)
            }
            "as.numeric" | "as.double" => {
                let x = self.required(args.arg("x"), name, "x")?;
                Rexp::Double(self.op(ops::as_double(&x))?)
            }
            "as.character" => {
                let x = self.required(args.arg("x"), name, "x")?;
                Rexp::Character(self.op(ops::as_character(&x))?)
            }
            "as.logical" => {
                let x = self.required(args.arg("x"), name, "x")?;
                Rexp::Logical(self.op(ops::as_logical(&x))?)
            }
            "sum" => {
                let parts = self.datas(args.dots())?;
                let all_int = parts
                    .iter()
                    .all(|p| matches!(p, Rexp::Integer(_) | Rexp::Logical(_) | Rexp::Null));
                let mut total = 0.0;
                let mut na = false;
                for p in &parts {
                    for d in self.op(ops::as_double(p))? {
                        match d {
                            Some(d) => total += d,
                            None => na = true,
                        }
                    }
                }
                match (na, all_int) {
                    (true, true) => Rexp::Integer(vec![None]),
                    (true, false) => Rexp::Double(vec![None]),
                    (false, true) if total.abs() <= f64::from(i32::MAX) => {
                        Rexp::integer(total as i32)
                    }
                    (false, _) => Rexp::double(total),
                }
            }

            // ── Strings ───────────────────────────────────────────────────────
            "paste" | "paste0" => {
                let sep = if name == "paste0" {
                    String::new()
                } else {
                    self.string_arg(args.named("sep"), " ")?
                };
                let collapse = match args.named("collapse") {
                    Some(c) => Some(self.string_arg(Some(c), "")?),
                    None => None,
                };
                let parts = self.datas(args.dots())?;
                let columns = parts
                    .iter()
                    .map(strings)
                    .collect::<OpResult<Vec<_>>>();
                let columns: Vec<Vec<String>> = self
                    .op(columns)?
                    .into_iter()
                    .filter(|c| !c.is_empty())
                    .collect();
                let n = columns.iter().map(Vec::len).max().unwrap_or(0);
                let rows: Vec<String> = (0..n)
                    .map(|i| {
                        columns
                            .iter()
                            .map(|c| c[i % c.len()].as_str())
                            .collect::<Vec<_>>()
                            .join(sep.as_str())
                    })
                    .collect();
                match collapse {
                    Some(c) => Rexp::string(rows.join(c.as_str())),
                    None => Rexp::character(rows),
                }
            }
            "sprintf" => {
                let fmt = self.required(args.arg("fmt"), name, "fmt")?;
                let rest = self.datas(args.dots())?;
                let fmt = self.op(strings(&fmt))?;
                self.op(sprintf(&fmt, &rest))?
            }
            "toupper" | "tolower" => {
                let x = self.required(args.arg("x"), name, "x")?;
                let v = self.op(ops::as_character(&x))?;
                Rexp::Character(
                    v.into_iter()
                        .map(|s| {
                            s.map(|s| {
                                if name == "toupper" {
                                    s.to_uppercase()
                                } else {
                                    s.to_lowercase()
                                }
                            })
                        })
                        .collect(),
                )
            }

            // ── Console ───────────────────────────────────────────────────────
            "stdout" => Rexp::integer(STDOUT_CONN),
            "stderr" => Rexp::integer(STDERR_CONN),
            "cat" => {
                let sep = self.string_arg(args.named("sep"), " ")?;
                let file = self.optional_data(args.named("file"))?;
                let append = self.flag(args.named("append"), false)?;
                let parts = self.datas(args.dots())?;
                let mut words = Vec::new();
                for p in &parts {
                    for item in ops::split(p) {
                        if matches!(item, Rexp::List { .. }) {
                            return Err(self.fail(
                                "argument 1 (type 'list') cannot be handled by 'cat'",
                            ));
                        }
                        words.extend(self.op(strings(&item))?);
                    }
                }
                let text = words.join(sep.as_str());
                self.emit(&text, file.as_ref(), append)?;
                return Ok(Obj::null());
            }
            "writeLines" => {
                let text = self.required(args.arg("text"), name, "text")?;
                let con = self.optional_data(args.arg("con"))?;
                let sep = self.string_arg(args.named("sep"), "\n")?;
                let mut out = String::new();
                for line in self.op(strings(&text))? {
                    out.push_str(&line);
                    out.push_str(&sep);
                }
                self.emit(&out, con.as_ref(), false)?;
                return Ok(Obj::null());
            }
            "readLines" => {
                let path = self.string_arg(args.arg("con"), "")?;
                let content = fs::read_to_string(self.resolve(&path)).map_err(|e| {
                    self.fail(format!("cannot open file '{path}': {e}"))
                })?;
                Rexp::character(content.lines())
            }
            "print" => {
                let x = args.arg("x").unwrap_or_else(Obj::null);
                let text = match &x {
                    Obj::Data(r) => ops::print_repr(r),
                    Obj::Closure(_) => "<closure>\n".to_owned(),
                };
                self.write(&text, Channel::Output);
                return Ok(x);
            }
            "message" => {
                let append_lf = self.flag(args.named("appendLF"), true)?;
                let parts = self.datas(args.dots())?;
                let mut text = String::new();
                for p in &parts {
                    text.extend(self.op(strings(p))?);
                }
                if append_lf {
                    text.push('\n');
                }
                self.write(&text, Channel::Error);
                return Ok(Obj::null());
            }
            "warning" => {
                let parts = self.datas(args.dots())?;
                let mut text = String::new();
                for p in &parts {
                    text.extend(self.op(strings(p))?);
                }
                self.warning(&text)?;
                Rexp::string(text)
            }
            "stop" => {
                let with_call = self.flag(args.named("call."), true)?;
                let parts = self.datas(args.dots())?;
                let mut message = String::new();
                for p in &parts {
                    message.extend(self.op(strings(p))?);
                }
                return Err(Unwind::Error(Condition {
                    message,
                    call: if with_call {
                        self.frames.last().map(|f| f.name.clone())
                    } else {
                        None
                    },
                }));
            }
            "geterrmessage" => Rexp::string(self.last_error.clone()),

            // ── Control ───────────────────────────────────────────────────────
            "return" => return Err(Unwind::Return(args.positional().unwrap_or_else(Obj::null))),
            "invisible" | "identity" => return Ok(args.positional().unwrap_or_else(Obj::null)),
            "options" => {
                let mut old_names = Vec::new();
                let mut old_values = Vec::new();
                for (n, v) in std::mem::take(&mut args.0) {
                    match n {
                        Some(n) => {
                            let old = self.options.insert(n.clone(), v);
                            old_names.push(n);
                            old_values.push(old.map_or(Rexp::Null, Obj::into_rexp));
                        }
                        None => {
                            let key = self.data(v)?;
                            for k in self.op(strings(&key))? {
                                let cur = self.options.get(&k).cloned();
                                old_values.push(cur.map_or(Rexp::Null, Obj::into_rexp));
                                old_names.push(k);
                            }
                        }
                    }
                }
                Rexp::List {
                    values: old_values,
                    names: Some(old_names),
                }
            }
            "getOption" => {
                let key = self.string_arg(args.arg("x"), "")?;
                let default = args.arg("default").unwrap_or_else(Obj::null);
                return Ok(self.options.get(&key).cloned().unwrap_or(default));
            }

            // ── Environment ───────────────────────────────────────────────────
            "ls" => Rexp::character(
                self.globals
                    .keys()
                    .filter(|k| !k.starts_with('.'))
                    .cloned()
                    .collect::<Vec<_>>(),
            ),
            "getwd" => Rexp::string(self.wd.to_string_lossy().replace('\\', "/")),
            "setwd" => {
                let dir = self.string_arg(args.arg("dir"), "")?;
                let target = self.resolve(&dir);
                if !target.is_dir() {
                    return Err(self.fail("cannot change working directory"));
                }
                let old = std::mem::replace(&mut self.wd, target);
                tracing::trace!("setwd {}", self.wd.display());
                return Ok(Obj::Data(Rexp::string(
                    old.to_string_lossy().replace('\\', "/"),
                )));
            }
            "Sys.getenv" => {
                let key = self.string_arg(args.arg("x"), "")?;
                let unset = self.string_arg(args.arg("unset"), "")?;
                Rexp::string(std::env::var(&key).unwrap_or(unset))
            }
            "file.path" => {
                let parts = self.datas(args.dots())?;
                let mut segs = Vec::new();
                for p in &parts {
                    segs.extend(self.op(strings(p))?);
                }
                Rexp::string(segs.join("/"))
            }
            "file.exists" | "dir.exists" => {
                let parts = self.datas(args.dots())?;
                let mut found = Vec::new();
                for p in &parts {
                    for path in self.op(strings(p))? {
                        let path = self.resolve(&path);
                        found.push(Some(if name == "dir.exists" {
                            path.is_dir()
                        } else {
                            path.exists()
                        }));
                    }
                }
                Rexp::Logical(found)
            }

            _ => return Err(self.fail(format!("could not find function \"{name}\""))),
        };
        Ok(Obj::Data(value))
    }

    /// Write console text to a connection (`stdout()`, `stderr()`) or a file.
    fn emit(&mut self, text: &str, file: Option<&Rexp>, append: bool) -> Eval<()> {
        match file {
            None => self.write(text, Channel::Output),
            Some(Rexp::Integer(v)) if v.first() == Some(&Some(STDERR_CONN)) => {
                self.write(text, Channel::Error)
            }
            Some(Rexp::Integer(_)) => self.write(text, Channel::Output),
            Some(Rexp::Character(v)) if v.first().is_some_and(|s| s.as_deref() == Some("")) => {
                self.write(text, Channel::Output)
            }
            Some(path @ Rexp::Character(_)) => {
                let path = path.as_string().unwrap_or_default().to_owned();
                let target = self.resolve(&path);
                let written = fs::OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(append)
                    .truncate(!append)
                    .open(&target)
                    .and_then(|mut f| f.write_all(text.as_bytes()));
                if let Err(e) = written {
                    return Err(self.fail(format!("cannot open file '{path}': {e}")));
                }
            }
            Some(other) => {
                return Err(self.fail(format!("invalid connection of type '{}'", other.type_name())))
            }
        }
        Ok(())
    }

    /// `rm(a, b)` / `rm(list = c("a", "b"))`; symbols are not evaluated.
    pub(super) fn builtin_rm(&mut self, args: &[Arg]) -> Eval<Obj> {
        let mut names = Vec::new();
        for arg in args {
            match (arg.name.as_deref(), &arg.value) {
                (Some("list"), expr) => {
                    let v = self.eval_data(expr)?;
                    names.extend(self.op(strings(&v))?);
                }
                (Some(_), _) => {}
                (None, Expr::Ident(n)) => names.push(n.clone()),
                (None, Expr::Const(c)) if c.as_string().is_some() => {
                    names.extend(c.as_string().map(str::to_owned));
                }
                (None, _) => {
                    return Err(self.fail("... must contain names or character strings"))
                }
            }
        }
        for n in names {
            if !self.remove_var(&n) {
                self.warning(&format!("object '{n}' not found"))?;
            }
        }
        Ok(Obj::null())
    }
}

// ── sprintf ───────────────────────────────────────────────────────────────────

/// Vectorised `sprintf()` supporting `%s %d %i %f %e %g %x %%` with flags,
/// width and precision.
fn sprintf(fmt: &[String], args: &[Rexp]) -> OpResult<Rexp> {
    if fmt.is_empty() || args.iter().any(Rexp::is_empty) {
        return Ok(Rexp::Character(Vec::new()));
    }
    let columns: Vec<Vec<Rexp>> = args.iter().map(ops::split).collect();
    let n = columns
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(fmt.len()))
        .max()
        .unwrap_or(1);
    let out = (0..n)
        .map(|i| {
            let row: Vec<&Rexp> = columns.iter().map(|c| &c[i % c.len()]).collect();
            format_one(&fmt[i % fmt.len()], &row).map(Some)
        })
        .collect::<OpResult<Vec<_>>>()?;
    Ok(Rexp::Character(out))
}

fn format_one(fmt: &str, args: &[&Rexp]) -> OpResult<String> {
    let mut out = String::new();
    let mut chars = fmt.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let mut flags = String::new();
        while let Some(&f) = chars.peek() {
            if "-+ 0#".contains(f) {
                flags.push(f);
                chars.next();
            } else {
                break;
            }
        }
        let mut width = String::new();
        while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            width.push(d);
            chars.next();
        }
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut p = String::new();
            while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                p.push(d);
                chars.next();
            }
            precision = Some(p.parse::<usize>().unwrap_or(0));
        }
        let conv = chars
            .next()
            .ok_or_else(|| format!("unrecognised format specification '{fmt}'"))?;
        let arg = args
            .get(next_arg)
            .ok_or_else(|| "too few arguments".to_owned())?;
        next_arg += 1;

        let numeric = || -> OpResult<Option<f64>> {
            Ok(ops::as_double(arg)?.first().copied().flatten())
        };
        let body = match conv {
            's' => {
                let s = na_string(ops::as_character(arg)?.swap_remove(0));
                match precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s,
                }
            }
            'd' | 'i' => {
                if matches!(arg, Rexp::Character(_)) {
                    return Err(format!("invalid format '%{conv}'; use format %s for character objects"));
                }
                match numeric()? {
                    None => "NA".to_owned(),
                    Some(d) if d.fract() != 0.0 => {
                        return Err(format!(
                            "invalid format '%{conv}'; use format %f, %e, %g or %a for numeric objects"
                        ))
                    }
                    Some(d) => signed(format!("{}", d as i64), &flags),
                }
            }
            'f' | 'e' | 'g' => match numeric()? {
                None => "NA".to_owned(),
                Some(d) => {
                    let p = precision.unwrap_or(6);
                    let s = match conv {
                        'f' => format!("{d:.p$}"),
                        'e' => exponent(&format!("{d:.p$e}")),
                        _ => ops::format_number(d),
                    };
                    signed(s, &flags)
                }
            },
            'x' | 'X' => match numeric()? {
                None => "NA".to_owned(),
                Some(d) => {
                    let s = format!("{:x}", d as i64);
                    if conv == 'X' {
                        s.to_uppercase()
                    } else {
                        s
                    }
                }
            },
            other => return Err(format!("unrecognised format specification '%{other}'")),
        };

        let width: usize = width.parse().unwrap_or(0);
        let pad = width.saturating_sub(body.chars().count());
        if flags.contains('-') {
            let _ = write!(out, "{body}{}", " ".repeat(pad));
        } else if flags.contains('0') && conv != 's' {
            let (sign, digits) = match body.strip_prefix('-') {
                Some(rest) => ("-", rest),
                None => ("", body.as_str()),
            };
            let _ = write!(out, "{sign}{}{digits}", "0".repeat(pad));
        } else {
            let _ = write!(out, "{}{body}", " ".repeat(pad));
        }
    }
    Ok(out)
}

fn signed(s: String, flags: &str) -> String {
    if !s.starts_with('-') && flags.contains('+') {
        format!("+{s}")
    } else if !s.starts_with('-') && flags.contains(' ') {
        format!(" {s}")
    } else {
        s
    }
}

/// Rust prints `1.5e3`; C prints `1.5e+03`.
fn exponent(s: &str) -> String {
    match s.split_once('e') {
        Some((m, e)) => {
            let n: i32 = e.parse().unwrap_or(0);
            format!("{m}e{}{:02}", if n < 0 { '-' } else { '+' }, n.abs())
        }
        None => s.to_owned(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parscript::runtime::Runtime;

    fn eval(code: &str) -> Rexp {
        SimRuntime::new()
            .parse_and_eval(code)
            .expect("evaluation failed")
    }

    #[test]
    fn sprintf_formats() {
        assert_eq!(eval("sprintf('%s=%d', 'n', 42L)"), Rexp::string("n=42"));
        assert_eq!(eval("sprintf('%5.2f|', 3.14159)"), Rexp::string(" 3.14|"));
        assert_eq!(eval("sprintf('%-4s|', 'ab')"), Rexp::string("ab  |"));
        assert_eq!(eval("sprintf('%03d', 7)"), Rexp::string("007"));
        assert_eq!(eval("sprintf('%e', 1500)"), Rexp::string("1.500000e+03"));
        assert_eq!(eval("sprintf('100%%')"), Rexp::string("100%"));
    }

    #[test]
    fn sprintf_is_vectorised() {
        assert_eq!(
            eval("sprintf('item %d', 1:3)"),
            Rexp::character(["item 1", "item 2", "item 3"])
        );
    }

    #[test]
    fn sprintf_rejects_fractional_integer_format() {
        assert!(SimRuntime::new().parse_and_eval("sprintf('%d', 1.5)").is_err());
    }

    #[test]
    fn paste_variants() {
        assert_eq!(eval("paste('a', 'b')"), Rexp::string("a b"));
        assert_eq!(eval("paste0('x', 1:2)"), Rexp::character(["x1", "x2"]));
        assert_eq!(
            eval("paste(c('a', 'b'), collapse = '+')"),
            Rexp::string("a+b")
        );
        assert_eq!(eval("paste('a', NULL, 'b', sep = '-')"), Rexp::string("a-b"));
    }

    #[test]
    fn list_names_and_length() {
        assert_eq!(eval("length(list(a = 1, 2))"), Rexp::integer(2));
        assert_eq!(eval("names(list(a = 1, 2))"), Rexp::character(["a", ""]));
        assert_eq!(eval("names(c(1, 2))"), Rexp::Null);
    }

    #[test]
    fn coercions() {
        assert_eq!(eval("as.integer('12')"), Rexp::integer(12));
        assert_eq!(eval("as.integer('x')"), Rexp::Integer(vec![None]));
        assert_eq!(eval("as.character(2.5)"), Rexp::string("2.5"));
        assert_eq!(eval("sum(1:4)"), Rexp::integer(10));
        assert_eq!(eval("sum(1, 2.5)"), Rexp::double(3.5));
    }

    #[test]
    fn options_returns_old_values() {
        assert_eq!(
            eval("options(warn = 1)\nold = options(warn = 2)\nold$warn"),
            Rexp::double(1.0)
        );
        assert_eq!(eval("getOption('nope', 'dflt')"), Rexp::string("dflt"));
    }

    #[test]
    fn unknown_function() {
        let err = SimRuntime::new().parse_and_eval("frobnicate(1)").unwrap_err();
        assert!(err.to_string().contains("could not find function \"frobnicate\""));
    }

    #[test]
    fn files_relative_to_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().replace('\\', "/");
        let mut rt = SimRuntime::new();
        let out = rt
            .parse_and_eval(&format!(
                "setwd('{path}')\nwriteLines(c('one', 'two'), 'out.txt')\nc(file.exists('out.txt'), dir.exists('.'))"
            ))
            .unwrap();
        assert_eq!(out, Rexp::Logical(vec![Some(true), Some(true)]));
        assert_eq!(
            fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "one\ntwo\n"
        );
        assert_eq!(
            rt.parse_and_eval("readLines('out.txt')").unwrap(),
            Rexp::character(["one", "two"])
        );
    }

    #[test]
    fn rm_missing_name_warns_only() {
        let mut rt = SimRuntime::new();
        rt.parse_and_eval("rm(ghost)").unwrap();
    }
}
