//! The real R interpreter, linked through `libR-sys`.
//!
//! Enabled with the `r` Cargo feature:
//! ```text
//! cargo build --features r
//! cargo test  --features r
//! ```
//!
//! R can be started once per process and is not thread safe.  The
//! interpreter handle owns the only [`EmbeddedR`] and serialises every call;
//! C stack checking is disabled because that handle may be used from more
//! than one thread over its lifetime.
//!
//! Console output is captured by replacing R's `WriteConsoleEx`,
//! `ShowMessage` and `FlushConsole` hooks.  The hooks forward to the
//! [`Console`] held in a process-wide slot, so the callbacks never touch
//! the interpreter lock.

use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use libR_sys::*;
use libc::{c_char, c_int};
use parking_lot::Mutex;

use crate::config::{EngineConfig, ENV_R_HOME};
use crate::error::{InitError, RuntimeError};
use crate::rexp::Rexp;
use crate::router::{Channel, Console};

use super::Runtime;

static STARTED: AtomicBool = AtomicBool::new(false);
static CONSOLE: Mutex<Option<Arc<dyn Console>>> = Mutex::new(None);

// ── Console hooks ─────────────────────────────────────────────────────────────

fn console() -> Option<Arc<dyn Console>> {
    CONSOLE.lock().clone()
}

unsafe extern "C" fn write_console_ex(buf: *const c_char, len: c_int, otype: c_int) {
    if buf.is_null() || len <= 0 {
        return;
    }
    let bytes = std::slice::from_raw_parts(buf.cast::<u8>(), len as usize);
    let text = String::from_utf8_lossy(bytes);
    match console() {
        Some(c) => c.write_console(&text, Channel::from_otype(otype)),
        None => tracing::debug!("R console output with no console attached: {text}"),
    }
}

unsafe extern "C" fn show_message(msg: *const c_char) {
    if msg.is_null() {
        return;
    }
    let text = CStr::from_ptr(msg).to_string_lossy();
    if let Some(c) = console() {
        c.show_message(&text);
    }
}

unsafe extern "C" fn flush_console() {
    if let Some(c) = console() {
        c.flush_console();
    }
}

// ── Startup ───────────────────────────────────────────────────────────────────

/// Make sure `R_HOME` is set before R starts: explicit setting first, then
/// the environment, then `R RHOME`.
fn ensure_r_home(config: &EngineConfig) -> Result<(), InitError> {
    if let Some(home) = &config.r_home {
        std::env::set_var(ENV_R_HOME, home);
        return Ok(());
    }
    if std::env::var_os(ENV_R_HOME).is_some() {
        return Ok(());
    }
    let output = std::process::Command::new("R")
        .args(["RHOME"])
        .output()
        .map_err(|_| InitError::RHomeNotFound)?;
    let home = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    if !output.status.success() || home.is_empty() {
        return Err(InitError::RHomeNotFound);
    }
    tracing::debug!("R_HOME resolved to {home}");
    std::env::set_var(ENV_R_HOME, home);
    Ok(())
}

/// Handle on the embedded R.  At most one exists per process.
pub struct EmbeddedR {
    _private: (),
}

impl EmbeddedR {
    /// Start R.  Fails if R was already started in this process.
    pub fn start(config: &EngineConfig) -> Result<Self, InitError> {
        if STARTED.swap(true, Ordering::SeqCst) {
            return Err(InitError::Startup(
                "R is already running in this process".into(),
            ));
        }
        ensure_r_home(config)?;

        let mut args = vec!["R".to_owned()];
        args.extend(config.r_args.iter().cloned());
        let args = args
            .into_iter()
            .map(CString::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| InitError::Startup(format!("invalid R argument: {e}")))?;
        let mut argv: Vec<*mut c_char> = args.iter().map(|a| a.as_ptr() as *mut c_char).collect();

        tracing::info!("starting embedded R with {:?}", config.r_args);
        unsafe {
            R_SignalHandlers = 0;
            if Rf_initialize_R(argv.len() as c_int, argv.as_mut_ptr()) != 0 {
                return Err(InitError::Startup("Rf_initialize_R failed".into()));
            }
            R_CStackLimit = usize::MAX;
            R_Interactive = Rboolean::FALSE;
            R_Outputfile = std::ptr::null_mut();
            R_Consolefile = std::ptr::null_mut();
            ptr_R_WriteConsole = None;
            ptr_R_WriteConsoleEx = Some(write_console_ex);
            ptr_R_ShowMessage = Some(show_message);
            ptr_R_FlushConsole = Some(flush_console);
            setup_Rmainloop();
        }
        Ok(EmbeddedR { _private: () })
    }
}

// ── Value marshalling ─────────────────────────────────────────────────────────

/// R raises an error (a longjmp) on embedded NULs, so they are refused
/// before any call into R.
fn check_nul(s: &str) -> Result<(), RuntimeError> {
    match s.find('\0') {
        Some(at) => Err(RuntimeError::Native(format!(
            "string contains a NUL byte at offset {at}"
        ))),
        None => Ok(()),
    }
}

/// The caller must have run [`check_nul`] on `s`.
unsafe fn mk_char(s: &str) -> SEXP {
    Rf_mkCharLenCE(s.as_ptr().cast::<c_char>(), s.len() as c_int, cetype_t::CE_UTF8)
}

/// Refuse any string in `x` that R cannot hold, before allocating.
fn check_strings(x: &Rexp) -> Result<(), RuntimeError> {
    match x {
        Rexp::Character(v) => v.iter().flatten().try_for_each(|s| check_nul(s)),
        Rexp::List { values, names } => {
            names.iter().flatten().try_for_each(|n| check_nul(n))?;
            values.iter().try_for_each(check_strings)
        }
        _ => Ok(()),
    }
}

unsafe fn char_to_string(c: SEXP) -> String {
    CStr::from_ptr(R_CHAR(c)).to_string_lossy().into_owned()
}

/// Build an R object.  The result is unprotected.  Strings must have
/// passed [`check_strings`].
unsafe fn to_sexp(x: &Rexp) -> Result<SEXP, RuntimeError> {
    let sexp = match x {
        Rexp::Null => R_NilValue,
        Rexp::Logical(v) => {
            let s = Rf_allocVector(LGLSXP, v.len() as R_xlen_t);
            let data = std::slice::from_raw_parts_mut(LOGICAL(s), v.len());
            for (d, b) in data.iter_mut().zip(v) {
                *d = b.map_or(R_NaInt, c_int::from);
            }
            s
        }
        Rexp::Integer(v) => {
            let s = Rf_allocVector(INTSXP, v.len() as R_xlen_t);
            let data = std::slice::from_raw_parts_mut(INTEGER(s), v.len());
            for (d, n) in data.iter_mut().zip(v) {
                *d = n.unwrap_or(R_NaInt);
            }
            s
        }
        Rexp::Double(v) => {
            let s = Rf_allocVector(REALSXP, v.len() as R_xlen_t);
            let data = std::slice::from_raw_parts_mut(REAL(s), v.len());
            for (d, x) in data.iter_mut().zip(v) {
                *d = x.unwrap_or(R_NaReal);
            }
            s
        }
        Rexp::Character(v) => {
            let s = Rf_protect(Rf_allocVector(STRSXP, v.len() as R_xlen_t));
            for (i, item) in v.iter().enumerate() {
                let c = match item {
                    Some(text) => mk_char(text),
                    None => R_NaString,
                };
                SET_STRING_ELT(s, i as R_xlen_t, c);
            }
            Rf_unprotect(1);
            s
        }
        Rexp::List { values, names } => {
            let s = Rf_protect(Rf_allocVector(VECSXP, values.len() as R_xlen_t));
            for (i, v) in values.iter().enumerate() {
                match to_sexp(v) {
                    Ok(child) => SET_VECTOR_ELT(s, i as R_xlen_t, child),
                    Err(e) => {
                        Rf_unprotect(1);
                        return Err(e);
                    }
                };
            }
            if let Some(names) = names {
                let n = Rf_protect(Rf_allocVector(STRSXP, names.len() as R_xlen_t));
                for (i, name) in names.iter().enumerate() {
                    SET_STRING_ELT(n, i as R_xlen_t, mk_char(name));
                }
                Rf_setAttrib(s, R_NamesSymbol, n);
                Rf_unprotect(1);
            }
            Rf_unprotect(1);
            s
        }
        Rexp::Unsupported(t) => {
            return Err(RuntimeError::Native(format!(
                "cannot build an R object of type '{t}'"
            )))
        }
    };
    Ok(sexp)
}

/// Read an R object back.  `s` must be protected by the caller.
unsafe fn from_sexp(s: SEXP) -> Rexp {
    let len = Rf_xlength(s) as usize;
    match TYPEOF(s) as u32 {
        NILSXP => Rexp::Null,
        LGLSXP => Rexp::Logical(
            std::slice::from_raw_parts(LOGICAL(s), len)
                .iter()
                .map(|&b| (b != R_NaInt).then_some(b != 0))
                .collect(),
        ),
        INTSXP => Rexp::Integer(
            std::slice::from_raw_parts(INTEGER(s), len)
                .iter()
                .map(|&n| (n != R_NaInt).then_some(n))
                .collect(),
        ),
        REALSXP => Rexp::Double(
            std::slice::from_raw_parts(REAL(s), len)
                .iter()
                .map(|&d| (R_IsNA(d) == 0).then_some(d))
                .collect(),
        ),
        STRSXP => Rexp::Character(
            (0..len)
                .map(|i| {
                    let c = STRING_ELT(s, i as R_xlen_t);
                    (c != R_NaString).then(|| char_to_string(c))
                })
                .collect(),
        ),
        VECSXP => {
            let values = (0..len)
                .map(|i| from_sexp(VECTOR_ELT(s, i as R_xlen_t)))
                .collect();
            let n = Rf_getAttrib(s, R_NamesSymbol);
            let names = (TYPEOF(n) as u32 == STRSXP).then(|| {
                (0..Rf_xlength(n))
                    .map(|i| {
                        let c = STRING_ELT(n, i);
                        if c == R_NaString {
                            String::new()
                        } else {
                            char_to_string(c)
                        }
                    })
                    .collect()
            });
            Rexp::List { values, names }
        }
        other => Rexp::Unsupported(
            CStr::from_ptr(Rf_type2char(other as SEXPTYPE))
                .to_string_lossy()
                .into_owned(),
        ),
    }
}

fn symbol(name: &str) -> Result<CString, RuntimeError> {
    CString::new(name).map_err(|_| RuntimeError::Native(format!("invalid R name {name:?}")))
}

// ── Runtime ───────────────────────────────────────────────────────────────────

impl Runtime for EmbeddedR {
    fn register_console(&mut self, console: Arc<dyn Console>) {
        *CONSOLE.lock() = Some(console);
    }

    fn parse_and_eval(&mut self, code: &str) -> Result<Rexp, RuntimeError> {
        check_nul(code)?;
        unsafe {
            let text = Rf_protect(Rf_ScalarString(mk_char(code)));
            let mut status = ParseStatus::PARSE_NULL;
            let exprs = Rf_protect(R_ParseVector(text, -1, &mut status, R_NilValue));
            if status != ParseStatus::PARSE_OK {
                Rf_unprotect(2);
                return Err(RuntimeError::Parse(format!("{status:?}")));
            }

            let mut last = R_NilValue;
            for i in 0..Rf_xlength(exprs) {
                let mut failed: c_int = 0;
                last = R_tryEval(VECTOR_ELT(exprs, i), R_GlobalEnv, &mut failed);
                if failed != 0 {
                    Rf_unprotect(2);
                    let message = CStr::from_ptr(R_curErrorBuf())
                        .to_string_lossy()
                        .trim_end()
                        .to_owned();
                    return Err(RuntimeError::Evaluation(message));
                }
            }
            Rf_protect(last);
            let value = from_sexp(last);
            Rf_unprotect(3);
            Ok(value)
        }
    }

    fn assign(&mut self, name: &str, value: &Rexp) -> Result<(), RuntimeError> {
        let sym = symbol(name)?;
        check_strings(value)?;
        unsafe {
            let v = Rf_protect(to_sexp(value)?);
            Rf_defineVar(Rf_install(sym.as_ptr()), v, R_GlobalEnv);
            Rf_unprotect(1);
        }
        Ok(())
    }

    fn get(&mut self, name: &str) -> Result<Option<Rexp>, RuntimeError> {
        let sym = symbol(name)?;
        unsafe {
            let v = Rf_findVarInFrame(R_GlobalEnv, Rf_install(sym.as_ptr()));
            if v == R_UnboundValue {
                return Ok(None);
            }
            Rf_protect(v);
            let value = from_sexp(v);
            Rf_unprotect(1);
            Ok(Some(value))
        }
    }

    fn remove(&mut self, name: &str) -> Result<(), RuntimeError> {
        let quoted = name.replace('\\', "\\\\").replace('"', "\\\"");
        self.parse_and_eval(&format!(
            "suppressWarnings(rm(list = \"{quoted}\", envir = .GlobalEnv))"
        ))
        .map(|_| ())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
