//! Console interception.
//!
//! R reports everything, including failures, as console text.  The engine
//! turns the error channel into a side channel by installing two R helpers
//! that print tagged lines:
//!
//! | Console text (error channel) | Meaning                              |
//! |------------------------------|--------------------------------------|
//! | `<PARError> …`               | `stop()` was called; rest is the message |
//! | `<PARProgress>=N`            | `set_progress(N)`                    |
//! | anything else                | ordinary diagnostic, forwarded       |
//!
//! [`OutputRouter`] receives every chunk through the [`Console`] callbacks,
//! classifies it with [`classify`], and either records the signal for the
//! engine or forwards the text to the host writers of the current run.

use std::io::Write;
use std::sync::OnceLock;

use parking_lot::Mutex;
use regex::Regex;

use crate::bindings::ProgressSink;
use crate::context::HostWriter;

/// Prefix printed by the `options(error=)` handler.
pub const STOP_TAG: &str = "<PARError> ";
/// Prefix printed by `set_progress()`, followed by `=` and an integer.
pub const PROGRESS_TAG: &str = "<PARProgress>";

// ── Console callbacks ─────────────────────────────────────────────────────────

/// Console stream a chunk of text was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Regular output (`oType == 0`).
    Output,
    /// Errors, warnings and messages (`oType == 1`).
    Error,
}

impl Channel {
    /// Map R's `WriteConsoleEx` output type.
    pub fn from_otype(otype: i32) -> Self {
        if otype == 0 {
            Channel::Output
        } else {
            Channel::Error
        }
    }
}

/// Callbacks a runtime invokes for console activity.  Always called
/// synchronously on the evaluating thread.
pub trait Console: Send + Sync {
    fn write_console(&self, text: &str, channel: Channel);
    fn flush_console(&self);
    fn show_message(&self, message: &str);
}

// ── Classification ────────────────────────────────────────────────────────────

/// What a chunk of error-channel text means.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<'a> {
    Stop(&'a str),
    Progress(i32),
    Diagnostic,
}

fn progress_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^{}=\s*(-?\d+)\s*$", regex::escape(PROGRESS_TAG)))
            .expect("progress pattern is valid")
    })
}

/// Classify error-channel text: stop tag first, then progress tag, then
/// plain diagnostic.  A progress tag with a malformed value is a diagnostic.
pub fn classify(text: &str) -> Signal<'_> {
    if let Some(message) = text.strip_prefix(STOP_TAG) {
        return Signal::Stop(message);
    }
    if text.starts_with(PROGRESS_TAG) {
        if let Some(n) = progress_re()
            .captures(text)
            .and_then(|c| c[1].parse::<i32>().ok())
        {
            return Signal::Progress(n);
        }
    }
    Signal::Diagnostic
}

// ── OutputRouter ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct RunState {
    out: Option<HostWriter>,
    err: Option<HostWriter>,
    stop_message: Option<String>,
    progress: Option<ProgressSink>,
}

/// The console registered with the interpreter.
///
/// Lives as long as the interpreter; the engine attaches the writers and
/// progress sink of each run with [`begin_run`](Self::begin_run) and
/// detaches them with [`end_run`](Self::end_run).
pub struct OutputRouter {
    echo: Option<HostWriter>,
    state: Mutex<RunState>,
}

impl OutputRouter {
    /// `echo_errors`: also copy diagnostics to this process's stderr.
    pub fn new(echo_errors: bool) -> Self {
        OutputRouter {
            echo: echo_errors.then(HostWriter::stderr),
            state: Mutex::new(RunState::default()),
        }
    }

    /// A router that copies every diagnostic to `echo` as well as to the
    /// run's error writer.
    pub fn with_echo(echo: HostWriter) -> Self {
        OutputRouter {
            echo: Some(echo),
            state: Mutex::new(RunState::default()),
        }
    }

    /// Reset the signal state and attach the host side of a run.
    pub fn begin_run(&self, out: HostWriter, err: HostWriter, progress: Option<ProgressSink>) {
        *self.state.lock() = RunState {
            out: Some(out),
            err: Some(err),
            stop_message: None,
            progress,
        };
    }

    /// Clear the signal state and detach the host writers.
    pub fn end_run(&self) {
        *self.state.lock() = RunState::default();
    }

    /// The stop message recorded during this run, if any.
    pub fn stop_message(&self) -> Option<String> {
        self.state.lock().stop_message.clone()
    }

    fn route_error(&self, text: &str) {
        let mut state = self.state.lock();
        match classify(text) {
            Signal::Stop(message) => {
                tracing::debug!("script stop: {}", message.trim_end());
                state.stop_message = Some(message.to_owned());
            }
            Signal::Progress(n) => match &state.progress {
                Some(sink) => {
                    tracing::trace!("progress {n}");
                    sink.set(n);
                }
                None => tracing::debug!("progress {n} ignored, no sink attached"),
            },
            Signal::Diagnostic => {
                let err = state.err.clone();
                drop(state);
                match (&self.echo, &err) {
                    (Some(echo), _) => forward(echo, text),
                    (None, None) => {
                        let mut stderr = std::io::stderr();
                        let _ = stderr.write_all(text.as_bytes());
                        let _ = stderr.flush();
                    }
                    (None, Some(_)) => {}
                }
                if let Some(w) = err {
                    forward(&w, text);
                }
            }
        }
    }
}

fn forward(w: &HostWriter, text: &str) {
    if let Err(e) = w.write_str(text) {
        tracing::warn!("dropping console text, host writer failed: {e}");
    }
}

impl Console for OutputRouter {
    fn write_console(&self, text: &str, channel: Channel) {
        match channel {
            Channel::Output => {
                let out = self.state.lock().out.clone();
                match out {
                    Some(w) => forward(&w, text),
                    None => {
                        let mut stdout = std::io::stdout();
                        let _ = stdout.write_all(text.as_bytes());
                        let _ = stdout.flush();
                    }
                }
            }
            Channel::Error => self.route_error(text),
        }
    }

    fn flush_console(&self) {
        let (out, err) = {
            let state = self.state.lock();
            (state.out.clone(), state.err.clone())
        };
        for w in out.iter().chain(err.iter()) {
            if let Err(e) = w.flush() {
                tracing::warn!("host writer flush failed: {e}");
            }
        }
    }

    fn show_message(&self, message: &str) {
        let err = self.state.lock().err.clone();
        match err {
            Some(w) => forward(&w, message),
            None => eprint!("{message}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
