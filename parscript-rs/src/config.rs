//! Engine configuration.
//!
//! Resolution order for each setting:
//! 1. value set explicitly on [`EngineConfig`]
//! 2. environment variable (see [`EngineConfig::from_env`])
//! 3. built-in default

use std::path::PathBuf;

use crate::error::ConfigError;

/// Set to `true` when the engine runs inside an isolated (forked) worker.
pub const ENV_FORKED: &str = "PARSCRIPT_FORKED";
/// Root of the R installation.
pub const ENV_R_HOME: &str = "R_HOME";
/// Extra arguments for the embedded R, whitespace separated.
pub const ENV_R_ARGS: &str = "PARSCRIPT_R_ARGS";
/// Working directory restored after every execution.
pub const ENV_SAFE_DIR: &str = "PARSCRIPT_SAFE_DIR";

/// Arguments the embedded R is started with: no site/user profiles, no
/// saved workspace, no echo of the evaluated code.
pub const DEFAULT_R_ARGS: &[&str] = &["--vanilla", "--no-echo"];

/// Settings read once when the engine is created.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Running inside an isolated worker.  When `false`, error text is also
    /// echoed to this process's stderr so it is never lost.
    pub forked: bool,
    /// `R_HOME`; `None` lets the runtime ask `R RHOME`.
    pub r_home: Option<PathBuf>,
    /// Startup arguments for the embedded R.
    pub r_args: Vec<String>,
    /// Directory the interpreter returns to after each run, so it never
    /// keeps a handle on a task's scratch directory.
    pub safe_dir: PathBuf,
    /// Value of `options(warn=)` installed before each run.
    pub warn_level: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            forked: false,
            r_home: None,
            r_args: DEFAULT_R_ARGS.iter().map(|s| (*s).to_owned()).collect(),
            safe_dir: default_safe_dir(),
            warn_level: 1,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from the process environment.
    ///
    /// Invalid values are logged and replaced by their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit lookup
    /// (exposed for testing).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = EngineConfig::default();

        if let Some(raw) = lookup(ENV_FORKED) {
            match parse_bool(ENV_FORKED, &raw) {
                Ok(b) => config.forked = b,
                Err(e) => tracing::warn!("{e}; using {}", config.forked),
            }
        }
        if let Some(home) = lookup(ENV_R_HOME).filter(|s| !s.is_empty()) {
            config.r_home = Some(PathBuf::from(home));
        }
        if let Some(args) = lookup(ENV_R_ARGS) {
            config
                .r_args
                .extend(args.split_whitespace().map(str::to_owned));
        }
        if let Some(dir) = lookup(ENV_SAFE_DIR).filter(|s| !s.is_empty()) {
            config.safe_dir = PathBuf::from(dir);
        }
        config
    }

    pub fn with_forked(mut self, forked: bool) -> Self {
        self.forked = forked;
        self
    }

    pub fn with_safe_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.safe_dir = dir.into();
        self
    }
}

/// User home directory, falling back to the system temp dir.
fn default_safe_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError {
            key: key.to_owned(),
            value: raw.to_owned(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let c = EngineConfig::from_lookup(|_| None);
        assert!(!c.forked);
        assert!(c.r_home.is_none());
        assert_eq!(c.r_args, ["--vanilla", "--no-echo"]);
        assert_eq!(c.warn_level, 1);
    }

    #[test]
    fn forked_flag() {
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_FORKED, "true")])).forked);
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_FORKED, "1")])).forked);
        assert!(!EngineConfig::from_lookup(lookup(&[(ENV_FORKED, "no")])).forked);
    }

    #[test]
    fn invalid_forked_keeps_default() {
        assert!(!EngineConfig::from_lookup(lookup(&[(ENV_FORKED, "maybe")])).forked);
    }

    #[test]
    fn r_settings() {
        let c = EngineConfig::from_lookup(lookup(&[
            (ENV_R_HOME, "/opt/R"),
            (ENV_R_ARGS, "--max-ppsize=100000  --quiet"),
            (ENV_SAFE_DIR, "/srv/work"),
        ]));
        assert_eq!(c.r_home, Some(PathBuf::from("/opt/R")));
        assert_eq!(c.r_args, ["--vanilla", "--no-echo", "--max-ppsize=100000", "--quiet"]);
        assert_eq!(c.safe_dir, PathBuf::from("/srv/work"));
    }

    #[test]
    fn parse_bool_rejects_garbage() {
        let e = parse_bool("K", "2").unwrap_err();
        assert_eq!(e.to_string(), "invalid value '2' for K");
    }
}
