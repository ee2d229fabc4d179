//! Static identity of the R engine, as seen by host engine discovery.

use crate::config::EngineConfig;
use crate::engine::ScriptEngine;
use crate::error::InitError;

pub const ENGINE_NAME: &str = "R";
pub const ENGINE_VERSION: &str = "1";
pub const LANGUAGE_NAME: &str = "R";
pub const LANGUAGE_VERSION: &str = "2";
pub const NAMES: &[&str] = &["R", "r", "parscript"];
pub const EXTENSIONS: &[&str] = &["R", "r", "parscript"];
pub const MIME_TYPES: &[&str] = &["text/x-R"];

/// Keys understood by [`EngineFactory::parameter`].
pub const PARAM_NAME: &str = "name";
pub const PARAM_ENGINE: &str = "engine";
pub const PARAM_ENGINE_VERSION: &str = "engine_version";
pub const PARAM_LANGUAGE: &str = "language";
pub const PARAM_LANGUAGE_VERSION: &str = "language_version";

/// Describes the engine and hands out [`ScriptEngine`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineFactory;

impl EngineFactory {
    pub fn engine_name(&self) -> &'static str {
        ENGINE_NAME
    }

    pub fn engine_version(&self) -> &'static str {
        ENGINE_VERSION
    }

    pub fn language_name(&self) -> &'static str {
        LANGUAGE_NAME
    }

    pub fn language_version(&self) -> &'static str {
        LANGUAGE_VERSION
    }

    pub fn names(&self) -> &'static [&'static str] {
        NAMES
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    pub fn mime_types(&self) -> &'static [&'static str] {
        MIME_TYPES
    }

    /// Look up one identity field by key; `None` for unknown keys.
    pub fn parameter(&self, key: &str) -> Option<&'static str> {
        match key {
            PARAM_NAME | PARAM_ENGINE => Some(ENGINE_NAME),
            PARAM_ENGINE_VERSION => Some(ENGINE_VERSION),
            PARAM_LANGUAGE => Some(LANGUAGE_NAME),
            PARAM_LANGUAGE_VERSION => Some(LANGUAGE_VERSION),
            _ => None,
        }
    }

    /// True when `name` is one of the engine's aliases.
    pub fn handles(&self, name: &str) -> bool {
        NAMES.contains(&name)
    }

    /// `m(obj,a,b);`
    pub fn method_call_syntax(&self, obj: &str, method: &str, args: &[&str]) -> String {
        let mut call = format!("{method}({obj}");
        for arg in args {
            call.push(',');
            call.push_str(arg);
        }
        call.push_str(");");
        call
    }

    /// Statement printing `text` verbatim.
    pub fn output_statement(&self, text: &str) -> String {
        format!("cat('{text}');")
    }

    /// Join statements into a program, one per line.
    pub fn program(&self, statements: &[&str]) -> String {
        statements.iter().map(|s| format!("{s};\n")).collect()
    }

    /// An engine on the shared interpreter, starting it on first use.
    pub fn script_engine(&self, config: EngineConfig) -> Result<ScriptEngine, InitError> {
        ScriptEngine::create(config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity() {
        let f = EngineFactory;
        assert_eq!(f.engine_name(), "R");
        assert_eq!(f.names(), ["R", "r", "parscript"]);
        assert_eq!(f.mime_types(), ["text/x-R"]);
        assert!(f.handles("parscript"));
        assert!(!f.handles("python"));
    }

    #[test]
    fn parameters() {
        let f = EngineFactory;
        assert_eq!(f.parameter("name"), Some("R"));
        assert_eq!(f.parameter("engine"), Some("R"));
        assert_eq!(f.parameter("engine_version"), Some("1"));
        assert_eq!(f.parameter("language"), Some("R"));
        assert_eq!(f.parameter("language_version"), Some("2"));
        assert_eq!(f.parameter("threading"), None);
    }

    #[test]
    fn code_helpers() {
        let f = EngineFactory;
        assert_eq!(f.method_call_syntax("x", "print", &[]), "print(x);");
        assert_eq!(f.method_call_syntax("x", "round", &["2"]), "round(x,2);");
        assert_eq!(f.output_statement("hi"), "cat('hi');");
        assert_eq!(f.program(&["a = 1", "b = 2"]), "a = 1;\nb = 2;\n");
        assert_eq!(f.program(&[]), "");
    }
}
