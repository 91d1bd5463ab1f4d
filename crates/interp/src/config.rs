use serde::Deserialize;

use crate::Result;

/// Session options.
///
/// ```toml
/// debug_log = true
/// enable_tracing = false
/// dump_ssa = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Log every bridge call at debug level.
    pub debug_log: bool,

    /// Log every executed instruction at trace level.
    pub enable_tracing: bool,

    /// Log the loaded main package in listing form.
    pub dump_ssa: bool,
}

impl Config {
    /// The configuration selected by the `debug` flag of [crate::Bridge::initialize].
    pub fn debug() -> Self {
        Self {
            debug_log: true,
            ..Self::default()
        }
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }
}
