//! Logger initialisation and structured configuration diagnostics.

use std::fmt;

use env_logger::{Builder, Env};
use log::{Level, LevelFilter};

/// Log target used for configuration diagnostics.
pub const CONFIG_TARGET: &str = "crowd_bridge::config";

/// Initializes the global logger.
///
/// When `verbose` is `true`, all debug messages are printed. Otherwise only
/// info level and above are shown.
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let env = Env::default().default_filter_or(level.to_string());
    let mut builder = Builder::from_env(env);

    // `try_init` only fails if a logger was already set. Ignore that case so
    // tests can call `init` multiple times without panicking.
    let _ = builder.try_init();
}

/// How serious a configuration finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Startup continues, possibly with a fallback.
    Warning,
    /// Startup aborts.
    Error,
}

impl Severity {
    const fn level(self) -> Level {
        match self {
            Self::Warning => Level::Warn,
            Self::Error => Level::Error,
        }
    }
}

/// A configuration-validation event naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Whether startup may continue.
    pub severity: Severity,
    /// Configuration field the finding is about, e.g. `model_type.initial_pose`.
    pub field: String,
    /// What is wrong with the field.
    pub description: String,
}

impl Diagnostic {
    /// Finding that lets startup continue.
    pub fn warning(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field: field.into(),
            description: description.into(),
        }
    }

    /// Finding that aborts startup.
    pub fn error(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field: field.into(),
            description: description.into(),
        }
    }

    /// Writes the diagnostic through the `log` facade.
    pub fn emit(&self) {
        log::log!(target: CONFIG_TARGET, self.severity.level(), "{self}");
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>: {}", self.field, self.description)
    }
}
