//! Error taxonomy shared by the configuration reader, the engine handle and
//! the bridge.
//!
//! Construction-time variants (`Configuration`, `EngineLoad`,
//! `DuplicateType`, `TypeNotFound`) abort startup. Per-frame variants
//! (`Index`, `InvalidOperation`) are reported and the offending object is
//! simply not updated for that frame.

use thiserror::Error;

/// Why a six-token pose string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoseParseError {
    /// The string did not split into exactly six whitespace-separated tokens.
    #[error("expected 6 values (x y z pitch roll yaw), found {found}")]
    TokenCount {
        /// Number of tokens actually present.
        found: usize,
    },
    /// A token was not a finite floating-point number.
    #[error("token {position} (`{token}`) is not a finite number")]
    InvalidToken {
        /// Zero-based token position.
        position: usize,
        /// The offending text.
        token: String,
    },
}

/// Errors surfaced by the crowd bridge and its collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrowdError {
    /// A required setting is missing or malformed.
    #[error("configuration error in `{field}`: {detail}")]
    Configuration {
        /// Name of the offending configuration field.
        field: String,
        /// Human-readable description.
        detail: String,
    },
    /// A scene or behaviour resource could not be loaded.
    #[error("failed to load `{resource}`: {detail}")]
    EngineLoad {
        /// Resolved path or reference of the resource.
        resource: String,
        /// Human-readable description.
        detail: String,
    },
    /// A type name was registered twice.
    #[error("agent type `{0}` is already defined")]
    DuplicateType(String),
    /// A type name did not resolve in the registry.
    #[error("agent type `{0}` is not defined")]
    TypeNotFound(String),
    /// An object or agent index was out of range.
    #[error("index {index} out of range (count {count})")]
    Index {
        /// Requested index.
        index: usize,
        /// Number of valid entries.
        count: usize,
    },
    /// The operation is not valid for the target or the current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// The external-agent set could not be bound to engine agents.
    #[error("spawn failed: {0}")]
    Spawn(String),
    /// The bridge was never configured or failed to initialise.
    #[error("crowd bridge is not initialised")]
    NotInitialized,
    /// A pose string could not be parsed.
    #[error("malformed pose: {0}")]
    PoseParse(#[from] PoseParseError),
}

impl CrowdError {
    pub(crate) fn configuration(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn engine_load(resource: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::EngineLoad {
            resource: resource.into(),
            detail: detail.into(),
        }
    }

    /// Returns `true` when the error prevents the bridge from reaching the
    /// running state.
    ///
    /// # Examples
    ///
    /// ```
    /// use crowd_bridge::CrowdError;
    /// assert!(CrowdError::NotInitialized.is_fatal());
    /// assert!(!CrowdError::Index { index: 3, count: 1 }.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Index { .. } | Self::InvalidOperation(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = CrowdError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CrowdError::configuration("scene_file", "missing"), true)]
    #[case(CrowdError::engine_load("scene.toml", "not found"), true)]
    #[case(CrowdError::DuplicateType("guard".into()), true)]
    #[case(CrowdError::TypeNotFound("guard".into()), true)]
    #[case(CrowdError::Spawn("robot9".into()), true)]
    #[case(CrowdError::Index { index: 1, count: 0 }, false)]
    #[case(CrowdError::InvalidOperation("push".into()), false)]
    fn fatality_follows_taxonomy(#[case] error: CrowdError, #[case] fatal: bool) {
        assert_eq!(error.is_fatal(), fatal);
    }

    #[rstest]
    fn pose_errors_convert() {
        let err: CrowdError = PoseParseError::TokenCount { found: 5 }.into();
        assert_eq!(
            err.to_string(),
            "malformed pose: expected 6 values (x y z pitch roll yaw), found 5"
        );
    }
}
