//! Error types for the Strata pipeline engine.
//!
//! This module provides [`PipelineError`], the standard error type surfaced
//! by pipeline invocations. Resolution failures (unknown tokens, circular
//! registrations, misused aliases) are distinct variants so callers can
//! diagnose configuration mistakes precisely; failures raised by middleware
//! or the destination propagate untranslated through [`PipelineError::Handler`].

use thiserror::Error;

/// Result type alias using [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Standard error type for pipeline invocations.
///
/// The first three variants are configuration errors detected while the
/// chain is being flattened or resolved; they abort the in-flight call
/// before (or mid-way through) execution. [`PipelineError::Handler`] carries
/// a failure raised by a middleware or the destination itself - the engine
/// adds no translation and never retries.
///
/// # Example
///
/// ```
/// use strata_core::PipelineError;
///
/// let err = PipelineError::unknown_handler("auth");
/// assert!(err.to_string().contains("auth"));
/// ```
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A string token matched no alias, no group, and no container binding.
    #[error("unknown middleware `{key}`: no alias, group, or container binding matches")]
    UnknownHandler {
        /// The token name that could not be resolved.
        key: String,
    },

    /// A group or alias referenced itself, directly or transitively.
    #[error("circular middleware reference through `{name}`")]
    CircularReference {
        /// The group or alias name revisited on the active expansion path.
        name: String,
    },

    /// An alias expanding to a list was used where a single handler is
    /// required (an argument-carrying token, or a nested alias position).
    #[error("alias `{name}` expands to a middleware list and cannot be resolved as a single handler")]
    GroupAlias {
        /// The offending alias name.
        name: String,
    },

    /// A failure raised by a middleware or the destination.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl PipelineError {
    /// Creates an unknown-handler error for a token key.
    #[must_use]
    pub fn unknown_handler(key: impl Into<String>) -> Self {
        Self::UnknownHandler { key: key.into() }
    }

    /// Creates a circular-reference error for a group or alias name.
    #[must_use]
    pub fn circular_reference(name: impl Into<String>) -> Self {
        Self::CircularReference { name: name.into() }
    }

    /// Creates a group-alias misuse error.
    #[must_use]
    pub fn group_alias(name: impl Into<String>) -> Self {
        Self::GroupAlias { name: name.into() }
    }

    /// Wraps a middleware failure.
    ///
    /// Middleware bodies usually rely on the `From<anyhow::Error>` impl and
    /// `?` instead; this helper exists for constructing failures from plain
    /// messages.
    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Handler(anyhow::Error::msg(message))
    }

    /// Returns `true` if this is a configuration error (anything other than
    /// a propagated handler failure).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Handler(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_handler_display() {
        let err = PipelineError::unknown_handler("auth");
        let msg = err.to_string();
        assert!(msg.contains("auth"));
        assert!(msg.contains("unknown middleware"));
    }

    #[test]
    fn test_circular_reference_display() {
        let err = PipelineError::circular_reference("web");
        assert!(err.to_string().contains("circular"));
        assert!(err.to_string().contains("web"));
    }

    #[test]
    fn test_group_alias_display() {
        let err = PipelineError::group_alias("gate");
        assert!(err.to_string().contains("gate"));
    }

    #[test]
    fn test_handler_from_anyhow() {
        fn failing() -> PipelineResult<()> {
            Err(anyhow::anyhow!("database unreachable"))?;
            Ok(())
        }

        let err = failing().unwrap_err();
        assert!(matches!(err, PipelineError::Handler(_)));
        assert!(err.to_string().contains("database unreachable"));
    }

    #[test]
    fn test_is_configuration() {
        assert!(PipelineError::unknown_handler("x").is_configuration());
        assert!(PipelineError::circular_reference("x").is_configuration());
        assert!(PipelineError::group_alias("x").is_configuration());
        assert!(!PipelineError::handler("boom").is_configuration());
    }
}
