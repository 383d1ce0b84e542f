//! Loader error types.

use std::path::PathBuf;

/// Errors surfaced by registration and resolution.
///
/// `Clone` because a single failure is observed by every requester attached
/// to the same shared fetch or execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    /// A definition was bound twice for the same id.
    #[error("duplicate registration for module '{id}'")]
    DuplicateRegistration { id: String },

    /// Malformed arguments to `define`.
    #[error("invalid call to define: {detail}")]
    InvalidCall { detail: String },

    /// Resolution reached a fetched id that never registered a definition.
    #[error(
        "no definition for module '{id}' loaded from {locator}; check that it \
         registers itself and that the configuration is right \
         (base_url: '{base_url}', path: '{path}')"
    )]
    MissingDefinition {
        id: String,
        locator: String,
        base_url: String,
        path: String,
    },

    /// The fetcher failed to load the artifact.
    #[error("failed to load module '{id}' from {locator}: {reason}")]
    LoadFailed {
        id: String,
        locator: String,
        reason: String,
    },

    /// The declared dependencies form a cycle.
    #[error("circular dependency: {}", .chain.join(" -> "))]
    CycleDetected { chain: Vec<String> },

    /// The module factory returned an error.
    #[error("factory for module '{id}' failed: {reason}")]
    FactoryFailed { id: String, reason: String },
}

impl LoaderError {
    /// The module id the error is about, if it names one.
    pub fn module_id(&self) -> Option<&str> {
        match self {
            LoaderError::DuplicateRegistration { id }
            | LoaderError::MissingDefinition { id, .. }
            | LoaderError::LoadFailed { id, .. }
            | LoaderError::FactoryFailed { id, .. } => Some(id),
            LoaderError::CycleDetected { chain } => chain.first().map(String::as_str),
            LoaderError::InvalidCall { .. } => None,
        }
    }
}

/// Errors reported by a [`Fetcher`](crate::fetch::Fetcher).
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Nothing exists at the locator.
    #[error("artifact not found at {locator}")]
    NotFound { locator: String },

    /// The artifact exists but could not be read.
    #[error("I/O error reading {locator}: {detail}")]
    Io { locator: String, detail: String },

    /// The artifact was read but is not a valid module declaration.
    #[error("malformed artifact {locator}: {detail}")]
    Malformed { locator: String, detail: String },

    /// The artifact loaded but its registration was rejected.
    #[error("registration rejected: {0}")]
    Rejected(#[from] LoaderError),
}

/// Errors loading a loader configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error.
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_shows_chain() {
        let err = LoaderError::CycleDetected {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "circular dependency: a -> b -> a");
        assert_eq!(err.module_id(), Some("a"));
    }

    #[test]
    fn missing_definition_names_configuration() {
        let err = LoaderError::MissingDefinition {
            id: "util".into(),
            locator: "./vendor/util".into(),
            base_url: "./".into(),
            path: "vendor/util".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'util' loaded from ./vendor/util"));
        assert!(msg.contains("base_url: './'"));
        assert!(msg.contains("path: 'vendor/util'"));
    }

    #[test]
    fn rejected_registration_wraps_loader_error() {
        let err: FetchError = LoaderError::DuplicateRegistration { id: "m".into() }.into();
        assert_eq!(
            err.to_string(),
            "registration rejected: duplicate registration for module 'm'"
        );
        assert_eq!(LoaderError::InvalidCall { detail: "x".into() }.module_id(), None);
    }
}
