//! Common types and utilities for swaggerdoc
//!
//! This crate contains the error type, the rendering [`Mode`], option
//! resolution and the scratch workspace shared by the parser, generator,
//! preprocessor and CLI components.

pub mod config;
pub mod options;
pub mod workspace;

pub use options::{
    ConfigBuilder, EffectiveConfig, Environment, Layer, OptionValue, RawOptions, Resolution,
};
pub use workspace::{Invocation, ScratchWorkspace};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while turning a spec into Markdown
#[derive(Error, Debug)]
pub enum SwaggerdocError {
    #[error("Can't find file {} (option `{option}`)", .path.display())]
    MissingFile { option: String, path: PathBuf },

    #[error("Cannot retrieve swagger spec file from url {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("No valid swagger spec file specified")]
    AcquisitionFailure,

    #[error("One of the options {} is required", .candidates.join(", "))]
    MissingRequiredOption { candidates: Vec<String> },

    #[error("Invalid mode `{value}`, expected one of: {}", .allowed.join(", "))]
    InvalidMode { value: String, allowed: Vec<String> },

    #[error("Failed to render doc template {template}: {message}")]
    TemplateRender { template: String, message: String },

    #[error("{program} failed ({status}). Full build log at {}", .log_path.display())]
    ConverterExecution {
        program: String,
        status: String,
        log_path: PathBuf,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SwaggerdocError {
    /// Whether the error stops the current tag.
    ///
    /// Non-fatal errors are logged and the pipeline degrades around them.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SwaggerdocError::MissingFile { .. }
                | SwaggerdocError::Fetch { .. }
                | SwaggerdocError::TemplateRender { .. }
        )
    }
}

/// Result type for swaggerdoc operations
pub type Result<T> = std::result::Result<T, SwaggerdocError>;

/// Rendering strategy selected by the `mode` option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Render the spec through a template
    Jinja,
    /// Delegate to the external `widdershins` converter
    Widdershins,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Jinja, Mode::Widdershins];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Jinja => "jinja",
            Mode::Widdershins => "widdershins",
        }
    }

    fn allowed() -> Vec<String> {
        Self::ALL.iter().map(|m| m.as_str().to_string()).collect()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = SwaggerdocError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| SwaggerdocError::InvalidMode {
                value: s.to_string(),
                allowed: Self::allowed(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("jinja".parse::<Mode>().unwrap(), Mode::Jinja);
        assert_eq!(" widdershins ".parse::<Mode>().unwrap(), Mode::Widdershins);
    }

    #[test]
    fn test_invalid_mode_lists_allowed_values() {
        let err = "markdown".parse::<Mode>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("markdown"), "{msg}");
        assert!(msg.contains("jinja, widdershins"), "{msg}");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_fatality() {
        let warning = SwaggerdocError::Fetch {
            url: "http://localhost/spec".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(!warning.is_fatal());
        assert!(SwaggerdocError::AcquisitionFailure.is_fatal());
    }
}
