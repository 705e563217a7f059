use std::path::PathBuf;
use thiserror::Error;

/// Classmap error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Unsupported diagram format: {0} (expected plantuml or mermaid)")]
    UnsupportedFormat(String),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Root path is not a directory: {0}")]
    InvalidPath(PathBuf),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

/// Result type alias for classmap operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    /// Create a parser error
    pub fn parser(msg: impl Into<String>) -> Self {
        Error::Parser(msg.into())
    }

    /// True for errors raised while validating options, before any analysis work
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::ConfigParse(_) | Error::ConfigValidation(_) | Error::UnsupportedFormat(_)
        )
    }
}
