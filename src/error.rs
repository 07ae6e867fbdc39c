//
//  error.rs
//  RouteLens
//

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the routelens library.
///
/// Most environmental failures (unreadable files, an unreachable database,
/// a malformed completion) are logged and degraded to empty results at the
/// component boundary. The variants here are what crosses that boundary
/// internally, plus [`RouteLensError::InvalidRoute`], which is the one error
/// callers are expected to see.
#[derive(Debug, Error)]
pub enum RouteLensError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported source language: {0}")]
    UnsupportedLanguage(PathBuf),

    #[error("failed to initialise parser for {0}: {1}")]
    ParserInitError(PathBuf, String),

    #[error("tree-sitter produced no tree for {0}")]
    TreeSitterParseFailed(PathBuf),

    #[error("syntax error in {path} at line {line}")]
    SyntaxError { path: PathBuf, line: usize },

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("data store error: {0}")]
    Store(String),

    #[error("data store unavailable")]
    StoreUnavailable,

    #[error("completion error: {0}")]
    Completion(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for RouteLensError {
    fn from(e: mongodb::error::Error) -> Self {
        RouteLensError::Store(e.to_string())
    }
}

impl From<reqwest::Error> for RouteLensError {
    fn from(e: reqwest::Error) -> Self {
        RouteLensError::Completion(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RouteLensError>;
