//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

#![allow(dead_code)] // Some helpers are for future use

use caravel_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// User input failed validation (reference, target, or arguments)
    #[error("{message}")]
    #[diagnostic(code(caravel::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(caravel::cli::io))]
    Io { message: String },

    /// A repository operation failed
    #[error("{message}")]
    #[diagnostic(code(caravel::cli::repo))]
    Repo { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Repo { .. } => exit_codes::ERROR,
        }
    }

    /// Create an input error (user provided invalid input)
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::InvalidReference { .. }
            | RepoError::InvalidTarget { .. }
            | RepoError::InvalidRepositoryUrl { .. } => CliError::Input {
                message: err.to_string(),
                help: None,
            },
            RepoError::Io(_) => CliError::Io {
                message: err.to_string(),
            },
            other => CliError::Repo {
                message: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
