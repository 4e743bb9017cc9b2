//! Error types for bot-dispatch.
//!
//! Defines the main error enum used throughout the crate. Match-time
//! conditions are not errors: they are expressed through `MatchOutcome`.

use thiserror::Error;

/// Main error type for dispatch operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Configuration errors (invalid config file, bad field shapes, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A parameter row could not be compiled into a matcher.
    #[error("Compile error in order '{command}' (header '{header}', row {row}): {message}")]
    Compile {
        /// Name of the order being compiled.
        command: String,
        /// Combined header the row was compiled for.
        header: String,
        /// Index of the offending parameter row.
        row: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// I/O errors while reading input or configuration.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a compile error for one parameter row of an order.
    pub fn compile(
        command: impl Into<String>,
        header: impl Into<String>,
        row: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Compile {
            command: command.into(),
            header: header.into(),
            row,
            message: message.into(),
        }
    }

    /// Creates an I/O error with the given message.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Compile { .. } => "Compile Error",
            Self::Io(_) => "I/O Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

/// Result type alias using DispatchError.
pub type Result<T> = std::result::Result<T, DispatchError>;
