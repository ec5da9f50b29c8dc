//! Core error types for studybuddy-core.
//!
//! Timer operations surface these to the dispatcher, which logs them and
//! carries on; nothing here is meant to take the process down.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studybuddy-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Durable key-value store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Application configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to read the backing file
    #[error("Failed to read store at {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },

    /// Failed to write the backing file
    #[error("Failed to write store at {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    /// Backing document exists but cannot be parsed
    #[error("Store contents are corrupt: {0}")]
    Corrupt(String),

    /// Store is temporarily unusable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Application configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Break longer than half the study period
    #[error("Break must be less than or equal to 50% of study time ({brk} > {study} / 2).")]
    BreakTooLong { study: u32, brk: u32 },

    /// Command name the dispatcher does not know
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
