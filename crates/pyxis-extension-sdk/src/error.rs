//! Error types for the Pyxis extension system

use thiserror::Error;

/// Result type for extension operations
pub type Result<T> = std::result::Result<T, ExtensionError>;

/// Errors that can occur in extension operations
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// Extension not found
    #[error("Extension not found: {0}")]
    NotFound(String),

    /// Network fetch failed
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// Manifest failed validation
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// The entry asset declared by the manifest could not be resolved
    #[error("Entry asset missing: {0}")]
    MissingEntry(String),

    /// Module loading failed
    #[error("Failed to load module: {0}")]
    LoadFailed(String),

    /// Evaluated module does not export a callable `activate`
    #[error("Module for '{0}' does not export activate")]
    MissingActivate(String),

    /// `activate` returned an error
    #[error("Activation failed: {0}")]
    ActivationFailed(String),

    /// `deactivate` returned an error
    #[error("Deactivation failed: {0}")]
    DeactivationFailed(String),

    /// Command lookup failed at execution time
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// `getSystemModule` was called with a name outside the closed set
    #[error("Unknown system module: {0}")]
    UnknownSystemModule(String),

    /// A known system module was requested but the host did not provide it
    #[error("System module not available: {0}")]
    SystemModuleUnavailable(String),

    /// A data URL did not match the `data:<mime>;base64,<payload>` shape
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// ZIP archive could not be read or resolved
    #[error("Archive error: {0}")]
    Archive(String),

    /// Persistent store failure
    #[error("Store error: {0}")]
    Store(String),

    /// An operation exceeded its time bound
    #[error("Timed out: {0}")]
    Timeout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtensionError {
    /// Create a new fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        ExtensionError::FetchFailed(msg.into())
    }

    /// Create a new activation error
    pub fn activation(msg: impl Into<String>) -> Self {
        ExtensionError::ActivationFailed(msg.into())
    }

    /// Create a new archive error
    pub fn archive(msg: impl Into<String>) -> Self {
        ExtensionError::Archive(msg.into())
    }

    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        ExtensionError::Store(msg.into())
    }
}
