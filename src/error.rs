use thiserror::Error;

/// Main error type for the meshrun supervisor
#[derive(Debug, Error)]
pub enum MeshrunError {
    // Launch errors
    #[error("Failed to spawn service '{0}': {1}")]
    SpawnFailed(String, String),

    #[error("Service '{service}' exited during startup")]
    EarlyExit {
        service: String,
        /// Stderr captured from the child before it died
        stderr: String,
    },

    // Shutdown errors
    #[error("Failed to stop service '{0}': {1}")]
    StopError(String, String),

    #[error("Signal error: {0}")]
    SignalError(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Top-level failure: nothing came up, so there is nothing to supervise
    #[error("No services could be started")]
    NoServicesStarted,

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for meshrun operations
pub type Result<T> = std::result::Result<T, MeshrunError>;
