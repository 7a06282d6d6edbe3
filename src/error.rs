use std::path::PathBuf;
use std::time::Duration;

/// Main error type for the library.
#[derive(thiserror::Error, Debug)]
pub enum McError {
    /// The GenTL producer file is missing or is not a producer.
    #[error("Producer error: {path}: {reason}")]
    Producer { path: PathBuf, reason: String },

    #[error("Connection error: no device with serial number {0}")]
    DeviceNotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// The feature name is not part of the device schema.
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// The device refused a feature write or command.
    #[error("Feature {name} rejected: {reason}")]
    FeatureRejected { name: String, reason: String },

    /// No buffer arrived in time. With marker recognition enabled this is what
    /// the device does when it cannot find the marker in the scene.
    #[error("Timeout: no buffer received within {0:?}")]
    Timeout(Duration),

    #[error("Missing component: {0}")]
    MissingComponent(String),

    #[error("Chunk error: {0}")]
    Chunk(String),

    #[error("Range grid {range:?} and intensity grid {intensity:?} have different shapes")]
    ShapeMismatch {
        range: (usize, usize),
        intensity: (usize, usize),
    },

    /// Used when the user pass a logical invalid parameter to a function.
    #[error("Parameter error: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Viewer error: {0}")]
    Viewer(String),
}

impl McError {
    /// Create a error with the kind `InvalidParameter`.
    /// # Arguments
    /// * `msg` - The error message.
    pub fn invalid_parameter<T: ToString>(msg: T) -> Self {
        McError::InvalidParameter(msg.to_string())
    }

    /// Create a error with the kind `FeatureRejected`.
    pub fn rejected<N: ToString, R: ToString>(name: N, reason: R) -> Self {
        McError::FeatureRejected {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, McError>;
