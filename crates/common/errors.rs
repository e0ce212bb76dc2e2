#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Error reading config file: {0}")]
    ConfigFileError(#[from] std::io::Error),
    #[error("Error deserializing config: {0}")]
    ConfigDeserializationError(#[from] serde_json::Error),
    #[error("Unknown fork name '{0}'")]
    UnknownFork(String),
    #[error("{0}")]
    Custom(String),
}
