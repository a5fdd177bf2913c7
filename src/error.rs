use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Unknown aggregation level: {0}")]
    InvalidLevel(String),

    #[error("Unknown granularity: {0}")]
    InvalidGranularity(String),

    #[error("Unknown metric key: {0}")]
    UnknownMetric(String),

    #[error("Unknown metric preset: {0}")]
    UnknownMetricPreset(String),

    #[error("Aggregation level '{level}' is not supported for {operation}")]
    UnsupportedLevel {
        level: String,
        operation: &'static str,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MetricsError>;
