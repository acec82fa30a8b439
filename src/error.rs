use std::time::Duration;

/// Failures talking to the chat transport. Retried by the ingestion loop.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Transport API error (status {status}): {description}")]
    Api { status: u16, description: String },

    #[error("Failed to decode transport response: {0}")]
    Decode(String),

    #[error("Transport request timed out after {0:?}")]
    Timeout(Duration),
}

/// Failures from the text-generation backend.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Completion API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Completion response contained no text")]
    EmptyResponse,

    #[error("Invalid completion response schema: {0}")]
    InvalidSchema(String),
}

/// The backend answered (or failed to) in a way that cannot become an event.
///
/// Distinct from `Extraction::NoEvent`, which is a valid outcome.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("completion service failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("completion service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("response JSON is malformed: {0}")]
    Malformed(String),

    #[error("response is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has an unusable value: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// Failures creating the calendar event. Reported, never retried.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Calendar authentication failed: {0}")]
    Authentication(String),

    #[error("Calendar API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid calendar response: {0}")]
    InvalidResponse(String),

    #[error("Calendar request timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config line {line}: {content}")]
    Syntax { line: usize, content: String },
}
