use hyper::StatusCode;
use thiserror::Error;

/// Failures of the runtime itself, as opposed to handler errors which end up in a `Diagnostic`.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Invalid AWS_LAMBDA_RUNTIME_API value: {0:?}. Expected host:port, e.g. 127.0.0.1:9001")]
    InvalidEndpoint(String),

    #[error("Runtime API is unreachable: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("Failed to build a Runtime API request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("Failed to read a Runtime API response: {0}")]
    Body(#[from] hyper::Error),

    #[error("Unexpected status {status} from {path}")]
    UnexpectedStatus { status: StatusCode, path: String },

    #[error("Missing required header {0}")]
    MissingHeader(&'static str),

    #[error("Failed to serialize the payload: {0}")]
    Serialize(#[from] serde_json::Error),
}
