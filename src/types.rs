use crate::config::FunctionConfig;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::type_name;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

/// The error type handlers return. Anything that converts into it can be returned with `?`.
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// errorType for a boxed error whose concrete type is none of the known ones
pub const BOXED_ERROR_TYPE: &str = "HandlerError";

/// Names the concrete type behind a boxed [Error], e.g. `serde_json::error::Error` for a `?` on `from_str`.
/// `type_name` of the box itself says nothing about what went wrong.
pub(crate) fn boxed_error_type(err: &(dyn StdError + Send + Sync + 'static)) -> &'static str {
    if err.is::<serde_json::Error>() {
        type_name::<serde_json::Error>()
    } else if err.is::<std::io::Error>() {
        type_name::<std::io::Error>()
    } else if err.is::<std::num::ParseIntError>() {
        type_name::<std::num::ParseIntError>()
    } else if err.is::<std::num::ParseFloatError>() {
        type_name::<std::num::ParseFloatError>()
    } else if err.is::<std::str::Utf8Error>() {
        type_name::<std::str::Utf8Error>()
    } else if err.is::<std::string::FromUtf8Error>() {
        type_name::<std::string::FromUtf8Error>()
    } else {
        BOXED_ERROR_TYPE
    }
}

/// A single invocation as delivered by `GET /runtime/invocation/next`.
/// Created once per fetch and consumed by the invoker.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Opaque, unique per invocation. Used in the response / error URLs.
    pub request_id: String,
    /// Absolute deadline in ms since the epoch, 0 if the header was missing or invalid
    pub deadline_ms: u64,
    pub invoked_function_arn: String,
    /// E.g. Root=1-6667af77-3f5a28b931d7678525d90593;Parent=66ab8e86299a69bc;Sampled=0
    pub trace_id: Option<String>,
    pub client_context: Option<Value>,
    pub identity: Option<Value>,
    /// The decoded body. An empty object if the body was not valid JSON.
    pub event: Value,
    /// Wall-clock time when the fetch returned
    pub received_at: DateTime<Utc>,
}

impl InvocationRequest {
    /// Splits the request into the event and a read-only context for the handler.
    pub fn into_parts(self, env_config: &FunctionConfig) -> (Value, InvocationContext) {
        let ctx = InvocationContext {
            request_id: self.request_id,
            deadline_ms: self.deadline_ms,
            invoked_function_arn: self.invoked_function_arn,
            xray_trace_id: self.trace_id,
            client_context: self.client_context,
            identity: self.identity,
            received_at: self.received_at,
            env_config: env_config.clone(),
        };

        (self.event, ctx)
    }
}

/// What the handler gets to know about the current invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvocationContext {
    pub request_id: String,
    pub deadline_ms: u64,
    pub invoked_function_arn: String,
    pub xray_trace_id: Option<String>,
    pub client_context: Option<Value>,
    pub identity: Option<Value>,
    pub received_at: DateTime<Utc>,
    pub env_config: FunctionConfig,
}

impl InvocationContext {
    /// The deadline as a timestamp. Falls back to the receipt time if the deadline is out of range.
    pub fn deadline(&self) -> DateTime<Utc> {
        i64::try_from(self.deadline_ms)
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(self.received_at)
    }

    /// Time left until the platform freezes the environment. Zero if the deadline has passed.
    pub fn remaining(&self) -> Duration {
        (self.deadline() - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }
}

/// The error payload understood by the `/error` and `/init/error` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub error_message: String,
    pub error_type: String,
    pub stack_trace: Vec<String>,
}

impl Diagnostic {
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            error_type: error_type.into(),
            stack_trace: Vec::new(),
        }
    }

    /// Builds a diagnostic from a handler error.
    /// A `Diagnostic` returned by the handler is passed through untouched,
    /// otherwise `error_type` is used and the stack trace is the chain of error sources.
    pub fn from_error(error_type: &str, err: Error) -> Self {
        let err = match err.downcast::<Diagnostic>() {
            Ok(diagnostic) => return *diagnostic,
            Err(err) => err,
        };

        let mut stack_trace = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            stack_trace.push(cause.to_string());
            source = cause.source();
        }

        Self {
            error_message: err.to_string(),
            error_type: error_type.to_owned(),
            stack_trace,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.error_message)
    }
}

impl StdError for Diagnostic {}

/// Exactly one of these is produced per invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Success(Value),
    Failure(Diagnostic),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "outer failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn diagnostic_serializes_with_runtime_api_field_names() {
        let d = Diagnostic {
            error_message: "boom".to_owned(),
            error_type: "MyError".to_owned(),
            stack_trace: vec!["frame".to_owned()],
        };

        assert_eq!(
            serde_json::to_value(&d).unwrap(),
            json!({"errorMessage": "boom", "errorType": "MyError", "stackTrace": ["frame"]})
        );
    }

    #[test]
    fn source_chain_becomes_stack_trace() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"));
        let d = Diagnostic::from_error("my_crate::Outer", Box::new(err));

        assert_eq!(d.error_message, "outer failed");
        assert_eq!(d.error_type, "my_crate::Outer");
        assert_eq!(d.stack_trace, vec!["disk on fire".to_owned()]);
    }

    #[test]
    fn diagnostic_returned_by_handler_is_kept_as_is() {
        let err: Error = Box::new(Diagnostic::new("Validation", "bad input"));
        let d = Diagnostic::from_error("ignored", err);

        assert_eq!(d, Diagnostic::new("Validation", "bad input"));
    }

    #[test]
    fn boxed_errors_are_named_after_the_concrete_type() {
        let json_err: Error = serde_json::from_str::<Value>("nope").unwrap_err().into();
        assert_eq!(boxed_error_type(&*json_err), type_name::<serde_json::Error>());

        let int_err: Error = "x".parse::<u32>().unwrap_err().into();
        assert_eq!(boxed_error_type(&*int_err), type_name::<std::num::ParseIntError>());

        let io_err: Error = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert_eq!(boxed_error_type(&*io_err), type_name::<std::io::Error>());

        let text_err: Error = "something went wrong".into();
        assert_eq!(boxed_error_type(&*text_err), BOXED_ERROR_TYPE);
    }

    #[test]
    fn deadline_converts_to_timestamp() {
        let ctx = InvocationContext {
            request_id: "abc-123".to_owned(),
            deadline_ms: 1_700_000_000_000,
            invoked_function_arn: String::new(),
            xray_trace_id: None,
            client_context: None,
            identity: None,
            received_at: Utc::now(),
            env_config: FunctionConfig::default(),
        };

        assert_eq!(ctx.deadline().timestamp_millis(), 1_700_000_000_000);
        // 2023 is in the past
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }
}
