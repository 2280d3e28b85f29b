use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::env::var;
use tracing::{debug, warn};

/// Host:port of the Runtime API, e.g. 127.0.0.1:9001. Its presence means we run inside Lambda.
pub const RUNTIME_API_ENV_VAR: &str = "AWS_LAMBDA_RUNTIME_API";

/// Version prefix of every Runtime API path
pub const RUNTIME_API_VERSION: &str = "2018-06-01";

/// Where the Runtime API lives. Set once at bootstrap, read-only after that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEndpointConfig {
    /// E.g. 127.0.0.1
    pub host: String,
    /// E.g. 9001
    pub port: u16,
}

impl RuntimeEndpointConfig {
    /// Parses the value of AWS_LAMBDA_RUNTIME_API.
    /// Unlike the emulator listener, any host name is accepted, not just IPv4.
    pub fn from_runtime_api(value: &str) -> Result<Self, RuntimeError> {
        let invalid = || RuntimeError::InvalidEndpoint(value.to_owned());

        let (host, port) = value.trim().rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;

        Ok(Self {
            host: host.to_owned(),
            port,
        })
    }

    /// E.g. http://127.0.0.1:9001/2018-06-01
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/{}", self.host, self.port, RUNTIME_API_VERSION)
    }
}

/// Function metadata the platform exposes via env vars. Copied into every context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionConfig {
    pub function_name: String,
    pub memory: u32,
    pub version: String,
    pub log_stream: String,
    pub log_group: String,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            function_name: String::new(),
            memory: 128,
            version: "$LATEST".to_owned(),
            log_stream: String::new(),
            log_group: String::new(),
        }
    }
}

impl FunctionConfig {
    /// Reads the standard AWS_LAMBDA_* vars, using defaults for anything missing.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let memory = match var("AWS_LAMBDA_FUNCTION_MEMORY_SIZE") {
            Ok(v) => v.parse::<u32>().unwrap_or_else(|_| {
                warn!("Invalid AWS_LAMBDA_FUNCTION_MEMORY_SIZE: {v}. Using {}", defaults.memory);
                defaults.memory
            }),
            Err(_) => defaults.memory,
        };

        Self {
            function_name: var("AWS_LAMBDA_FUNCTION_NAME").unwrap_or(defaults.function_name),
            memory,
            version: var("AWS_LAMBDA_FUNCTION_VERSION").unwrap_or(defaults.version),
            log_stream: var("AWS_LAMBDA_LOG_STREAM_NAME").unwrap_or(defaults.log_stream),
            log_group: var("AWS_LAMBDA_LOG_GROUP_NAME").unwrap_or(defaults.log_group),
        }
    }
}

/// Payloads come from the local file, results go to stdout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// File name as provided in the param. No file means an empty event.
    pub payload_file: Option<String>,
}

/// A concrete type for either the platform or the local debugging mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Platform(RuntimeEndpointConfig),
    Local(LocalConfig),
}

#[derive(Debug)]
pub struct Config {
    pub mode: Mode,
    pub function: FunctionConfig,
}

impl Config {
    /// Creates a new Config from the environment and the command line.
    /// Fails only if AWS_LAMBDA_RUNTIME_API is set but cannot be parsed.
    pub fn from_env() -> Result<Self, RuntimeError> {
        Self::from_parts(
            var(RUNTIME_API_ENV_VAR).ok(),
            std::env::args().nth(1),
            FunctionConfig::from_env(),
        )
    }

    /// Picks the mode from the value of AWS_LAMBDA_RUNTIME_API, if any.
    /// The payload file is only used in the local mode.
    pub fn from_parts(
        runtime_api: Option<String>,
        payload_file: Option<String>,
        function: FunctionConfig,
    ) -> Result<Self, RuntimeError> {
        let mode = match runtime_api {
            Some(v) => Mode::Platform(RuntimeEndpointConfig::from_runtime_api(&v)?),
            None => Mode::Local(LocalConfig { payload_file }),
        };
        debug!("Runtime mode: {mode:?}");

        Ok(Self { mode, function })
    }
}
