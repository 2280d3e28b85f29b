use crate::config::{Config, FunctionConfig, LocalConfig, Mode};
use crate::decoder::decode_body;
use crate::invoker::{invoke, Handler};
use crate::runtime::Runtime;
use crate::types::{Error, InvocationRequest, InvocationResult};
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

/// A request ID substitute for local payloads. Nothing is sent anywhere for it.
pub const LOCAL_REQUEST_ID: &str = "local-request-id";

/// Far enough in the future to never expire while debugging (2034)
const LOCAL_DEADLINE_MS: u64 = 2_035_313_041_000;

const LOCAL_FUNCTION_ARN: &str = "from-local-payload";

const LOCAL_TRACE_ID: &str =
    "Root=0-00000000-000000000000000000000000;Parent=0000000000000000;Sampled=0;Lineage=00000000:0";

/// Starts the runtime with the given handler.
/// - AWS_LAMBDA_RUNTIME_API is set: serves invocations until the Runtime API becomes unreachable
/// - otherwise: runs the handler once with a payload from the file named in the first argument
///
/// Returns an error if the process should exit with a non-zero code.
pub async fn run<H: Handler>(handler: H) -> Result<(), Error> {
    let config = Config::from_env()?;

    match config.mode {
        Mode::Platform(endpoint) => {
            info!("Runtime API: {}", endpoint.base_url());
            Runtime::new(&endpoint, config.function, handler).run().await?;
            Ok(())
        }
        Mode::Local(local_config) => run_local(handler, &local_config, config.function).await,
    }
}

/// Runs the handler once outside of Lambda and prints the result to stdout.
pub async fn run_local<H: Handler>(
    handler: H,
    local_config: &LocalConfig,
    function: FunctionConfig,
) -> Result<(), Error> {
    let payload = match &local_config.payload_file {
        Some(file_name) if file_name == "--help" => {
            print_help();
            return Ok(());
        }
        Some(file_name) => {
            info!("Payload from: {file_name}");
            std::fs::read(file_name).map_err(|e| format!("Failed to read payload from {file_name}: {e}"))?
        }
        None => {
            info!("No payload file. Using {{}}");
            Vec::new()
        }
    };

    let request = InvocationRequest {
        request_id: LOCAL_REQUEST_ID.to_owned(),
        deadline_ms: LOCAL_DEADLINE_MS,
        invoked_function_arn: LOCAL_FUNCTION_ARN.to_owned(),
        trace_id: Some(LOCAL_TRACE_ID.to_owned()),
        client_context: None,
        identity: None,
        event: decode_body(payload.into()),
        received_at: Utc::now(),
    };
    let (event, ctx) = request.into_parts(&function);

    match invoke(Arc::new(handler), event, ctx).await {
        InvocationResult::Success(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        InvocationResult::Failure(diagnostic) => {
            println!("{}", serde_json::to_string_pretty(&diagnostic)?);
            Err(diagnostic.into())
        }
    }
}

fn print_help() {
    println!("AWS Lambda custom runtime.");
    println!("Inside Lambda AWS_LAMBDA_RUNTIME_API is set and invocations come from the Runtime API.");
    println!();
    println!("Local run with a payload: bootstrap [payload_file], e.g. lambda_payload.json");
    println!("Local run with an empty event: bootstrap");
}

/// Initializes the tracing from RUST_LOG env var if present or sets minimal logging:
/// - INFO for this crate and the function binary
/// - WARN for everything else
///
/// No colors and no timestamps because CloudWatch adds its own.
pub fn init_tracing() {
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_none() {
        for directive in default_directives(&binary_name()) {
            filter = filter.add_directive(directive);
        }
    }

    // ignore the error if a subscriber is already set, e.g. by the handler
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .compact()
        .try_init();
}

/// The file name of the running executable, `bootstrap` on Lambda.
fn binary_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|name| name.to_string_lossy().to_string()))
        .unwrap_or_else(|| "bootstrap".to_owned())
}

/// `<target>=info` for this crate and the binary.
/// Tracing uses target names with underscores, e.g. `my_function` for `my-function`.
fn default_directives(binary_name: &str) -> Vec<Directive> {
    let binary_target = binary_name.replace('-', "_");

    [env!("CARGO_CRATE_NAME"), binary_target.as_str()]
        .into_iter()
        .filter_map(|target| Directive::from_str(&[target, "=info"].concat()).ok())
        .collect()
}
