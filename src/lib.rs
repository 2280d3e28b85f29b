//! A client for the AWS Lambda Runtime API.
//!
//! The runtime fetches one invocation at a time from `/runtime/invocation/next`, hands the event
//! to a [Handler] and posts either the result or a [Diagnostic] back.
//! Handler errors and panics are reported per invocation, while an unreachable Runtime API
//! is reported once via `/runtime/init/error` and ends the loop.
//!
//! ```no_run
//! use lambda_runtime_client::{handler_fn, Error, InvocationContext};
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     lambda_runtime_client::init_tracing();
//!     lambda_runtime_client::run(handler_fn(|event: Value, _ctx: InvocationContext| async move {
//!         Ok::<_, Error>(event)
//!     }))
//!     .await
//! }
//! ```

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod decoder;
pub mod dispatcher;
mod error;
pub mod invoker;
pub mod runtime;
pub mod trace;
pub mod types;

pub use bootstrap::{init_tracing, run};
pub use config::{FunctionConfig, RuntimeEndpointConfig};
pub use error::RuntimeError;
pub use invoker::{handler_fn, Handler};
pub use runtime::Runtime;
pub use trace::current_trace_id;
pub use types::{Diagnostic, Error, InvocationContext, InvocationRequest, InvocationResult};
