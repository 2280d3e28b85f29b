use crate::client::RuntimeApiClient;
use crate::config::{FunctionConfig, RuntimeEndpointConfig};
use crate::decoder::decode;
use crate::dispatcher::{dispatch, send_init_error};
use crate::invoker::{invoke, Handler};
use crate::types::{Diagnostic, InvocationRequest};
use crate::RuntimeError;
use hyper::StatusCode;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};

/// errorType reported to /runtime/init/error when the next invocation cannot be fetched
pub const FETCH_ERROR_TYPE: &str = "Runtime.NextInvocationError";

/// Where the loop is within the fetch -> invoke -> respond cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Idle,
    Fetching,
    Invoking,
    Responding,
    /// Terminal. The Runtime API is unusable and the process should exit.
    FatalInitError,
}

/// Drives one handler against the Runtime API, one invocation at a time.
pub struct Runtime<H> {
    client: RuntimeApiClient,
    function: FunctionConfig,
    handler: Arc<H>,
}

impl<H: Handler> Runtime<H> {
    pub fn new(endpoint: &RuntimeEndpointConfig, function: FunctionConfig, handler: H) -> Self {
        Self {
            client: RuntimeApiClient::new(endpoint),
            function,
            handler: Arc::new(handler),
        }
    }

    /// Fetches, invokes and responds until fetching fails.
    /// A failed fetch is reported once to /runtime/init/error and returned, nothing is retried.
    /// Every fetched invocation gets exactly one response or error POST before the next fetch.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let mut state = RuntimeState::Idle;

        loop {
            transition(&mut state, RuntimeState::Fetching);
            let request = match self.next_invocation().await {
                Ok(v) => v,
                Err(e) => {
                    transition(&mut state, RuntimeState::FatalInitError);
                    error!("Cannot get the next invocation: {e}");
                    send_init_error(&self.client, &Diagnostic::new(FETCH_ERROR_TYPE, e.to_string())).await;
                    return Err(e);
                }
            };

            let span = info_span!(
                "invocation",
                request_id = %request.request_id,
                trace_id = request.trace_id.as_deref().unwrap_or_default()
            );

            span.in_scope(|| info!("Invocation received"));

            let request_id = request.request_id.clone();
            let (event, ctx) = request.into_parts(&self.function);

            transition(&mut state, RuntimeState::Invoking);
            let result = invoke(Arc::clone(&self.handler), event, ctx)
                .instrument(span.clone())
                .await;

            // the outcome of the POST does not matter, the loop moves on regardless
            transition(&mut state, RuntimeState::Responding);
            dispatch(&self.client, &request_id, result).instrument(span).await;

            transition(&mut state, RuntimeState::Idle);
        }
    }

    /// Long-polls /runtime/invocation/next. Anything but a 200 with a request ID is an error.
    async fn next_invocation(&self) -> Result<InvocationRequest, RuntimeError> {
        let url = self.client.next_invocation_url();
        let resp = self.client.get(&url).await?;

        if resp.status != StatusCode::OK {
            return Err(RuntimeError::UnexpectedStatus {
                status: resp.status,
                path: url,
            });
        }

        decode(&resp.headers, resp.body)
    }
}

fn transition(state: &mut RuntimeState, next: RuntimeState) {
    debug!("{state:?} -> {next:?}");
    *state = next;
}
