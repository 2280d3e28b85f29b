use crate::trace;
use crate::types::{boxed_error_type, Diagnostic, Error, InvocationContext, InvocationResult};
use serde::Serialize;
use serde_json::Value;
use std::any::{type_name, Any};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, Instrument, Span};

/// What a handler produces once awaited: a JSON payload or a ready-to-send error.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, Diagnostic>> + Send + 'static>>;

/// The business logic behind the runtime. Called at most once per fetched invocation.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, event: Value, ctx: InvocationContext) -> HandlerFuture;
}

/// Adapts an async fn or closure into a [Handler]. Returned by [handler_fn].
pub struct HandlerFn<F> {
    f: F,
}

/// Wraps `async fn(Value, InvocationContext) -> Result<impl Serialize, impl Into<Error>>` into a Handler.
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

impl<F, Fut, R, E> Handler for HandlerFn<F>
where
    F: Fn(Value, InvocationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Serialize + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    fn call(&self, event: Value, ctx: InvocationContext) -> HandlerFuture {
        let fut = (self.f)(event, ctx);

        Box::pin(async move {
            match fut.await {
                Ok(resp) => serde_json::to_value(resp)
                    .map_err(|e| Diagnostic::from_error(type_name::<serde_json::Error>(), Box::new(e))),
                Err(e) => {
                    let err: Error = e.into();
                    let error_type = if type_name::<E>() == type_name::<Error>() {
                        boxed_error_type(&*err)
                    } else {
                        type_name::<E>()
                    };
                    Err(Diagnostic::from_error(error_type, err))
                }
            }
        })
    }
}

/// Runs the handler to completion and converts whatever happens into an InvocationResult.
/// Handler errors and panics stop here and never reach the runtime loop.
/// There is no timeout: the platform stops the environment at the deadline.
pub async fn invoke<H: Handler>(handler: Arc<H>, event: Value, ctx: InvocationContext) -> InvocationResult {
    let trace_id = ctx.xray_trace_id.clone();

    // the handler runs on its own task so that a panic surfaces as a JoinError
    // the trace ID is in place before the first poll of the handler future
    let task = tokio::spawn(
        trace::scope(trace_id, async move { handler.call(event, ctx).await }).instrument(Span::current()),
    );

    match task.await {
        Ok(Ok(payload)) => {
            debug!("Handler succeeded");
            InvocationResult::Success(payload)
        }
        Ok(Err(diagnostic)) => {
            error!("Handler failed: {diagnostic}");
            InvocationResult::Failure(diagnostic)
        }
        Err(e) if e.is_panic() => {
            let msg = panic_message(e.into_panic());
            error!("Handler panicked: {msg}");
            InvocationResult::Failure(Diagnostic::new("Panic", msg))
        }
        Err(e) => {
            error!("Handler task failed: {e}");
            InvocationResult::Failure(Diagnostic::new("Cancelled", e.to_string()))
        }
    }
}

/// Extracts the message from `panic!("...")` payloads.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(payload) => match payload.downcast_ref::<&'static str>() {
            Some(s) => (*s).to_owned(),
            None => "Handler panicked with a non-string payload".to_owned(),
        },
    }
}
