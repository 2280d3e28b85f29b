//! The X-Ray trace ID of the invocation being handled.
//!
//! The value lives in a task-local slot that is set right before the handler future starts
//! and only exists for as long as that future runs. Code called from the handler reads it with
//! [current_trace_id] without having to pass the context around.

use std::future::Future;

tokio::task_local! {
    static TRACE_ID: Option<String>;
}

/// Returns the trace ID of the current invocation or None outside of a handler.
pub fn current_trace_id() -> Option<String> {
    TRACE_ID.try_with(|t| t.clone()).ok().flatten()
}

/// Runs `f` with `trace_id` visible to [current_trace_id].
pub(crate) async fn scope<F: Future>(trace_id: Option<String>, f: F) -> F::Output {
    TRACE_ID.scope(trace_id, f).await
}
