use crate::client::RuntimeApiClient;
use crate::types::{Diagnostic, InvocationResult};
use crate::RuntimeError;
use hyper::StatusCode;
use serde_json::Value;
use tracing::{debug, error, info};

/// Tells the Runtime API what kind of error the body describes
pub const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

/// Sends the result of an invocation to the matching endpoint.
/// Delivery failures are logged and dropped: a lost response is not retried.
pub async fn dispatch(client: &RuntimeApiClient, request_id: &str, result: InvocationResult) {
    match result {
        InvocationResult::Success(payload) => send_success(client, request_id, &payload).await,
        InvocationResult::Failure(diagnostic) => send_failure(client, request_id, &diagnostic).await,
    }
}

/// POSTs the handler result to /runtime/invocation/{request_id}/response.
pub async fn send_success(client: &RuntimeApiClient, request_id: &str, payload: &Value) {
    let url = client.response_url(request_id);
    if let Err(e) = post(client, &url, serde_json::to_vec(payload), &[]).await {
        error!("Failed to send the response for {request_id}: {e}");
    }
}

/// POSTs the error to /runtime/invocation/{request_id}/error.
pub async fn send_failure(client: &RuntimeApiClient, request_id: &str, diagnostic: &Diagnostic) {
    let url = client.error_url(request_id);
    let headers = [(ERROR_TYPE_HEADER, diagnostic.error_type.as_str())];
    if let Err(e) = post(client, &url, serde_json::to_vec(diagnostic), &headers).await {
        error!("Failed to send the error for {request_id}: {e}");
    }
}

/// POSTs the error to /runtime/init/error. The caller is expected to exit right after.
pub async fn send_init_error(client: &RuntimeApiClient, diagnostic: &Diagnostic) {
    let url = client.init_error_url();
    let headers = [(ERROR_TYPE_HEADER, diagnostic.error_type.as_str())];
    if let Err(e) = post(client, &url, serde_json::to_vec(diagnostic), &headers).await {
        error!("Failed to report the init error: {e}");
    }
}

/// Anything other than 202 Accepted counts as a failed delivery.
async fn post(
    client: &RuntimeApiClient,
    url: &str,
    body: Result<Vec<u8>, serde_json::Error>,
    headers: &[(&str, &str)],
) -> Result<(), RuntimeError> {
    let body = body?;
    debug!("Posting {}B to {url}", body.len());

    let resp = client.post_json(url, body, headers).await?;
    if resp.status != StatusCode::ACCEPTED {
        match std::str::from_utf8(&resp.body) {
            Ok(v) => info!("Runtime API replied with {}: {v}", resp.status),
            Err(_) => info!("Runtime API replied with {}: {}", resp.status, hex::encode(&resp.body)),
        }
        return Err(RuntimeError::UnexpectedStatus {
            status: resp.status,
            path: url.to_owned(),
        });
    }

    Ok(())
}
