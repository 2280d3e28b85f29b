//! An in-process stand-in for the Lambda Runtime API.
//! Serves scripted invocations in order and records every request it gets.
//! Once the script runs out, `/invocation/next` answers 500 so the runtime loop stops.
#![allow(dead_code)]

use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use lambda_runtime_client::RuntimeEndpointConfig;
use regex::Regex;
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::net::TcpListener;

/// Extracts the request ID from /runtime/invocation/[aws-req-id]/response or /error
static REQUEST_ID_REGEX: OnceLock<Regex> = OnceLock::new();

/// One scripted response to GET /runtime/invocation/next
#[derive(Clone, Debug)]
pub struct NextInvocation {
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl NextInvocation {
    pub fn new(request_id: &str, body: &str) -> Self {
        Self {
            headers: vec![
                ("Lambda-Runtime-Aws-Request-Id".to_owned(), request_id.to_owned()),
                ("Lambda-Runtime-Deadline-Ms".to_owned(), "1700000000000".to_owned()),
                (
                    "Lambda-Runtime-Invoked-Function-Arn".to_owned(),
                    "arn:aws:lambda:us-east-1:123:function:test".to_owned(),
                ),
            ],
            body: body.to_owned(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }
}

/// A request received by the mock
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    /// Only set for /response and /error
    pub request_id: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Recorded body is not JSON")
    }

    pub fn is_next(&self) -> bool {
        self.method == Method::GET && self.path.ends_with("/runtime/invocation/next")
    }

    pub fn is_response(&self) -> bool {
        self.method == Method::POST && self.path.ends_with("/response")
    }

    pub fn is_error(&self) -> bool {
        self.method == Method::POST && self.path.contains("/runtime/invocation/") && self.path.ends_with("/error")
    }

    pub fn is_init_error(&self) -> bool {
        self.method == Method::POST && self.path.ends_with("/runtime/init/error")
    }
}

struct MockState {
    invocations: VecDeque<NextInvocation>,
    requests: Vec<Recorded>,
    /// What /response and /error reply with
    post_status: StatusCode,
}

#[derive(Clone)]
pub struct MockRuntimeApi {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
}

impl MockRuntimeApi {
    pub async fn start(invocations: Vec<NextInvocation>) -> Self {
        Self::start_with_post_status(invocations, StatusCode::ACCEPTED).await
    }

    pub async fn start_with_post_status(invocations: Vec<NextInvocation>, post_status: StatusCode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Cannot bind the mock");
        let addr = listener.local_addr().expect("Cannot get the mock address");

        let state = Arc::new(Mutex::new(MockState {
            invocations: invocations.into(),
            requests: Vec::new(),
            post_status,
        }));

        let server_state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(v) => v,
                    Err(_) => return,
                };
                let io = TokioIo::new(stream);
                let conn_state = Arc::clone(&server_state);

                // Spawn a tokio task to serve multiple connections concurrently
                tokio::task::spawn(async move {
                    let svc = service_fn(move |req| lambda_api_handler(Arc::clone(&conn_state), req));
                    let _ = http1::Builder::new().serve_connection(io, svc).await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn endpoint(&self) -> RuntimeEndpointConfig {
        RuntimeEndpointConfig::from_runtime_api(&self.addr.to_string()).expect("Invalid mock address")
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().expect("Poisoned mock state").requests.clone()
    }
}

async fn lambda_api_handler(
    state: Arc<Mutex<MockState>>,
    req: Request<hyper::body::Incoming>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let headers = req.headers().clone();
    let body = req.into_body().collect().await?.to_bytes();

    let regex = REQUEST_ID_REGEX.get_or_init(|| {
        Regex::new(r"/runtime/invocation/(.+)/(response|error)$").expect("Invalid request ID regex. It's a bug.")
    });
    let request_id = regex
        .captures(&path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned());

    let mut state = state.lock().expect("Poisoned mock state");
    state.requests.push(Recorded {
        method: method.clone(),
        path: path.clone(),
        request_id,
        headers,
        body,
    });

    if method == Method::GET && path.ends_with("/invocation/next") {
        let resp = match state.invocations.pop_front() {
            Some(next) => {
                let mut builder = Response::builder().status(StatusCode::OK);
                for (name, value) in next.headers {
                    builder = builder.header(name, value);
                }
                builder.body(full(next.body))
            }
            None => Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(full(r#"{"errorMessage":"no more invocations","errorType":"Mock"}"#)),
        };
        return Ok(resp.expect("Failed to create a response"));
    }

    let status = if path.ends_with("/init/error") {
        StatusCode::ACCEPTED
    } else {
        state.post_status
    };

    Ok(Response::builder()
        .status(status)
        .body(empty())
        .expect("Failed to create a response"))
}

fn empty() -> BoxBody<Bytes, hyper::Error> {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, hyper::Error> {
    Full::new(chunk.into()).map_err(|never| match never {}).boxed()
}
