use crate::config::RuntimeEndpointConfig;
use crate::RuntimeError;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Method, Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

/// A fully collected Runtime API response.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Plain HTTP/1 client for the Runtime API.
/// There is no request timeout: the next invocation call is a long poll that may block
/// for as long as the platform has nothing to deliver.
#[derive(Clone)]
pub struct RuntimeApiClient {
    /// E.g. http://127.0.0.1:9001/2018-06-01
    base_url: String,
    http: Client<HttpConnector, Full<Bytes>>,
}

impl RuntimeApiClient {
    pub fn new(endpoint: &RuntimeEndpointConfig) -> Self {
        Self {
            base_url: endpoint.base_url(),
            http: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    /// See https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html#runtimes-api-next
    pub fn next_invocation_url(&self) -> String {
        [&self.base_url, "/runtime/invocation/next"].concat()
    }

    /// See https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html#runtimes-api-response
    pub fn response_url(&self, request_id: &str) -> String {
        format!("{}/runtime/invocation/{}/response", self.base_url, urlencoding::encode(request_id))
    }

    /// See https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html#runtimes-api-invokeerror
    pub fn error_url(&self, request_id: &str) -> String {
        format!("{}/runtime/invocation/{}/error", self.base_url, urlencoding::encode(request_id))
    }

    /// See https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html#runtimes-api-initerror
    pub fn init_error_url(&self) -> String {
        [&self.base_url, "/runtime/init/error"].concat()
    }

    pub async fn get(&self, url: &str) -> Result<ApiResponse, RuntimeError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(url)
            .body(Full::new(Bytes::new()))?;

        self.send(req).await
    }

    /// POSTs a JSON body with any extra headers, e.g. Lambda-Runtime-Function-Error-Type.
    /// Extra headers are optional: a value that is not a valid header value is dropped, the POST still goes out.
    pub async fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse, RuntimeError> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            match HeaderValue::from_str(value) {
                Ok(v) => builder = builder.header(*name, v),
                Err(_) => warn!("Dropping {name}: invalid header value {value:?}"),
            }
        }
        let req = builder.body(Full::new(Bytes::from(body)))?;

        self.send(req).await
    }

    async fn send(&self, req: Request<Full<Bytes>>) -> Result<ApiResponse, RuntimeError> {
        debug!("{} {}", req.method(), req.uri());

        let (parts, body) = self.http.request(req).await?.into_parts();
        let body = body.collect().await?.to_bytes();

        debug!("Status: {}, body: {}B", parts.status, body.len());

        Ok(ApiResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}
