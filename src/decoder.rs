//! Turns a next-invocation response into an [InvocationRequest].
//!
//! Header names are compared in lower case so the decoder works with whatever header
//! collection the caller has: a hyper `HeaderMap`, a list of name/value pairs or a map.

use crate::types::InvocationRequest;
use crate::RuntimeError;
use chrono::Utc;
use hyper::body::Bytes;
use hyper::HeaderMap;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use tracing::{debug, warn};

pub const REQUEST_ID_HEADER: &str = "lambda-runtime-aws-request-id";
pub const DEADLINE_HEADER: &str = "lambda-runtime-deadline-ms";
pub const FUNCTION_ARN_HEADER: &str = "lambda-runtime-invoked-function-arn";
pub const TRACE_ID_HEADER: &str = "lambda-runtime-trace-id";
pub const CLIENT_CONTEXT_HEADER: &str = "lambda-runtime-client-context";
pub const COGNITO_IDENTITY_HEADER: &str = "lambda-runtime-cognito-identity";

/// Case-insensitive read access to a header collection.
pub trait HeaderLookup {
    /// Returns the first value stored under `name`, ignoring the case of both sides.
    fn lookup(&self, name: &str) -> Option<String>;
}

fn find_in_pairs<'a, K, V>(mut pairs: impl Iterator<Item = (&'a K, &'a V)>, name: &str) -> Option<String>
where
    K: AsRef<str> + 'a + ?Sized,
    V: AsRef<str> + 'a + ?Sized,
{
    let name = name.to_ascii_lowercase();
    pairs
        .find(|&(k, _)| <K as AsRef<str>>::as_ref(k).to_ascii_lowercase() == name)
        .map(|(_, v)| <V as AsRef<str>>::as_ref(v).to_owned())
}

impl HeaderLookup for HeaderMap {
    fn lookup(&self, name: &str) -> Option<String> {
        // HeaderMap keys are stored in lower case already
        let value = self.get(name.to_ascii_lowercase().as_str())?;
        match value.to_str() {
            Ok(v) => Some(v.to_owned()),
            Err(_) => {
                warn!("Non-ASCII value in {name}: {}", hex::encode(value.as_bytes()));
                None
            }
        }
    }
}

impl<K: AsRef<str>, V: AsRef<str>> HeaderLookup for [(K, V)] {
    fn lookup(&self, name: &str) -> Option<String> {
        find_in_pairs(self.iter().map(|(k, v)| (k, v)), name)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> HeaderLookup for Vec<(K, V)> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.as_slice().lookup(name)
    }
}

impl<K: AsRef<str>, V: AsRef<str>, S: BuildHasher> HeaderLookup for HashMap<K, V, S> {
    fn lookup(&self, name: &str) -> Option<String> {
        find_in_pairs(self.iter(), name)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> HeaderLookup for BTreeMap<K, V> {
    fn lookup(&self, name: &str) -> Option<String> {
        find_in_pairs(self.iter(), name)
    }
}

/// The body of a next-invocation response, either already parsed or still raw.
#[derive(Debug, Clone)]
pub enum RawBody {
    Json(Value),
    Bytes(Bytes),
}

impl From<Value> for RawBody {
    fn from(v: Value) -> Self {
        RawBody::Json(v)
    }
}

impl From<Bytes> for RawBody {
    fn from(b: Bytes) -> Self {
        RawBody::Bytes(b)
    }
}

impl From<Vec<u8>> for RawBody {
    fn from(b: Vec<u8>) -> Self {
        RawBody::Bytes(Bytes::from(b))
    }
}

impl From<&'static str> for RawBody {
    fn from(s: &'static str) -> Self {
        RawBody::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

/// Returns the event as JSON. Anything that does not parse becomes an empty object.
pub fn decode_body(body: RawBody) -> Value {
    let bytes = match body {
        RawBody::Json(v) => return v,
        RawBody::Bytes(b) => b,
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(v) => v,
        Err(e) => {
            match std::str::from_utf8(&bytes) {
                Ok(s) => debug!("Event is not JSON ({e}), using {{}}: {s}"),
                Err(_) => debug!("Event is not JSON ({e}), using {{}}: {}", hex::encode(&bytes)),
            }
            Value::Object(Map::new())
        }
    }
}

/// Optional headers carrying JSON documents. Kept as a plain string if they are not JSON.
fn decode_json_header<H: HeaderLookup + ?Sized>(headers: &H, name: &str) -> Option<Value> {
    headers
        .lookup(name)
        .filter(|v| !v.is_empty())
        .map(|v| serde_json::from_str(&v).unwrap_or(Value::String(v)))
}

/// Builds an InvocationRequest from the headers and body of a 200 response.
/// Only a missing request ID is an error because no response can be sent without it.
pub fn decode<H: HeaderLookup + ?Sized>(
    headers: &H,
    body: impl Into<RawBody>,
) -> Result<InvocationRequest, RuntimeError> {
    let request_id = headers
        .lookup(REQUEST_ID_HEADER)
        .filter(|v| !v.is_empty())
        .ok_or(RuntimeError::MissingHeader(REQUEST_ID_HEADER))?;

    let deadline_ms = match headers.lookup(DEADLINE_HEADER) {
        Some(v) => v.trim().parse::<u64>().unwrap_or_else(|_| {
            warn!("Invalid {DEADLINE_HEADER}: {v}");
            0
        }),
        None => {
            warn!("Missing {DEADLINE_HEADER}");
            0
        }
    };

    Ok(InvocationRequest {
        request_id,
        deadline_ms,
        invoked_function_arn: headers.lookup(FUNCTION_ARN_HEADER).unwrap_or_default(),
        trace_id: headers.lookup(TRACE_ID_HEADER).filter(|v| !v.is_empty()),
        client_context: decode_json_header(headers, CLIENT_CONTEXT_HEADER),
        identity: decode_json_header(headers, COGNITO_IDENTITY_HEADER),
        event: decode_body(body.into()),
        received_at: Utc::now(),
    })
}
