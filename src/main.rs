/// A basic handler to run the runtime with, e.g. under the Runtime Interface Emulator.
use lambda_runtime_client::{handler_fn, Error, InvocationContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

#[derive(Deserialize, Debug)]
struct Request {
    command: String,
}

#[derive(Serialize)]
struct Response {
    req_id: String,
    msg: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime_client::init_tracing();

    lambda_runtime_client::run(handler_fn(my_handler)).await
}

pub(crate) async fn my_handler(event: Value, ctx: InvocationContext) -> Result<Response, Error> {
    info!("Received event: {event}");

    let command = serde_json::from_value::<Request>(event)?.command;

    info!("Command received: {}", command);

    Ok(Response {
        req_id: ctx.request_id,
        msg: format!("Command {} executed.", command),
    })
}
