use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use ipc_xmlrpc::{
    call::{Call, MethodCall},
    codec::value,
    executor::{Command, CommandError, CommandRouter, ExecutionResult},
    object::{Map, Object},
    server::{Server, ServerBuilder},
    value::Value,
    wire::Element,
};

pub async fn setup() -> (Server, WorkerGuard) {
    setup_with(|builder| builder).await
}

#[allow(dead_code)]
pub async fn setup_with(
    configure: impl FnOnce(ServerBuilder) -> ServerBuilder,
) -> (Server, WorkerGuard) {
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(non_blocking)
        .finish();

    // Several tests share one process, only the first one installs its subscriber
    let _ = tracing::subscriber::set_global_default(subscriber);

    let builder = ServerBuilder::new(Arc::new(router()))
        .bind_address("127.0.0.1:0".parse().unwrap());

    let server = configure(builder).build().await.unwrap();

    (server, guard)
}

struct Echo;

#[async_trait]
impl Command for Echo {
    async fn execute(&self, call: &mut Call) -> ExecutionResult {
        Ok(Object::Map(
            call.arguments()
                .iter()
                .map(|(key, value)| (key, value.clone()))
                .collect(),
        ))
    }
}

struct SessionId;

#[async_trait]
impl Command for SessionId {
    async fn execute(&self, call: &mut Call) -> ExecutionResult {
        let connection = call.connection().map_err(anyhow::Error::from)?;
        let session = connection
            .session()
            .await
            .ok_or_else(|| anyhow::anyhow!("No session attached"))?;

        Ok(Object::from(session.id()))
    }
}

struct Slow;

#[async_trait]
impl Command for Slow {
    async fn execute(&self, call: &mut Call) -> ExecutionResult {
        let millis = call.arguments().at::<i32>(0).map_err(anyhow::Error::from)?;
        tokio::time::sleep(Duration::from_millis(millis as u64)).await;

        Ok(Object::from(millis))
    }
}

fn result(call: &mut Call) -> ExecutionResult {
    let value = call.arguments().at::<i32>(0).map_err(anyhow::Error::from)?;
    Ok(Object::from(Map::new().with("result", value)))
}

fn sum(call: &mut Call) -> ExecutionResult {
    let values = call
        .arguments()
        .at::<Vec<i32>>(0)
        .map_err(anyhow::Error::from)?;

    Ok(Object::from(values.iter().map(|v| *v as i64).sum::<i64>()))
}

fn boom(_: &mut Call) -> ExecutionResult {
    Err(CommandError::new("boom").into())
}

fn explode(_: &mut Call) -> ExecutionResult {
    panic!("kaboom")
}

fn wide(_: &mut Call) -> ExecutionResult {
    Ok(Object::list([Object::from(7u16), Object::from(7u32), Object::from(i64::MAX)]))
}

pub fn router() -> CommandRouter {
    CommandRouter::new()
        .add_command("echo", Box::new(Echo))
        .add_command("session", Box::new(SessionId))
        .add_command("slow", Box::new(Slow))
        .add_command("result", Box::new(result))
        .add_command("sum", Box::new(sum))
        .add_command("boom", Box::new(boom))
        .add_command("explode", Box::new(explode))
        .add_command("wide", Box::new(wide))
}

#[derive(Debug, PartialEq)]
pub enum Response {
    Success(Value),
    Fault { code: i32, message: String },
}

pub fn method_call(method_name: &str, params: impl IntoIterator<Item = Value>) -> String {
    MethodCall::new(method_name, params).to_document().unwrap()
}

pub async fn post(
    client: &reqwest::Client,
    server: &Server,
    body: impl Into<String>,
    cookie: Option<&str>,
) -> reqwest::Response {
    let mut request = client
        .post(server.url().clone())
        .header(CONTENT_TYPE, "text/xml")
        .body(body.into());

    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }

    tokio::time::timeout(Duration::from_secs(5), request.send())
        .await
        .expect("Timed out waiting for response")
        .unwrap()
}

pub async fn call(
    server: &Server,
    method_name: &str,
    params: impl IntoIterator<Item = Value>,
) -> Response {
    let client = reqwest::Client::new();
    let response = post(&client, server, method_call(method_name, params), None).await;

    assert!(response.status().is_success());
    parse_response(&response.text().await.unwrap())
}

pub fn parse_response(document: &str) -> Response {
    let root = Element::parse(document).unwrap();
    assert_eq!(root.name(), "methodResponse");

    if let Some(fault) = root.child("fault") {
        let fault = value::decode(fault.child("value").unwrap()).unwrap();
        let Value::Struct(members) = fault else {
            panic!("Fault value must be a struct");
        };

        let [(code_name, Value::Int(code)), (string_name, Value::Text(message))] =
            members.as_slice()
        else {
            panic!("Unexpected fault members: {members:?}");
        };
        assert_eq!((code_name.as_str(), string_name.as_str()), ("faultCode", "faultString"));

        return Response::Fault {
            code: *code,
            message: message.clone(),
        };
    }

    let value = root
        .child("params")
        .and_then(|params| params.child("param"))
        .and_then(|param| param.child("value"))
        .expect("Response has neither params nor fault");

    Response::Success(value::decode(value).unwrap())
}

/// Value of `name` in the response's `Set-Cookie` header.
#[allow(dead_code)]
pub fn session_cookie(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .filter_map(|header| header.split(';').next())
        .filter_map(|cookie| cookie.split_once('='))
        .find(|(cookie_name, _)| *cookie_name == name)
        .map(|(_, value)| value.to_string())
}

#[allow(dead_code)]
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let mut interval = tokio::time::interval(Duration::from_millis(50));

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if condition().await {
                return;
            }

            interval.tick().await;
        }
    })
    .await
    .expect("Timed out waiting for condition");
}
