#![forbid(unsafe_code)]

//! # ipc-xmlrpc
//!
//! The `ipc-xmlrpc` crate is an XML-RPC protocol binding for asynchronous Rust services. It turns
//! `methodCall` documents into typed calls, hands them to a command executor and turns whatever
//! the executor returns (or raises) into a `methodResponse` document.
//!
//! ## Values
//!
//! Every XML-RPC value is represented by [Value](crate::value::Value), a closed enum over the
//! wire types. Executors work with the looser [Object](crate::object::Object) model instead,
//! which keeps track of native integer widths and carries anything without a dedicated wire
//! shape as text. [ObjectCodec](crate::codec::ObjectCodec) converts between the two:
//!
//! ```rust
//! use ipc_xmlrpc::{codec::ObjectCodec, object::{Map, Object}, value::Value};
//!
//! let codec = ObjectCodec::default();
//! let object = Object::from(Map::new().with("result", 42).with("ratio", 0.5));
//!
//! assert_eq!(
//!     codec.encode(&object).unwrap(),
//!     Value::structure([("result", Value::Int(42)), ("ratio", Value::Double(0.5))])
//! );
//! ```
//!
//! ## Arguments
//!
//! Params are bound to [Arguments](crate::call::Arguments) by a fixed rule: a single struct
//! param is read as named arguments, anything else is positional and keyed `"0"`, `"1"`, ...
//!
//! ```rust
//! use ipc_xmlrpc::{call::{bind, ArgumentKind}, codec::ObjectCodec, value::Value};
//!
//! let codec = ObjectCodec::default();
//!
//! let positional = bind(&[Value::Int(42), Value::Bool(true)], &codec);
//! assert_eq!(positional.kind(), ArgumentKind::Positional);
//! assert_eq!(positional.at::<i32>(0), Ok(42));
//!
//! let named = bind(&[Value::structure([("a", Value::Int(1))])], &codec);
//! assert_eq!(named.kind(), ArgumentKind::Named);
//! assert_eq!(named.get_as::<i32>("a"), Ok(1));
//! ```
//!
//! ## Serving calls
//!
//! A [CommandRouter](crate::executor::CommandRouter) maps method names to commands, and a
//! [ServerBuilder](crate::server::ServerBuilder) puts it behind an HTTP listener. Commands that
//! fail with a [CommandError](crate::executor::CommandError), any other error or a panic are
//! answered with a fault; the connection stays open.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use ipc_xmlrpc::{
//!     call::Call,
//!     executor::{Command, CommandError, CommandRouter, ExecutionResult},
//!     object::{Map, Object},
//!     server::ServerBuilder,
//! };
//!
//! struct Divide;
//!
//! #[async_trait]
//! impl Command for Divide {
//!     async fn execute(&self, call: &mut Call) -> ExecutionResult {
//!         let arguments = call.arguments();
//!         let dividend = arguments.get_as::<f64>("dividend").map_err(anyhow::Error::from)?;
//!         let divisor = arguments.get_as::<f64>("divisor").map_err(anyhow::Error::from)?;
//!
//!         if divisor == 0.0 {
//!             return Err(CommandError::with_code(1, "Division by zero").into());
//!         }
//!
//!         Ok(Object::from(Map::new().with("result", dividend / divisor)))
//!     }
//! }
//!
//! #[tokio::main(flavor = "multi_thread", worker_threads = 4)]
//! async fn main() {
//!     let router = CommandRouter::new().add_command("divide", Box::new(Divide));
//!
//!     let server = ServerBuilder::new(Arc::new(router))
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     println!("Listening on {}", server.url());
//!     tokio::signal::ctrl_c().await.unwrap();
//! }
//! ```

pub mod call;
pub mod codec;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod object;
pub mod server;
pub mod value;
pub mod wire;

pub use {
    call::{Arguments, Call, MethodCall},
    codec::{Fault, ObjectCodec},
    dispatcher::Dispatcher,
    error::ProtocolViolation,
    executor::{CommandExecutor, CommandRouter},
    object::Object,
    server::{Server, ServerBuilder},
    value::Value,
};
