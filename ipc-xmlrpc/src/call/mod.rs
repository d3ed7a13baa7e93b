//! A single decoded request and the state it carries while being dispatched.

use std::sync::Arc;

use tracing::trace;

use crate::{
    codec::{value, DecodeError, ObjectCodec},
    connection::Connection,
    error::ProtocolViolation,
    value::Value,
    wire::{method_call_document, Envelope, XmlError},
};

mod arguments;
mod context;

pub use {
    arguments::{bind, ArgumentError, ArgumentKind, Arguments},
    context::Context,
};

/// The decoded contents of a `methodCall` document.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method_name: String,
    pub params: Vec<Value>,
}

impl MethodCall {
    pub fn new(method_name: impl Into<String>, params: impl IntoIterator<Item = Value>) -> Self {
        Self {
            method_name: method_name.into(),
            params: params.into_iter().collect(),
        }
    }

    /// Decode the `<value>` element of every param, in order.
    pub fn decode(envelope: Envelope) -> Result<Self, DecodeError> {
        let params = envelope
            .params
            .iter()
            .map(value::decode)
            .collect::<Result<_, _>>()?;

        Ok(Self {
            method_name: envelope.method_name,
            params,
        })
    }

    pub fn to_document(&self) -> Result<String, XmlError> {
        method_call_document(&self.method_name, self.params.iter().map(value::encode))
    }
}

/// Lifecycle of a [Call]. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CallState {
    /// Decoded, not yet attached to a connection.
    Received,
    /// Attached to a connection.
    Bound,
    /// Handed to the executor.
    Dispatching,
    Succeeded,
    Failed,
    /// The response was handed back to the transport.
    Responded,
}

/// One in-flight call: the request, its bound arguments, a scoped context and the connection
/// it arrived on.
///
/// A `Call` is created per request and dropped once responded to; it is never reused.
#[derive(Debug)]
pub struct Call {
    method_call: MethodCall,
    arguments: Arguments,
    context: Context,
    state: CallState,
    connection: Option<Arc<Connection>>,
}

impl Call {
    /// Create a call in the [CallState::Received] state, binding its arguments from the params.
    pub fn new(method_call: MethodCall, codec: &ObjectCodec) -> Self {
        let arguments = bind(&method_call.params, codec);

        Self {
            method_call,
            arguments,
            context: Context::new(),
            state: CallState::Received,
            connection: None,
        }
    }

    pub fn method_name(&self) -> &str {
        &self.method_call.method_name
    }

    pub fn method_call(&self) -> &MethodCall {
        &self.method_call
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Attach the connection this call arrived on. Can only happen once.
    pub fn attach(&mut self, connection: Arc<Connection>) -> Result<(), ProtocolViolation> {
        if self.connection.is_some() {
            return Err(ProtocolViolation::AlreadyAttached);
        }

        self.connection = Some(connection);
        self.transition(CallState::Bound);
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.connection.is_some()
    }

    /// The connection this call arrived on. Fails if the call was never attached.
    pub fn connection(&self) -> Result<&Arc<Connection>, ProtocolViolation> {
        self.connection
            .as_ref()
            .ok_or(ProtocolViolation::NotAttached)
    }

    pub(crate) fn transition(&mut self, state: CallState) {
        trace!(
            "Call \"{}\" moved from {:?} to {:?}",
            self.method_call.method_name,
            self.state,
            state
        );
        self.state = state;

        if state == CallState::Responded {
            self.context.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connection::ConnectionRegistry, object::Object};

    fn call(params: impl IntoIterator<Item = Value>) -> Call {
        Call::new(MethodCall::new("echo", params), &ObjectCodec::default())
    }

    #[test]
    fn decode_from_envelope() {
        let envelope = Envelope::parse(
            "<methodCall><methodName>echo</methodName><params>\
             <param><value><i4>42</i4></value></param>\
             <param><value><boolean>1</boolean></value></param>\
             </params></methodCall>",
        )
        .unwrap();

        assert_eq!(
            MethodCall::decode(envelope),
            Ok(MethodCall::new("echo", [Value::Int(42), Value::Bool(true)]))
        );
    }

    #[test]
    fn malformed_value_fails_decode() {
        let envelope = Envelope::parse(
            "<methodCall><methodName>echo</methodName><params>\
             <param><value><boolean>yes</boolean></value></param>\
             </params></methodCall>",
        )
        .unwrap();

        assert!(matches!(
            MethodCall::decode(envelope),
            Err(DecodeError::InvalidBoolean(..))
        ));
    }

    #[test]
    fn document_round_trip() {
        let method_call = MethodCall::new(
            "sum",
            [Value::array([Value::Int(1), Value::Int(2)]), Value::text("x")],
        );

        let document = method_call.to_document().unwrap();
        let decoded = MethodCall::decode(Envelope::parse(&document).unwrap()).unwrap();

        assert_eq!(decoded, method_call);
    }

    #[test]
    fn arguments_are_bound_on_construction() {
        let call = call([Value::Int(42)]);

        assert_eq!(call.state(), CallState::Received);
        assert_eq!(call.method_name(), "echo");
        assert_eq!(call.arguments().get("0"), Some(&Object::from(42)));
    }

    #[tokio::test]
    async fn connection_requires_attach() {
        let registry = ConnectionRegistry::new();
        let connection = registry.connect(None).await;
        let mut call = call([]);

        assert!(matches!(
            call.connection(),
            Err(ProtocolViolation::NotAttached)
        ));

        call.attach(connection.clone()).unwrap();
        assert_eq!(call.state(), CallState::Bound);
        assert_eq!(call.connection().unwrap().channel(), connection.channel());

        assert!(matches!(
            call.attach(connection),
            Err(ProtocolViolation::AlreadyAttached)
        ));
    }

    #[test]
    fn context_is_cleared_once_responded() {
        let mut call = call([]);
        call.context_mut().insert("user", 7u32);

        call.transition(CallState::Succeeded);
        assert_eq!(call.context().get::<u32>("user"), Some(&7));

        call.transition(CallState::Responded);
        assert!(call.context().is_empty());
    }
}
