//! Drives a request from body to response: decode, bind, execute, encode.
//!
//! Every failure after the envelope has been parsed becomes a fault response. Only a malformed
//! envelope, a channel missing from the registry or a response that cannot be written are
//! reported as a [ProtocolViolation] for the transport to deal with.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures_util::FutureExt;
use tracing::{error, span, trace, warn, Instrument, Level};

use crate::{
    call::{Call, CallState, MethodCall},
    codec::{
        fault::codes, value, DecodeError, EncodeError, Fault, FaultCodes, ObjectCodec,
    },
    connection::{ChannelId, ConnectionRegistry},
    error::ProtocolViolation,
    executor::{CommandError, CommandExecutor, ExecutionError, UnexpectedError},
    value::Value,
    wire::{fault_document, success_document, Envelope, XmlError},
};

/// Everything that can make a single call fail. Each variant ends up as a fault.
#[derive(thiserror::Error, Debug)]
pub enum CallError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Unexpected(UnexpectedError),
}

impl From<ExecutionError> for CallError {
    fn from(value: ExecutionError) -> Self {
        match value {
            ExecutionError::Command(e) => CallError::Command(e),
            ExecutionError::Unexpected(e) => CallError::Unexpected(e),
        }
    }
}

impl CallError {
    pub fn fault(&self, scheme: FaultCodes) -> Fault {
        match self {
            CallError::Decode(e) => Fault::from_error(e, codes::INVALID_PARAMS, scheme),
            CallError::Encode(e) => Fault::from_error(e, codes::INTERNAL_ERROR, scheme),
            CallError::Command(e) => {
                Fault::from_error(e, e.code.unwrap_or(codes::APPLICATION_ERROR), scheme)
            }
            CallError::Unexpected(e) => Fault::named(
                e.type_name(),
                e.to_string(),
                codes::APPLICATION_ERROR,
                scheme,
            ),
        }
    }
}

/// The single outcome of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success(Value),
    Failure(Fault),
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }

    /// Write the `methodResponse` document for this outcome.
    pub fn to_document(&self) -> Result<String, XmlError> {
        match self {
            CallOutcome::Success(result) => success_document(value::encode(result)),
            CallOutcome::Failure(fault) => fault_document(value::encode(&fault.encode())),
        }
    }
}

pub struct Dispatcher {
    codec: ObjectCodec,
    fault_codes: FaultCodes,
    executor: Arc<dyn CommandExecutor>,
    connections: ConnectionRegistry,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn CommandExecutor>, connections: ConnectionRegistry) -> Self {
        Self {
            codec: ObjectCodec::default(),
            fault_codes: FaultCodes::default(),
            executor,
            connections,
        }
    }

    pub fn with_codec(mut self, codec: ObjectCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_fault_codes(mut self, fault_codes: FaultCodes) -> Self {
        self.fault_codes = fault_codes;
        self
    }

    pub fn codec(&self) -> &ObjectCodec {
        &self.codec
    }

    pub fn fault_codes(&self) -> FaultCodes {
        self.fault_codes
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Handle one fully assembled request body that arrived on `channel` and return the
    /// response body.
    pub async fn handle(&self, channel: ChannelId, body: &str) -> Result<String, ProtocolViolation> {
        let envelope = Envelope::parse(body).map_err(|e| {
            error!("Failed to parse request on channel {channel}: {e}");
            ProtocolViolation::from(e)
        })?;

        let span = span!(
            Level::DEBUG,
            "xmlrpc_call",
            method = %envelope.method_name,
            %channel
        );

        self.handle_envelope(channel, envelope)
            .instrument(span)
            .await
    }

    async fn handle_envelope(
        &self,
        channel: ChannelId,
        envelope: Envelope,
    ) -> Result<String, ProtocolViolation> {
        let method_call = match MethodCall::decode(envelope) {
            Ok(method_call) => method_call,
            Err(e) => {
                warn!("Failed to decode params: {e}");
                let fault = CallError::from(e).fault(self.fault_codes);
                return Ok(CallOutcome::Failure(fault).to_document()?);
            }
        };

        let mut call = Call::new(method_call, &self.codec);

        let connection = self.connections.get(channel).await.ok_or_else(|| {
            error!("No connection registered for channel {channel}");
            ProtocolViolation::UnknownChannel(channel)
        })?;
        call.attach(connection)?;

        let outcome = self.dispatch(&mut call).await?;
        let document = outcome.to_document();
        call.transition(CallState::Responded);

        Ok(document?)
    }

    /// Run a bound call through the executor and encode the result.
    ///
    /// The call must be attached to its connection first and can only be dispatched once.
    /// Executor errors, panics and encoding failures all produce [CallOutcome::Failure].
    pub async fn dispatch(&self, call: &mut Call) -> Result<CallOutcome, ProtocolViolation> {
        if !call.is_attached() {
            return Err(ProtocolViolation::NotAttached);
        }
        if call.state() != CallState::Bound {
            return Err(ProtocolViolation::InvalidState(call.state()));
        }

        call.transition(CallState::Dispatching);

        let outcome = match self.execute(call).await {
            Ok(result) => {
                call.transition(CallState::Succeeded);
                CallOutcome::Success(result)
            }
            Err(e) => {
                warn!("Call \"{}\" failed: {e}", call.method_name());
                call.transition(CallState::Failed);
                CallOutcome::Failure(e.fault(self.fault_codes))
            }
        };

        Ok(outcome)
    }

    async fn execute(&self, call: &mut Call) -> Result<Value, CallError> {
        let method_name = call.method_name().to_string();

        let result = AssertUnwindSafe(self.executor.execute(&method_name, call))
            .catch_unwind()
            .await
            .map_err(|payload| {
                let panic = ExecutorPanic(panic_message(&*payload));
                CallError::Unexpected(UnexpectedError::new(panic))
            })??;

        trace!("Encoding result of \"{method_name}\"");
        Ok(self.codec.encode(&result)?)
    }
}

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
struct ExecutorPanic(String);

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Executor panicked".to_string()
    }
}
