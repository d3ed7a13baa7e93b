use crate::{
    call::CallState,
    codec::fault::codes,
    connection::ChannelId,
    wire::{EnvelopeError, XmlError},
};

/// Failures that happen outside of a call: a request that never became a call, a response that
/// could not be written, or a misuse of the call/connection binding.
///
/// These are never turned into a fault by the dispatcher. The transport decides what to do with
/// them, typically answering with [ProtocolViolation::fault_code] and closing the connection.
#[derive(thiserror::Error, Debug)]
pub enum ProtocolViolation {
    #[error("Malformed request: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("Failed to write response: {0}")]
    Xml(#[from] XmlError),
    #[error("Call is not yet attached to a connection")]
    NotAttached,
    #[error("Call is already attached to a connection")]
    AlreadyAttached,
    #[error("Call cannot be dispatched from state {0:?}")]
    InvalidState(CallState),
    #[error("No connection registered for channel {0}")]
    UnknownChannel(ChannelId),
}

impl ProtocolViolation {
    /// Interop fault code for a transport-level answer to this violation.
    ///
    /// Only a request that could not be parsed is the client's fault; everything else is an
    /// internal error.
    pub fn fault_code(&self) -> i32 {
        match self {
            ProtocolViolation::Envelope(_) => codes::PARSE_ERROR,
            _ => codes::INTERNAL_ERROR,
        }
    }
}
