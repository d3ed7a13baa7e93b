use std::{
    collections::hash_map::DefaultHasher,
    error::Error,
    fmt,
    hash::{Hash, Hasher},
};

use crate::value::Value;

pub const FAULT_CODE: &str = "faultCode";
pub const FAULT_STRING: &str = "faultString";

/// Fault codes from the XML-RPC interoperability fault code list.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const APPLICATION_ERROR: i32 = -32500;
}

/// How the numeric `faultCode` of a response is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaultCodes {
    /// Use the interoperability code attached to the failure.
    #[default]
    Interop,
    /// Derive the code from the failure itself (type name and message).
    ///
    /// Codes are stable within one build of the server but carry no meaning for clients.
    Identity,
}

impl FaultCodes {
    pub fn resolve(self, interop_code: i32, type_name: &str, message: &str) -> i32 {
        match self {
            FaultCodes::Interop => interop_code,
            FaultCodes::Identity => identity_code(type_name, message),
        }
    }
}

fn identity_code(type_name: &str, message: &str) -> i32 {
    let mut hasher = DefaultHasher::new();
    type_name.hash(&mut hasher);
    message.hash(&mut hasher);

    // Truncation is intended, only the low 32 bits are kept
    hasher.finish() as i32
}

/// An XML-RPC fault: the payload of `methodResponse/fault/value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

impl Fault {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Build a fault from an error value.
    ///
    /// The message is the error's display text, or its type name if that text is empty.
    pub fn from_error<E>(error: &E, interop_code: i32, scheme: FaultCodes) -> Self
    where
        E: Error + ?Sized,
    {
        Self::named(
            std::any::type_name::<E>(),
            error.to_string(),
            interop_code,
            scheme,
        )
    }

    /// Build a fault for an error whose type is only known by name, such as one behind a trait
    /// object.
    pub fn named(type_name: &str, message: String, interop_code: i32, scheme: FaultCodes) -> Self {
        let message = message_or_type_name(message, type_name);

        Self {
            code: scheme.resolve(interop_code, type_name, &message),
            message,
        }
    }

    /// Encode as a struct with exactly two members: `faultCode` then `faultString`.
    pub fn encode(&self) -> Value {
        Value::Struct(vec![
            (FAULT_CODE.to_string(), Value::Int(self.code)),
            (FAULT_STRING.to_string(), Value::Text(self.message.clone())),
        ])
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fault {}: {}", self.code, self.message)
    }
}

pub fn message_or_type_name(message: String, type_name: &str) -> String {
    if message.is_empty() {
        type_name.to_string()
    } else {
        message
    }
}
