//! Conversions between wire elements, [Value](crate::value::Value)s and native
//! [Object](crate::object::Object)s.
//!
//! Every codec here is stateless and can be shared freely between connections.

pub mod collection;
mod error;
pub mod fault;
mod object;
pub mod scalar;
pub mod value;

pub use {
    error::{DecodeError, EncodeError},
    fault::{Fault, FaultCodes},
    object::{CodecConfig, ObjectCodec},
};

pub const I4: &str = "i4";
pub const INT: &str = "int";
pub const BOOLEAN: &str = "boolean";
pub const STRING: &str = "string";
pub const DOUBLE: &str = "double";
pub const DATE_TIME_ISO_8601: &str = "dateTime.iso8601";
pub const BASE_64: &str = "base64";
pub const NIL: &str = "nil";
pub const ARRAY: &str = "array";
pub const DATA: &str = "data";
pub const STRUCT: &str = "struct";
pub const MEMBER: &str = "member";
pub const NAME: &str = "name";
