use tracing::debug;

use crate::{
    codec::{value, DecodeError, EncodeError},
    object::{Float, Int, Map, Object},
    value::Value,
    wire::Element,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Encode objects without a dedicated shape as their textual representation.
    /// When disabled, encoding such an object fails with [EncodeError::UnsupportedType].
    pub stringify_unknown: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            stringify_unknown: true,
        }
    }
}

/// Converts between native [Object]s and wire [Value]s.
///
/// Encoding classifies the object by shape, in this order: null, bool, list, map, datetime,
/// integral number, floating number, bytes, string. Anything else falls back to its textual
/// representation. Integers that always fit 32 bits (`i8`, `i16`, `i32`, `u8`, `u16`) become
/// `i4`; every other number becomes a `double`, which is lossy for large 64-bit and 128-bit values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectCodec {
    config: CodecConfig,
}

impl ObjectCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn decode(&self, value: &Value) -> Object {
        match value {
            Value::Null => Object::Null,
            Value::Bool(b) => Object::Bool(*b),
            Value::Int(i) => Object::Int(Int::I32(*i)),
            Value::Double(d) => Object::Float(Float::F64(*d)),
            Value::DateTime(dt) => Object::DateTime(*dt),
            Value::Binary(bytes) => Object::Bytes(bytes.clone()),
            Value::Text(s) => Object::String(s.clone()),
            Value::Array(values) => Object::List(values.iter().map(|v| self.decode(v)).collect()),
            Value::Struct(members) => Object::Map(self.decode_members(members)),
        }
    }

    /// Decode struct members into an ordered [Map].
    pub fn decode_members(&self, members: &[(String, Value)]) -> Map {
        members
            .iter()
            .map(|(name, v)| (name.clone(), self.decode(v)))
            .collect()
    }

    pub fn encode(&self, object: &Object) -> Result<Value, EncodeError> {
        let value = match object {
            Object::Null => Value::Null,
            Object::Bool(b) => Value::Bool(*b),
            Object::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.encode(item))
                    .collect::<Result<_, _>>()?,
            ),
            Object::Map(map) => Value::Struct(
                map.iter()
                    .map(|(key, item)| Ok((key.to_string(), self.encode(item)?)))
                    .collect::<Result<_, EncodeError>>()?,
            ),
            Object::DateTime(dt) => Value::DateTime(*dt),
            Object::Int(int) => match int.as_i32() {
                Some(i) => Value::Int(i),
                None => Value::Double(int.as_f64()),
            },
            Object::Float(float) => Value::Double(float.as_f64()),
            Object::Bytes(bytes) => Value::Binary(bytes.clone()),
            Object::String(s) => Value::Text(s.clone()),
            Object::Opaque(opaque) => {
                if !self.config.stringify_unknown {
                    return Err(EncodeError::UnsupportedType(opaque.type_name().to_string()));
                }

                debug!(
                    "No codec configured for {}, using its textual representation",
                    opaque.type_name()
                );
                Value::Text(opaque.to_string())
            }
        };

        Ok(value)
    }

    /// Decode a `<value>` element straight into an [Object].
    pub fn decode_element(&self, element: &Element) -> Result<Object, DecodeError> {
        Ok(self.decode(&value::decode(element)?))
    }

    /// Encode an [Object] straight into a `<value>` element.
    pub fn encode_element(&self, object: &Object) -> Result<Element, EncodeError> {
        Ok(value::encode(&self.encode(object)?))
    }
}
