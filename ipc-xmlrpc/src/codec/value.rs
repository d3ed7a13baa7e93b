//! The `<value>` element: picks the typed child and routes it to the scalar or collection codec.

use crate::{
    codec::{
        collection, scalar, DecodeError, ARRAY, BASE_64, BOOLEAN, DATE_TIME_ISO_8601, DOUBLE, I4,
        INT, NIL, STRING, STRUCT,
    },
    value::Value,
    wire::{Element, VALUE},
};

/// Decode a `<value>` element.
///
/// A value without a typed child is a string. More than one typed child is rejected.
pub fn decode(element: &Element) -> Result<Value, DecodeError> {
    if element.name() != VALUE {
        return Err(DecodeError::UnexpectedElement {
            expected: VALUE,
            found: element.name().to_string(),
        });
    }

    let typed = match element.children() {
        [] => return Ok(Value::Text(element.text().to_string())),
        [typed] => typed,
        _ => return Err(DecodeError::AmbiguousValue),
    };

    let text = typed.text();

    match typed.name() {
        I4 => scalar::decode_int(I4, text).map(Value::Int),
        INT => scalar::decode_int(INT, text).map(Value::Int),
        BOOLEAN => scalar::decode_boolean(text).map(Value::Bool),
        STRING => Ok(Value::Text(text.to_string())),
        DOUBLE => scalar::decode_double(text).map(Value::Double),
        DATE_TIME_ISO_8601 => scalar::decode_date_time(text).map(Value::DateTime),
        BASE_64 => scalar::decode_base64(text).map(Value::Binary),
        NIL => Ok(Value::Null),
        ARRAY => collection::decode_array(typed),
        STRUCT => collection::decode_struct(typed),
        unknown => Err(DecodeError::UnknownType(unknown.to_string())),
    }
}

/// Encode a [Value] into a `<value>` element with exactly one typed child.
pub fn encode(value: &Value) -> Element {
    let typed = match value {
        Value::Null => Element::new(NIL),
        Value::Bool(b) => Element::with_text(BOOLEAN, scalar::encode_boolean(*b)),
        Value::Int(i) => Element::with_text(I4, scalar::encode_int(*i)),
        Value::Double(d) => Element::with_text(DOUBLE, scalar::encode_double(*d)),
        Value::DateTime(dt) => Element::with_text(DATE_TIME_ISO_8601, scalar::encode_date_time(dt)),
        Value::Binary(bytes) => Element::with_text(BASE_64, scalar::encode_base64(bytes)),
        Value::Text(s) => Element::with_text(STRING, s.as_str()),
        Value::Array(values) => collection::encode_array(values),
        Value::Struct(members) => collection::encode_struct(members),
    };

    Element::new(VALUE).with_child(typed)
}
