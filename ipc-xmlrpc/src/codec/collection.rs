//! `<array>` and `<struct>` conversions. Element values go back through [super::value].

use crate::{
    codec::{value, DecodeError, ARRAY, DATA, MEMBER, NAME, STRUCT},
    value::Value,
    wire::{Element, VALUE},
};

/// Decode an `<array>` element. It must hold exactly one `<data>`, which holds zero or more values.
pub fn decode_array(array: &Element) -> Result<Value, DecodeError> {
    let data = match array.children() {
        [data] if data.name() == DATA => data,
        [other] => {
            return Err(DecodeError::UnexpectedElement {
                expected: DATA,
                found: other.name().to_string(),
            })
        }
        children => return Err(DecodeError::ArrayData(children.len())),
    };

    data.children()
        .iter()
        .map(value::decode)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

pub fn encode_array(values: &[Value]) -> Element {
    let data = values
        .iter()
        .fold(Element::new(DATA), |data, v| data.with_child(value::encode(v)));

    Element::new(ARRAY).with_child(data)
}

/// Decode a `<struct>` element, keeping member order.
pub fn decode_struct(structure: &Element) -> Result<Value, DecodeError> {
    structure
        .children()
        .iter()
        .map(decode_member)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Struct)
}

fn decode_member(member: &Element) -> Result<(String, Value), DecodeError> {
    if member.name() != MEMBER {
        return Err(DecodeError::UnexpectedElement {
            expected: MEMBER,
            found: member.name().to_string(),
        });
    }

    if member.children().len() != 2 {
        return Err(DecodeError::MemberArity(member.children().len()));
    }

    let name = member
        .child(NAME)
        .ok_or(DecodeError::MissingMemberPart(NAME))?;
    let member_value = member
        .child(VALUE)
        .ok_or(DecodeError::MissingMemberPart(VALUE))?;

    Ok((name.text().to_string(), value::decode(member_value)?))
}

pub fn encode_struct(members: &[(String, Value)]) -> Element {
    members
        .iter()
        .fold(Element::new(STRUCT), |structure, (name, v)| {
            structure.with_child(
                Element::new(MEMBER)
                    .with_child(Element::with_text(NAME, name.as_str()))
                    .with_child(value::encode(v)),
            )
        })
}
