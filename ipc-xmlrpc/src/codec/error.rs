use crate::codec::{DATA, MEMBER};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Expected <{0}> to contain 1 or 0 but was {1:?}")]
    InvalidBoolean(&'static str, String),
    #[error("Invalid <{0}> value: {1:?}")]
    InvalidNumber(&'static str, String),
    #[error("Invalid <{0}> value {1:?}, expected yyyyMMddTHH:mm:ss")]
    InvalidDateTime(&'static str, String),
    #[error("Invalid <{0}> value: {1}")]
    InvalidBase64(&'static str, String),
    #[error("Ambiguous or empty value")]
    AmbiguousValue,
    #[error("Unknown value type <{0}>")]
    UnknownType(String),
    #[error("Expected <{expected}> but was <{found}>")]
    UnexpectedElement {
        expected: &'static str,
        found: String,
    },
    #[error("Expected array to contain only <{DATA}>, found {0} elements")]
    ArrayData(usize),
    #[error("Expected <{MEMBER}> to contain only 2 elements, found {0}")]
    MemberArity(usize),
    #[error("Expected <{0}> in <{MEMBER}>")]
    MissingMemberPart(&'static str),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("No codec configured for {0}")]
    UnsupportedType(String),
}
