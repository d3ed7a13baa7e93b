//! XML plumbing: the element tree produced by the parser and the
//! `methodCall`/`methodResponse` envelopes around values.

use std::string::FromUtf8Error;

mod document;
mod element;

pub use {
    document::{
        fault_document, method_call_document, success_document, Envelope, EnvelopeError,
    },
    element::Element,
};

pub const METHOD_CALL: &str = "methodCall";
pub const METHOD_NAME: &str = "methodName";
pub const METHOD_RESPONSE: &str = "methodResponse";
pub const PARAMS: &str = "params";
pub const PARAM: &str = "param";
pub const VALUE: &str = "value";
pub const FAULT: &str = "fault";

pub const XML_DECLARATION: &str = r#"<?xml version="1.0"?>"#;

/// Deepest element nesting accepted by [Element::parse], counting the root as depth 1.
///
/// Each nested array or struct costs three levels (`value`, `array`, `data` or `value`,
/// `struct`, `member`), on top of the three taken by `methodCall/params/param`.
pub const MAX_DEPTH: usize = 256;

#[derive(thiserror::Error, Debug)]
pub enum XmlError {
    #[error(transparent)]
    Parse(#[from] quick_xml::Error),
    #[error(transparent)]
    InvalidUtf8(#[from] FromUtf8Error),
    #[error("Failed to write XML: {0}")]
    Write(String),
    #[error("Document is empty")]
    Empty,
    #[error("Document has more than one root element")]
    MultipleRoots,
    #[error("Text outside of the root element")]
    TextOutsideRoot,
    #[error("Unbalanced start and end tags")]
    Unbalanced,
    #[error("Elements nested deeper than {0} levels")]
    TooDeep(usize),
}

impl XmlError {
    fn write(error: impl std::fmt::Display) -> Self {
        XmlError::Write(error.to_string())
    }
}
