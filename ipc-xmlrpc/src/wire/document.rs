use crate::wire::{
    Element, XmlError, FAULT, METHOD_CALL, METHOD_NAME, METHOD_RESPONSE, PARAM, PARAMS, VALUE,
    XML_DECLARATION,
};

#[derive(thiserror::Error, Debug)]
pub enum EnvelopeError {
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),
    #[error("Expected <{METHOD_CALL}> but document root was <{0}>")]
    UnexpectedRoot(String),
    #[error("Missing <{METHOD_NAME}>")]
    MissingMethodName,
    #[error("Unexpected <{found}> inside <{parent}>")]
    UnexpectedElement { parent: &'static str, found: String },
    #[error("Expected <{PARAM}> to contain exactly one <{VALUE}>, found {0} elements")]
    ParamArity(usize),
}

/// The outer shape of a request: the method name and the raw `<value>` element of each param.
///
/// Values are left undecoded so that a malformed value can be reported to the caller as a fault,
/// while a malformed envelope is rejected outright.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub method_name: String,
    pub params: Vec<Element>,
}

impl Envelope {
    pub fn parse(document: &str) -> Result<Self, EnvelopeError> {
        Self::from_element(Element::parse(document)?)
    }

    pub fn from_element(root: Element) -> Result<Self, EnvelopeError> {
        if root.name() != METHOD_CALL {
            return Err(EnvelopeError::UnexpectedRoot(root.name().to_string()));
        }

        let mut method_name = None;
        let mut params = Vec::new();

        for child in root.into_children() {
            let name = child.name().to_string();
            match name.as_str() {
                METHOD_NAME if method_name.is_none() => {
                    method_name = Some(child.text().trim().to_string());
                }
                PARAMS => {
                    for param in child.into_children() {
                        params.push(Self::param_value(param)?);
                    }
                }
                _ => {
                    return Err(EnvelopeError::UnexpectedElement {
                        parent: METHOD_CALL,
                        found: name,
                    })
                }
            }
        }

        let method_name = method_name
            .filter(|name| !name.is_empty())
            .ok_or(EnvelopeError::MissingMethodName)?;

        Ok(Self {
            method_name,
            params,
        })
    }

    fn param_value(param: Element) -> Result<Element, EnvelopeError> {
        if param.name() != PARAM {
            return Err(EnvelopeError::UnexpectedElement {
                parent: PARAMS,
                found: param.name().to_string(),
            });
        }

        let mut children = param.into_children();
        if children.len() != 1 {
            return Err(EnvelopeError::ParamArity(children.len()));
        }

        let value = children.remove(0);
        if value.name() != VALUE {
            return Err(EnvelopeError::UnexpectedElement {
                parent: PARAM,
                found: value.name().to_string(),
            });
        }

        Ok(value)
    }
}

fn with_declaration(root: &Element) -> Result<String, XmlError> {
    Ok([XML_DECLARATION, root.to_xml()?.as_str()].join("\n"))
}

/// Build a `methodCall` document from already encoded `<value>` elements.
pub fn method_call_document(
    method_name: &str,
    params: impl IntoIterator<Item = Element>,
) -> Result<String, XmlError> {
    let params = params
        .into_iter()
        .fold(Element::new(PARAMS), |params, value| {
            params.with_child(Element::new(PARAM).with_child(value))
        });

    with_declaration(
        &Element::new(METHOD_CALL)
            .with_child(Element::with_text(METHOD_NAME, method_name))
            .with_child(params),
    )
}

/// `methodResponse/params/param/value`
pub fn success_document(value: Element) -> Result<String, XmlError> {
    with_declaration(
        &Element::new(METHOD_RESPONSE).with_child(
            Element::new(PARAMS).with_child(Element::new(PARAM).with_child(value)),
        ),
    )
}

/// `methodResponse/fault/value`
pub fn fault_document(value: Element) -> Result<String, XmlError> {
    with_declaration(&Element::new(METHOD_RESPONSE).with_child(Element::new(FAULT).with_child(value)))
}
