use tracing::trace;

use crate::{
    codec::ObjectCodec,
    object::{FromObject, Map, Object, ObjectMismatch},
    value::Value,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("Missing argument \"{0}\"")]
    Missing(String),
    #[error("Invalid argument \"{key}\": {source}")]
    Mismatch {
        key: String,
        #[source]
        source: ObjectMismatch,
    },
}

/// Whether arguments were passed by position or by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArgumentKind {
    #[default]
    Empty,
    /// Keyed `"0"`, `"1"`, ... in parameter order.
    Positional,
    /// Keyed by the member names of a single struct parameter.
    Named,
}

/// The arguments of a call, keyed either by position or by name, never both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    kind: ArgumentKind,
    values: Map,
}

impl Arguments {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn positional(values: impl IntoIterator<Item = Object>) -> Self {
        Self {
            kind: ArgumentKind::Positional,
            values: values
                .into_iter()
                .enumerate()
                .map(|(index, value)| (index.to_string(), value))
                .collect(),
        }
    }

    /// Duplicate names are kept, lookups see the first one.
    pub fn named(values: Map) -> Self {
        Self {
            kind: ArgumentKind::Named,
            values,
        }
    }

    pub fn kind(&self) -> ArgumentKind {
        self.kind
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.values.get(key)
    }

    pub fn get_as<T: FromObject>(&self, key: &str) -> Result<T, ArgumentError> {
        let object = self
            .get(key)
            .ok_or_else(|| ArgumentError::Missing(key.to_string()))?;

        T::from_object(object).map_err(|source| ArgumentError::Mismatch {
            key: key.to_string(),
            source,
        })
    }

    /// Like [Arguments::get_as], but a missing argument is `None` rather than an error.
    pub fn optional<T: FromObject>(&self, key: &str) -> Result<Option<T>, ArgumentError> {
        match self.get(key) {
            Some(_) => self.get_as(key).map(Some),
            None => Ok(None),
        }
    }

    /// Typed access to the positional argument at `index`.
    pub fn at<T: FromObject>(&self, index: usize) -> Result<T, ArgumentError> {
        self.get_as(&index.to_string())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.values.iter()
    }
}

/// Turn a parameter list into call arguments.
///
/// - no parameters: empty arguments
/// - exactly one struct parameter: its members become named arguments
/// - anything else: positional arguments keyed by index
///
/// A caller cannot pass a single struct positionally, it is always read as named arguments.
pub fn bind(params: &[Value], codec: &ObjectCodec) -> Arguments {
    match params {
        [] => {
            trace!("No params provided");
            Arguments::empty()
        }
        [Value::Struct(members)] => {
            trace!("Treating single struct param as named params");
            Arguments::named(codec.decode_members(members))
        }
        params => {
            trace!("Treating {} params as positional", params.len());
            Arguments::positional(params.iter().map(|param| codec.decode(param)))
        }
    }
}
