use std::{fmt, sync::Arc};

use chrono::NaiveDateTime;

/// A native integer, tagged with the width it was produced with.
///
/// The width decides the wire type: see [ObjectCodec](crate::codec::ObjectCodec).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Int {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
}

impl Int {
    /// Returns the value as an `i32` if this is one of the widths that always fits.
    pub fn as_i32(self) -> Option<i32> {
        match self {
            Int::I8(v) => Some(v.into()),
            Int::I16(v) => Some(v.into()),
            Int::I32(v) => Some(v),
            Int::U8(v) => Some(v.into()),
            Int::U16(v) => Some(v.into()),
            _ => None,
        }
    }

    pub fn as_i64(self) -> Option<i64> {
        match self {
            Int::I64(v) => Some(v),
            Int::I128(v) => i64::try_from(v).ok(),
            Int::U32(v) => Some(v.into()),
            Int::U64(v) => i64::try_from(v).ok(),
            Int::U128(v) => i64::try_from(v).ok(),
            narrow => narrow.as_i32().map(i64::from),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Int::I8(v) => v.into(),
            Int::I16(v) => v.into(),
            Int::I32(v) => v.into(),
            Int::I64(v) => v as f64,
            Int::I128(v) => v as f64,
            Int::U8(v) => v.into(),
            Int::U16(v) => v.into(),
            Int::U32(v) => v.into(),
            Int::U64(v) => v as f64,
            Int::U128(v) => v as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Float {
    F32(f32),
    F64(f64),
}

impl Float {
    pub fn as_f64(self) -> f64 {
        match self {
            Float::F32(v) => v.into(),
            Float::F64(v) => v,
        }
    }
}

/// A value with no dedicated shape, carried around by its textual representation.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Arc<dyn fmt::Display + Send + Sync>,
}

impl Opaque {
    pub fn new<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>({})", self.type_name, self.inner)
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.to_string() == other.to_string()
    }
}

/// Ordered string-keyed map. Duplicate keys are kept; lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map {
    entries: Vec<(String, Object)>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Object>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Builder-style [Map::insert].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Object>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<Object>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Map {
    type Item = (String, Object);
    type IntoIter = std::vec::IntoIter<(String, Object)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// The native side of the codec: what executors receive as arguments and return as results.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Bool(bool),
    List(Vec<Object>),
    Map(Map),
    DateTime(NaiveDateTime),
    Int(Int),
    Float(Float),
    Bytes(Vec<u8>),
    String(String),
    Opaque(Opaque),
}

impl Object {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Object::Bytes(bytes.into())
    }

    pub fn opaque<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Object::Opaque(Opaque::new(value))
    }

    pub fn list<T: Into<Object>>(items: impl IntoIterator<Item = T>) -> Self {
        Object::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Short description of the shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Bool(_) => "bool",
            Object::List(_) => "list",
            Object::Map(_) => "map",
            Object::DateTime(_) => "datetime",
            Object::Int(_) => "integer",
            Object::Float(_) => "float",
            Object::Bytes(_) => "bytes",
            Object::String(_) => "string",
            Object::Opaque(opaque) => opaque.type_name(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Object::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Object]> {
        match self {
            Object::List(list) => Some(list),
            _ => None,
        }
    }
}

macro_rules! object_from_int {
    ($($ty:ty => $variant:ident,)+) => {
        $(
            impl From<$ty> for Object {
                fn from(value: $ty) -> Self {
                    Object::Int(Int::$variant(value))
                }
            }
        )+
    };
}

object_from_int! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
}

impl From<f32> for Object {
    fn from(value: f32) -> Self {
        Object::Float(Float::F32(value))
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Object::Float(Float::F64(value))
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Bool(value)
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Object::String(value.to_string())
    }
}

impl From<String> for Object {
    fn from(value: String) -> Self {
        Object::String(value)
    }
}

impl From<NaiveDateTime> for Object {
    fn from(value: NaiveDateTime) -> Self {
        Object::DateTime(value)
    }
}

impl From<Map> for Object {
    fn from(value: Map) -> Self {
        Object::Map(value)
    }
}

impl From<Vec<Object>> for Object {
    fn from(value: Vec<Object>) -> Self {
        Object::List(value)
    }
}

impl<T: Into<Object>> From<Option<T>> for Object {
    fn from(value: Option<T>) -> Self {
        value.map_or(Object::Null, Into::into)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("Expected {expected} but found {found}")]
pub struct ObjectMismatch {
    pub expected: &'static str,
    pub found: &'static str,
}

/// Typed extraction from a native [Object].
pub trait FromObject: Sized {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch>;
}

fn mismatch<T>(expected: &'static str, object: &Object) -> Result<T, ObjectMismatch> {
    Err(ObjectMismatch {
        expected,
        found: object.kind(),
    })
}

impl FromObject for Object {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch> {
        Ok(object.clone())
    }
}

impl FromObject for bool {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch> {
        match object {
            Object::Bool(b) => Ok(*b),
            other => mismatch("bool", other),
        }
    }
}

impl FromObject for i32 {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch> {
        match object {
            Object::Int(int) => int.as_i32().map_or_else(|| mismatch("i32", object), Ok),
            other => mismatch("i32", other),
        }
    }
}

impl FromObject for i64 {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch> {
        match object {
            Object::Int(int) => int.as_i64().map_or_else(|| mismatch("i64", object), Ok),
            other => mismatch("i64", other),
        }
    }
}

impl FromObject for f64 {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch> {
        match object {
            Object::Float(float) => Ok(float.as_f64()),
            Object::Int(int) => Ok(int.as_f64()),
            other => mismatch("f64", other),
        }
    }
}

impl FromObject for String {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch> {
        match object {
            Object::String(s) => Ok(s.clone()),
            other => mismatch("string", other),
        }
    }
}

impl FromObject for NaiveDateTime {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch> {
        match object {
            Object::DateTime(dt) => Ok(*dt),
            other => mismatch("datetime", other),
        }
    }
}

impl FromObject for Map {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch> {
        match object {
            Object::Map(map) => Ok(map.clone()),
            other => mismatch("map", other),
        }
    }
}

impl<T: FromObject> FromObject for Vec<T> {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch> {
        match object {
            Object::List(items) => items.iter().map(T::from_object).collect(),
            other => mismatch("list", other),
        }
    }
}

impl<T: FromObject> FromObject for Option<T> {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch> {
        match object {
            Object::Null => Ok(None),
            other => T::from_object(other).map(Some),
        }
    }
}

/// Byte sequences, since `Vec<u8>` already reads as a list of integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl FromObject for Bytes {
    fn from_object(object: &Object) -> Result<Self, ObjectMismatch> {
        match object {
            Object::Bytes(bytes) => Ok(Bytes(bytes.clone())),
            other => mismatch("bytes", other),
        }
    }
}
