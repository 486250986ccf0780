//! Generic MessagePack value types.

use std::cmp::Ordering;
use std::fmt;

use crate::ext::{ExtensionValue, Timestamp};

/// A MessagePack value: the node type produced by decoding and consumed by
/// encoding.
///
/// Maps are an ordered list of pairs rather than a hash table. MessagePack
/// permits duplicate and non-primitive keys, and both are kept as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum MsgpackValue {
    Nil,
    Boolean(bool),
    Integer(Integer),
    Float(Float),
    String(String),
    Binary(Vec<u8>),
    Array(Vec<MsgpackValue>),
    Map(Vec<(MsgpackValue, MsgpackValue)>),
    Extension(ExtensionValue),
    Timestamp(Timestamp),
}

/// An integer together with its width and signedness.
///
/// Equality and ordering compare numeric values only, so `U64(5) == U8(5)`.
#[derive(Debug, Clone, Copy)]
pub enum Integer {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
}

/// A floating point number together with its width.
///
/// Values compare after widening to `f64`.
#[derive(Debug, Clone, Copy)]
pub enum Float {
    F32(f32),
    F64(f64),
}

impl Integer {
    /// Width in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::U8(_) | Self::I8(_) => 1,
            Self::U16(_) | Self::I16(_) => 2,
            Self::U32(_) | Self::I32(_) => 4,
            Self::U64(_) | Self::I64(_) => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::I8(_) | Self::I16(_) | Self::I32(_) | Self::I64(_))
    }

    /// The numeric value, wide enough for every variant.
    pub fn to_i128(self) -> i128 {
        match self {
            Self::U8(v) => i128::from(v),
            Self::U16(v) => i128::from(v),
            Self::U32(v) => i128::from(v),
            Self::U64(v) => i128::from(v),
            Self::I8(v) => i128::from(v),
            Self::I16(v) => i128::from(v),
            Self::I32(v) => i128::from(v),
            Self::I64(v) => i128::from(v),
        }
    }

    /// The value as `i64`, if it fits.
    pub fn as_i64(self) -> Option<i64> {
        i64::try_from(self.to_i128()).ok()
    }

    /// The value as `u64`, if it fits.
    pub fn as_u64(self) -> Option<u64> {
        u64::try_from(self.to_i128()).ok()
    }
}

impl PartialEq for Integer {
    fn eq(&self, other: &Self) -> bool {
        self.to_i128() == other.to_i128()
    }
}

impl Eq for Integer {}

impl PartialOrd for Integer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Integer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_i128().cmp(&other.to_i128())
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_i128())
    }
}

impl Float {
    /// Width in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::F32(_) => 4,
            Self::F64(_) => 8,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Self::F32(v) => f64::from(v),
            Self::F64(v) => v,
        }
    }
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.to_f64() == other.to_f64()
    }
}

impl PartialOrd for Float {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.to_f64().partial_cmp(&other.to_f64())
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
        }
    }
}

impl MsgpackValue {
    /// Short name of the active variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Binary(_) => "binary",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Extension(_) => "extension",
            Self::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as a string reference, if it is a `String` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an i64, if it is an `Integer` that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => i.as_i64(),
            _ => None,
        }
    }

    /// Returns the value as a u64, if it is a non-negative `Integer`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Integer(i) => i.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(v.to_f64()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[MsgpackValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(MsgpackValue, MsgpackValue)]> {
        match self {
            Self::Map(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Looks up the first entry whose key is the string `key`.
    pub fn map_get(&self, key: &str) -> Option<&MsgpackValue> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }
}

// -- Convenience conversions --

impl From<bool> for MsgpackValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

macro_rules! from_integer {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for MsgpackValue {
                fn from(v: $ty) -> Self {
                    Self::Integer(Integer::$variant(v))
                }
            }
        )*
    };
}

from_integer!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
);

impl From<f32> for MsgpackValue {
    fn from(v: f32) -> Self {
        Self::Float(Float::F32(v))
    }
}

impl From<f64> for MsgpackValue {
    fn from(v: f64) -> Self {
        Self::Float(Float::F64(v))
    }
}

impl From<String> for MsgpackValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for MsgpackValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<Vec<u8>> for MsgpackValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Binary(b)
    }
}

impl From<Vec<MsgpackValue>> for MsgpackValue {
    fn from(v: Vec<MsgpackValue>) -> Self {
        Self::Array(v)
    }
}

impl From<Vec<(MsgpackValue, MsgpackValue)>> for MsgpackValue {
    fn from(pairs: Vec<(MsgpackValue, MsgpackValue)>) -> Self {
        Self::Map(pairs)
    }
}

impl From<ExtensionValue> for MsgpackValue {
    fn from(e: ExtensionValue) -> Self {
        Self::Extension(e)
    }
}

impl From<Timestamp> for MsgpackValue {
    fn from(t: Timestamp) -> Self {
        Self::Timestamp(t)
    }
}

impl fmt::Display for MsgpackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Binary(b) => write!(f, "<{} bytes>", b.len()),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Extension(e) => write!(f, "ext({}, <{} bytes>)", e.type_code(), e.data().len()),
            Self::Timestamp(t) => write!(f, "timestamp({}s {}ns)", t.seconds(), t.nanoseconds()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_compare_by_value() {
        assert_eq!(Integer::U64(5), Integer::U8(5));
        assert_eq!(Integer::I32(-1), Integer::I8(-1));
        assert_ne!(Integer::U8(255), Integer::I8(-1));
        assert!(Integer::I64(-2) < Integer::U8(0));
    }

    #[test]
    fn integer_accessors() {
        assert_eq!(Integer::U64(u64::MAX).as_i64(), None);
        assert_eq!(Integer::I16(-3).as_u64(), None);
        assert_eq!(Integer::I16(-3).as_i64(), Some(-3));
        assert_eq!(Integer::U16(3).width(), 2);
        assert!(Integer::I8(0).is_signed());
    }

    #[test]
    fn floats_compare_widened() {
        assert_eq!(Float::F32(2.5), Float::F64(2.5));
        assert_ne!(Float::F32(0.1), Float::F64(0.1));
        assert_ne!(Float::F64(f64::NAN), Float::F64(f64::NAN));
    }

    #[test]
    fn map_get_finds_first_string_key() {
        let map = MsgpackValue::Map(vec![
            (MsgpackValue::from(1u8), MsgpackValue::from("int key")),
            (MsgpackValue::from("name"), MsgpackValue::from("first")),
            (MsgpackValue::from("name"), MsgpackValue::from("second")),
        ]);
        assert_eq!(map.map_get("name"), Some(&MsgpackValue::from("first")));
        assert_eq!(map.map_get("missing"), None);
    }

    #[test]
    fn display_nested() {
        let v = MsgpackValue::Array(vec![
            MsgpackValue::Nil,
            MsgpackValue::from(7i32),
            MsgpackValue::Map(vec![(MsgpackValue::from("k"), MsgpackValue::from(true))]),
        ]);
        assert_eq!(v.to_string(), "[nil, 7, {\"k\": true}]");
    }
}
