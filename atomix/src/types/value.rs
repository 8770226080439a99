//! Column value types.
//!
//! Provides the `Value` enum and its `ValueType` discriminant. The numeric
//! tags are part of the on-disk catalog format and must not be renumbered.

/// Value type discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// Variable-length byte string (also used for text).
    Bytes = 0x01,
    /// Signed 64-bit integer.
    Int64 = 0x02,
}

impl TryFrom<u8> for ValueType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Bytes),
            0x02 => Ok(Self::Int64),
            _ => Err(value),
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes => write!(f, "bytes"),
            Self::Int64 => write!(f, "int64"),
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Bytes(Vec<u8>),
    Int64(i64),
}

impl Value {
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Bytes(_) => ValueType::Bytes,
            Self::Int64(_) => ValueType::Int64,
        }
    }

    /// Return the integer payload, if this is an `Int64`.
    #[must_use]
    pub const fn as_int64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            Self::Bytes(_) => None,
        }
    }

    /// Return the byte payload, if this is a `Bytes` value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::Int64(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Bytes(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int64(v) => write!(f, "{v}"),
            Self::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => write!(f, "{s:?}"),
                Err(_) => write!(f, "{b:02x?}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_conversion() {
        assert_eq!(ValueType::try_from(0x01), Ok(ValueType::Bytes));
        assert_eq!(ValueType::try_from(0x02), Ok(ValueType::Int64));
        assert_eq!(ValueType::try_from(0x00), Err(0x00));
        assert_eq!(ValueType::try_from(0x03), Err(0x03));
    }

    #[test]
    fn test_value_type_tag() {
        assert_eq!(Value::Int64(-4).value_type(), ValueType::Int64);
        assert_eq!(Value::from("abc").value_type(), ValueType::Bytes);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int64(7).as_int64(), Some(7));
        assert_eq!(Value::Int64(7).as_bytes(), None);
        assert_eq!(Value::from("hi").as_bytes(), Some(b"hi".as_slice()));
        assert_eq!(Value::from("hi").as_int64(), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int64(-12).to_string(), "-12");
        assert_eq!(Value::from("bob").to_string(), "\"bob\"");
        assert_eq!(Value::Bytes(vec![0xff, 0x00]).to_string(), "[ff, 00]");
    }
}
