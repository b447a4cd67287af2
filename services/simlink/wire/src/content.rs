//! Typed leaf content for the node tree.
//!
//! Every leaf on the wire is an opaque run of bytes; the [`ContentKind`]
//! attached to an outbound node decides how its [`Value`] is packed
//! (fixed-width little-endian numbers, Latin-1 text or raw bytes) and which
//! range the value must fall into.

use crate::error::WireError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Primitive content types as defined in the wire protocol
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    /// Unsigned 8-bit integer
    Byte = 0,
    /// Signed 8-bit integer
    ShortInt = 1,
    /// Unsigned 16-bit integer
    Word = 2,
    /// Signed 16-bit integer
    SmallInt = 3,
    /// Signed 32-bit integer
    Integer = 4,
    /// Unsigned 32-bit integer
    Cardinal = 5,
    /// Signed 64-bit integer
    Integer64 = 6,
    /// IEEE-754 single precision float
    Single = 7,
    /// IEEE-754 double precision float
    Double = 8,
    /// Latin-1 text, one byte per character
    String = 9,
    /// Opaque file contents
    File = 10,
    /// Undecoded bytes (every leaf produced by the decoder)
    Raw = 11,
}

impl TryFrom<u8> for ContentKind {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ContentKind::Byte),
            1 => Ok(ContentKind::ShortInt),
            2 => Ok(ContentKind::Word),
            3 => Ok(ContentKind::SmallInt),
            4 => Ok(ContentKind::Integer),
            5 => Ok(ContentKind::Cardinal),
            6 => Ok(ContentKind::Integer64),
            7 => Ok(ContentKind::Single),
            8 => Ok(ContentKind::Double),
            9 => Ok(ContentKind::String),
            10 => Ok(ContentKind::File),
            11 => Ok(ContentKind::Raw),
            _ => Err(WireError::UnknownContentType(value)),
        }
    }
}

impl ContentKind {
    /// Fixed wire width in bytes, `None` for variable-length kinds
    pub fn width(self) -> Option<usize> {
        match self {
            ContentKind::Byte | ContentKind::ShortInt => Some(1),
            ContentKind::Word | ContentKind::SmallInt => Some(2),
            ContentKind::Integer | ContentKind::Cardinal | ContentKind::Single => Some(4),
            ContentKind::Integer64 | ContentKind::Double => Some(8),
            ContentKind::String | ContentKind::File | ContentKind::Raw => None,
        }
    }

    /// Inclusive value range of the integer kinds
    pub fn int_range(self) -> Option<RangeInclusive<i64>> {
        match self {
            ContentKind::Byte => Some(u8::MIN.into()..=u8::MAX.into()),
            ContentKind::ShortInt => Some(i8::MIN.into()..=i8::MAX.into()),
            ContentKind::Word => Some(u16::MIN.into()..=u16::MAX.into()),
            ContentKind::SmallInt => Some(i16::MIN.into()..=i16::MAX.into()),
            ContentKind::Integer => Some(i32::MIN.into()..=i32::MAX.into()),
            ContentKind::Cardinal => Some(u32::MIN.into()..=u32::MAX.into()),
            ContentKind::Integer64 => Some(i64::MIN..=i64::MAX),
            _ => None,
        }
    }

    /// Pack `value` as this kind, appending the wire bytes to `buf`.
    ///
    /// Nothing is written when the value is rejected.
    pub fn encode_into(self, value: &Value, buf: &mut BytesMut) -> Result<(), WireError> {
        match self {
            ContentKind::Byte => buf.put_u8(self.checked_int(value)? as u8),
            ContentKind::ShortInt => buf.put_i8(self.checked_int(value)? as i8),
            ContentKind::Word => buf.put_u16_le(self.checked_int(value)? as u16),
            ContentKind::SmallInt => buf.put_i16_le(self.checked_int(value)? as i16),
            ContentKind::Integer => buf.put_i32_le(self.checked_int(value)? as i32),
            ContentKind::Cardinal => buf.put_u32_le(self.checked_int(value)? as u32),
            ContentKind::Integer64 => buf.put_i64_le(self.checked_int(value)?),
            ContentKind::Single => {
                let v = self.checked_float(value)?;
                if v.abs() > f64::from(f32::MAX) {
                    return Err(WireError::value(
                        self,
                        format!("{v} exceeds the single precision range"),
                    ));
                }
                buf.put_f32_le(v as f32);
            }
            ContentKind::Double => buf.put_f64_le(self.checked_float(value)?),
            ContentKind::String => {
                let Value::Text(text) = value else {
                    return Err(WireError::value(self, format!("{value} is not text")));
                };
                if let Some(c) = text.chars().find(|c| u32::from(*c) > 0xFF) {
                    return Err(WireError::value(
                        self,
                        format!("character {c:?} has no single-byte encoding"),
                    ));
                }
                buf.extend(text.chars().map(|c| u32::from(c) as u8));
            }
            ContentKind::File | ContentKind::Raw => {
                let Value::Bytes(bytes) = value else {
                    return Err(WireError::value(self, "content is not in bytes format"));
                };
                buf.put_slice(bytes);
            }
        }
        Ok(())
    }

    /// Pack `value` as this kind into a fresh buffer
    pub fn encode(self, value: &Value) -> Result<Bytes, WireError> {
        let mut buf = BytesMut::with_capacity(self.width().unwrap_or(16));
        self.encode_into(value, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Reinterpret raw leaf bytes (as produced by the decoder) as this kind.
    pub fn read_value(self, raw: &[u8]) -> Result<Value, WireError> {
        if let Some(expected) = self.width() {
            if raw.len() != expected {
                return Err(WireError::ContentWidth {
                    kind: self,
                    expected,
                    actual: raw.len(),
                });
            }
        }

        let mut buf = raw;
        let value = match self {
            ContentKind::Byte => Value::Int(buf.get_u8().into()),
            ContentKind::ShortInt => Value::Int(buf.get_i8().into()),
            ContentKind::Word => Value::Int(buf.get_u16_le().into()),
            ContentKind::SmallInt => Value::Int(buf.get_i16_le().into()),
            ContentKind::Integer => Value::Int(buf.get_i32_le().into()),
            ContentKind::Cardinal => Value::Int(buf.get_u32_le().into()),
            ContentKind::Integer64 => Value::Int(buf.get_i64_le()),
            ContentKind::Single => Value::Float(buf.get_f32_le().into()),
            ContentKind::Double => Value::Float(buf.get_f64_le()),
            ContentKind::String => Value::Text(raw.iter().map(|b| char::from(*b)).collect()),
            ContentKind::File | ContentKind::Raw => Value::Bytes(Bytes::copy_from_slice(raw)),
        };
        Ok(value)
    }

    fn checked_int(self, value: &Value) -> Result<i64, WireError> {
        let Value::Int(v) = *value else {
            return Err(WireError::value(
                self,
                format!("{value} cannot be compared to an integer range"),
            ));
        };
        let range = self
            .int_range()
            .ok_or_else(|| WireError::value(self, "not an integer kind"))?;
        if !range.contains(&v) {
            return Err(WireError::value(
                self,
                format!("{v} exceeds limits of {} to {}", range.start(), range.end()),
            ));
        }
        Ok(v)
    }

    fn checked_float(self, value: &Value) -> Result<f64, WireError> {
        let v = match *value {
            Value::Float(v) => v,
            Value::Int(v) => v as f64,
            _ => {
                return Err(WireError::value(
                    self,
                    format!("{value} cannot be compared to a float range"),
                ))
            }
        };
        if !v.is_finite() {
            return Err(WireError::value(self, format!("{v} is not finite")));
        }
        Ok(v)
    }
}

/// Leaf content as held in memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Any integer kind
    Int(i64),
    /// Single or double
    Float(f64),
    /// String kind
    Text(String),
    /// File and raw kinds
    Bytes(Bytes),
}

impl Value {
    /// Integer payload, if any
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float payload; integers are widened
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Text payload, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Byte payload, if any
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "{} bytes", b.len()),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v.into())
            }
        })*
    };
}

value_from_int!(u8, i8, u16, i16, u32, i32, i64);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(kind: ContentKind, value: impl Into<Value>) -> Result<Bytes, WireError> {
        kind.encode(&value.into())
    }

    #[test]
    fn test_content_kind_conversion() {
        assert_eq!(ContentKind::try_from(0).unwrap(), ContentKind::Byte);
        assert_eq!(ContentKind::try_from(9).unwrap(), ContentKind::String);
        assert_eq!(ContentKind::try_from(11).unwrap(), ContentKind::Raw);
        assert!(matches!(
            ContentKind::try_from(12),
            Err(WireError::UnknownContentType(12))
        ));
    }

    #[test]
    fn test_byte_range() {
        assert_eq!(&encode(ContentKind::Byte, 255u8).unwrap()[..], &[0xFF]);
        assert_eq!(&encode(ContentKind::Byte, 0u8).unwrap()[..], &[0x00]);
        assert!(matches!(
            encode(ContentKind::Byte, 256i32),
            Err(WireError::EncodingValue { kind: ContentKind::Byte, .. })
        ));
        assert!(matches!(
            encode(ContentKind::Byte, -1i32),
            Err(WireError::EncodingValue { .. })
        ));
    }

    #[test]
    fn test_word_range() {
        assert_eq!(&encode(ContentKind::Word, 65535u16).unwrap()[..], &[0xFF, 0xFF]);
        assert_eq!(&encode(ContentKind::Word, 0x1234u16).unwrap()[..], &[0x34, 0x12]);
        assert!(matches!(
            encode(ContentKind::Word, 65536i64),
            Err(WireError::EncodingValue { .. })
        ));
    }

    #[test]
    fn test_signed_kinds_little_endian() {
        assert_eq!(&encode(ContentKind::ShortInt, -1i8).unwrap()[..], &[0xFF]);
        assert!(encode(ContentKind::ShortInt, 128i32).is_err());
        assert_eq!(&encode(ContentKind::SmallInt, -2i16).unwrap()[..], &[0xFE, 0xFF]);
        assert_eq!(
            &encode(ContentKind::Integer, -2i32).unwrap()[..],
            &[0xFE, 0xFF, 0xFF, 0xFF]
        );
        assert!(encode(ContentKind::Integer, i64::from(i32::MAX) + 1).is_err());
        assert_eq!(
            &encode(ContentKind::Cardinal, u32::MAX).unwrap()[..],
            &[0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert!(encode(ContentKind::Cardinal, -1i32).is_err());
        assert_eq!(encode(ContentKind::Integer64, i64::MIN).unwrap().len(), 8);
    }

    #[test]
    fn test_integer_kind_rejects_other_values() {
        let err = encode(ContentKind::Word, "12").unwrap_err();
        assert!(err.to_string().contains("cannot be compared"));
        assert!(encode(ContentKind::Byte, 1.0f64).is_err());
    }

    #[test]
    fn test_float_kinds() {
        assert_eq!(
            &encode(ContentKind::Single, 1.0f32).unwrap()[..],
            &1.0f32.to_le_bytes()
        );
        assert_eq!(
            &encode(ContentKind::Double, -2.5f64).unwrap()[..],
            &(-2.5f64).to_le_bytes()
        );
        assert_eq!(
            &encode(ContentKind::Single, 3i32).unwrap()[..],
            &3.0f32.to_le_bytes()
        );
        assert!(encode(ContentKind::Single, 1.0e39f64).is_err());
        assert!(encode(ContentKind::Double, f64::NAN).is_err());
        assert!(encode(ContentKind::Double, f64::INFINITY).is_err());
    }

    #[test]
    fn test_string_latin1() {
        assert_eq!(&encode(ContentKind::String, "Zug").unwrap()[..], b"Zug");
        assert_eq!(&encode(ContentKind::String, "ü").unwrap()[..], &[0xFC]);
        assert!(encode(ContentKind::String, "€").is_err());
        assert!(encode(ContentKind::String, 5u8).is_err());
    }

    #[test]
    fn test_raw_requires_bytes() {
        assert_eq!(
            &encode(ContentKind::File, vec![1u8, 2, 3]).unwrap()[..],
            &[1, 2, 3]
        );
        assert!(encode(ContentKind::Raw, "text").is_err());
    }

    #[test]
    fn test_read_value() {
        assert_eq!(
            ContentKind::Word.read_value(&[0xFF, 0xFF]).unwrap(),
            Value::Int(65535)
        );
        assert_eq!(
            ContentKind::SmallInt.read_value(&[0xFE, 0xFF]).unwrap(),
            Value::Int(-2)
        );
        assert_eq!(
            ContentKind::String.read_value(&[b'A', 0xFC]).unwrap(),
            Value::Text("Aü".to_string())
        );
        assert_eq!(
            ContentKind::Single
                .read_value(&0.5f32.to_le_bytes())
                .unwrap()
                .as_float(),
            Some(0.5)
        );
        assert!(matches!(
            ContentKind::Cardinal.read_value(&[1, 2]),
            Err(WireError::ContentWidth {
                expected: 4,
                actual: 2,
                ..
            })
        ));
    }
}
