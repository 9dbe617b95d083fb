//! Compile-time constants attached to parameters and fields.
//!
//! A [`Literal`] is the decoded form of a `Constant` table row (§II.22.9). The metadata stores
//! the value as an element-type byte plus a little-endian blob; [`Literal::from_constant`]
//! performs that decoding, anything it does not understand is preserved as [`Literal::Bytes`].

use crate::Result;

/// Element type identifiers that may appear in a `Constant` row (§II.23.1.16)
#[allow(non_snake_case)]
pub mod CONSTANT_TYPE {
    /// `bool`
    pub const BOOLEAN: u8 = 0x02;
    /// `char`
    pub const CHAR: u8 = 0x03;
    /// `sbyte`
    pub const I1: u8 = 0x04;
    /// `byte`
    pub const U1: u8 = 0x05;
    /// `short`
    pub const I2: u8 = 0x06;
    /// `ushort`
    pub const U2: u8 = 0x07;
    /// `int`
    pub const I4: u8 = 0x08;
    /// `uint`
    pub const U4: u8 = 0x09;
    /// `long`
    pub const I8: u8 = 0x0a;
    /// `ulong`
    pub const U8: u8 = 0x0b;
    /// `float`
    pub const R4: u8 = 0x0c;
    /// `double`
    pub const R8: u8 = 0x0d;
    /// `string`
    pub const STRING: u8 = 0x0e;
    /// Any reference type; the value is always a 4-byte zero (`null`)
    pub const CLASS: u8 = 0x12;
}

/// A constant value as stored in metadata
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null` (or `default` for value types)
    Null,
    /// Boolean value
    Boolean(bool),
    /// UTF-16 code unit
    Char(u16),
    /// 8-bit signed integer
    I1(i8),
    /// 8-bit unsigned integer
    U1(u8),
    /// 16-bit signed integer
    I2(i16),
    /// 16-bit unsigned integer
    U2(u16),
    /// 32-bit signed integer
    I4(i32),
    /// 32-bit unsigned integer
    U4(u32),
    /// 64-bit signed integer
    I8(i64),
    /// 64-bit unsigned integer
    U8(u64),
    /// 32-bit floating point
    R4(f32),
    /// 64-bit floating point
    R8(f64),
    /// String value
    String(String),
    /// Raw bytes of a constant with no source-level spelling
    Bytes(Vec<u8>),
}

fn read_array<const N: usize>(blob: &[u8]) -> Result<[u8; N]> {
    blob.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| malformed_error!("Constant blob too short - need {}, got {}", N, blob.len()))
}

impl Literal {
    /// Decode a `Constant` row
    ///
    /// ## Arguments
    /// * `element_type` - The element type byte of the row (see [`CONSTANT_TYPE`])
    /// * `blob`         - The little-endian value blob
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the blob is shorter than the element type
    /// requires or a string blob is not valid UTF-16.
    pub fn from_constant(element_type: u8, blob: &[u8]) -> Result<Self> {
        Ok(match element_type {
            CONSTANT_TYPE::BOOLEAN => Literal::Boolean(read_array::<1>(blob)?[0] != 0),
            CONSTANT_TYPE::CHAR => Literal::Char(u16::from_le_bytes(read_array(blob)?)),
            CONSTANT_TYPE::I1 => Literal::I1(i8::from_le_bytes(read_array(blob)?)),
            CONSTANT_TYPE::U1 => Literal::U1(read_array::<1>(blob)?[0]),
            CONSTANT_TYPE::I2 => Literal::I2(i16::from_le_bytes(read_array(blob)?)),
            CONSTANT_TYPE::U2 => Literal::U2(u16::from_le_bytes(read_array(blob)?)),
            CONSTANT_TYPE::I4 => Literal::I4(i32::from_le_bytes(read_array(blob)?)),
            CONSTANT_TYPE::U4 => Literal::U4(u32::from_le_bytes(read_array(blob)?)),
            CONSTANT_TYPE::I8 => Literal::I8(i64::from_le_bytes(read_array(blob)?)),
            CONSTANT_TYPE::U8 => Literal::U8(u64::from_le_bytes(read_array(blob)?)),
            CONSTANT_TYPE::R4 => Literal::R4(f32::from_le_bytes(read_array(blob)?)),
            CONSTANT_TYPE::R8 => Literal::R8(f64::from_le_bytes(read_array(blob)?)),
            CONSTANT_TYPE::STRING => {
                if blob.len() % 2 != 0 {
                    return Err(malformed_error!(
                        "Invalid UTF-16 string length: {} (must be even)",
                        blob.len()
                    ));
                }

                let units: Vec<u16> = blob
                    .chunks_exact(2)
                    .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
                    .collect();

                match String::from_utf16(&units) {
                    Ok(value) => Literal::String(value),
                    Err(_) => return Err(malformed_error!("Invalid UTF-16 sequence in constant")),
                }
            }
            CONSTANT_TYPE::CLASS => Literal::Null,
            _ => Literal::Bytes(blob.to_vec()),
        })
    }

    /// The literal's value as a signed 64-bit integer, for integral kinds
    ///
    /// Unsigned 64-bit values are reinterpreted bit-for-bit, which matches how enum
    /// constants with an `ulong` underlying type are compared.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Boolean(value) => Some(i64::from(*value)),
            Literal::Char(value) => Some(i64::from(*value)),
            Literal::I1(value) => Some(i64::from(*value)),
            Literal::U1(value) => Some(i64::from(*value)),
            Literal::I2(value) => Some(i64::from(*value)),
            Literal::U2(value) => Some(i64::from(*value)),
            Literal::I4(value) => Some(i64::from(*value)),
            Literal::U4(value) => Some(i64::from(*value)),
            Literal::I8(value) => Some(*value),
            #[allow(clippy::cast_possible_wrap)]
            Literal::U8(value) => Some(*value as i64),
            _ => None,
        }
    }

    /// A short name of the literal's kind, used in diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Boolean(_) => "bool",
            Literal::Char(_) => "char",
            Literal::I1(_) => "sbyte",
            Literal::U1(_) => "byte",
            Literal::I2(_) => "short",
            Literal::U2(_) => "ushort",
            Literal::I4(_) => "int",
            Literal::U4(_) => "uint",
            Literal::I8(_) => "long",
            Literal::U8(_) => "ulong",
            Literal::R4(_) => "float",
            Literal::R8(_) => "double",
            Literal::String(_) => "string",
            Literal::Bytes(_) => "bytes",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_from_constant_integers() {
        assert_eq!(
            Literal::from_constant(CONSTANT_TYPE::I4, &[0x2A, 0, 0, 0]).unwrap(),
            Literal::I4(42)
        );
        assert_eq!(
            Literal::from_constant(CONSTANT_TYPE::I2, &[0xFF, 0xFF]).unwrap(),
            Literal::I2(-1)
        );
        assert_eq!(
            Literal::from_constant(CONSTANT_TYPE::U8, &[1, 0, 0, 0, 0, 0, 0, 0x80]).unwrap(),
            Literal::U8(0x8000_0000_0000_0001)
        );
        assert_eq!(
            Literal::from_constant(CONSTANT_TYPE::BOOLEAN, &[1]).unwrap(),
            Literal::Boolean(true)
        );
    }

    #[test]
    fn test_from_constant_string_and_null() {
        let blob = [b'h', 0, b'i', 0];
        assert_eq!(
            Literal::from_constant(CONSTANT_TYPE::STRING, &blob).unwrap(),
            Literal::String("hi".to_string())
        );
        assert_eq!(
            Literal::from_constant(CONSTANT_TYPE::STRING, &[]).unwrap(),
            Literal::String(String::new())
        );
        assert_eq!(
            Literal::from_constant(CONSTANT_TYPE::CLASS, &[0, 0, 0, 0]).unwrap(),
            Literal::Null
        );
    }

    #[test]
    fn test_from_constant_unknown_kind_preserved() {
        let literal = Literal::from_constant(0x11, &[1, 2, 3]).unwrap();
        assert_eq!(literal, Literal::Bytes(vec![1, 2, 3]));
        assert_eq!(literal.kind(), "bytes");
    }

    #[test]
    fn test_from_constant_malformed() {
        assert!(matches!(
            Literal::from_constant(CONSTANT_TYPE::I4, &[1, 2]),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            Literal::from_constant(CONSTANT_TYPE::STRING, &[1, 2, 3]),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_as_i64() {
        assert_eq!(Literal::U1(7).as_i64(), Some(7));
        assert_eq!(Literal::U8(u64::MAX).as_i64(), Some(-1));
        assert_eq!(Literal::R8(1.0).as_i64(), None);
        assert_eq!(Literal::Null.as_i64(), None);
    }
}
