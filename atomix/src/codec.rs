//! Order-preserving key codec.
//!
//! Encoded keys compare with a single byte-wise comparison in the same order
//! as the typed tuples they came from.
//!
//! # Value encodings
//!
//! - `Int64`: 8 bytes big-endian with the sign bit flipped, so negative
//!   numbers sort before positive ones.
//! - `Bytes`: escaped, then terminated by `0x00`:
//!
//! ```text
//! 0x00 -> 0x01 0x01
//! 0x01 -> 0x01 0x02
//! 0xFE -> 0xFE 0x01
//! 0xFF -> 0xFE 0x02
//! ```
//!
//! Every other byte is copied verbatim. The escape code is monotone and
//! prefix-free and the terminator sorts below every code, so a shorter string
//! sorts before its extensions. An encoded string never contains `0xFF`.
//!
//! # Key layout
//!
//! ```text
//! [prefix: u32 big-endian][value 0][value 1]...
//! ```
//!
//! # Partial keys
//!
//! A bound with fewer values than the index has columns is padded by
//! `encode_key_partial` so it sorts at the correct end of every key sharing
//! its prefix.

use crate::types::{CmpOp, Value, ValueType};

/// Size of the key-space prefix at the start of every key.
pub const PREFIX_SIZE: usize = 4;

const INT64_SIZE: usize = 8;
const SIGN_BIT: u64 = 1 << 63;

const TERMINATOR: u8 = 0x00;
const LOW_ESCAPE: u8 = 0x01;
const HIGH_ESCAPE: u8 = 0xFE;
/// Sorts after the first byte of every `Bytes` encoding.
const MAX_BYTE: u8 = 0xFF;

/// Append the encoding of one value.
pub fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Int64(v) => {
            #[allow(clippy::cast_sign_loss)]
            let flipped = (*v as u64) ^ SIGN_BIT;
            out.extend_from_slice(&flipped.to_be_bytes());
        }
        Value::Bytes(bytes) => {
            out.reserve(bytes.len() + 1);
            for &b in bytes {
                match b {
                    0x00 => out.extend_from_slice(&[LOW_ESCAPE, 0x01]),
                    0x01 => out.extend_from_slice(&[LOW_ESCAPE, 0x02]),
                    0xFE => out.extend_from_slice(&[HIGH_ESCAPE, 0x01]),
                    0xFF => out.extend_from_slice(&[HIGH_ESCAPE, 0x02]),
                    _ => out.push(b),
                }
            }
            out.push(TERMINATOR);
        }
    }
}

/// Append the encodings of several values.
pub fn encode_values(values: &[Value], out: &mut Vec<u8>) {
    for value in values {
        encode_value(value, out);
    }
}

/// Encode a full key: prefix followed by the values.
#[must_use]
pub fn encode_key(prefix: u32, values: &[Value]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PREFIX_SIZE + values.len() * INT64_SIZE);
    out.extend_from_slice(&prefix.to_be_bytes());
    encode_values(values, &mut out);
    out
}

/// Encode a possibly partial key used as a range bound.
///
/// `index_types` are the types of all index columns; `values` covers a
/// leading subset of them. When `cmp` must sort after every continuation of
/// the prefix (`>` and `<=`), each missing column is padded with its maximum
/// encoding: eight `0xFF` bytes for an integer, a single `0xFF` for a byte
/// string (no string encoding contains it, so later columns are irrelevant).
#[must_use]
pub fn encode_key_partial(
    prefix: u32,
    values: &[Value],
    index_types: &[ValueType],
    cmp: CmpOp,
) -> Vec<u8> {
    let mut out = encode_key(prefix, values);
    if !cmp.pads_to_max() {
        return out;
    }
    for ty in index_types.iter().skip(values.len()) {
        match ty {
            ValueType::Int64 => out.extend_from_slice(&[MAX_BYTE; INT64_SIZE]),
            ValueType::Bytes => {
                out.push(MAX_BYTE);
                break;
            }
        }
    }
    out
}

/// Split a key into its prefix and encoded body.
pub fn split_prefix(key: &[u8]) -> Result<(u32, &[u8]), CodecError> {
    if key.len() < PREFIX_SIZE {
        return Err(CodecError::MissingPrefix(key.len()));
    }
    let (head, body) = key.split_at(PREFIX_SIZE);
    let prefix = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);
    Ok((prefix, body))
}

/// Decode one value of the given type, returning it and the bytes consumed.
pub fn decode_value(bytes: &[u8], ty: ValueType) -> Result<(Value, usize), CodecError> {
    match ty {
        ValueType::Int64 => {
            let Some(raw) = bytes.get(..INT64_SIZE) else {
                return Err(CodecError::Truncated {
                    expected: INT64_SIZE,
                    actual: bytes.len(),
                });
            };
            let mut buf = [0u8; INT64_SIZE];
            buf.copy_from_slice(raw);
            #[allow(clippy::cast_possible_wrap)]
            let v = (u64::from_be_bytes(buf) ^ SIGN_BIT) as i64;
            Ok((Value::Int64(v), INT64_SIZE))
        }
        ValueType::Bytes => {
            let mut out = Vec::new();
            let mut i = 0;
            while i < bytes.len() {
                let b = bytes[i];
                match b {
                    TERMINATOR => return Ok((Value::Bytes(out), i + 1)),
                    LOW_ESCAPE | HIGH_ESCAPE => {
                        let next = *bytes.get(i + 1).ok_or(CodecError::Unterminated)?;
                        let decoded = match (b, next) {
                            (LOW_ESCAPE, 0x01) => 0x00,
                            (LOW_ESCAPE, 0x02) => 0x01,
                            (HIGH_ESCAPE, 0x01) => 0xFE,
                            (HIGH_ESCAPE, 0x02) => 0xFF,
                            _ => return Err(CodecError::InvalidEscape([b, next])),
                        };
                        out.push(decoded);
                        i += 2;
                    }
                    MAX_BYTE => return Err(CodecError::InvalidByte(b)),
                    _ => {
                        out.push(b);
                        i += 1;
                    }
                }
            }
            Err(CodecError::Unterminated)
        }
    }
}

/// Decode a sequence of values, returning them and the bytes consumed.
pub fn decode_values(
    bytes: &[u8],
    types: &[ValueType],
) -> Result<(Vec<Value>, usize), CodecError> {
    let mut values = Vec::with_capacity(types.len());
    let mut offset = 0;
    for &ty in types {
        let (value, used) = decode_value(&bytes[offset..], ty)?;
        values.push(value);
        offset += used;
    }
    Ok((values, offset))
}

/// Decode a sequence of values that must consume `bytes` exactly.
pub fn decode_exact(bytes: &[u8], types: &[ValueType]) -> Result<Vec<Value>, CodecError> {
    let (values, used) = decode_values(bytes, types)?;
    if used != bytes.len() {
        return Err(CodecError::TrailingBytes(bytes.len() - used));
    }
    Ok(values)
}

/// Errors raised when decoding keys or values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The key is shorter than the prefix.
    MissingPrefix(usize),
    /// A fixed-width value was cut short.
    Truncated { expected: usize, actual: usize },
    /// A byte string has no terminator.
    Unterminated,
    /// An escape byte was followed by an invalid code.
    InvalidEscape([u8; 2]),
    /// A byte that never appears in a byte string encoding.
    InvalidByte(u8),
    /// Bytes left over after the last expected value.
    TrailingBytes(usize),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPrefix(len) => {
                write!(f, "key too short for prefix: {len} bytes")
            }
            Self::Truncated { expected, actual } => {
                write!(f, "truncated value: expected {expected} bytes, got {actual}")
            }
            Self::Unterminated => write!(f, "unterminated byte string"),
            Self::InvalidEscape([a, b]) => {
                write!(f, "invalid escape sequence: 0x{a:02x} 0x{b:02x}")
            }
            Self::InvalidByte(b) => write!(f, "invalid byte in string: 0x{b:02x}"),
            Self::TrailingBytes(n) => write!(f, "{n} trailing bytes after last value"),
        }
    }
}

impl std::error::Error for CodecError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(value: &Value) -> Vec<u8> {
        let mut out = Vec::new();
        encode_value(value, &mut out);
        out
    }

    #[test]
    fn test_int_encoding_is_big_endian_sign_flipped() {
        assert_eq!(enc(&Value::Int64(0)), vec![0x80, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(enc(&Value::Int64(1)), vec![0x80, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(enc(&Value::Int64(-1)), vec![0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(enc(&Value::Int64(i64::MIN)), vec![0; 8]);
        assert_eq!(enc(&Value::Int64(i64::MAX)), vec![0xff; 8]);
    }

    #[test]
    fn test_int_order_preserved() {
        let nums = [i64::MIN, -1_000_000, -256, -1, 0, 1, 255, 256, 70_000, i64::MAX];
        for pair in nums.windows(2) {
            let a = enc(&Value::Int64(pair[0]));
            let b = enc(&Value::Int64(pair[1]));
            assert!(a < b, "{} should sort before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_bytes_escaping() {
        assert_eq!(enc(&Value::from("")), vec![0x00]);
        assert_eq!(enc(&Value::from("ab")), vec![b'a', b'b', 0x00]);
        assert_eq!(
            enc(&Value::Bytes(vec![0x00, 0x01, 0xfe, 0xff, 0x02])),
            vec![0x01, 0x01, 0x01, 0x02, 0xfe, 0x01, 0xfe, 0x02, 0x02, 0x00]
        );
    }

    #[test]
    fn test_bytes_order_preserved() {
        let strings: Vec<Vec<u8>> = vec![
            vec![],
            vec![0x00],
            vec![0x00, 0x00],
            vec![0x00, 0x01],
            vec![0x01],
            vec![0x01, 0xff],
            vec![0x02],
            b"a".to_vec(),
            b"ab".to_vec(),
            b"b".to_vec(),
            vec![0xfd, 0xff],
            vec![0xfe],
            vec![0xfe, 0x00],
            vec![0xff],
            vec![0xff, 0xff],
        ];
        for pair in strings.windows(2) {
            let a = enc(&Value::Bytes(pair[0].clone()));
            let b = enc(&Value::Bytes(pair[1].clone()));
            assert!(a < b, "{:?} should sort before {:?}", pair[0], pair[1]);
            assert!(!a.contains(&0xff));
        }
    }

    #[test]
    fn test_composite_order_follows_first_column() {
        // ("a", 100) < ("ab", -5): the terminator keeps "a" ahead of "ab".
        let k1 = encode_key(7, &[Value::from("a"), Value::Int64(100)]);
        let k2 = encode_key(7, &[Value::from("ab"), Value::Int64(-5)]);
        assert!(k1 < k2);

        let k3 = encode_key(7, &[Value::Int64(3), Value::from("zzz")]);
        let k4 = encode_key(7, &[Value::Int64(4), Value::from("")]);
        assert!(k3 < k4);
    }

    #[test]
    fn test_prefix_separates_key_spaces() {
        let low = encode_key(100, &[Value::Int64(i64::MAX)]);
        let high = encode_key(101, &[Value::Int64(i64::MIN)]);
        assert!(low < high);
        assert_eq!(split_prefix(&low).expect("prefix").0, 100);
    }

    #[test]
    fn test_decode_roundtrip() {
        let values = vec![
            Value::Int64(-42),
            Value::Bytes(vec![0x00, 0xff, b'x', 0x01, 0xfe]),
            Value::from(""),
            Value::Int64(i64::MAX),
        ];
        let types = [ValueType::Int64, ValueType::Bytes, ValueType::Bytes, ValueType::Int64];
        let key = encode_key(123, &values);

        let (prefix, body) = split_prefix(&key).expect("split");
        assert_eq!(prefix, 123);
        let (decoded, used) = decode_values(body, &types).expect("decode");
        assert_eq!(decoded, values);
        assert_eq!(used, body.len());
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            decode_value(&[1, 2, 3], ValueType::Int64),
            Err(CodecError::Truncated {
                expected: 8,
                actual: 3
            })
        );
        assert_eq!(
            decode_value(b"abc", ValueType::Bytes),
            Err(CodecError::Unterminated)
        );
        assert_eq!(
            decode_value(&[0x01], ValueType::Bytes),
            Err(CodecError::Unterminated)
        );
        assert_eq!(
            decode_value(&[0x01, 0x07, 0x00], ValueType::Bytes),
            Err(CodecError::InvalidEscape([0x01, 0x07]))
        );
        assert_eq!(
            decode_value(&[0xff, 0x00], ValueType::Bytes),
            Err(CodecError::InvalidByte(0xff))
        );
        assert_eq!(split_prefix(&[1, 2]), Err(CodecError::MissingPrefix(2)));

        let mut bytes = Vec::new();
        encode_value(&Value::Int64(5), &mut bytes);
        bytes.push(0x42);
        assert_eq!(
            decode_exact(&bytes, &[ValueType::Int64]),
            Err(CodecError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_partial_key_padding() {
        let types = [ValueType::Int64, ValueType::Int64, ValueType::Bytes];
        let vals = [Value::Int64(5)];

        // Lower-style operators use the bare prefix.
        let ge = encode_key_partial(9, &vals, &types, CmpOp::Ge);
        let lt = encode_key_partial(9, &vals, &types, CmpOp::Lt);
        assert_eq!(ge, encode_key(9, &vals));
        assert_eq!(lt, ge);

        // Upper-style operators pad int with 8 bytes, then one byte for text.
        let le = encode_key_partial(9, &vals, &types, CmpOp::Le);
        let gt = encode_key_partial(9, &vals, &types, CmpOp::Gt);
        assert_eq!(le.len(), ge.len() + 8 + 1);
        assert!(le[ge.len()..].iter().all(|&b| b == 0xff));
        assert_eq!(gt, le);

        // Full tuples are never padded.
        let full = [Value::Int64(5), Value::Int64(6), Value::from("x")];
        assert_eq!(
            encode_key_partial(9, &full, &types, CmpOp::Le),
            encode_key(9, &full)
        );
    }

    #[test]
    fn test_partial_key_brackets_every_continuation() {
        let types = [ValueType::Int64, ValueType::Bytes, ValueType::Int64];
        let lower = encode_key_partial(9, &[Value::Int64(5)], &types, CmpOp::Ge);
        let upper = encode_key_partial(9, &[Value::Int64(5)], &types, CmpOp::Le);

        let continuations = [
            vec![Value::Int64(5), Value::from(""), Value::Int64(i64::MIN)],
            vec![Value::Int64(5), Value::Bytes(vec![0xff; 4]), Value::Int64(i64::MAX)],
            vec![Value::Int64(5), Value::from("m"), Value::Int64(0)],
        ];
        for c in &continuations {
            let key = encode_key(9, c);
            assert!(lower <= key);
            assert!(key <= upper);
        }

        let before = encode_key(
            9,
            &[Value::Int64(4), Value::Bytes(vec![0xff; 8]), Value::Int64(i64::MAX)],
        );
        let after = encode_key(9, &[Value::Int64(6), Value::from(""), Value::Int64(i64::MIN)]);
        assert!(before < lower);
        assert!(after > upper);
    }
}
