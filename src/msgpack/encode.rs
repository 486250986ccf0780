//! MessagePack encoding: `MsgpackValue` → bytes.
//!
//! Every encoder picks the smallest wire representation that holds the value
//! exactly. All multi-byte fields are big-endian.

use bytes::{BufMut, BytesMut};

use super::header::HeaderTag;
use crate::config::Configuration;
use crate::error::MsgpackError;
use crate::ext::{ExtensionValue, Timestamp};
use crate::types::{Float, Integer, MsgpackValue};

/// Encodes a `MsgpackValue` into the buffer.
///
/// On error the buffer may hold a partially written item.
pub fn encode_value(
    buf: &mut BytesMut,
    value: &MsgpackValue,
    config: &Configuration,
) -> Result<(), MsgpackError> {
    encode_at_depth(buf, value, config, 0)
}

fn encode_at_depth(
    buf: &mut BytesMut,
    value: &MsgpackValue,
    config: &Configuration,
    depth: usize,
) -> Result<(), MsgpackError> {
    match value {
        MsgpackValue::Nil => encode_nil(buf),
        MsgpackValue::Boolean(b) => encode_bool(buf, *b),
        MsgpackValue::Integer(i) => encode_integer(buf, *i),
        MsgpackValue::Float(f) => encode_float(buf, *f),
        MsgpackValue::String(s) => encode_string(buf, s)?,
        MsgpackValue::Binary(b) => encode_binary(buf, b)?,
        MsgpackValue::Array(items) => encode_array_at(buf, items, config, depth)?,
        MsgpackValue::Map(pairs) => encode_map_at(buf, pairs, config, depth)?,
        MsgpackValue::Extension(ext) => encode_extension(buf, ext)?,
        MsgpackValue::Timestamp(ts) => encode_timestamp(buf, ts),
    }
    Ok(())
}

fn descend(depth: usize, config: &Configuration) -> Result<usize, MsgpackError> {
    let next = depth + 1;
    if next > config.max_depth {
        return Err(MsgpackError::DepthLimitExceeded(config.max_depth));
    }
    Ok(next)
}

fn checked_len(len: usize) -> Result<u32, MsgpackError> {
    u32::try_from(len).map_err(|_| MsgpackError::ValueExceededSupportedLength(len))
}

/// Writes a header byte with an embedded value.
fn put_embedded(buf: &mut BytesMut, tag: HeaderTag, value: u8) {
    match tag.merge_embedded_value(value) {
        Some(byte) => buf.put_u8(byte),
        None => unreachable!("{tag:?} has no embedded value"),
    }
}

pub fn encode_nil(buf: &mut BytesMut) {
    buf.put_u8(HeaderTag::Nil.byte());
}

pub fn encode_bool(buf: &mut BytesMut, value: bool) {
    let tag = if value { HeaderTag::True } else { HeaderTag::False };
    buf.put_u8(tag.byte());
}

/// Encodes an integer using the smallest possible representation.
///
/// The candidates are tried in a fixed order: positive fixint, negative
/// fixint, uint8, int8, uint16, int16, uint32, int32, uint64, int64. The
/// choice depends on the value only, never on the source width.
pub fn encode_integer(buf: &mut BytesMut, value: Integer) {
    let v = value.to_i128();
    if (0..=127).contains(&v) {
        put_embedded(buf, HeaderTag::PositiveFixint, v as u8);
    } else if (-32..=-1).contains(&v) && value.is_signed() {
        put_embedded(buf, HeaderTag::NegativeFixint, v as i8 as u8);
    } else if let Ok(v) = u8::try_from(v) {
        buf.put_u8(HeaderTag::Uint8.byte());
        buf.put_u8(v);
    } else if let Ok(v) = i8::try_from(v) {
        buf.put_u8(HeaderTag::Int8.byte());
        buf.put_i8(v);
    } else if let Ok(v) = u16::try_from(v) {
        buf.put_u8(HeaderTag::Uint16.byte());
        buf.put_u16(v);
    } else if let Ok(v) = i16::try_from(v) {
        buf.put_u8(HeaderTag::Int16.byte());
        buf.put_i16(v);
    } else if let Ok(v) = u32::try_from(v) {
        buf.put_u8(HeaderTag::Uint32.byte());
        buf.put_u32(v);
    } else if let Ok(v) = i32::try_from(v) {
        buf.put_u8(HeaderTag::Int32.byte());
        buf.put_i32(v);
    } else if let Ok(v) = u64::try_from(v) {
        buf.put_u8(HeaderTag::Uint64.byte());
        buf.put_u64(v);
    } else if let Ok(v) = i64::try_from(v) {
        buf.put_u8(HeaderTag::Int64.byte());
        buf.put_i64(v);
    } else {
        unreachable!("integer {v} exceeds 64 bits");
    }
}

pub fn encode_int(buf: &mut BytesMut, value: i64) {
    encode_integer(buf, Integer::I64(value));
}

pub fn encode_uint(buf: &mut BytesMut, value: u64) {
    encode_integer(buf, Integer::U64(value));
}

pub fn encode_float(buf: &mut BytesMut, value: Float) {
    match value {
        Float::F32(v) => encode_f32(buf, v),
        Float::F64(v) => encode_f64(buf, v),
    }
}

pub fn encode_f32(buf: &mut BytesMut, value: f32) {
    buf.put_u8(HeaderTag::Float32.byte());
    buf.put_f32(value);
}

/// Encodes a double as float32 when the narrowing is exact (bit for bit
/// after widening back, which also covers infinities, signed zeros and
/// NaN payloads that survive), else as float64.
pub fn encode_f64(buf: &mut BytesMut, value: f64) {
    let narrowed = value as f32;
    if f64::from(narrowed).to_bits() == value.to_bits() {
        encode_f32(buf, narrowed);
    } else {
        buf.put_u8(HeaderTag::Float64.byte());
        buf.put_f64(value);
    }
}

/// Encodes a string (size = byte length, not char count).
pub fn encode_string(buf: &mut BytesMut, value: &str) -> Result<(), MsgpackError> {
    encode_string_header(buf, value.len())?;
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn encode_string_header(buf: &mut BytesMut, len: usize) -> Result<(), MsgpackError> {
    let len = checked_len(len)?;
    if len < 32 {
        put_embedded(buf, HeaderTag::Fixstr, len as u8);
    } else if len <= 0xFF {
        buf.put_u8(HeaderTag::Str8.byte());
        buf.put_u8(len as u8);
    } else if len <= 0xFFFF {
        buf.put_u8(HeaderTag::Str16.byte());
        buf.put_u16(len as u16);
    } else {
        buf.put_u8(HeaderTag::Str32.byte());
        buf.put_u32(len);
    }
    Ok(())
}

pub fn encode_binary(buf: &mut BytesMut, value: &[u8]) -> Result<(), MsgpackError> {
    let len = checked_len(value.len())?;
    if len <= 0xFF {
        buf.put_u8(HeaderTag::Bin8.byte());
        buf.put_u8(len as u8);
    } else if len <= 0xFFFF {
        buf.put_u8(HeaderTag::Bin16.byte());
        buf.put_u16(len as u16);
    } else {
        buf.put_u8(HeaderTag::Bin32.byte());
        buf.put_u32(len);
    }
    buf.put_slice(value);
    Ok(())
}

/// Encodes an array with recursively encoded elements.
pub fn encode_array(
    buf: &mut BytesMut,
    items: &[MsgpackValue],
    config: &Configuration,
) -> Result<(), MsgpackError> {
    encode_array_at(buf, items, config, 0)
}

fn encode_array_at(
    buf: &mut BytesMut,
    items: &[MsgpackValue],
    config: &Configuration,
    depth: usize,
) -> Result<(), MsgpackError> {
    let depth = descend(depth, config)?;
    encode_array_header(buf, items.len())?;
    for item in items {
        encode_at_depth(buf, item, config, depth)?;
    }
    Ok(())
}

/// Writes an array header for `len` elements.
pub fn encode_array_header(buf: &mut BytesMut, len: usize) -> Result<(), MsgpackError> {
    let len = checked_len(len)?;
    if len < 16 {
        put_embedded(buf, HeaderTag::Fixarray, len as u8);
    } else if len <= 0xFFFF {
        buf.put_u8(HeaderTag::Array16.byte());
        buf.put_u16(len as u16);
    } else {
        buf.put_u8(HeaderTag::Array32.byte());
        buf.put_u32(len);
    }
    Ok(())
}

/// Encodes a map as its ordered pairs; duplicate keys are written as-is.
pub fn encode_map(
    buf: &mut BytesMut,
    pairs: &[(MsgpackValue, MsgpackValue)],
    config: &Configuration,
) -> Result<(), MsgpackError> {
    encode_map_at(buf, pairs, config, 0)
}

fn encode_map_at(
    buf: &mut BytesMut,
    pairs: &[(MsgpackValue, MsgpackValue)],
    config: &Configuration,
    depth: usize,
) -> Result<(), MsgpackError> {
    let depth = descend(depth, config)?;
    encode_map_header(buf, pairs.len())?;
    for (key, value) in pairs {
        encode_at_depth(buf, key, config, depth)?;
        encode_at_depth(buf, value, config, depth)?;
    }
    Ok(())
}

/// Writes a map header for `len` key/value pairs.
pub fn encode_map_header(buf: &mut BytesMut, len: usize) -> Result<(), MsgpackError> {
    let len = checked_len(len)?;
    if len < 16 {
        put_embedded(buf, HeaderTag::Fixmap, len as u8);
    } else if len <= 0xFFFF {
        buf.put_u8(HeaderTag::Map16.byte());
        buf.put_u16(len as u16);
    } else {
        buf.put_u8(HeaderTag::Map32.byte());
        buf.put_u32(len);
    }
    Ok(())
}

/// Encodes an extension: header, length (non-fixext only), type code,
/// payload.
pub fn encode_extension(buf: &mut BytesMut, ext: &ExtensionValue) -> Result<(), MsgpackError> {
    let data = ext.data();
    let len = checked_len(data.len())?;
    match len {
        1 => buf.put_u8(HeaderTag::Fixext1.byte()),
        2 => buf.put_u8(HeaderTag::Fixext2.byte()),
        4 => buf.put_u8(HeaderTag::Fixext4.byte()),
        8 => buf.put_u8(HeaderTag::Fixext8.byte()),
        16 => buf.put_u8(HeaderTag::Fixext16.byte()),
        0..=0xFF => {
            buf.put_u8(HeaderTag::Ext8.byte());
            buf.put_u8(len as u8);
        }
        0x100..=0xFFFF => {
            buf.put_u8(HeaderTag::Ext16.byte());
            buf.put_u16(len as u16);
        }
        _ => {
            buf.put_u8(HeaderTag::Ext32.byte());
            buf.put_u32(len);
        }
    }
    buf.put_u8(ext.type_byte());
    buf.put_slice(data);
    Ok(())
}

/// Encodes a timestamp as the smallest timestamp extension layout.
pub fn encode_timestamp(buf: &mut BytesMut, ts: &Timestamp) {
    let ext = ts.to_extension();
    // Timestamp payloads are 4, 8 or 12 bytes.
    if let Err(e) = encode_extension(buf, &ext) {
        unreachable!("timestamp payload rejected: {e}");
    }
}
