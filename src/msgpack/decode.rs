//! MessagePack decoding: bytes → `MsgpackValue`.
//!
//! Each decoder takes the bytes starting at an item and returns the decoded
//! value together with the bytes that follow it, so sequences are parsed by
//! feeding the remainder back in.

use bytes::Buf;

use super::header::{Family, HeaderTag};
use super::raw::RawMsgpack;
use crate::config::Configuration;
use crate::error::MsgpackError;
use crate::ext::{ExtensionValue, Timestamp, predefined};
use crate::types::{Float, Integer, MsgpackValue};

/// Decodes a single `MsgpackValue` from the start of `data`.
///
/// Returns the value and the unconsumed bytes after it.
pub fn decode_value<'a>(
    data: &'a [u8],
    config: &Configuration,
) -> Result<(MsgpackValue, &'a [u8]), MsgpackError> {
    decode_at_depth(data, config, 0)
}

fn decode_at_depth<'a>(
    data: &'a [u8],
    config: &Configuration,
    depth: usize,
) -> Result<(MsgpackValue, &'a [u8]), MsgpackError> {
    let raw = RawMsgpack::new(data)?;
    match raw.tag().family() {
        Family::Nil => Ok((MsgpackValue::Nil, raw.remaining_after())),
        Family::Bool => decode_bool(&raw),
        Family::Int => decode_integer(&raw),
        Family::Float => decode_float(&raw),
        Family::Str => decode_string(&raw),
        Family::Bin => decode_binary(&raw),
        Family::Array => decode_array(&raw, config, descend(depth, config)?),
        Family::Map => decode_map(&raw, config, descend(depth, config)?),
        Family::Ext => decode_extension(&raw),
    }
}

fn descend(depth: usize, config: &Configuration) -> Result<usize, MsgpackError> {
    let next = depth + 1;
    if next > config.max_depth {
        tracing::debug!(depth = next, limit = config.max_depth, "msgpack nesting too deep");
        return Err(MsgpackError::DepthLimitExceeded(config.max_depth));
    }
    Ok(next)
}

/// The flat value section of a non-container item.
fn value_bytes<'a>(raw: &RawMsgpack<'a>) -> Result<&'a [u8], MsgpackError> {
    raw.value_data()
        .ok_or_else(|| MsgpackError::invalid(format!("{:?} carries no value data", raw.tag())))
}

fn expect_family(raw: &RawMsgpack<'_>, family: Family) -> Result<(), MsgpackError> {
    if raw.tag().family() != family {
        return Err(MsgpackError::invalid(format!(
            "expected {family:?} header, found {:?}",
            raw.tag()
        )));
    }
    Ok(())
}

pub fn decode_bool<'a>(raw: &RawMsgpack<'a>) -> Result<(MsgpackValue, &'a [u8]), MsgpackError> {
    let value = match raw.tag() {
        HeaderTag::True => true,
        HeaderTag::False => false,
        other => {
            return Err(MsgpackError::invalid(format!(
                "expected boolean header, found {other:?}"
            )));
        }
    };
    Ok((MsgpackValue::Boolean(value), raw.remaining_after()))
}

/// Decodes any integer header, preserving the wire width and signedness.
pub fn decode_integer<'a>(
    raw: &RawMsgpack<'a>,
) -> Result<(MsgpackValue, &'a [u8]), MsgpackError> {
    expect_family(raw, Family::Int)?;
    let tag = raw.tag();
    let value = match tag {
        HeaderTag::PositiveFixint | HeaderTag::NegativeFixint => {
            let bits = tag
                .extract_embedded_value(raw.header_byte())
                .unwrap_or_default();
            if tag == HeaderTag::PositiveFixint {
                Integer::U8(bits)
            } else {
                // Sign-extend the low five bits.
                Integer::I8((bits | 0xE0) as i8)
            }
        }
        HeaderTag::Uint8 => Integer::U8(raw.read_be_uint(1)? as u8),
        HeaderTag::Uint16 => Integer::U16(raw.read_be_uint(2)? as u16),
        HeaderTag::Uint32 => Integer::U32(raw.read_be_uint(4)? as u32),
        HeaderTag::Uint64 => Integer::U64(raw.read_be_uint(8)?),
        HeaderTag::Int8 => Integer::I8(raw.read_be_uint(1)? as u8 as i8),
        HeaderTag::Int16 => Integer::I16(raw.read_be_uint(2)? as u16 as i16),
        HeaderTag::Int32 => Integer::I32(raw.read_be_uint(4)? as u32 as i32),
        HeaderTag::Int64 => Integer::I64(raw.read_be_uint(8)? as i64),
        _ => unreachable!("{tag:?} is not an integer header"),
    };
    Ok((MsgpackValue::Integer(value), raw.remaining_after()))
}

pub fn decode_float<'a>(raw: &RawMsgpack<'a>) -> Result<(MsgpackValue, &'a [u8]), MsgpackError> {
    expect_family(raw, Family::Float)?;
    let mut bytes = value_bytes(raw)?;
    let value = match raw.tag() {
        HeaderTag::Float32 => Float::F32(bytes.get_f32()),
        _ => Float::F64(bytes.get_f64()),
    };
    Ok((MsgpackValue::Float(value), raw.remaining_after()))
}

/// Decodes a string. Invalid UTF-8 fails with
/// [`MsgpackError::InvalidStringData`] carrying the raw bytes.
pub fn decode_string<'a>(
    raw: &RawMsgpack<'a>,
) -> Result<(MsgpackValue, &'a [u8]), MsgpackError> {
    expect_family(raw, Family::Str)?;
    let bytes = value_bytes(raw)?;
    let s = std::str::from_utf8(bytes).map_err(|e| {
        tracing::debug!(
            len = bytes.len(),
            valid_up_to = e.valid_up_to(),
            "invalid utf-8 in msgpack string"
        );
        MsgpackError::InvalidStringData(bytes.to_vec())
    })?;
    Ok((MsgpackValue::String(s.to_owned()), raw.remaining_after()))
}

pub fn decode_binary<'a>(
    raw: &RawMsgpack<'a>,
) -> Result<(MsgpackValue, &'a [u8]), MsgpackError> {
    expect_family(raw, Family::Bin)?;
    let bytes = value_bytes(raw)?;
    Ok((MsgpackValue::Binary(bytes.to_vec()), raw.remaining_after()))
}

/// Decodes an extension. Type code `-1` is decoded as a [`Timestamp`].
pub fn decode_extension<'a>(
    raw: &RawMsgpack<'a>,
) -> Result<(MsgpackValue, &'a [u8]), MsgpackError> {
    expect_family(raw, Family::Ext)?;
    let section = value_bytes(raw)?;
    let Some((&type_byte, payload)) = section.split_first() else {
        return Err(MsgpackError::invalid("extension lacks a type code"));
    };
    let type_code = type_byte as i8;
    let value = if type_code == predefined::TIMESTAMP {
        MsgpackValue::Timestamp(Timestamp::from_payload(payload)?)
    } else {
        MsgpackValue::Extension(ExtensionValue::new(type_code, payload.to_vec())?)
    };
    Ok((value, raw.remaining_after()))
}

fn one_element_less(raw: &RawMsgpack<'_>) -> MsgpackError {
    tracing::debug!(header = raw.header_byte(), "msgpack container ended early");
    MsgpackError::invalid(format!(
        "{:?} contained one element less than declared",
        raw.tag()
    ))
}

/// Decodes the next element of a container, failing if the buffer ran out.
fn decode_element<'a>(
    raw: &RawMsgpack<'_>,
    rest: &'a [u8],
    config: &Configuration,
    depth: usize,
) -> Result<(MsgpackValue, &'a [u8]), MsgpackError> {
    if rest.is_empty() {
        return Err(one_element_less(raw));
    }
    decode_at_depth(rest, config, depth)
}

/// Decodes an array by parsing `count` consecutive items.
fn decode_array<'a>(
    raw: &RawMsgpack<'a>,
    config: &Configuration,
    depth: usize,
) -> Result<(MsgpackValue, &'a [u8]), MsgpackError> {
    let count = raw.value_len().unwrap_or(0);
    let mut items = Vec::with_capacity(count);
    let mut rest = raw.remaining_after();
    for _ in 0..count {
        let (item, next) = decode_element(raw, rest, config, depth)?;
        items.push(item);
        rest = next;
    }
    Ok((MsgpackValue::Array(items), rest))
}

/// Decodes a map as an ordered pair list. Keys are neither hashed nor
/// deduplicated.
fn decode_map<'a>(
    raw: &RawMsgpack<'a>,
    config: &Configuration,
    depth: usize,
) -> Result<(MsgpackValue, &'a [u8]), MsgpackError> {
    let count = raw.value_len().unwrap_or(0);
    let mut pairs = Vec::with_capacity(count);
    let mut rest = raw.remaining_after();
    for _ in 0..count {
        let (key, next) = decode_element(raw, rest, config, depth)?;
        let (value, next) = decode_element(raw, next, config, depth)?;
        pairs.push((key, value));
        rest = next;
    }
    Ok((MsgpackValue::Map(pairs), rest))
}
