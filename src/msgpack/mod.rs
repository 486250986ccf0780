//! MessagePack binary format.
//!
//! All multi-byte numbers and lengths are big-endian. The header byte of an
//! item determines its family and how its length is stored; see
//! [`header::HeaderTag`].

pub mod decode;
pub mod encode;
pub mod header;
pub mod raw;

use bytes::{Bytes, BytesMut};

use crate::config::Configuration;
use crate::error::MsgpackError;
use crate::types::MsgpackValue;

pub use decode::decode_value;
pub use encode::encode_value;
pub use header::HeaderTag;
pub use raw::RawMsgpack;

/// Encodes a value into a fresh buffer.
pub fn encode_with(value: &MsgpackValue, config: &Configuration) -> Result<Bytes, MsgpackError> {
    let mut buf = BytesMut::new();
    encode_value(&mut buf, value, config)?;
    tracing::trace!(len = buf.len(), kind = value.kind(), "encoded msgpack value");
    Ok(buf.freeze())
}

/// Decodes exactly one item; trailing bytes are an error.
pub fn decode_with(data: &[u8], config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
    let (value, rest) = decode_value(data, config)?;
    if !rest.is_empty() {
        tracing::debug!(
            consumed = data.len() - rest.len(),
            available = data.len(),
            "trailing bytes after msgpack item"
        );
        return Err(MsgpackError::invalid(format!(
            "{} trailing bytes after item",
            rest.len()
        )));
    }
    tracing::trace!(consumed = data.len(), kind = value.kind(), "decoded msgpack value");
    Ok(value)
}

/// Decodes a concatenation of items until the buffer is exhausted.
pub fn decode_sequence(
    data: &[u8],
    config: &Configuration,
) -> Result<Vec<MsgpackValue>, MsgpackError> {
    let mut values = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let (value, next) = decode_value(rest, config)?;
        values.push(value);
        rest = next;
    }
    tracing::trace!(len = values.len(), consumed = data.len(), "decoded msgpack sequence");
    Ok(values)
}
