//! Byte-span view over a single MessagePack item.
//!
//! Any item on the wire is laid out as
//!
//! ```text
//! header byte | length section (optional) | value data (optional)
//! ```
//!
//! [`RawMsgpack`] classifies the header, locates the value data and the bytes
//! that follow the item, all eagerly at construction. Arrays and maps are the
//! exception: their value data is a run of further items that can only be
//! delimited by decoding them, so for those the "remaining" bytes start right
//! after the length section.

use std::ops::Range;

use bytes::Buf;

use super::header::{Family, HeaderTag, LengthClass};
use crate::error::MsgpackError;

/// A classified MessagePack item at the start of a borrowed buffer.
#[derive(Debug, Clone, Copy)]
pub struct RawMsgpack<'a> {
    data: &'a [u8],
    tag: HeaderTag,
    /// Offset of the value data (or of the first element for containers).
    value_start: usize,
    /// Byte length of the value data, or element count for containers.
    /// `None` when the header carries nothing further.
    value_len: Option<usize>,
}

impl<'a> RawMsgpack<'a> {
    /// Classifies the item at the start of `data` and validates that the
    /// buffer holds everything the header declares.
    ///
    /// Fails with [`MsgpackError::UnknownMsgpack`] for an unassigned header
    /// byte and with [`MsgpackError::InvalidMsgpack`] for an empty or
    /// truncated buffer.
    pub fn new(data: &'a [u8]) -> Result<Self, MsgpackError> {
        let Some(&header_byte) = data.first() else {
            return Err(MsgpackError::invalid("empty buffer"));
        };
        let Some(tag) = HeaderTag::classify(header_byte) else {
            tracing::debug!(byte = header_byte, "unknown msgpack header");
            return Err(MsgpackError::UnknownMsgpack(header_byte));
        };

        let (value_start, value_len) = match tag.length_class() {
            LengthClass::None => (1, None),
            // The header byte is its own value.
            LengthClass::Embedded => (0, Some(1)),
            LengthClass::Fixed(n) => (1, Some(n)),
            LengthClass::ContainedBits(bits) => {
                let len = header_byte & ((1u8 << bits) - 1);
                (1, Some(usize::from(len)))
            }
            LengthClass::Explicit(n) => (1 + n, Some(read_length(data, n)?)),
        };

        let mut raw = Self {
            data,
            tag,
            value_start,
            value_len,
        };

        if tag.family() == Family::Ext {
            // The type code byte precedes the payload.
            raw.value_len = raw.value_len.map(|len| len + 1);
        }

        raw.ensure_declared_length()?;
        Ok(raw)
    }

    fn ensure_declared_length(&self) -> Result<(), MsgpackError> {
        let needed = match (self.tag.family(), self.value_len) {
            // Every element takes at least one byte, map entries at least two.
            (Family::Array, Some(count)) => count,
            (Family::Map, Some(count)) => count.checked_mul(2).unwrap_or(usize::MAX),
            (_, Some(len)) => len,
            (_, None) => 0,
        };
        let total = self.value_start.checked_add(needed).unwrap_or(usize::MAX);
        if self.data.len() < total.max(1) {
            tracing::debug!(
                header = self.tag.byte(),
                needed = total,
                available = self.data.len(),
                "truncated msgpack item"
            );
            return Err(MsgpackError::InvalidMsgpack(format!(
                "{:?} needs {total} bytes but only {} available",
                self.tag,
                self.data.len()
            )));
        }
        Ok(())
    }

    /// The classified header tag.
    pub fn tag(&self) -> HeaderTag {
        self.tag
    }

    /// The raw header byte, including any embedded bits.
    pub fn header_byte(&self) -> u8 {
        self.data[0]
    }

    /// Declared length of the value section: a byte count for scalars,
    /// strings, binaries and extensions (type code included), an element
    /// count for arrays and maps.
    pub fn value_len(&self) -> Option<usize> {
        self.value_len
    }

    fn is_container(&self) -> bool {
        matches!(self.tag.family(), Family::Array | Family::Map)
    }

    /// The flat value-data slice.
    ///
    /// `None` for arrays and maps (their value needs recursive parsing) and
    /// for headers without a value section.
    pub fn value_data(&self) -> Option<&'a [u8]> {
        if self.is_container() {
            return None;
        }
        let len = self.value_len?;
        Some(&self.data[self.value_start..self.value_start + len])
    }

    /// Whether `index` addresses a byte of the flat value section.
    pub fn is_accessible(&self, index: usize) -> bool {
        self.value_data().is_some_and(|v| index < v.len())
    }

    /// Byte `index` of the value section.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the value section. Callers validate
    /// lengths beforehand, so this indicates an internal bug.
    pub fn byte_at(&self, index: usize) -> u8 {
        assert!(
            self.is_accessible(index),
            "value byte {index} out of range for {:?}",
            self.tag
        );
        self.data[self.value_start + index]
    }

    /// A sub-range of the value section.
    ///
    /// # Panics
    ///
    /// Panics if `range` is not fully inside the value section.
    pub fn slice(&self, range: Range<usize>) -> &'a [u8] {
        let value = self.value_data().unwrap_or_default();
        assert!(
            range.start <= range.end && range.end <= value.len(),
            "value range {range:?} out of range for {:?}",
            self.tag
        );
        &value[range]
    }

    /// The bytes after this item.
    ///
    /// For arrays and maps these are the raw, not yet decoded elements
    /// followed by whatever trails the container. Empty when nothing remains.
    pub fn remaining_after(&self) -> &'a [u8] {
        let start = if self.is_container() {
            self.value_start
        } else {
            self.value_start + self.value_len.unwrap_or(0)
        };
        self.data.get(start..).unwrap_or_default()
    }

    /// Reads the value section as a big-endian unsigned integer of
    /// `width` bytes (1, 2, 4 or 8).
    pub(crate) fn read_be_uint(&self, width: usize) -> Result<u64, MsgpackError> {
        let value = self
            .value_data()
            .filter(|v| v.len() >= width)
            .ok_or_else(|| MsgpackError::invalid(format!("{:?} lacks value bytes", self.tag)))?;
        let mut buf = value;
        Ok(match width {
            1 => u64::from(buf.get_u8()),
            2 => u64::from(buf.get_u16()),
            4 => u64::from(buf.get_u32()),
            8 => buf.get_u64(),
            _ => unreachable!("unsupported integer width {width}"),
        })
    }
}

fn read_length(data: &[u8], width: usize) -> Result<usize, MsgpackError> {
    let Some(mut bytes) = data.get(1..1 + width) else {
        return Err(MsgpackError::InvalidMsgpack(format!(
            "length section needs {width} bytes but only {} available",
            data.len().saturating_sub(1)
        )));
    };
    let len = match width {
        1 => u32::from(bytes.get_u8()),
        2 => u32::from(bytes.get_u16()),
        _ => bytes.get_u32(),
    };
    usize::try_from(len).map_err(|_| MsgpackError::invalid("length exceeds platform address space"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_is_invalid() {
        assert!(matches!(
            RawMsgpack::new(&[]),
            Err(MsgpackError::InvalidMsgpack(_))
        ));
    }

    #[test]
    fn reserved_byte_is_unknown() {
        assert_eq!(
            RawMsgpack::new(&[0xC1]).unwrap_err(),
            MsgpackError::UnknownMsgpack(0xC1)
        );
    }

    #[test]
    fn truncated_fixstr_is_invalid() {
        assert!(matches!(
            RawMsgpack::new(&[0xA3, 0x61, 0x62]),
            Err(MsgpackError::InvalidMsgpack(_))
        ));
    }

    #[test]
    fn missing_length_bytes_are_invalid() {
        assert!(matches!(
            RawMsgpack::new(&[0xDA, 0x00]),
            Err(MsgpackError::InvalidMsgpack(_))
        ));
    }

    #[test]
    fn nil_has_no_value_section() {
        let raw = RawMsgpack::new(&[0xC0, 0x01]).unwrap();
        assert_eq!(raw.tag(), HeaderTag::Nil);
        assert_eq!(raw.value_data(), None);
        assert_eq!(raw.remaining_after(), &[0x01]);
    }

    #[test]
    fn fixint_value_is_header_byte() {
        let raw = RawMsgpack::new(&[0x2A, 0xC0]).unwrap();
        assert_eq!(raw.value_data(), Some(&[0x2A][..]));
        assert_eq!(raw.byte_at(0), 0x2A);
        assert_eq!(raw.remaining_after(), &[0xC0]);
    }

    #[test]
    fn str8_spans() {
        let raw = RawMsgpack::new(&[0xD9, 0x02, b'h', b'i', 0x07]).unwrap();
        assert_eq!(raw.tag(), HeaderTag::Str8);
        assert_eq!(raw.value_data(), Some(&b"hi"[..]));
        assert_eq!(raw.slice(1..2), b"i");
        assert_eq!(raw.remaining_after(), &[0x07]);
    }

    #[test]
    fn ext_length_includes_type_code() {
        let raw = RawMsgpack::new(&[0xD4, 0x05, 0xAA]).unwrap();
        assert_eq!(raw.value_len(), Some(2));
        assert_eq!(raw.value_data(), Some(&[0x05, 0xAA][..]));
        assert!(raw.remaining_after().is_empty());
    }

    #[test]
    fn array_remaining_is_elements() {
        let raw = RawMsgpack::new(&[0x92, 0x01, 0x02, 0xC0]).unwrap();
        assert_eq!(raw.value_data(), None);
        assert_eq!(raw.value_len(), Some(2));
        assert_eq!(raw.remaining_after(), &[0x01, 0x02, 0xC0]);
    }

    #[test]
    fn map_claiming_too_many_pairs_fails_fast() {
        // map32 declaring u32::MAX pairs over a handful of bytes.
        let data = [0xDF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x02];
        assert!(matches!(
            RawMsgpack::new(&data),
            Err(MsgpackError::InvalidMsgpack(_))
        ));
    }

    #[test]
    fn read_be_uint_reads_big_endian() {
        let raw = RawMsgpack::new(&[0xCD, 0x12, 0x34]).unwrap();
        assert_eq!(raw.read_be_uint(2).unwrap(), 0x1234);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn byte_at_past_value_panics() {
        let raw = RawMsgpack::new(&[0xCC, 0x01, 0x02]).unwrap();
        raw.byte_at(1);
    }
}
