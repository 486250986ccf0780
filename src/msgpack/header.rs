//! MessagePack header bytes and their classification.
//!
//! Every item on the wire starts with a single header byte. Five families
//! (positive fixint, negative fixint, fixstr, fixarray, fixmap) embed a
//! value or length in the low bits of that byte; every other header is an
//! exact byte value.

// Masks selecting the header bits of the embedded-value families.
const FIRST_BIT: u8 = 0b1000_0000;
const FIRST_THREE_BITS: u8 = 0b1110_0000;
const FIRST_FOUR_BITS: u8 = 0b1111_0000;

/// The single byte value the format leaves unassigned.
pub const NEVER_USED: u8 = 0xC1;

/// Symbolic MessagePack header tag.
///
/// The discriminant is the tag's base byte. For the embedded-value families
/// the low bits of the base byte are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HeaderTag {
    Nil = 0xC0,
    False = 0xC2,
    True = 0xC3,

    PositiveFixint = 0x00,
    NegativeFixint = 0xE0,
    Uint8 = 0xCC,
    Uint16 = 0xCD,
    Uint32 = 0xCE,
    Uint64 = 0xCF,
    Int8 = 0xD0,
    Int16 = 0xD1,
    Int32 = 0xD2,
    Int64 = 0xD3,

    Float32 = 0xCA,
    Float64 = 0xCB,

    Fixstr = 0xA0,
    Str8 = 0xD9,
    Str16 = 0xDA,
    Str32 = 0xDB,

    Bin8 = 0xC4,
    Bin16 = 0xC5,
    Bin32 = 0xC6,

    Fixarray = 0x90,
    Array16 = 0xDC,
    Array32 = 0xDD,

    Fixmap = 0x80,
    Map16 = 0xDE,
    Map32 = 0xDF,

    Fixext1 = 0xD4,
    Fixext2 = 0xD5,
    Fixext4 = 0xD6,
    Fixext8 = 0xD7,
    Fixext16 = 0xD8,
    Ext8 = 0xC7,
    Ext16 = 0xC8,
    Ext32 = 0xC9,
}

/// Broad value family a header belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Nil,
    Bool,
    Int,
    Float,
    Str,
    Bin,
    Array,
    Map,
    Ext,
}

/// How a header's length (or value) is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthClass {
    /// No further bytes follow the header.
    None,
    /// The value lives in the header byte itself (fixints).
    Embedded,
    /// A fixed number of value bytes follows the header.
    Fixed(usize),
    /// The length is stored in the low `n` bits of the header byte.
    ContainedBits(u8),
    /// The length is stored in `n` big-endian bytes following the header.
    Explicit(usize),
}

impl HeaderTag {
    /// Classifies a leading byte. Returns `None` for the unused byte `0xC1`.
    pub fn classify(byte: u8) -> Option<Self> {
        if byte & FIRST_BIT == 0 {
            return Some(Self::PositiveFixint);
        }
        match byte & FIRST_THREE_BITS {
            0xE0 => return Some(Self::NegativeFixint),
            0xA0 => return Some(Self::Fixstr),
            _ => {}
        }
        match byte & FIRST_FOUR_BITS {
            0x90 => return Some(Self::Fixarray),
            0x80 => return Some(Self::Fixmap),
            _ => {}
        }
        Self::from_exact(byte)
    }

    fn from_exact(byte: u8) -> Option<Self> {
        let tag = match byte {
            0xC0 => Self::Nil,
            0xC2 => Self::False,
            0xC3 => Self::True,
            0xC4 => Self::Bin8,
            0xC5 => Self::Bin16,
            0xC6 => Self::Bin32,
            0xC7 => Self::Ext8,
            0xC8 => Self::Ext16,
            0xC9 => Self::Ext32,
            0xCA => Self::Float32,
            0xCB => Self::Float64,
            0xCC => Self::Uint8,
            0xCD => Self::Uint16,
            0xCE => Self::Uint32,
            0xCF => Self::Uint64,
            0xD0 => Self::Int8,
            0xD1 => Self::Int16,
            0xD2 => Self::Int32,
            0xD3 => Self::Int64,
            0xD4 => Self::Fixext1,
            0xD5 => Self::Fixext2,
            0xD6 => Self::Fixext4,
            0xD7 => Self::Fixext8,
            0xD8 => Self::Fixext16,
            0xD9 => Self::Str8,
            0xDA => Self::Str16,
            0xDB => Self::Str32,
            0xDC => Self::Array16,
            0xDD => Self::Array32,
            0xDE => Self::Map16,
            0xDF => Self::Map32,
            _ => return None,
        };
        Some(tag)
    }

    /// The tag's base byte (low bits cleared for embedded-value families).
    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn family(self) -> Family {
        match self {
            Self::Nil => Family::Nil,
            Self::True | Self::False => Family::Bool,
            Self::PositiveFixint
            | Self::NegativeFixint
            | Self::Uint8
            | Self::Uint16
            | Self::Uint32
            | Self::Uint64
            | Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64 => Family::Int,
            Self::Float32 | Self::Float64 => Family::Float,
            Self::Fixstr | Self::Str8 | Self::Str16 | Self::Str32 => Family::Str,
            Self::Bin8 | Self::Bin16 | Self::Bin32 => Family::Bin,
            Self::Fixarray | Self::Array16 | Self::Array32 => Family::Array,
            Self::Fixmap | Self::Map16 | Self::Map32 => Family::Map,
            Self::Fixext1
            | Self::Fixext2
            | Self::Fixext4
            | Self::Fixext8
            | Self::Fixext16
            | Self::Ext8
            | Self::Ext16
            | Self::Ext32 => Family::Ext,
        }
    }

    pub fn length_class(self) -> LengthClass {
        match self {
            Self::Nil | Self::True | Self::False => LengthClass::None,

            Self::PositiveFixint | Self::NegativeFixint => LengthClass::Embedded,

            Self::Fixext1 | Self::Uint8 | Self::Int8 => LengthClass::Fixed(1),
            Self::Fixext2 | Self::Uint16 | Self::Int16 => LengthClass::Fixed(2),
            Self::Fixext4 | Self::Uint32 | Self::Int32 | Self::Float32 => LengthClass::Fixed(4),
            Self::Fixext8 | Self::Uint64 | Self::Int64 | Self::Float64 => LengthClass::Fixed(8),
            Self::Fixext16 => LengthClass::Fixed(16),

            Self::Fixstr => LengthClass::ContainedBits(5),
            Self::Fixarray | Self::Fixmap => LengthClass::ContainedBits(4),

            Self::Str8 | Self::Bin8 | Self::Ext8 => LengthClass::Explicit(1),
            Self::Str16 | Self::Bin16 | Self::Array16 | Self::Map16 | Self::Ext16 => {
                LengthClass::Explicit(2)
            }
            Self::Str32 | Self::Bin32 | Self::Array32 | Self::Map32 | Self::Ext32 => {
                LengthClass::Explicit(4)
            }
        }
    }

    /// Masks the header bits off `byte`, leaving the embedded value.
    ///
    /// Only fixints, fixstr, fixarray and fixmap carry an embedded value.
    pub fn extract_embedded_value(self, byte: u8) -> Option<u8> {
        match self {
            Self::PositiveFixint => Some(byte & !FIRST_BIT),
            Self::NegativeFixint | Self::Fixstr => Some(byte & !FIRST_THREE_BITS),
            Self::Fixarray | Self::Fixmap => Some(byte & !FIRST_FOUR_BITS),
            _ => None,
        }
    }

    /// Merges `value`, truncated to the available bits, into the base byte.
    pub fn merge_embedded_value(self, value: u8) -> Option<u8> {
        match self {
            Self::PositiveFixint => Some(self.byte() | (value & !FIRST_BIT)),
            Self::NegativeFixint | Self::Fixstr => Some(self.byte() | (value & !FIRST_THREE_BITS)),
            Self::Fixarray | Self::Fixmap => Some(self.byte() | (value & !FIRST_FOUR_BITS)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_but_c1_classifies() {
        for byte in 0..=u8::MAX {
            let tag = HeaderTag::classify(byte);
            if byte == NEVER_USED {
                assert_eq!(tag, None);
            } else {
                assert!(tag.is_some(), "byte 0x{byte:02X} unclassified");
            }
        }
    }

    #[test]
    fn masked_families() {
        assert_eq!(HeaderTag::classify(0x00), Some(HeaderTag::PositiveFixint));
        assert_eq!(HeaderTag::classify(0x7F), Some(HeaderTag::PositiveFixint));
        assert_eq!(HeaderTag::classify(0xE0), Some(HeaderTag::NegativeFixint));
        assert_eq!(HeaderTag::classify(0xFF), Some(HeaderTag::NegativeFixint));
        assert_eq!(HeaderTag::classify(0xA0), Some(HeaderTag::Fixstr));
        assert_eq!(HeaderTag::classify(0xBF), Some(HeaderTag::Fixstr));
        assert_eq!(HeaderTag::classify(0x90), Some(HeaderTag::Fixarray));
        assert_eq!(HeaderTag::classify(0x9F), Some(HeaderTag::Fixarray));
        assert_eq!(HeaderTag::classify(0x80), Some(HeaderTag::Fixmap));
        assert_eq!(HeaderTag::classify(0x8F), Some(HeaderTag::Fixmap));
    }

    #[test]
    fn exact_bytes_round_trip_through_byte() {
        for byte in 0xC0..=0xDF {
            if let Some(tag) = HeaderTag::classify(byte) {
                assert_eq!(tag.byte(), byte);
            }
        }
    }

    #[test]
    fn extract_embedded() {
        assert_eq!(HeaderTag::Fixstr.extract_embedded_value(0xA5), Some(5));
        assert_eq!(HeaderTag::Fixarray.extract_embedded_value(0x9F), Some(15));
        assert_eq!(HeaderTag::Fixmap.extract_embedded_value(0x83), Some(3));
        assert_eq!(HeaderTag::PositiveFixint.extract_embedded_value(0x7F), Some(127));
        assert_eq!(HeaderTag::Str8.extract_embedded_value(0xD9), None);
    }

    #[test]
    fn merge_truncates_to_available_bits() {
        assert_eq!(HeaderTag::PositiveFixint.merge_embedded_value(0xFF), Some(0x7F));
        assert_eq!(HeaderTag::NegativeFixint.merge_embedded_value(0xE1), Some(0xE1));
        assert_eq!(HeaderTag::Fixstr.merge_embedded_value(33), Some(0xA1));
        assert_eq!(HeaderTag::Fixarray.merge_embedded_value(17), Some(0x91));
        assert_eq!(HeaderTag::Fixmap.merge_embedded_value(2), Some(0x82));
        assert_eq!(HeaderTag::Nil.merge_embedded_value(1), None);
    }

    #[test]
    fn length_classes() {
        assert_eq!(HeaderTag::Nil.length_class(), LengthClass::None);
        assert_eq!(HeaderTag::NegativeFixint.length_class(), LengthClass::Embedded);
        assert_eq!(HeaderTag::Fixext16.length_class(), LengthClass::Fixed(16));
        assert_eq!(HeaderTag::Fixstr.length_class(), LengthClass::ContainedBits(5));
        assert_eq!(HeaderTag::Map32.length_class(), LengthClass::Explicit(4));
        assert_eq!(HeaderTag::Ext8.family(), Family::Ext);
    }
}
