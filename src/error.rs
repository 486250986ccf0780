//! Error types for MessagePack encoding and decoding.

/// Errors that can occur while encoding to or decoding from MessagePack.
///
/// Every variant is a permanent, data-dependent failure; nothing here is
/// worth retrying with the same input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MsgpackError {
    /// The buffer is truncated, shorter than its declared length, or
    /// otherwise structurally broken.
    #[error("invalid msgpack: {0}")]
    InvalidMsgpack(String),

    /// The leading byte does not map to any defined header.
    #[error("unknown msgpack header byte: 0x{0:02X}")]
    UnknownMsgpack(u8),

    /// A string payload is not valid UTF-8. Carries the raw bytes.
    #[error("invalid UTF-8 string data ({} bytes)", .0.len())]
    InvalidStringData(Vec<u8>),

    /// A string, binary, array, map or extension payload holds `2^32` or
    /// more elements.
    #[error("length {0} exceeds the supported maximum of 2^32 - 1")]
    ValueExceededSupportedLength(usize),

    /// A numeric conversion would lose information and lossy conversion is
    /// disabled. Carries the original value.
    #[error("number {0} could not be converted without loss")]
    NumberCouldNotBeConvertedWithoutLoss(String),

    /// Decoded timestamp components cannot form a valid time value.
    #[error("timestamp cannot be converted to a date")]
    TimestampUnconvertibleToDate,

    /// A time value cannot be expressed as a timestamp extension.
    #[error("date cannot be converted to a timestamp")]
    DateUnconvertibleToTimestamp,

    /// Container nesting exceeded the configured depth limit.
    #[error("nesting depth limit of {0} exceeded")]
    DepthLimitExceeded(usize),

    /// A string could not be represented as UTF-8 and lossy string
    /// conversion is disabled.
    #[error("string {0:?} cannot be represented using UTF-8")]
    StringNotRepresentableInUtf8(String),

    /// A value's variant does not match the requested target type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl MsgpackError {
    /// Shorthand for an [`MsgpackError::InvalidMsgpack`] with a reason.
    pub fn invalid(reason: impl std::fmt::Display) -> Self {
        Self::InvalidMsgpack(reason.to_string())
    }

    /// Shorthand for a lossy numeric conversion error.
    pub fn lossy(number: impl std::fmt::Display) -> Self {
        Self::NumberCouldNotBeConvertedWithoutLoss(number.to_string())
    }
}
