//! The predefined timestamp extension (type code -1).
//!
//! Three payload layouts exist, chosen on encode by the smallest one that
//! holds the value and told apart on decode purely by payload length:
//!
//! - timestamp 32: 4 bytes, unsigned seconds, no sub-second part.
//! - timestamp 64: 8 bytes, nanoseconds in the high 30 bits and unsigned
//!   seconds in the low 34 bits of one big-endian `u64`.
//! - timestamp 96: 12 bytes, big-endian `u32` nanoseconds followed by
//!   big-endian `i64` seconds.
//!
//! Seconds always count from 1970-01-01T00:00:00Z, the epoch the format
//! defines for all three layouts.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};

use super::{ExtensionValue, predefined};
use crate::error::MsgpackError;

pub const NANOS_PER_SECOND: u32 = 1_000_000_000;

const TIMESTAMP64_SECONDS_LIMIT: i64 = 1 << 34;
const TIMESTAMP64_SECONDS_MASK: u64 = 0x0000_0003_FFFF_FFFF;

/// A point in time as seconds and nanoseconds relative to the Unix epoch.
///
/// `nanoseconds` is always in `0..1_000_000_000`; instants before the epoch
/// have negative `seconds` and a non-negative sub-second part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    seconds: i64,
    nanoseconds: u32,
}

impl Timestamp {
    pub const UNIX_EPOCH: Timestamp = Timestamp {
        seconds: 0,
        nanoseconds: 0,
    };

    /// Fails with [`MsgpackError::DateUnconvertibleToTimestamp`] if
    /// `nanoseconds` is not below one second.
    pub fn new(seconds: i64, nanoseconds: u32) -> Result<Self, MsgpackError> {
        if nanoseconds >= NANOS_PER_SECOND {
            return Err(MsgpackError::DateUnconvertibleToTimestamp);
        }
        Ok(Self {
            seconds,
            nanoseconds,
        })
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }

    /// Converts a fractional count of seconds since the epoch.
    ///
    /// The sub-second part must be an exact integer number of nanoseconds
    /// and the whole seconds must fit an `i64`.
    pub fn from_secs_f64(secs: f64) -> Result<Self, MsgpackError> {
        if !secs.is_finite() {
            return Err(MsgpackError::DateUnconvertibleToTimestamp);
        }
        let whole = secs.floor();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range.
        if whole < i64::MIN as f64 || whole >= i64::MAX as f64 {
            return Err(MsgpackError::DateUnconvertibleToTimestamp);
        }
        let nanos = (secs - whole) * f64::from(NANOS_PER_SECOND);
        if nanos.fract() != 0.0 {
            return Err(MsgpackError::DateUnconvertibleToTimestamp);
        }

        let mut seconds = whole as i64;
        let mut nanoseconds = nanos as u32;
        if nanoseconds >= NANOS_PER_SECOND {
            nanoseconds -= NANOS_PER_SECOND;
            seconds = seconds
                .checked_add(1)
                .ok_or(MsgpackError::DateUnconvertibleToTimestamp)?;
        }
        Self::new(seconds, nanoseconds)
    }

    /// Fractional seconds since the epoch. May lose precision for large
    /// magnitudes.
    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + f64::from(self.nanoseconds) / f64::from(NANOS_PER_SECOND)
    }

    /// Converts to the platform time type.
    ///
    /// Fails with [`MsgpackError::TimestampUnconvertibleToDate`] if the
    /// platform cannot represent the instant.
    pub fn to_system_time(&self) -> Result<SystemTime, MsgpackError> {
        let sub_second = Duration::from_nanos(u64::from(self.nanoseconds));
        let whole = Duration::from_secs(self.seconds.unsigned_abs());
        let at_second = if self.seconds >= 0 {
            UNIX_EPOCH.checked_add(whole)
        } else {
            UNIX_EPOCH.checked_sub(whole)
        };
        at_second
            .and_then(|t| t.checked_add(sub_second))
            .ok_or(MsgpackError::TimestampUnconvertibleToDate)
    }

    /// Encodes into the smallest timestamp extension layout.
    pub fn to_extension(&self) -> ExtensionValue {
        let mut data = BytesMut::with_capacity(12);
        if self.nanoseconds == 0 && u32::try_from(self.seconds).is_ok() {
            data.put_u32(self.seconds as u32);
        } else if (0..TIMESTAMP64_SECONDS_LIMIT).contains(&self.seconds) {
            data.put_u64((u64::from(self.nanoseconds) << 34) | self.seconds as u64);
        } else {
            // timestamp 96 as the MessagePack format defines it: signed
            // seconds since 1970-01-01T00:00:00Z, no other epoch offset.
            data.put_u32(self.nanoseconds);
            data.put_i64(self.seconds);
        }
        ExtensionValue {
            type_code: predefined::TIMESTAMP,
            data: data.to_vec(),
        }
    }

    /// Decodes a timestamp extension payload (type code already stripped).
    ///
    /// Fails with [`MsgpackError::InvalidMsgpack`] for a payload that is not
    /// 4, 8 or 12 bytes long and with
    /// [`MsgpackError::TimestampUnconvertibleToDate`] when the nanosecond
    /// field is out of range.
    pub fn from_payload(payload: &[u8]) -> Result<Self, MsgpackError> {
        let mut buf = payload;
        match payload.len() {
            4 => Ok(Self {
                seconds: i64::from(buf.get_u32()),
                nanoseconds: 0,
            }),
            8 => {
                let packed = buf.get_u64();
                let nanoseconds = (packed >> 34) as u32;
                let seconds = (packed & TIMESTAMP64_SECONDS_MASK) as i64;
                Self::new(seconds, nanoseconds)
                    .map_err(|_| MsgpackError::TimestampUnconvertibleToDate)
            }
            12 => {
                let nanoseconds = buf.get_u32();
                let seconds = buf.get_i64();
                Self::new(seconds, nanoseconds)
                    .map_err(|_| MsgpackError::TimestampUnconvertibleToDate)
            }
            len => Err(MsgpackError::InvalidMsgpack(format!(
                "timestamp payload must be 4, 8 or 12 bytes, got {len}"
            ))),
        }
    }
}

impl TryFrom<SystemTime> for Timestamp {
    type Error = MsgpackError;

    fn try_from(time: SystemTime) -> Result<Self, Self::Error> {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => {
                let seconds = i64::try_from(since.as_secs())
                    .map_err(|_| MsgpackError::DateUnconvertibleToTimestamp)?;
                Self::new(seconds, since.subsec_nanos())
            }
            Err(before) => {
                let before = before.duration();
                let mut seconds = i64::try_from(before.as_secs())
                    .map(|s| -s)
                    .map_err(|_| MsgpackError::DateUnconvertibleToTimestamp)?;
                let mut nanoseconds = before.subsec_nanos();
                if nanoseconds > 0 {
                    seconds = seconds
                        .checked_sub(1)
                        .ok_or(MsgpackError::DateUnconvertibleToTimestamp)?;
                    nanoseconds = NANOS_PER_SECOND - nanoseconds;
                }
                Self::new(seconds, nanoseconds)
            }
        }
    }
}

impl TryFrom<&ExtensionValue> for Timestamp {
    type Error = MsgpackError;

    fn try_from(ext: &ExtensionValue) -> Result<Self, Self::Error> {
        if ext.type_code() != predefined::TIMESTAMP {
            return Err(MsgpackError::TypeMismatch {
                expected: "timestamp extension",
                found: "extension",
            });
        }
        Self::from_payload(ext.data())
    }
}
