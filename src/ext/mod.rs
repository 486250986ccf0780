//! MessagePack extension values and predefined extension types.

pub mod timestamp;

pub use timestamp::Timestamp;

use crate::error::MsgpackError;
use crate::types::MsgpackValue;

/// Type codes reserved by the format for predefined extensions.
pub mod predefined {
    /// The timestamp extension.
    pub const TIMESTAMP: i8 = -1;
}

/// Largest payload an extension may carry (`2^32 - 1` bytes).
pub const MAX_EXTENSION_LEN: usize = u32::MAX as usize;

/// An application-defined extension: a signed type code plus opaque bytes.
///
/// Codes `0..=127` are free for applications, negative codes are reserved
/// for predefined types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionValue {
    type_code: i8,
    data: Vec<u8>,
}

impl ExtensionValue {
    /// Creates an extension value.
    ///
    /// Fails with [`MsgpackError::ValueExceededSupportedLength`] if `data`
    /// does not fit an unsigned 32-bit length. A payload under the timestamp
    /// type code must be a valid timestamp payload, since the decoder reads
    /// that code as a [`Timestamp`].
    pub fn new(type_code: i8, data: Vec<u8>) -> Result<Self, MsgpackError> {
        if data.len() > MAX_EXTENSION_LEN {
            return Err(MsgpackError::ValueExceededSupportedLength(data.len()));
        }
        if type_code == predefined::TIMESTAMP {
            Timestamp::from_payload(&data)?;
        }
        Ok(Self { type_code, data })
    }

    pub fn type_code(&self) -> i8 {
        self.type_code
    }

    /// The type code as it appears on the wire.
    pub fn type_byte(&self) -> u8 {
        self.type_code as u8
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Whether this extension carries a predefined type code.
    pub fn is_predefined(&self) -> bool {
        self.type_code < 0
    }
}

/// A user type that travels as an extension value.
///
/// Implement this, then derive [`Wrap`](crate::convert::Wrap) and
/// [`Unwrap`](crate::convert::Unwrap) with
/// [`impl_msgpack_extension!`](crate::impl_msgpack_extension).
pub trait MsgpackExtension {
    /// The application type code, normally in `0..=127`.
    const TYPE_CODE: i8;

    /// Serializes the value into the extension payload.
    fn encode_self(&self) -> Result<Vec<u8>, MsgpackError>;

    /// Rebuilds the value from an extension payload.
    fn from_data(data: &[u8]) -> Result<Self, MsgpackError>
    where
        Self: Sized;
}

/// Wraps a user extension type as an extension value.
pub fn wrap_extension<T: MsgpackExtension + ?Sized>(
    value: &T,
) -> Result<MsgpackValue, MsgpackError> {
    ExtensionValue::new(T::TYPE_CODE, value.encode_self()?).map(MsgpackValue::Extension)
}

/// Unwraps an extension value into a user extension type.
///
/// Fails with [`MsgpackError::TypeMismatch`] if the value is not an
/// extension or carries a different type code.
pub fn unwrap_extension<T: MsgpackExtension>(value: MsgpackValue) -> Result<T, MsgpackError> {
    match value {
        MsgpackValue::Extension(ext) if ext.type_code() == T::TYPE_CODE => {
            T::from_data(ext.data())
        }
        // The decoder turns timestamp-coded extensions into timestamps.
        MsgpackValue::Timestamp(ts) if T::TYPE_CODE == predefined::TIMESTAMP => {
            T::from_data(ts.to_extension().data())
        }
        MsgpackValue::Extension(_) => Err(MsgpackError::TypeMismatch {
            expected: "extension with matching type code",
            found: "extension",
        }),
        other => Err(MsgpackError::TypeMismatch {
            expected: "extension",
            found: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Buf, BufMut};

    use super::*;

    #[test]
    fn type_byte_is_twos_complement() {
        let ext = ExtensionValue::new(-2, vec![1, 2, 3]).unwrap();
        assert_eq!(ext.type_byte(), 0xFE);
        assert!(ext.is_predefined());
        assert_eq!(ext.data(), &[1, 2, 3]);
    }

    #[test]
    fn application_code_is_not_predefined() {
        let ext = ExtensionValue::new(42, Vec::new()).unwrap();
        assert!(!ext.is_predefined());
        assert!(ext.into_data().is_empty());
    }

    #[test]
    fn timestamp_code_requires_timestamp_payload() {
        assert!(matches!(
            ExtensionValue::new(predefined::TIMESTAMP, vec![1, 2, 3]),
            Err(MsgpackError::InvalidMsgpack(_))
        ));
        // ts64 with nanoseconds above one second.
        assert_eq!(
            ExtensionValue::new(predefined::TIMESTAMP, vec![0xFF; 8]),
            Err(MsgpackError::TimestampUnconvertibleToDate)
        );
        let ok = ExtensionValue::new(predefined::TIMESTAMP, vec![0, 0, 0, 1]).unwrap();
        assert_eq!(Timestamp::try_from(&ok), Ok(Timestamp::new(1, 0).unwrap()));
    }

    #[derive(Debug, PartialEq)]
    struct Rgb(u8, u8, u8);

    impl MsgpackExtension for Rgb {
        const TYPE_CODE: i8 = 9;

        fn encode_self(&self) -> Result<Vec<u8>, MsgpackError> {
            let mut buf = Vec::with_capacity(3);
            buf.put_u8(self.0);
            buf.put_u8(self.1);
            buf.put_u8(self.2);
            Ok(buf)
        }

        fn from_data(mut data: &[u8]) -> Result<Self, MsgpackError> {
            if data.len() != 3 {
                return Err(MsgpackError::invalid("rgb payload must be 3 bytes"));
            }
            Ok(Rgb(data.get_u8(), data.get_u8(), data.get_u8()))
        }
    }

    #[test]
    fn user_extension_wraps_with_its_type_code() {
        let wrapped = wrap_extension(&Rgb(1, 2, 3)).unwrap();
        assert_eq!(
            wrapped,
            MsgpackValue::Extension(ExtensionValue::new(9, vec![1, 2, 3]).unwrap())
        );
        assert_eq!(unwrap_extension::<Rgb>(wrapped), Ok(Rgb(1, 2, 3)));
    }

    #[test]
    fn user_extension_rejects_other_codes_and_variants() {
        let other = MsgpackValue::Extension(ExtensionValue::new(8, vec![1, 2, 3]).unwrap());
        assert_eq!(
            unwrap_extension::<Rgb>(other),
            Err(MsgpackError::TypeMismatch {
                expected: "extension with matching type code",
                found: "extension"
            })
        );
        assert_eq!(
            unwrap_extension::<Rgb>(MsgpackValue::Nil),
            Err(MsgpackError::TypeMismatch {
                expected: "extension",
                found: "nil"
            })
        );
        let short = MsgpackValue::Extension(ExtensionValue::new(9, vec![1]).unwrap());
        assert!(matches!(
            unwrap_extension::<Rgb>(short),
            Err(MsgpackError::InvalidMsgpack(_))
        ));
    }
}
