//! msgpackr: a pure-Rust MessagePack codec.
//!
//! Converts between MessagePack bytes and a generic value tree, with the
//! smallest wire representation chosen on encode and strict validation on
//! decode. Timestamps (extension type -1) are decoded into a dedicated type.
//!
//! # Architecture
//!
//! - **`msgpack`**: Wire format: header classification, byte-span reader,
//!   encoder and decoder
//! - **`types`**: The `MsgpackValue` tree and its integer/float widths
//! - **`ext`**: Extension values and the timestamp extension
//! - **`convert`**: `Wrap`/`Unwrap` between native Rust types and values
//! - **`config`**: Codec options
//!
//! ```
//! use msgpackr::{decode, encode, MsgpackValue};
//!
//! let value = MsgpackValue::Array(vec![MsgpackValue::from(1u8), MsgpackValue::from("a")]);
//! let bytes = encode(&value).unwrap();
//! assert_eq!(&bytes[..], &[0x92, 0x01, 0xA1, 0x61]);
//! assert_eq!(decode(&bytes).unwrap(), value);
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod ext;
pub mod msgpack;
pub mod types;

use bytes::Bytes;

pub use config::Configuration;
pub use convert::{ByteBuf, Unwrap, Wrap, unwrap_as};
pub use error::MsgpackError;
pub use ext::{ExtensionValue, MsgpackExtension, Timestamp};
pub use msgpack::{decode_sequence, decode_with, encode_with};
pub use types::{Float, Integer, MsgpackValue};

/// Decodes exactly one item with the default configuration.
pub fn decode(data: &[u8]) -> Result<MsgpackValue, MsgpackError> {
    decode_with(data, &Configuration::default())
}

/// Encodes a value with the default configuration.
pub fn encode(value: &MsgpackValue) -> Result<Bytes, MsgpackError> {
    encode_with(value, &Configuration::default())
}

/// Wraps a native value and encodes it.
pub fn to_msgpack<T: Wrap + ?Sized>(
    value: &T,
    config: &Configuration,
) -> Result<Bytes, MsgpackError> {
    encode_with(&value.wrap(config)?, config)
}

/// Decodes one item and unwraps it into a native value.
pub fn from_msgpack<T: Unwrap>(data: &[u8], config: &Configuration) -> Result<T, MsgpackError> {
    unwrap_as(decode_with(data, config)?, config)
}
