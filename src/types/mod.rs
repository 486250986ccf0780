//! MessagePack value types.

mod value;

pub use value::{Float, Integer, MsgpackValue};

pub use crate::ext::{ExtensionValue, Timestamp};
