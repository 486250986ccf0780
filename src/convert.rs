//! Conversions between Rust values and [`MsgpackValue`].
//!
//! [`Wrap`] turns a native value into a value node ready for encoding and
//! [`Unwrap`] recovers a native value from a decoded node. Both honor the
//! lossy-conversion and shape options of [`Configuration`].

use std::collections::{BTreeMap, HashMap};
use std::ffi::{OsStr, OsString};
use std::hash::Hash;
use std::ops::Deref;
use std::time::SystemTime;

use bytes::Bytes;

use crate::config::Configuration;
use crate::error::MsgpackError;
use crate::ext::timestamp::NANOS_PER_SECOND;
use crate::ext::{ExtensionValue, Timestamp};
use crate::types::{Float, MsgpackValue};

/// Converts a native value into a [`MsgpackValue`].
pub trait Wrap {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError>;
}

/// Recovers a native value from a [`MsgpackValue`].
///
/// Call through [`unwrap_as`] to avoid clashing with inherent `unwrap`
/// methods such as `Option::unwrap`.
pub trait Unwrap: Sized {
    fn unwrap(value: MsgpackValue, config: &Configuration) -> Result<Self, MsgpackError>;
}

/// Unwraps `value` into `T`.
pub fn unwrap_as<T: Unwrap>(
    value: MsgpackValue,
    config: &Configuration,
) -> Result<T, MsgpackError> {
    <T as Unwrap>::unwrap(value, config)
}

fn mismatch(expected: &'static str, found: &MsgpackValue) -> MsgpackError {
    MsgpackError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

/// A byte buffer that wraps as the binary type.
///
/// Plain `Vec<u8>` wraps as an array like any other vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteBuf(pub Bytes);

impl ByteBuf {
    pub fn into_inner(self) -> Bytes {
        self.0
    }
}

impl Deref for ByteBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteBuf {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl From<Bytes> for ByteBuf {
    fn from(b: Bytes) -> Self {
        Self(b)
    }
}

impl From<&[u8]> for ByteBuf {
    fn from(b: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(b))
    }
}

// -- Wrap --

impl<T: Wrap + ?Sized> Wrap for &T {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        (**self).wrap(config)
    }
}

impl Wrap for MsgpackValue {
    fn wrap(&self, _config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        Ok(self.clone())
    }
}

impl Wrap for bool {
    fn wrap(&self, _config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        Ok(MsgpackValue::Boolean(*self))
    }
}

macro_rules! wrap_via_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Wrap for $ty {
                fn wrap(&self, _config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
                    Ok(MsgpackValue::from(*self))
                }
            }
        )*
    };
}

wrap_via_from!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Wrap for usize {
    fn wrap(&self, _config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        Ok(MsgpackValue::from(*self as u64))
    }
}

impl Wrap for isize {
    fn wrap(&self, _config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        Ok(MsgpackValue::from(*self as i64))
    }
}

impl Wrap for str {
    fn wrap(&self, _config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        Ok(MsgpackValue::from(self))
    }
}

impl Wrap for String {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        self.as_str().wrap(config)
    }
}

impl Wrap for OsStr {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        match self.to_str() {
            Some(s) => Ok(MsgpackValue::from(s)),
            None if config.allow_lossy_string_conversion => {
                let lossy = self.to_string_lossy().into_owned();
                tracing::warn!(string = %lossy, "replaced non-UTF-8 sequences in string");
                Ok(MsgpackValue::String(lossy))
            }
            None => Err(MsgpackError::StringNotRepresentableInUtf8(
                self.to_string_lossy().into_owned(),
            )),
        }
    }
}

impl Wrap for OsString {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        self.as_os_str().wrap(config)
    }
}

impl<T: Wrap> Wrap for Option<T> {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        match self {
            Some(v) => v.wrap(config),
            None => Ok(MsgpackValue::Nil),
        }
    }
}

impl<T: Wrap> Wrap for [T] {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        self.iter()
            .map(|item| item.wrap(config))
            .collect::<Result<Vec<_>, _>>()
            .map(MsgpackValue::Array)
    }
}

impl<T: Wrap> Wrap for Vec<T> {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        self.as_slice().wrap(config)
    }
}

impl Wrap for ByteBuf {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        if config.encode_byte_buffers_as_binary {
            Ok(MsgpackValue::Binary(self.0.to_vec()))
        } else {
            Ok(MsgpackValue::Array(
                self.0.iter().map(|&b| MsgpackValue::from(b)).collect(),
            ))
        }
    }
}

/// Renders a wrapped key as a string key.
fn string_key(key: MsgpackValue) -> MsgpackValue {
    match key {
        MsgpackValue::String(_) => key,
        other => MsgpackValue::String(other.to_string()),
    }
}

fn wrap_entries<'a, K, V>(
    entries: impl ExactSizeIterator<Item = (&'a K, &'a V)>,
    config: &Configuration,
) -> Result<MsgpackValue, MsgpackError>
where
    K: Wrap + 'a,
    V: Wrap + 'a,
{
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key = k.wrap(config)?;
        if config.encode_map_keys_as_strings {
            key = string_key(key);
        }
        pairs.push((key, v.wrap(config)?));
    }
    if config.encode_maps_in_cross_language_compatible_form {
        Ok(MsgpackValue::Map(pairs))
    } else {
        // Flat key, value, key, value... array.
        Ok(MsgpackValue::Array(
            pairs.into_iter().flat_map(|(k, v)| [k, v]).collect(),
        ))
    }
}

impl<K: Wrap, V: Wrap, S> Wrap for HashMap<K, V, S> {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        wrap_entries(self.iter(), config)
    }
}

impl<K: Wrap, V: Wrap> Wrap for BTreeMap<K, V> {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        wrap_entries(self.iter(), config)
    }
}

impl Wrap for SystemTime {
    fn wrap(&self, config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        let ts = Timestamp::try_from(*self)?;
        if config.convert_native_datetime_to_timestamp {
            Ok(MsgpackValue::Timestamp(ts))
        } else {
            Ok(MsgpackValue::Float(Float::F64(ts.as_secs_f64())))
        }
    }
}

impl Wrap for Timestamp {
    fn wrap(&self, _config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        Ok(MsgpackValue::Timestamp(*self))
    }
}

impl Wrap for ExtensionValue {
    fn wrap(&self, _config: &Configuration) -> Result<MsgpackValue, MsgpackError> {
        Ok(MsgpackValue::Extension(self.clone()))
    }
}

// -- Unwrap --

impl Unwrap for MsgpackValue {
    fn unwrap(value: MsgpackValue, _config: &Configuration) -> Result<Self, MsgpackError> {
        Ok(value)
    }
}

impl Unwrap for bool {
    fn unwrap(value: MsgpackValue, _config: &Configuration) -> Result<Self, MsgpackError> {
        match value {
            MsgpackValue::Boolean(b) => Ok(b),
            MsgpackValue::String(ref s) => s.parse().map_err(|_| mismatch("boolean", &value)),
            other => Err(mismatch("boolean", &other)),
        }
    }
}

/// Widens any numeric-looking value to `i128`.
///
/// Floats must be integral unless lossy integer conversion is allowed, in
/// which case they truncate toward zero.
fn integer_source(value: &MsgpackValue, config: &Configuration) -> Result<i128, MsgpackError> {
    match value {
        MsgpackValue::Integer(i) => Ok(i.to_i128()),
        MsgpackValue::Float(f) => {
            let v = f.to_f64();
            // Every f64 below 2^64 in magnitude with no fraction fits.
            if v.is_finite() && v.fract() == 0.0 && v.abs() < 18_446_744_073_709_551_616.0 {
                Ok(v as i128)
            } else if config.allow_lossy_integer_conversion {
                tracing::warn!(value = v, "truncated float to integer");
                Ok(v as i128)
            } else {
                Err(MsgpackError::lossy(v))
            }
        }
        MsgpackValue::String(s) => s.trim().parse().map_err(|_| mismatch("integer", value)),
        other => Err(mismatch("integer", other)),
    }
}

macro_rules! unwrap_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Unwrap for $ty {
                fn unwrap(
                    value: MsgpackValue,
                    config: &Configuration,
                ) -> Result<Self, MsgpackError> {
                    let wide = integer_source(&value, config)?;
                    match <$ty>::try_from(wide) {
                        Ok(v) => Ok(v),
                        Err(_) if config.allow_lossy_integer_conversion => {
                            let clamped = wide.clamp(<$ty>::MIN as i128, <$ty>::MAX as i128) as $ty;
                            tracing::warn!(
                                value = %wide,
                                clamped = %clamped,
                                target = stringify!($ty),
                                "clamped integer"
                            );
                            Ok(clamped)
                        }
                        Err(_) => Err(MsgpackError::lossy(wide)),
                    }
                }
            }
        )*
    };
}

unwrap_integer!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl Unwrap for f64 {
    fn unwrap(value: MsgpackValue, config: &Configuration) -> Result<Self, MsgpackError> {
        match value {
            MsgpackValue::Float(f) => Ok(f.to_f64()),
            MsgpackValue::Integer(i) => {
                let wide = i.to_i128();
                let v = wide as f64;
                if v as i128 == wide {
                    Ok(v)
                } else if config.allow_lossy_float_conversion {
                    tracing::warn!(value = %wide, rounded = v, "rounded integer to float");
                    Ok(v)
                } else {
                    Err(MsgpackError::lossy(wide))
                }
            }
            MsgpackValue::String(ref s) => s.trim().parse().map_err(|_| mismatch("float", &value)),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl Unwrap for f32 {
    fn unwrap(value: MsgpackValue, config: &Configuration) -> Result<Self, MsgpackError> {
        if let MsgpackValue::Float(Float::F32(v)) = value {
            return Ok(v);
        }
        let wide = unwrap_as::<f64>(value, config)?;
        let narrowed = wide as f32;
        if f64::from(narrowed) == wide || wide.is_nan() {
            Ok(narrowed)
        } else if config.allow_lossy_float_conversion {
            tracing::warn!(value = wide, rounded = narrowed, "rounded double to float");
            Ok(narrowed)
        } else {
            Err(MsgpackError::lossy(wide))
        }
    }
}

impl Unwrap for String {
    fn unwrap(value: MsgpackValue, _config: &Configuration) -> Result<Self, MsgpackError> {
        match value {
            MsgpackValue::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl Unwrap for OsString {
    fn unwrap(value: MsgpackValue, config: &Configuration) -> Result<Self, MsgpackError> {
        unwrap_as::<String>(value, config).map(OsString::from)
    }
}

impl<T: Unwrap> Unwrap for Option<T> {
    fn unwrap(value: MsgpackValue, config: &Configuration) -> Result<Self, MsgpackError> {
        match value {
            MsgpackValue::Nil => Ok(None),
            other => unwrap_as(other, config).map(Some),
        }
    }
}

/// Arrays unwrap element-wise. A binary value unwraps byte by byte, so
/// `Vec<u8>` accepts both shapes.
impl<T: Unwrap> Unwrap for Vec<T> {
    fn unwrap(value: MsgpackValue, config: &Configuration) -> Result<Self, MsgpackError> {
        match value {
            MsgpackValue::Array(items) => items
                .into_iter()
                .map(|item| unwrap_as(item, config))
                .collect(),
            MsgpackValue::Binary(bytes) => bytes
                .into_iter()
                .map(|b| unwrap_as(MsgpackValue::from(b), config))
                .collect(),
            other => Err(mismatch("array", &other)),
        }
    }
}

impl Unwrap for ByteBuf {
    fn unwrap(value: MsgpackValue, config: &Configuration) -> Result<Self, MsgpackError> {
        match value {
            MsgpackValue::Binary(bytes) => Ok(ByteBuf::from(bytes)),
            MsgpackValue::Array(_) => unwrap_as::<Vec<u8>>(value, config).map(ByteBuf::from),
            other => Err(mismatch("binary", &other)),
        }
    }
}

/// Map entries from either a map or a flat key/value array.
fn unwrap_entries<K: Unwrap, V: Unwrap>(
    value: MsgpackValue,
    config: &Configuration,
) -> Result<Vec<(K, V)>, MsgpackError> {
    let pairs = match value {
        MsgpackValue::Map(pairs) => pairs,
        MsgpackValue::Array(items) if items.len() % 2 == 0 => {
            let mut pairs = Vec::with_capacity(items.len() / 2);
            let mut items = items.into_iter();
            while let (Some(k), Some(v)) = (items.next(), items.next()) {
                pairs.push((k, v));
            }
            pairs
        }
        other => return Err(mismatch("map", &other)),
    };
    pairs
        .into_iter()
        .map(|(k, v)| Ok((unwrap_as(k, config)?, unwrap_as(v, config)?)))
        .collect()
}

/// Later duplicate keys overwrite earlier ones.
impl<K, V, S> Unwrap for HashMap<K, V, S>
where
    K: Unwrap + Eq + Hash,
    V: Unwrap,
    S: std::hash::BuildHasher + Default,
{
    fn unwrap(value: MsgpackValue, config: &Configuration) -> Result<Self, MsgpackError> {
        Ok(unwrap_entries(value, config)?.into_iter().collect())
    }
}

impl<K: Unwrap + Ord, V: Unwrap> Unwrap for BTreeMap<K, V> {
    fn unwrap(value: MsgpackValue, config: &Configuration) -> Result<Self, MsgpackError> {
        Ok(unwrap_entries(value, config)?.into_iter().collect())
    }
}

/// Float seconds rounded to the nearest nanosecond.
fn timestamp_from_secs(secs: f64) -> Result<Timestamp, MsgpackError> {
    if !secs.is_finite() {
        return Err(MsgpackError::TimestampUnconvertibleToDate);
    }
    let whole = secs.floor();
    if whole < i64::MIN as f64 || whole >= i64::MAX as f64 {
        return Err(MsgpackError::TimestampUnconvertibleToDate);
    }
    let mut seconds = whole as i64;
    let mut nanos = ((secs - whole) * f64::from(NANOS_PER_SECOND)).round() as u32;
    if nanos >= NANOS_PER_SECOND {
        nanos -= NANOS_PER_SECOND;
        seconds += 1;
    }
    Timestamp::new(seconds, nanos).map_err(|_| MsgpackError::TimestampUnconvertibleToDate)
}

impl Unwrap for Timestamp {
    fn unwrap(value: MsgpackValue, _config: &Configuration) -> Result<Self, MsgpackError> {
        match value {
            MsgpackValue::Timestamp(ts) => Ok(ts),
            MsgpackValue::Extension(ref ext) => Timestamp::try_from(ext),
            other => Err(mismatch("timestamp", &other)),
        }
    }
}

impl Unwrap for SystemTime {
    fn unwrap(value: MsgpackValue, config: &Configuration) -> Result<Self, MsgpackError> {
        let ts = match value {
            MsgpackValue::Float(f) => timestamp_from_secs(f.to_f64())?,
            MsgpackValue::Integer(i) => {
                let seconds = i64::try_from(i.to_i128())
                    .map_err(|_| MsgpackError::TimestampUnconvertibleToDate)?;
                Timestamp::new(seconds, 0)?
            }
            other => unwrap_as::<Timestamp>(other, config)?,
        };
        ts.to_system_time()
    }
}

impl Unwrap for ExtensionValue {
    fn unwrap(value: MsgpackValue, _config: &Configuration) -> Result<Self, MsgpackError> {
        match value {
            MsgpackValue::Extension(ext) => Ok(ext),
            MsgpackValue::Timestamp(ts) => Ok(ts.to_extension()),
            other => Err(mismatch("extension", &other)),
        }
    }
}

/// Implements [`Wrap`] and [`Unwrap`] for types implementing
/// [`MsgpackExtension`](crate::ext::MsgpackExtension), so they travel as
/// extension values.
#[macro_export]
macro_rules! impl_msgpack_extension {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::convert::Wrap for $ty {
                fn wrap(
                    &self,
                    _config: &$crate::config::Configuration,
                ) -> Result<$crate::types::MsgpackValue, $crate::error::MsgpackError> {
                    $crate::ext::wrap_extension(self)
                }
            }

            impl $crate::convert::Unwrap for $ty {
                fn unwrap(
                    value: $crate::types::MsgpackValue,
                    _config: &$crate::config::Configuration,
                ) -> Result<Self, $crate::error::MsgpackError> {
                    $crate::ext::unwrap_extension(value)
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    fn cfg() -> Configuration {
        Configuration::default()
    }

    #[test]
    fn integer_narrowing_fails_without_lossy() {
        let v = MsgpackValue::from(300u16);
        assert_eq!(
            unwrap_as::<u8>(v.clone(), &cfg()),
            Err(MsgpackError::NumberCouldNotBeConvertedWithoutLoss("300".into()))
        );
        let lossy = cfg().allow_lossy_integer_conversion(true);
        assert_eq!(unwrap_as::<u8>(v, &lossy), Ok(255));
        assert_eq!(unwrap_as::<u8>(MsgpackValue::from(-5i8), &lossy), Ok(0));
        assert_eq!(unwrap_as::<i64>(MsgpackValue::from(u64::MAX), &lossy), Ok(i64::MAX));
    }

    #[test]
    fn integer_widening_and_sign_change() {
        assert_eq!(unwrap_as::<i64>(MsgpackValue::from(200u8), &cfg()), Ok(200));
        assert_eq!(unwrap_as::<u32>(MsgpackValue::from(7i64), &cfg()), Ok(7));
        assert!(unwrap_as::<u32>(MsgpackValue::from(-7i64), &cfg()).is_err());
    }

    #[test]
    fn integral_floats_unwrap_as_integers() {
        assert_eq!(unwrap_as::<i32>(MsgpackValue::from(3.0f64), &cfg()), Ok(3));
        assert_eq!(
            unwrap_as::<i32>(MsgpackValue::from(3.5f64), &cfg()),
            Err(MsgpackError::lossy(3.5))
        );
    }

    #[test]
    fn strings_parse_into_numbers_and_bools() {
        assert_eq!(unwrap_as::<u16>(MsgpackValue::from("42"), &cfg()), Ok(42));
        assert_eq!(unwrap_as::<f64>(MsgpackValue::from("2.5"), &cfg()), Ok(2.5));
        assert_eq!(unwrap_as::<bool>(MsgpackValue::from("true"), &cfg()), Ok(true));
        assert_eq!(
            unwrap_as::<u16>(MsgpackValue::from("forty"), &cfg()),
            Err(MsgpackError::TypeMismatch {
                expected: "integer",
                found: "string"
            })
        );
    }

    #[test]
    fn float_narrowing() {
        assert_eq!(unwrap_as::<f32>(MsgpackValue::from(2.5f64), &cfg()), Ok(2.5));
        assert!(matches!(
            unwrap_as::<f32>(MsgpackValue::from(0.1f64), &cfg()),
            Err(MsgpackError::NumberCouldNotBeConvertedWithoutLoss(_))
        ));
        let lossy = cfg().allow_lossy_float_conversion(true);
        assert_eq!(unwrap_as::<f32>(MsgpackValue::from(0.1f64), &lossy), Ok(0.1f32));
    }

    #[test]
    fn large_integer_to_double() {
        let big = MsgpackValue::from(u64::MAX);
        assert!(unwrap_as::<f64>(big.clone(), &cfg()).is_err());
        let lossy = cfg().allow_lossy_float_conversion(true);
        assert_eq!(unwrap_as::<f64>(big, &lossy), Ok(u64::MAX as f64));
    }

    #[test]
    fn type_mismatch() {
        assert_eq!(
            unwrap_as::<String>(MsgpackValue::Nil, &cfg()),
            Err(MsgpackError::TypeMismatch {
                expected: "string",
                found: "nil"
            })
        );
    }

    #[test]
    fn option_maps_nil() {
        assert_eq!(None::<i32>.wrap(&cfg()), Ok(MsgpackValue::Nil));
        assert_eq!(unwrap_as::<Option<i32>>(MsgpackValue::Nil, &cfg()), Ok(None));
        assert_eq!(
            unwrap_as::<Option<i32>>(MsgpackValue::from(1u8), &cfg()),
            Ok(Some(1))
        );
    }

    #[test]
    fn byte_buffers() {
        let buf = ByteBuf::from(vec![1u8, 2]);
        assert_eq!(buf.wrap(&cfg()), Ok(MsgpackValue::Binary(vec![1, 2])));
        let as_array = cfg().encode_byte_buffers_as_binary(false);
        let wrapped = buf.wrap(&as_array).unwrap();
        assert_eq!(
            wrapped,
            MsgpackValue::Array(vec![MsgpackValue::from(1u8), MsgpackValue::from(2u8)])
        );
        assert_eq!(unwrap_as::<ByteBuf>(wrapped, &cfg()), Ok(buf));
    }

    #[test]
    fn vec_u8_accepts_binary_and_array() {
        let bin = MsgpackValue::Binary(vec![9, 8]);
        assert_eq!(unwrap_as::<Vec<u8>>(bin, &cfg()), Ok(vec![9, 8]));
        let arr = vec![9u8, 8].wrap(&cfg()).unwrap();
        assert!(matches!(arr, MsgpackValue::Array(_)));
        assert_eq!(unwrap_as::<Vec<u8>>(arr, &cfg()), Ok(vec![9, 8]));
    }

    #[test]
    fn map_keys_as_strings() {
        let map = BTreeMap::from([(1u8, true), (2u8, false)]);
        let c = cfg().encode_map_keys_as_strings(true);
        let wrapped = map.wrap(&c).unwrap();
        assert_eq!(wrapped.map_get("1"), Some(&MsgpackValue::Boolean(true)));
        // String keys parse back into integers.
        assert_eq!(unwrap_as::<BTreeMap<u8, bool>>(wrapped, &c), Ok(map));
    }

    #[test]
    fn flat_map_form() {
        let map = BTreeMap::from([("a".to_owned(), 1i32)]);
        let c = cfg().encode_maps_in_cross_language_compatible_form(false);
        let wrapped = map.wrap(&c).unwrap();
        assert_eq!(
            wrapped,
            MsgpackValue::Array(vec![MsgpackValue::from("a"), MsgpackValue::from(1i32)])
        );
        assert_eq!(unwrap_as::<BTreeMap<String, i32>>(wrapped, &c), Ok(map));
    }

    #[test]
    fn hash_map_last_duplicate_wins() {
        let value = MsgpackValue::Map(vec![
            (MsgpackValue::from("k"), MsgpackValue::from(1u8)),
            (MsgpackValue::from("k"), MsgpackValue::from(2u8)),
        ]);
        let map: HashMap<String, u8> = unwrap_as(value, &cfg()).unwrap();
        assert_eq!(map.get("k"), Some(&2));
    }

    #[test]
    fn system_time_as_timestamp_or_seconds() {
        let t = UNIX_EPOCH + Duration::new(10, 500_000_000);
        let wrapped = t.wrap(&cfg()).unwrap();
        assert_eq!(
            wrapped,
            MsgpackValue::Timestamp(Timestamp::new(10, 500_000_000).unwrap())
        );
        assert_eq!(unwrap_as::<SystemTime>(wrapped, &cfg()), Ok(t));

        let c = cfg().convert_native_datetime_to_timestamp(false);
        let wrapped = t.wrap(&c).unwrap();
        assert_eq!(wrapped.as_f64(), Some(10.5));
        assert_eq!(unwrap_as::<SystemTime>(wrapped, &c), Ok(t));
    }

    #[test]
    fn pre_epoch_system_time() {
        let t = UNIX_EPOCH - Duration::from_millis(1500);
        let wrapped = t.wrap(&cfg()).unwrap();
        assert_eq!(
            wrapped,
            MsgpackValue::Timestamp(Timestamp::new(-2, 500_000_000).unwrap())
        );
        assert_eq!(unwrap_as::<SystemTime>(wrapped, &cfg()), Ok(t));
    }

    #[test]
    fn timestamp_is_an_extension() {
        let ext = unwrap_as::<ExtensionValue>(
            MsgpackValue::Timestamp(Timestamp::UNIX_EPOCH),
            &cfg(),
        )
        .unwrap();
        assert_eq!(ext.type_code(), -1);
        assert_eq!(
            unwrap_as::<Timestamp>(MsgpackValue::Extension(ext), &cfg()),
            Ok(Timestamp::UNIX_EPOCH)
        );
    }

    #[derive(Debug, PartialEq)]
    struct Version {
        major: u16,
        minor: u16,
    }

    impl crate::ext::MsgpackExtension for Version {
        const TYPE_CODE: i8 = 21;

        fn encode_self(&self) -> Result<Vec<u8>, MsgpackError> {
            let mut data = self.major.to_be_bytes().to_vec();
            data.extend_from_slice(&self.minor.to_be_bytes());
            Ok(data)
        }

        fn from_data(data: &[u8]) -> Result<Self, MsgpackError> {
            match data {
                [a, b, c, d] => Ok(Version {
                    major: u16::from_be_bytes([*a, *b]),
                    minor: u16::from_be_bytes([*c, *d]),
                }),
                _ => Err(MsgpackError::invalid("version payload must be 4 bytes")),
            }
        }
    }

    crate::impl_msgpack_extension!(Version);

    #[test]
    fn user_extension_through_wrap_and_unwrap() {
        let v = Version { major: 1, minor: 2 };
        let wrapped = v.wrap(&cfg()).unwrap();
        assert_eq!(
            wrapped,
            MsgpackValue::Extension(ExtensionValue::new(21, vec![0, 1, 0, 2]).unwrap())
        );
        assert_eq!(unwrap_as::<Version>(wrapped, &cfg()), Ok(v));

        // Nested inside containers like any other wrapped type.
        let list = vec![Some(Version { major: 3, minor: 0 }), None];
        let wrapped = list.wrap(&cfg()).unwrap();
        assert_eq!(unwrap_as::<Vec<Option<Version>>>(wrapped, &cfg()), Ok(list));
    }

    #[test]
    fn user_extension_wrong_code() {
        let other = MsgpackValue::Extension(ExtensionValue::new(22, vec![0, 1, 0, 2]).unwrap());
        assert!(matches!(
            unwrap_as::<Version>(other, &cfg()),
            Err(MsgpackError::TypeMismatch { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn os_str_lossy_string_conversion() {
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"a\xFFb");
        assert!(matches!(
            raw.wrap(&cfg()),
            Err(MsgpackError::StringNotRepresentableInUtf8(_))
        ));
        let lossy = cfg().allow_lossy_string_conversion(true);
        assert_eq!(raw.wrap(&lossy), Ok(MsgpackValue::from("a\u{FFFD}b")));
    }
}
