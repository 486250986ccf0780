//! Codec configuration.

/// Default container nesting limit for encoding and decoding.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Options honored by the codec and the wrap/unwrap adapters.
///
/// Passed by reference to every entry point; there is no global default
/// beyond [`Configuration::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Clamp integers that do not fit the requested width instead of
    /// failing. Default `false`.
    pub allow_lossy_integer_conversion: bool,
    /// Round `f64` values that are not representable as the requested
    /// `f32` instead of failing. Default `false`.
    pub allow_lossy_float_conversion: bool,
    /// Substitute invalid UTF-8 sequences instead of failing. Default `false`.
    pub allow_lossy_string_conversion: bool,
    /// Wrap `SystemTime` as the timestamp extension rather than as float
    /// seconds. Default `true`.
    pub convert_native_datetime_to_timestamp: bool,
    /// Wrap map-like types as MessagePack maps rather than as a flat
    /// key/value array. Default `true`.
    pub encode_maps_in_cross_language_compatible_form: bool,
    /// Wrap map keys as their string rendering. Default `false`.
    pub encode_map_keys_as_strings: bool,
    /// Wrap byte buffers as the binary type rather than as an array of
    /// small integers. Default `true`.
    pub encode_byte_buffers_as_binary: bool,
    /// Maximum container nesting depth. Default [`DEFAULT_MAX_DEPTH`].
    pub max_depth: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            allow_lossy_integer_conversion: false,
            allow_lossy_float_conversion: false,
            allow_lossy_string_conversion: false,
            convert_native_datetime_to_timestamp: true,
            encode_maps_in_cross_language_compatible_form: true,
            encode_map_keys_as_strings: false,
            encode_byte_buffers_as_binary: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Configuration {
    /// Starts from the defaults; chain the setters below.
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn allow_lossy_integer_conversion(mut self, allow: bool) -> Self {
        self.allow_lossy_integer_conversion = allow;
        self
    }

    pub fn allow_lossy_float_conversion(mut self, allow: bool) -> Self {
        self.allow_lossy_float_conversion = allow;
        self
    }

    pub fn allow_lossy_string_conversion(mut self, allow: bool) -> Self {
        self.allow_lossy_string_conversion = allow;
        self
    }

    pub fn convert_native_datetime_to_timestamp(mut self, convert: bool) -> Self {
        self.convert_native_datetime_to_timestamp = convert;
        self
    }

    pub fn encode_maps_in_cross_language_compatible_form(mut self, enable: bool) -> Self {
        self.encode_maps_in_cross_language_compatible_form = enable;
        self
    }

    pub fn encode_map_keys_as_strings(mut self, enable: bool) -> Self {
        self.encode_map_keys_as_strings = enable;
        self
    }

    pub fn encode_byte_buffers_as_binary(mut self, enable: bool) -> Self {
        self.encode_byte_buffers_as_binary = enable;
        self
    }

    /// Sets the maximum container nesting depth.
    pub fn max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }
}
