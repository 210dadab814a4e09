//! The capability contract every concrete encoder satisfies.
//!
//! [`ObjectEncoder`] is the keyed surface ("add a typed value under a
//! key"); [`ArrayEncoder`] is the positional one ("append a typed value").
//! Field dispatch is written purely against these traits, so a field never
//! knows which concrete encoder it lands in.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::buffer::Buffer;
use crate::entry::{Entry, EntryCaller, Level};
use crate::error::EncodeError;

/// Line terminator used when the configuration leaves `line_ending` empty.
pub const DEFAULT_LINE_ENDING: &str = "\n";

/// User-supplied marshaling callback for array-valued fields.
///
/// The callback receives the live positional encoder and may issue any
/// number of appends. Implemented for closures, so call sites can pass
/// `|enc| { ... }` directly.
pub trait ArrayMarshaler: Send + Sync {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<(), EncodeError>;
}

impl<F> ArrayMarshaler for F
where
    F: Fn(&mut dyn ArrayEncoder) -> Result<(), EncodeError> + Send + Sync,
{
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<(), EncodeError> {
        self(enc)
    }
}

/// User-supplied marshaling callback for object-valued fields.
///
/// The callback receives the live keyed encoder and may issue any number
/// of adds, including nested namespace opens.
pub trait ObjectMarshaler: Send + Sync {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<(), EncodeError>;
}

impl<F> ObjectMarshaler for F
where
    F: Fn(&mut dyn ObjectEncoder) -> Result<(), EncodeError> + Send + Sync,
{
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<(), EncodeError> {
        self(enc)
    }
}

/// Keyed encoding surface: write a typed value under an explicit key.
pub trait ObjectEncoder {
    fn add_array(&mut self, key: &str, marshaler: &dyn ArrayMarshaler)
        -> Result<(), EncodeError>;
    fn add_object(
        &mut self,
        key: &str,
        marshaler: &dyn ObjectMarshaler,
    ) -> Result<(), EncodeError>;

    /// Adds an opaque binary blob. Encoders render it in whatever
    /// transport-safe form fits their format (the JSON encoder uses
    /// base64).
    fn add_binary(&mut self, key: &str, value: &[u8]);

    /// Adds UTF-8-ish bytes as a string value, escaping without first
    /// materializing a `String`.
    fn add_byte_string(&mut self, key: &str, value: &[u8]);

    fn add_bool(&mut self, key: &str, value: bool);
    fn add_complex128(&mut self, key: &str, re: f64, im: f64);
    fn add_complex64(&mut self, key: &str, re: f32, im: f32);
    fn add_duration(&mut self, key: &str, value: Duration);
    fn add_float64(&mut self, key: &str, value: f64);
    fn add_float32(&mut self, key: &str, value: f32);
    fn add_int64(&mut self, key: &str, value: i64);
    fn add_int32(&mut self, key: &str, value: i32);
    fn add_int16(&mut self, key: &str, value: i16);
    fn add_int8(&mut self, key: &str, value: i8);
    fn add_string(&mut self, key: &str, value: &str);
    fn add_time(&mut self, key: &str, value: DateTime<FixedOffset>);
    fn add_uint64(&mut self, key: &str, value: u64);
    fn add_uint32(&mut self, key: &str, value: u32);
    fn add_uint16(&mut self, key: &str, value: u16);
    fn add_uint8(&mut self, key: &str, value: u8);
    fn add_usize(&mut self, key: &str, value: usize);

    /// Adds a value through the structural fallback serializer. Reserved
    /// for values with no typed case; the hot path never goes through
    /// here.
    fn add_reflected(&mut self, key: &str, value: &serde_json::Value)
        -> Result<(), EncodeError>;

    /// Opens a nested scope: all subsequent adds land inside it until the
    /// encoder's open namespaces are closed.
    fn open_namespace(&mut self, key: &str);
}

/// Positional encoding surface: append a typed value with no key.
pub trait ArrayEncoder {
    fn append_array(&mut self, marshaler: &dyn ArrayMarshaler) -> Result<(), EncodeError>;
    fn append_object(&mut self, marshaler: &dyn ObjectMarshaler) -> Result<(), EncodeError>;
    fn append_bool(&mut self, value: bool);
    fn append_byte_string(&mut self, value: &[u8]);
    fn append_complex128(&mut self, re: f64, im: f64);
    fn append_complex64(&mut self, re: f32, im: f32);
    fn append_duration(&mut self, value: Duration);
    fn append_float64(&mut self, value: f64);
    fn append_float32(&mut self, value: f32);
    fn append_int64(&mut self, value: i64);
    fn append_int32(&mut self, value: i32);
    fn append_int16(&mut self, value: i16);
    fn append_int8(&mut self, value: i8);
    fn append_string(&mut self, value: &str);
    fn append_time(&mut self, value: DateTime<FixedOffset>);
    fn append_uint64(&mut self, value: u64);
    fn append_uint32(&mut self, value: u32);
    fn append_uint16(&mut self, value: u16);
    fn append_uint8(&mut self, value: u8);
    fn append_usize(&mut self, value: usize);
    fn append_reflected(&mut self, value: &serde_json::Value) -> Result<(), EncodeError>;
}

/// A complete entry encoder.
///
/// `clone_encoder` produces an independent encoder with the same
/// configuration, namespace depth, and accumulated context bytes but its
/// own buffer, so concurrent entries never race on shared storage.
pub trait Encoder: ObjectEncoder + Send {
    fn clone_encoder(&self) -> Box<dyn Encoder>;

    /// Serializes a whole entry plus its fields into a pooled buffer. The
    /// caller owns the buffer and must return it with
    /// [`crate::buffer::put`] once the bytes reach their sink.
    fn encode_entry(&self, entry: &Entry, fields: &[crate::field::Field])
        -> Result<Buffer, EncodeError>;
}

/// Formatter callback for levels. Writing nothing makes the encoder fall
/// back to the lowercase level name.
pub type LevelEncoder = fn(Level, &mut dyn ArrayEncoder);

/// Formatter callback for timestamps. Writing nothing makes the encoder
/// fall back to epoch nanoseconds.
pub type TimeEncoder = fn(DateTime<FixedOffset>, &mut dyn ArrayEncoder);

/// Formatter callback for durations. Writing nothing makes the encoder
/// fall back to nanoseconds.
pub type DurationEncoder = fn(Duration, &mut dyn ArrayEncoder);

/// Formatter callback for caller locations. Writing nothing makes the
/// encoder fall back to the full `file:line` path.
pub type CallerEncoder = fn(&EntryCaller, &mut dyn ArrayEncoder);

/// Formatter callback for logger names. Writing nothing makes the encoder
/// fall back to the verbatim name.
pub type NameEncoder = fn(&str, &mut dyn ArrayEncoder);

/// Configuration consumed (not owned) by the encoders.
///
/// An empty key suppresses that element of the entry entirely. An empty
/// `line_ending` means [`DEFAULT_LINE_ENDING`].
#[derive(Debug, Clone, Default)]
pub struct EncoderConfig {
    pub message_key: String,
    pub level_key: String,
    pub time_key: String,
    pub name_key: String,
    pub caller_key: String,
    pub stacktrace_key: String,
    pub line_ending: String,
    pub encode_level: Option<LevelEncoder>,
    pub encode_time: Option<TimeEncoder>,
    pub encode_duration: Option<DurationEncoder>,
    pub encode_caller: Option<CallerEncoder>,
    pub encode_name: Option<NameEncoder>,
}

/// Lowercase level name: `info`.
pub fn lowercase_level_encoder(level: Level, enc: &mut dyn ArrayEncoder) {
    enc.append_string(level.as_str());
}

/// Uppercase level name: `INFO`.
pub fn uppercase_level_encoder(level: Level, enc: &mut dyn ArrayEncoder) {
    enc.append_string(level.as_upper_str());
}

/// Floating-point seconds since the Unix epoch.
pub fn epoch_time_encoder(time: DateTime<FixedOffset>, enc: &mut dyn ArrayEncoder) {
    let nanos = time.timestamp_nanos_opt().unwrap_or(0);
    enc.append_float64(nanos as f64 / 1e9);
}

/// Integer nanoseconds since the Unix epoch.
pub fn epoch_nanos_time_encoder(time: DateTime<FixedOffset>, enc: &mut dyn ArrayEncoder) {
    enc.append_int64(time.timestamp_nanos_opt().unwrap_or(0));
}

/// RFC 3339 with millisecond precision, `Z` for UTC.
pub fn rfc3339_time_encoder(time: DateTime<FixedOffset>, enc: &mut dyn ArrayEncoder) {
    enc.append_string(&time.to_rfc3339_opts(SecondsFormat::Millis, true));
}

/// Floating-point seconds.
pub fn seconds_duration_encoder(duration: Duration, enc: &mut dyn ArrayEncoder) {
    enc.append_float64(duration.as_secs_f64());
}

/// Integer nanoseconds, saturating at `i64::MAX`.
pub fn nanos_duration_encoder(duration: Duration, enc: &mut dyn ArrayEncoder) {
    enc.append_int64(duration_nanos(duration));
}

/// Human form, e.g. `1.5s` or `250ms`.
pub fn string_duration_encoder(duration: Duration, enc: &mut dyn ArrayEncoder) {
    enc.append_string(&format!("{duration:?}"));
}

/// Full `file:line` caller path.
pub fn full_caller_encoder(caller: &EntryCaller, enc: &mut dyn ArrayEncoder) {
    enc.append_string(&caller.full_path());
}

/// Caller path trimmed to the last two segments.
pub fn short_caller_encoder(caller: &EntryCaller, enc: &mut dyn ArrayEncoder) {
    enc.append_string(&caller.trimmed_path());
}

/// Logger name verbatim. Also the fallback when no name encoder is
/// configured.
pub fn full_name_encoder(name: &str, enc: &mut dyn ArrayEncoder) {
    enc.append_string(name);
}

pub(crate) fn duration_nanos(duration: Duration) -> i64 {
    duration.as_nanos().min(i64::MAX as u128) as i64
}
