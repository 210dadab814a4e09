use std::mem;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::buffer::{self, Buffer};
use crate::encoder::{
    duration_nanos, full_name_encoder, ArrayEncoder, ArrayMarshaler, Encoder, EncoderConfig,
    ObjectEncoder, ObjectMarshaler, DEFAULT_LINE_ENDING,
};
use crate::entry::Entry;
use crate::error::EncodeError;
use crate::field::{add_fields, Field};

/// Hex digits for `\u00XX` escapes.
const HEX: &[u8; 16] = b"0123456789abcdef";

/// Upper bound on the encoder free list.
const MAX_POOLED: usize = 16;

lazy_static! {
    static ref JSON_POOL: Mutex<Vec<JsonEncoder>> = Mutex::new(Vec::new());
    /// Placeholder configuration held by pooled encoders so a reused
    /// instance can never see a prior caller's keys or callbacks.
    static ref EMPTY_CONFIG: Arc<EncoderConfig> = Arc::new(EncoderConfig::default());
}

fn get_pooled() -> JsonEncoder {
    JSON_POOL.lock().pop().unwrap_or_else(|| JsonEncoder {
        cfg: Arc::clone(&EMPTY_CONFIG),
        buf: Buffer::new(),
        spaced: false,
        open_namespaces: 0,
        reflect_buf: None,
    })
}

fn put_pooled(mut enc: JsonEncoder) {
    if let Some(scratch) = enc.reflect_buf.take() {
        buffer::put(scratch);
    }
    buffer::put(mem::take(&mut enc.buf));
    enc.cfg = Arc::clone(&EMPTY_CONFIG);
    enc.spaced = false;
    enc.open_namespaces = 0;
    let mut pool = JSON_POOL.lock();
    if pool.len() < MAX_POOLED {
        pool.push(enc);
    }
}

/// A fast, low-allocation JSON encoder.
///
/// The encoder escapes all field keys and values but does not deduplicate
/// keys, so a field list with repeated keys produces a message like
/// `{"foo":"bar","foo":"baz"}` — permitted by the JSON specification, if
/// not encouraged.
///
/// # Examples
///
/// ```
/// use logline::{buffer, Entry, EncoderConfig, Encoder, Field, JsonEncoder, Level};
///
/// let enc = JsonEncoder::new(EncoderConfig {
///     message_key: "msg".to_string(),
///     ..EncoderConfig::default()
/// });
/// let entry = Entry::new(Level::Info, "ready");
/// let buf = enc
///     .encode_entry(&entry, &[Field::string("service", "api")])
///     .unwrap();
/// assert_eq!(buf.as_bytes(), b"{\"msg\":\"ready\",\"service\":\"api\"}\n");
/// buffer::put(buf);
/// ```
pub struct JsonEncoder {
    cfg: Arc<EncoderConfig>,
    buf: Buffer,
    spaced: bool,
    open_namespaces: usize,
    // Scratch for the structural fallback, created on first use and
    // reset-and-reused across calls.
    reflect_buf: Option<Buffer>,
}

impl JsonEncoder {
    /// Creates a compact JSON encoder with the given configuration.
    pub fn new(cfg: EncoderConfig) -> Self {
        Self::with_spacing(cfg, false)
    }

    /// Spaced variant: a space follows every colon and comma. Used by the
    /// console encoder's context block.
    pub(crate) fn with_spacing(cfg: EncoderConfig, spaced: bool) -> Self {
        Self {
            cfg: Arc::new(cfg),
            buf: buffer::get(),
            spaced,
            open_namespaces: 0,
            reflect_buf: None,
        }
    }

    pub(crate) fn config(&self) -> Arc<EncoderConfig> {
        Arc::clone(&self.cfg)
    }

    /// An independent encoder with the same configuration and namespace
    /// depth but a fresh, empty buffer.
    fn clone_scratch(&self) -> JsonEncoder {
        let mut clone = get_pooled();
        clone.cfg = Arc::clone(&self.cfg);
        clone.spaced = self.spaced;
        clone.open_namespaces = self.open_namespaces;
        clone.buf = buffer::get();
        clone
    }

    /// Returns this encoder and its buffers to their pools.
    pub(crate) fn release(self) {
        put_pooled(self);
    }

    pub(crate) fn context_len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn context_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    /// Writes one closing brace per open namespace and resets the depth
    /// counter. Must run before a buffer that used namespaces is
    /// finalized, or the JSON is left unbalanced.
    pub(crate) fn close_open_namespaces(&mut self) {
        for _ in 0..self.open_namespaces {
            self.buf.append_byte(b'}');
        }
        self.open_namespaces = 0;
    }

    fn add_key(&mut self, key: &str) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        self.safe_add_str(key);
        self.buf.append_byte(b'"');
        self.buf.append_byte(b':');
        if self.spaced {
            self.buf.append_byte(b' ');
        }
    }

    /// The separator rule: inspect the last byte written; after `{`, `[`,
    /// `:`, `,`, or a space, write nothing, otherwise write `,` (and a
    /// space when spacing is on). Deliberately a last-byte heuristic
    /// rather than an element count — external writers (namespace opens,
    /// custom formatters) touch the buffer between calls.
    fn add_element_separator(&mut self) {
        let last = match self.buf.as_bytes().last() {
            Some(&b) => b,
            None => return,
        };
        match last {
            b'{' | b'[' | b':' | b',' | b' ' => {}
            _ => {
                self.buf.append_byte(b',');
                if self.spaced {
                    self.buf.append_byte(b' ');
                }
            }
        }
    }

    fn safe_add_str(&mut self, s: &str) {
        // Valid UTF-8 never reaches the replacement branch.
        self.safe_add_bytes(s.as_bytes());
    }

    /// JSON-escapes bytes into the buffer without materializing a string.
    /// Bytes >= 0x20 other than `\` and `"` pass through; the usual
    /// two-character escapes cover `\`, `"`, `\n`, `\r`, `\t`; remaining
    /// control bytes become `\u00XX`; invalid UTF-8 bytes become
    /// `\ufffd`, one replacement per rejected byte.
    fn safe_add_bytes(&mut self, s: &[u8]) {
        let mut i = 0;
        while i < s.len() {
            let b = s[i];
            if b < 0x80 {
                self.add_ascii_byte(b);
                i += 1;
                continue;
            }
            let width = utf8_char_width(b);
            if width == 0
                || i + width > s.len()
                || std::str::from_utf8(&s[i..i + width]).is_err()
            {
                self.buf.append_str("\\ufffd");
                i += 1;
                continue;
            }
            self.buf.append_bytes(&s[i..i + width]);
            i += width;
        }
    }

    fn add_ascii_byte(&mut self, b: u8) {
        if b >= 0x20 && b != b'\\' && b != b'"' {
            self.buf.append_byte(b);
            return;
        }
        match b {
            b'\\' | b'"' => {
                self.buf.append_byte(b'\\');
                self.buf.append_byte(b);
            }
            b'\n' => self.buf.append_str("\\n"),
            b'\r' => self.buf.append_str("\\r"),
            b'\t' => self.buf.append_str("\\t"),
            _ => {
                self.buf.append_str("\\u00");
                self.buf.append_byte(HEX[(b >> 4) as usize]);
                self.buf.append_byte(HEX[(b & 0x0F) as usize]);
            }
        }
    }

    /// Serializes a reflected value into the scratch buffer, newline
    /// trimmed, ready to be spliced into the output.
    fn fill_reflect_buf(&mut self, value: &serde_json::Value) -> Result<(), EncodeError> {
        let scratch = self.reflect_buf.get_or_insert_with(buffer::get);
        scratch.reset();
        serde_json::to_writer(&mut *scratch, value)?;
        scratch.trim_newline();
        Ok(())
    }

    fn splice_reflect_buf(&mut self) {
        if let Some(scratch) = &self.reflect_buf {
            self.buf.append_bytes(scratch.as_bytes());
        }
    }

    fn append_float(&mut self, value: f64, bits: u32) {
        self.add_element_separator();
        if value.is_nan() {
            self.buf.append_str("\"NaN\"");
        } else if value == f64::INFINITY {
            self.buf.append_str("\"+Inf\"");
        } else if value == f64::NEG_INFINITY {
            self.buf.append_str("\"-Inf\"");
        } else {
            self.buf.append_float(value, bits);
        }
    }
}

impl Clone for JsonEncoder {
    /// Value-preserving clone: same configuration and namespace depth,
    /// plus a copy of the accumulated buffer bytes, in an independent
    /// buffer. Clones never alias storage.
    fn clone(&self) -> Self {
        let mut clone = self.clone_scratch();
        clone.buf.append_bytes(self.buf.as_bytes());
        clone
    }
}

impl ObjectEncoder for JsonEncoder {
    fn add_array(
        &mut self,
        key: &str,
        marshaler: &dyn ArrayMarshaler,
    ) -> Result<(), EncodeError> {
        self.add_key(key);
        self.append_array(marshaler)
    }

    fn add_object(
        &mut self,
        key: &str,
        marshaler: &dyn ObjectMarshaler,
    ) -> Result<(), EncodeError> {
        self.add_key(key);
        self.append_object(marshaler)
    }

    fn add_binary(&mut self, key: &str, value: &[u8]) {
        self.add_string(key, &BASE64.encode(value));
    }

    fn add_byte_string(&mut self, key: &str, value: &[u8]) {
        self.add_key(key);
        self.append_byte_string(value);
    }

    fn add_bool(&mut self, key: &str, value: bool) {
        self.add_key(key);
        self.append_bool(value);
    }

    fn add_complex128(&mut self, key: &str, re: f64, im: f64) {
        self.add_key(key);
        self.append_complex128(re, im);
    }

    fn add_complex64(&mut self, key: &str, re: f32, im: f32) {
        self.add_key(key);
        self.append_complex64(re, im);
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.add_key(key);
        self.append_duration(value);
    }

    fn add_float64(&mut self, key: &str, value: f64) {
        self.add_key(key);
        self.append_float64(value);
    }

    fn add_float32(&mut self, key: &str, value: f32) {
        self.add_key(key);
        self.append_float32(value);
    }

    fn add_int64(&mut self, key: &str, value: i64) {
        self.add_key(key);
        self.append_int64(value);
    }

    fn add_int32(&mut self, key: &str, value: i32) {
        self.add_key(key);
        self.append_int32(value);
    }

    fn add_int16(&mut self, key: &str, value: i16) {
        self.add_key(key);
        self.append_int16(value);
    }

    fn add_int8(&mut self, key: &str, value: i8) {
        self.add_key(key);
        self.append_int8(value);
    }

    fn add_string(&mut self, key: &str, value: &str) {
        self.add_key(key);
        self.append_string(value);
    }

    fn add_time(&mut self, key: &str, value: DateTime<FixedOffset>) {
        self.add_key(key);
        self.append_time(value);
    }

    fn add_uint64(&mut self, key: &str, value: u64) {
        self.add_key(key);
        self.append_uint64(value);
    }

    fn add_uint32(&mut self, key: &str, value: u32) {
        self.add_key(key);
        self.append_uint32(value);
    }

    fn add_uint16(&mut self, key: &str, value: u16) {
        self.add_key(key);
        self.append_uint16(value);
    }

    fn add_uint8(&mut self, key: &str, value: u8) {
        self.add_key(key);
        self.append_uint8(value);
    }

    fn add_usize(&mut self, key: &str, value: usize) {
        self.add_key(key);
        self.append_usize(value);
    }

    fn add_reflected(
        &mut self,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), EncodeError> {
        self.fill_reflect_buf(value)?;
        self.add_key(key);
        self.splice_reflect_buf();
        Ok(())
    }

    fn open_namespace(&mut self, key: &str) {
        self.add_key(key);
        self.buf.append_byte(b'{');
        self.open_namespaces += 1;
    }
}

impl ArrayEncoder for JsonEncoder {
    fn append_array(&mut self, marshaler: &dyn ArrayMarshaler) -> Result<(), EncodeError> {
        self.add_element_separator();
        // Brackets are written on both success and failure paths, so the
        // output stays syntactically balanced even when marshaling fails.
        self.buf.append_byte(b'[');
        let res = marshaler.marshal_log_array(self);
        self.buf.append_byte(b']');
        res
    }

    fn append_object(&mut self, marshaler: &dyn ObjectMarshaler) -> Result<(), EncodeError> {
        self.add_element_separator();
        self.buf.append_byte(b'{');
        let res = marshaler.marshal_log_object(self);
        self.buf.append_byte(b'}');
        res
    }

    fn append_bool(&mut self, value: bool) {
        self.add_element_separator();
        self.buf.append_bool(value);
    }

    fn append_byte_string(&mut self, value: &[u8]) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        self.safe_add_bytes(value);
        self.buf.append_byte(b'"');
    }

    fn append_complex128(&mut self, re: f64, im: f64) {
        self.add_element_separator();
        // Inside a quoted string, so no NaN/Inf special-casing is needed.
        self.buf.append_byte(b'"');
        self.buf.append_float(re, 64);
        self.buf.append_byte(b'+');
        self.buf.append_float(im, 64);
        self.buf.append_byte(b'i');
        self.buf.append_byte(b'"');
    }

    fn append_complex64(&mut self, re: f32, im: f32) {
        self.append_complex128(f64::from(re), f64::from(im));
    }

    fn append_duration(&mut self, value: Duration) {
        let cur = self.buf.len();
        if let Some(encode) = self.cfg.encode_duration {
            encode(value, self);
        }
        if cur == self.buf.len() {
            // The configured duration formatter was absent or a no-op.
            // Fall back to nanoseconds to keep the output valid.
            self.append_int64(duration_nanos(value));
        }
    }

    fn append_float64(&mut self, value: f64) {
        self.append_float(value, 64);
    }

    fn append_float32(&mut self, value: f32) {
        self.append_float(f64::from(value), 32);
    }

    fn append_int64(&mut self, value: i64) {
        self.add_element_separator();
        self.buf.append_int(value);
    }

    fn append_int32(&mut self, value: i32) {
        self.append_int64(i64::from(value));
    }

    fn append_int16(&mut self, value: i16) {
        self.append_int64(i64::from(value));
    }

    fn append_int8(&mut self, value: i8) {
        self.append_int64(i64::from(value));
    }

    fn append_string(&mut self, value: &str) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        self.safe_add_str(value);
        self.buf.append_byte(b'"');
    }

    fn append_time(&mut self, value: DateTime<FixedOffset>) {
        let cur = self.buf.len();
        if let Some(encode) = self.cfg.encode_time {
            encode(value, self);
        }
        if cur == self.buf.len() {
            // Absent or no-op time formatter: fall back to epoch
            // nanoseconds to keep the output valid.
            self.append_int64(value.timestamp_nanos_opt().unwrap_or(0));
        }
    }

    fn append_uint64(&mut self, value: u64) {
        self.add_element_separator();
        self.buf.append_uint(value);
    }

    fn append_uint32(&mut self, value: u32) {
        self.append_uint64(u64::from(value));
    }

    fn append_uint16(&mut self, value: u16) {
        self.append_uint64(u64::from(value));
    }

    fn append_uint8(&mut self, value: u8) {
        self.append_uint64(u64::from(value));
    }

    fn append_usize(&mut self, value: usize) {
        self.append_uint64(value as u64);
    }

    fn append_reflected(&mut self, value: &serde_json::Value) -> Result<(), EncodeError> {
        self.fill_reflect_buf(value)?;
        self.add_element_separator();
        self.splice_reflect_buf();
        Ok(())
    }
}

impl Encoder for JsonEncoder {
    fn clone_encoder(&self) -> Box<dyn Encoder> {
        Box::new(self.clone())
    }

    fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> Result<Buffer, EncodeError> {
        let cfg = Arc::clone(&self.cfg);
        // Work on an independent clone so concurrent entries sharing this
        // encoder never race on one buffer.
        let mut fin = self.clone_scratch();

        fin.buf.append_byte(b'{');

        if !cfg.level_key.is_empty() {
            fin.add_key(&cfg.level_key);
            let cur = fin.buf.len();
            if let Some(encode) = cfg.encode_level {
                encode(entry.level, &mut fin);
            }
            if cur == fin.buf.len() {
                fin.append_string(entry.level.as_str());
            }
        }
        if !cfg.time_key.is_empty() {
            fin.add_time(&cfg.time_key, entry.time.fixed_offset());
        }
        if !entry.logger_name.is_empty() && !cfg.name_key.is_empty() {
            fin.add_key(&cfg.name_key);
            let cur = fin.buf.len();
            let encode = cfg.encode_name.unwrap_or(full_name_encoder);
            encode(&entry.logger_name, &mut fin);
            if cur == fin.buf.len() {
                fin.append_string(&entry.logger_name);
            }
        }
        if entry.caller.defined && !cfg.caller_key.is_empty() {
            fin.add_key(&cfg.caller_key);
            let cur = fin.buf.len();
            if let Some(encode) = cfg.encode_caller {
                encode(&entry.caller, &mut fin);
            }
            if cur == fin.buf.len() {
                fin.append_string(&entry.caller.full_path());
            }
        }
        if !cfg.message_key.is_empty() {
            fin.add_key(&cfg.message_key);
            fin.append_string(&entry.message);
        }

        // Pre-accumulated context bytes, spliced separator-aware.
        if !self.buf.is_empty() {
            fin.add_element_separator();
            fin.buf.append_bytes(self.buf.as_bytes());
        }

        add_fields(&mut fin, fields);
        fin.close_open_namespaces();

        if !entry.stack.is_empty() && !cfg.stacktrace_key.is_empty() {
            fin.add_string(&cfg.stacktrace_key, &entry.stack);
        }

        fin.buf.append_byte(b'}');
        if cfg.line_ending.is_empty() {
            fin.buf.append_str(DEFAULT_LINE_ENDING);
        } else {
            fin.buf.append_str(&cfg.line_ending);
        }

        let out = mem::take(&mut fin.buf);
        fin.release();
        Ok(out)
    }
}

/// Byte length of the UTF-8 sequence led by `b`, or 0 for bytes that can
/// never lead a valid sequence.
fn utf8_char_width(b: u8) -> usize {
    match b {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}
