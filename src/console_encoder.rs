use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::buffer::{self, Buffer};
use crate::encoder::{
    full_name_encoder, ArrayEncoder, ArrayMarshaler, Encoder, EncoderConfig, ObjectEncoder,
    ObjectMarshaler, DEFAULT_LINE_ENDING,
};
use crate::entry::Entry;
use crate::error::EncodeError;
use crate::field::{add_fields, Field};
use crate::json_encoder::JsonEncoder;

/// An encoder whose output is designed for human rather than machine
/// consumption.
///
/// Entry metadata (time, level, name, caller) is rendered as plain text
/// cells joined by tabs; the message follows; structured context trails
/// the line as a single spaced JSON object. Metadata cells are written
/// through the configured formatter callbacks only — an element with no
/// callback, or whose key is empty, is omitted.
///
/// # Examples
///
/// ```
/// use logline::{
///     buffer, uppercase_level_encoder, ConsoleEncoder, Encoder, EncoderConfig, Entry, Field,
///     Level,
/// };
///
/// let enc = ConsoleEncoder::new(EncoderConfig {
///     message_key: "msg".to_string(),
///     level_key: "level".to_string(),
///     encode_level: Some(uppercase_level_encoder),
///     ..EncoderConfig::default()
/// });
/// let entry = Entry::new(Level::Warn, "disk almost full");
/// let buf = enc
///     .encode_entry(&entry, &[Field::uint64("used_pct", 97)])
///     .unwrap();
/// assert_eq!(
///     buf.as_str_lossy(),
///     "WARN\tdisk almost full\t{\"used_pct\": 97}\n"
/// );
/// buffer::put(buf);
/// ```
pub struct ConsoleEncoder {
    json: JsonEncoder,
}

impl ConsoleEncoder {
    /// Creates a console encoder. The embedded JSON encoder runs in
    /// spaced mode so the context block reads comfortably.
    pub fn new(cfg: EncoderConfig) -> Self {
        Self {
            json: JsonEncoder::with_spacing(cfg, true),
        }
    }

    /// Renders the structured context into `line`: a tab (when the line
    /// is non-empty) followed by the accumulated fields in one pair of
    /// braces. Writes nothing when there are no context bytes.
    fn write_context(&self, line: &mut Buffer, extra: &[Field]) {
        let mut context = self.json.clone();
        add_fields(&mut context, extra);
        context.close_open_namespaces();
        if context.context_len() == 0 {
            context.release();
            return;
        }
        add_tab_if_necessary(line);
        line.append_byte(b'{');
        line.append_bytes(context.context_bytes());
        line.append_byte(b'}');
        context.release();
    }
}

fn add_tab_if_necessary(line: &mut Buffer) {
    if !line.is_empty() {
        line.append_byte(b'\t');
    }
}

impl Clone for ConsoleEncoder {
    fn clone(&self) -> Self {
        Self {
            json: self.json.clone(),
        }
    }
}

impl Encoder for ConsoleEncoder {
    fn clone_encoder(&self) -> Box<dyn Encoder> {
        Box::new(self.clone())
    }

    fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> Result<Buffer, EncodeError> {
        let cfg = self.json.config();
        let mut line = buffer::get();

        // Metadata must not be quoted and escaped the way JSON values
        // are, so it goes through a positional scratch encoder and is
        // joined by tabs afterwards.
        let mut cells = SliceEncoder::default();
        if !cfg.time_key.is_empty() {
            if let Some(encode) = cfg.encode_time {
                encode(entry.time.fixed_offset(), &mut cells);
            }
        }
        if !cfg.level_key.is_empty() {
            if let Some(encode) = cfg.encode_level {
                encode(entry.level, &mut cells);
            }
        }
        if !entry.logger_name.is_empty() && !cfg.name_key.is_empty() {
            let encode = cfg.encode_name.unwrap_or(full_name_encoder);
            encode(&entry.logger_name, &mut cells);
        }
        if entry.caller.defined && !cfg.caller_key.is_empty() {
            if let Some(encode) = cfg.encode_caller {
                encode(&entry.caller, &mut cells);
            }
        }
        for (i, cell) in cells.elems.iter().enumerate() {
            if i > 0 {
                line.append_byte(b'\t');
            }
            line.append_str(cell);
        }

        if !cfg.message_key.is_empty() {
            add_tab_if_necessary(&mut line);
            line.append_str(&entry.message);
        }

        self.write_context(&mut line, fields);

        // No stacktrace key means the user wants single-line output.
        if !entry.stack.is_empty() && !cfg.stacktrace_key.is_empty() {
            line.append_byte(b'\n');
            line.append_str(&entry.stack);
        }

        if cfg.line_ending.is_empty() {
            line.append_str(DEFAULT_LINE_ENDING);
        } else {
            line.append_str(&cfg.line_ending);
        }
        Ok(line)
    }
}

impl ObjectEncoder for ConsoleEncoder {
    fn add_array(
        &mut self,
        key: &str,
        marshaler: &dyn ArrayMarshaler,
    ) -> Result<(), EncodeError> {
        self.json.add_array(key, marshaler)
    }

    fn add_object(
        &mut self,
        key: &str,
        marshaler: &dyn ObjectMarshaler,
    ) -> Result<(), EncodeError> {
        self.json.add_object(key, marshaler)
    }

    fn add_binary(&mut self, key: &str, value: &[u8]) {
        self.json.add_binary(key, value);
    }

    fn add_byte_string(&mut self, key: &str, value: &[u8]) {
        self.json.add_byte_string(key, value);
    }

    fn add_bool(&mut self, key: &str, value: bool) {
        self.json.add_bool(key, value);
    }

    fn add_complex128(&mut self, key: &str, re: f64, im: f64) {
        self.json.add_complex128(key, re, im);
    }

    fn add_complex64(&mut self, key: &str, re: f32, im: f32) {
        self.json.add_complex64(key, re, im);
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.json.add_duration(key, value);
    }

    fn add_float64(&mut self, key: &str, value: f64) {
        self.json.add_float64(key, value);
    }

    fn add_float32(&mut self, key: &str, value: f32) {
        self.json.add_float32(key, value);
    }

    fn add_int64(&mut self, key: &str, value: i64) {
        self.json.add_int64(key, value);
    }

    fn add_int32(&mut self, key: &str, value: i32) {
        self.json.add_int32(key, value);
    }

    fn add_int16(&mut self, key: &str, value: i16) {
        self.json.add_int16(key, value);
    }

    fn add_int8(&mut self, key: &str, value: i8) {
        self.json.add_int8(key, value);
    }

    fn add_string(&mut self, key: &str, value: &str) {
        self.json.add_string(key, value);
    }

    fn add_time(&mut self, key: &str, value: DateTime<FixedOffset>) {
        self.json.add_time(key, value);
    }

    fn add_uint64(&mut self, key: &str, value: u64) {
        self.json.add_uint64(key, value);
    }

    fn add_uint32(&mut self, key: &str, value: u32) {
        self.json.add_uint32(key, value);
    }

    fn add_uint16(&mut self, key: &str, value: u16) {
        self.json.add_uint16(key, value);
    }

    fn add_uint8(&mut self, key: &str, value: u8) {
        self.json.add_uint8(key, value);
    }

    fn add_usize(&mut self, key: &str, value: usize) {
        self.json.add_usize(key, value);
    }

    fn add_reflected(
        &mut self,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), EncodeError> {
        self.json.add_reflected(key, value)
    }

    fn open_namespace(&mut self, key: &str) {
        self.json.open_namespace(key);
    }
}

/// A positional encoder that collects rendered cells instead of bytes.
/// The console encoder reuses the typed-to-text machinery through it,
/// then joins the cells with tabs.
#[derive(Default)]
struct SliceEncoder {
    elems: Vec<String>,
}

impl ArrayEncoder for SliceEncoder {
    fn append_array(&mut self, marshaler: &dyn ArrayMarshaler) -> Result<(), EncodeError> {
        let mut nested = SliceEncoder::default();
        let res = marshaler.marshal_log_array(&mut nested);
        self.elems.push(format!("[{}]", nested.elems.join(", ")));
        res
    }

    fn append_object(&mut self, marshaler: &dyn ObjectMarshaler) -> Result<(), EncodeError> {
        let mut nested = JsonEncoder::with_spacing(EncoderConfig::default(), true);
        let res = marshaler.marshal_log_object(&mut nested);
        self.elems.push(format!(
            "{{{}}}",
            String::from_utf8_lossy(nested.context_bytes())
        ));
        nested.release();
        res
    }

    fn append_bool(&mut self, value: bool) {
        self.elems.push(value.to_string());
    }

    fn append_byte_string(&mut self, value: &[u8]) {
        self.elems.push(String::from_utf8_lossy(value).into_owned());
    }

    fn append_complex128(&mut self, re: f64, im: f64) {
        self.elems.push(format!("{re}+{im}i"));
    }

    fn append_complex64(&mut self, re: f32, im: f32) {
        self.append_complex128(f64::from(re), f64::from(im));
    }

    fn append_duration(&mut self, value: Duration) {
        self.elems.push(format!("{value:?}"));
    }

    fn append_float64(&mut self, value: f64) {
        self.elems.push(value.to_string());
    }

    fn append_float32(&mut self, value: f32) {
        self.elems.push(value.to_string());
    }

    fn append_int64(&mut self, value: i64) {
        self.elems.push(value.to_string());
    }

    fn append_int32(&mut self, value: i32) {
        self.elems.push(value.to_string());
    }

    fn append_int16(&mut self, value: i16) {
        self.elems.push(value.to_string());
    }

    fn append_int8(&mut self, value: i8) {
        self.elems.push(value.to_string());
    }

    fn append_string(&mut self, value: &str) {
        self.elems.push(value.to_string());
    }

    fn append_time(&mut self, value: DateTime<FixedOffset>) {
        self.elems.push(value.to_rfc3339());
    }

    fn append_uint64(&mut self, value: u64) {
        self.elems.push(value.to_string());
    }

    fn append_uint32(&mut self, value: u32) {
        self.elems.push(value.to_string());
    }

    fn append_uint16(&mut self, value: u16) {
        self.elems.push(value.to_string());
    }

    fn append_uint8(&mut self, value: u8) {
        self.elems.push(value.to_string());
    }

    fn append_usize(&mut self, value: usize) {
        self.elems.push(value.to_string());
    }

    fn append_reflected(&mut self, value: &serde_json::Value) -> Result<(), EncodeError> {
        self.elems.push(serde_json::to_string(value)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_encoder_renders_cells_unquoted() {
        let mut cells = SliceEncoder::default();
        cells.append_string("INFO");
        cells.append_uint64(12);
        cells.append_bool(false);
        assert_eq!(cells.elems, vec!["INFO", "12", "false"]);
    }

    #[test]
    fn slice_encoder_nests_arrays() {
        let mut cells = SliceEncoder::default();
        let pair = |enc: &mut dyn ArrayEncoder| -> Result<(), EncodeError> {
            enc.append_int64(1);
            enc.append_int64(2);
            Ok(())
        };
        cells.append_array(&pair).unwrap();
        assert_eq!(cells.elems, vec!["[1, 2]"]);
    }
}
