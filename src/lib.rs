//! # Logline
//!
//! A structured log-record encoding engine. Logline turns a typed sequence
//! of key/value fields plus entry metadata (level, timestamp, message,
//! logger name, caller, stack) into a byte-exact serialized line, in
//! either a machine-readable or a human-readable format:
//!
//! * **Low-allocation hot path**: pooled buffers and pooled encoder
//!   clones, so a warmed-up process encodes without touching the allocator
//! * **Byte-stable output**: identical inputs and configuration always
//!   produce identical bytes
//! * **Safe under hostile values**: arbitrary user-supplied strings,
//!   blobs, and marshaling callbacks can never unbalance or corrupt a
//!   record
//!
//! Level filtering, call-site capture, sampling, and sink durability are
//! the business of the surrounding logger core and sinks; this crate only
//! encodes records and composes output sinks.
//!
//! ## Main Components
//!
//! * `Field`: a tagged key/value attribute that replays itself into any
//!   encoder
//! * `JsonEncoder`: compact JSON lines with namespace nesting and escaping
//! * `ConsoleEncoder`: tab-separated plain text with an embedded JSON
//!   context block
//! * `write_syncer`: sink composition — flush adaptation, locking, fan-out
//!
//! ## Quick Start
//!
//! ```
//! use logline::{buffer, Encoder, EncoderConfig, Entry, Field, JsonEncoder, Level};
//! use logline::write_syncer::{add_sync, lock, WriteSyncer};
//!
//! let encoder = JsonEncoder::new(EncoderConfig {
//!     message_key: "msg".to_string(),
//!     level_key: "level".to_string(),
//!     ..EncoderConfig::default()
//! });
//!
//! let entry = Entry::new(Level::Info, "request served");
//! let fields = [
//!     Field::string("route", "/healthz"),
//!     Field::int64("status", 200),
//!     Field::bool("cached", true),
//! ];
//!
//! let buf = encoder.encode_entry(&entry, &fields).unwrap();
//! assert_eq!(
//!     buf.as_str_lossy(),
//!     "{\"level\":\"info\",\"msg\":\"request served\",\
//!      \"route\":\"/healthz\",\"status\":200,\"cached\":true}\n"
//! );
//!
//! let mut sink = lock(add_sync(Vec::new()));
//! sink.write(buf.as_bytes()).unwrap();
//! sink.sync().unwrap();
//! buffer::put(buf);
//! ```

pub mod buffer;
pub mod console_encoder;
pub mod encoder;
pub mod entry;
pub mod error;
pub mod field;
pub mod json_encoder;
pub mod write_syncer;

pub use buffer::Buffer;
pub use console_encoder::ConsoleEncoder;
pub use encoder::{
    epoch_nanos_time_encoder, epoch_time_encoder, full_caller_encoder, full_name_encoder,
    lowercase_level_encoder, nanos_duration_encoder, rfc3339_time_encoder,
    seconds_duration_encoder, short_caller_encoder, string_duration_encoder,
    uppercase_level_encoder, ArrayEncoder, ArrayMarshaler, CallerEncoder, DurationEncoder,
    Encoder, EncoderConfig, LevelEncoder, NameEncoder, ObjectEncoder, ObjectMarshaler,
    TimeEncoder, DEFAULT_LINE_ENDING,
};
pub use entry::{Entry, EntryCaller, Level};
pub use error::EncodeError;
pub use field::{add_fields, Field, FieldType, FieldValue};
pub use json_encoder::JsonEncoder;
pub use write_syncer::{add_sync, lock, multi, LockedWriteSyncer, WriteSyncer};
