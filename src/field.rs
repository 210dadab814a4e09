//! The tagged field model.
//!
//! A [`Field`] is a key plus a typed value, produced by call sites and
//! replayed into any encoder satisfying the [`ObjectEncoder`] capability.
//! Fields are cheap immutable value records: scalars are packed into the
//! `integer`/`string` scratch members, and only reference-shaped payloads
//! (blobs, marshalers, errors) live in the [`FieldValue`] enum.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

use crate::encoder::{duration_nanos, ArrayMarshaler, ObjectEncoder, ObjectMarshaler};
use crate::error::EncodeError;

/// Which member of the field union is meaningful and how it serializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// The default tag. Adding a field with this type to an encoder is a
    /// programming error and panics.
    Unknown,
    /// The field carries an [`ArrayMarshaler`].
    ArrayMarshaler,
    /// The field carries an [`ObjectMarshaler`].
    ObjectMarshaler,
    /// The field carries an opaque binary blob.
    Binary,
    /// The field carries a bool, packed into `integer` as 0/1.
    Bool,
    /// The field carries UTF-8-ish bytes encoded as a string value.
    ByteString,
    /// The field carries a complex number with 64-bit parts.
    Complex128,
    /// The field carries a complex number with 32-bit parts.
    Complex64,
    /// The field carries a duration as nanoseconds in `integer`.
    Duration,
    /// The field carries an `f64` as its bit pattern in `integer`.
    Float64,
    /// The field carries an `f32` as its bit pattern in `integer`.
    Float32,
    Int64,
    Int32,
    Int16,
    Int8,
    /// The field carries a string in the `string` scratch member.
    String,
    /// The field carries epoch nanoseconds in `integer`, with an optional
    /// timezone payload.
    Time,
    Uint64,
    Uint32,
    Uint16,
    Uint8,
    /// Pointer-sized unsigned integer.
    Usize,
    /// The field carries a value serialized through the structural
    /// fallback.
    Reflect,
    /// Signals the beginning of an isolated namespace; all subsequent
    /// fields land inside it.
    Namespace,
    /// The field carries a `Display` value rendered lazily at encode time.
    Stringer,
    /// The field carries an error rendered via its message.
    Error,
    /// A no-op field.
    Skip,
}

/// Reference payload of a field. `None` for everything packed into the
/// scalar scratch members.
#[derive(Clone)]
pub enum FieldValue {
    None,
    Bytes(Vec<u8>),
    Array(Arc<dyn ArrayMarshaler>),
    Object(Arc<dyn ObjectMarshaler>),
    Err(Arc<dyn std::error::Error + Send + Sync>),
    Stringer(Arc<dyn fmt::Display + Send + Sync>),
    Reflect(serde_json::Value),
    Complex(f64, f64),
    Timezone(FixedOffset),
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::None => f.write_str("None"),
            FieldValue::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            FieldValue::Array(_) => f.write_str("Array(..)"),
            FieldValue::Object(_) => f.write_str("Object(..)"),
            FieldValue::Err(e) => f.debug_tuple("Err").field(&e.to_string()).finish(),
            FieldValue::Stringer(_) => f.write_str("Stringer(..)"),
            FieldValue::Reflect(v) => f.debug_tuple("Reflect").field(v).finish(),
            FieldValue::Complex(re, im) => {
                f.debug_tuple("Complex").field(re).field(im).finish()
            }
            FieldValue::Timezone(tz) => f.debug_tuple("Timezone").field(tz).finish(),
        }
    }
}

/// A single typed key/value log attribute awaiting serialization.
#[derive(Debug, Clone)]
pub struct Field {
    pub key: String,
    pub ty: FieldType,
    pub integer: i64,
    pub string: String,
    pub value: FieldValue,
}

fn scalar(key: impl Into<String>, ty: FieldType, integer: i64) -> Field {
    Field {
        key: key.into(),
        ty,
        integer,
        string: String::new(),
        value: FieldValue::None,
    }
}

impl Field {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Field {
        Field {
            key: key.into(),
            ty: FieldType::String,
            integer: 0,
            string: value.into(),
            value: FieldValue::None,
        }
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Field {
        scalar(key, FieldType::Bool, i64::from(value))
    }

    pub fn int64(key: impl Into<String>, value: i64) -> Field {
        scalar(key, FieldType::Int64, value)
    }

    pub fn int32(key: impl Into<String>, value: i32) -> Field {
        scalar(key, FieldType::Int32, i64::from(value))
    }

    pub fn int16(key: impl Into<String>, value: i16) -> Field {
        scalar(key, FieldType::Int16, i64::from(value))
    }

    pub fn int8(key: impl Into<String>, value: i8) -> Field {
        scalar(key, FieldType::Int8, i64::from(value))
    }

    pub fn uint64(key: impl Into<String>, value: u64) -> Field {
        scalar(key, FieldType::Uint64, value as i64)
    }

    pub fn uint32(key: impl Into<String>, value: u32) -> Field {
        scalar(key, FieldType::Uint32, i64::from(value))
    }

    pub fn uint16(key: impl Into<String>, value: u16) -> Field {
        scalar(key, FieldType::Uint16, i64::from(value))
    }

    pub fn uint8(key: impl Into<String>, value: u8) -> Field {
        scalar(key, FieldType::Uint8, i64::from(value))
    }

    pub fn usize(key: impl Into<String>, value: usize) -> Field {
        scalar(key, FieldType::Usize, value as i64)
    }

    pub fn float64(key: impl Into<String>, value: f64) -> Field {
        scalar(key, FieldType::Float64, value.to_bits() as i64)
    }

    pub fn float32(key: impl Into<String>, value: f32) -> Field {
        scalar(key, FieldType::Float32, i64::from(value.to_bits()))
    }

    pub fn complex128(key: impl Into<String>, re: f64, im: f64) -> Field {
        Field {
            key: key.into(),
            ty: FieldType::Complex128,
            integer: 0,
            string: String::new(),
            value: FieldValue::Complex(re, im),
        }
    }

    pub fn complex64(key: impl Into<String>, re: f32, im: f32) -> Field {
        Field {
            key: key.into(),
            ty: FieldType::Complex64,
            integer: 0,
            string: String::new(),
            value: FieldValue::Complex(f64::from(re), f64::from(im)),
        }
    }

    pub fn duration(key: impl Into<String>, value: Duration) -> Field {
        scalar(key, FieldType::Duration, duration_nanos(value))
    }

    /// A timestamp localized to its fixed offset.
    pub fn time(key: impl Into<String>, value: DateTime<FixedOffset>) -> Field {
        Field {
            key: key.into(),
            ty: FieldType::Time,
            integer: value.timestamp_nanos_opt().unwrap_or(0),
            string: String::new(),
            value: FieldValue::Timezone(*value.offset()),
        }
    }

    /// A timestamp with no timezone payload, treated as UTC at encode
    /// time.
    pub fn time_utc(key: impl Into<String>, value: DateTime<Utc>) -> Field {
        scalar(
            key,
            FieldType::Time,
            value.timestamp_nanos_opt().unwrap_or(0),
        )
    }

    pub fn binary(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Field {
        Field {
            key: key.into(),
            ty: FieldType::Binary,
            integer: 0,
            string: String::new(),
            value: FieldValue::Bytes(value.into()),
        }
    }

    pub fn byte_string(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Field {
        Field {
            key: key.into(),
            ty: FieldType::ByteString,
            integer: 0,
            string: String::new(),
            value: FieldValue::Bytes(value.into()),
        }
    }

    pub fn array(key: impl Into<String>, marshaler: impl ArrayMarshaler + 'static) -> Field {
        Field {
            key: key.into(),
            ty: FieldType::ArrayMarshaler,
            integer: 0,
            string: String::new(),
            value: FieldValue::Array(Arc::new(marshaler)),
        }
    }

    pub fn object(key: impl Into<String>, marshaler: impl ObjectMarshaler + 'static) -> Field {
        Field {
            key: key.into(),
            ty: FieldType::ObjectMarshaler,
            integer: 0,
            string: String::new(),
            value: FieldValue::Object(Arc::new(marshaler)),
        }
    }

    pub fn error(
        key: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Field {
        Field {
            key: key.into(),
            ty: FieldType::Error,
            integer: 0,
            string: String::new(),
            value: FieldValue::Err(Arc::new(err)),
        }
    }

    /// A value rendered lazily via `Display` at encode time.
    pub fn stringer(
        key: impl Into<String>,
        value: impl fmt::Display + Send + Sync + 'static,
    ) -> Field {
        Field {
            key: key.into(),
            ty: FieldType::Stringer,
            integer: 0,
            string: String::new(),
            value: FieldValue::Stringer(Arc::new(value)),
        }
    }

    /// A value with no typed case, serialized through the structural
    /// fallback encoder.
    pub fn reflect(key: impl Into<String>, value: serde_json::Value) -> Field {
        Field {
            key: key.into(),
            ty: FieldType::Reflect,
            integer: 0,
            string: String::new(),
            value: FieldValue::Reflect(value),
        }
    }

    /// Opens a nested namespace; subsequent fields land inside it.
    pub fn namespace(key: impl Into<String>) -> Field {
        scalar(key, FieldType::Namespace, 0)
    }

    /// A no-op field.
    pub fn skip() -> Field {
        scalar("", FieldType::Skip, 0)
    }

    /// Replays the field into an encoder, selecting the encoder method by
    /// type.
    ///
    /// Marshaler failures never abort the record: the error is recorded as
    /// a synthetic `<key>Error` string field and encoding proceeds.
    ///
    /// # Panics
    ///
    /// Panics on [`FieldType::Unknown`] or on a payload that does not
    /// match the tag. Both are contract violations by the field producer,
    /// not runtime conditions.
    pub fn add_to(&self, enc: &mut dyn ObjectEncoder) {
        let mut err: Option<EncodeError> = None;

        match self.ty {
            FieldType::ArrayMarshaler => {
                let FieldValue::Array(m) = &self.value else {
                    panic!("array field {:?} missing its marshaler payload", self.key);
                };
                err = enc.add_array(&self.key, m.as_ref()).err();
            }
            FieldType::ObjectMarshaler => {
                let FieldValue::Object(m) = &self.value else {
                    panic!("object field {:?} missing its marshaler payload", self.key);
                };
                err = enc.add_object(&self.key, m.as_ref()).err();
            }
            FieldType::Binary => {
                let FieldValue::Bytes(b) = &self.value else {
                    panic!("binary field {:?} missing its payload", self.key);
                };
                enc.add_binary(&self.key, b);
            }
            FieldType::Bool => enc.add_bool(&self.key, self.integer == 1),
            FieldType::ByteString => {
                let FieldValue::Bytes(b) = &self.value else {
                    panic!("byte-string field {:?} missing its payload", self.key);
                };
                enc.add_byte_string(&self.key, b);
            }
            FieldType::Complex128 => {
                let FieldValue::Complex(re, im) = &self.value else {
                    panic!("complex field {:?} missing its payload", self.key);
                };
                enc.add_complex128(&self.key, *re, *im);
            }
            FieldType::Complex64 => {
                let FieldValue::Complex(re, im) = &self.value else {
                    panic!("complex field {:?} missing its payload", self.key);
                };
                enc.add_complex64(&self.key, *re as f32, *im as f32);
            }
            FieldType::Duration => {
                enc.add_duration(&self.key, Duration::from_nanos(self.integer.max(0) as u64));
            }
            FieldType::Float64 => enc.add_float64(&self.key, f64::from_bits(self.integer as u64)),
            FieldType::Float32 => enc.add_float32(&self.key, f32::from_bits(self.integer as u32)),
            FieldType::Int64 => enc.add_int64(&self.key, self.integer),
            FieldType::Int32 => enc.add_int32(&self.key, self.integer as i32),
            FieldType::Int16 => enc.add_int16(&self.key, self.integer as i16),
            FieldType::Int8 => enc.add_int8(&self.key, self.integer as i8),
            FieldType::String => enc.add_string(&self.key, &self.string),
            FieldType::Time => {
                let utc = DateTime::from_timestamp_nanos(self.integer);
                if let FieldValue::Timezone(tz) = &self.value {
                    enc.add_time(&self.key, utc.with_timezone(tz));
                } else {
                    enc.add_time(&self.key, utc.fixed_offset());
                }
            }
            FieldType::Uint64 => enc.add_uint64(&self.key, self.integer as u64),
            FieldType::Uint32 => enc.add_uint32(&self.key, self.integer as u32),
            FieldType::Uint16 => enc.add_uint16(&self.key, self.integer as u16),
            FieldType::Uint8 => enc.add_uint8(&self.key, self.integer as u8),
            FieldType::Usize => enc.add_usize(&self.key, self.integer as usize),
            FieldType::Reflect => {
                let FieldValue::Reflect(v) = &self.value else {
                    panic!("reflect field {:?} missing its payload", self.key);
                };
                err = enc.add_reflected(&self.key, v).err();
            }
            FieldType::Namespace => enc.open_namespace(&self.key),
            FieldType::Stringer => {
                let FieldValue::Stringer(s) = &self.value else {
                    panic!("stringer field {:?} missing its payload", self.key);
                };
                enc.add_string(&self.key, &s.to_string());
            }
            FieldType::Error => {
                let FieldValue::Err(e) = &self.value else {
                    panic!("error field {:?} missing its payload", self.key);
                };
                enc.add_string(&self.key, &e.to_string());
            }
            FieldType::Skip => {}
            FieldType::Unknown => panic!("unknown field type for key {:?}", self.key),
        }

        if let Some(e) = err {
            enc.add_string(&format!("{}Error", self.key), &e.to_string());
        }
    }
}

impl PartialEq for Field {
    /// Type-appropriate equality: byte-wise for blobs, structural for
    /// reflected values, pointer identity for opaque marshaler/error/
    /// stringer payloads, scalar comparison otherwise.
    fn eq(&self, other: &Self) -> bool {
        if self.ty != other.ty || self.key != other.key {
            return false;
        }
        match (&self.value, &other.value) {
            (FieldValue::Bytes(a), FieldValue::Bytes(b)) => a == b,
            (FieldValue::Array(a), FieldValue::Array(b)) => Arc::ptr_eq(a, b),
            (FieldValue::Object(a), FieldValue::Object(b)) => Arc::ptr_eq(a, b),
            (FieldValue::Err(a), FieldValue::Err(b)) => Arc::ptr_eq(a, b),
            (FieldValue::Stringer(a), FieldValue::Stringer(b)) => Arc::ptr_eq(a, b),
            (FieldValue::Reflect(a), FieldValue::Reflect(b)) => a == b,
            (FieldValue::Complex(ar, ai), FieldValue::Complex(br, bi)) => ar == br && ai == bi,
            (FieldValue::Timezone(a), FieldValue::Timezone(b)) => {
                a == b && self.integer == other.integer
            }
            (FieldValue::None, FieldValue::None) => {
                self.integer == other.integer && self.string == other.string
            }
            _ => false,
        }
    }
}

/// Replays a slice of fields into an encoder in order. Duplicate keys are
/// preserved, not deduplicated.
pub fn add_fields(enc: &mut dyn ObjectEncoder, fields: &[Field]) {
    for field in fields {
        field.add_to(enc);
    }
}
