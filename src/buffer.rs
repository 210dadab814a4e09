//! Reusable byte buffers for the encoding hot path.
//!
//! Every encoder operation works against a `Buffer` acquired from the
//! process-wide pool. Buffers keep their capacity when returned, so a
//! warmed-up process encodes log lines without touching the allocator.

use std::io::{self, Write};

use lazy_static::lazy_static;
use parking_lot::Mutex;

/// Initial capacity of a pooled buffer. Covers typical log lines without
/// regrowth.
const INITIAL_CAPACITY: usize = 1024;

/// Upper bound on the free list. Buffers returned beyond this are dropped.
const MAX_POOLED: usize = 64;

lazy_static! {
    /// Process-wide free list of buffers, shared by all encoders.
    static ref BUFFER_POOL: Mutex<Vec<Buffer>> = Mutex::new(Vec::new());
}

/// Acquires a reset buffer from the pool, allocating a fresh one if the
/// free list is empty.
///
/// The caller owns the buffer until it hands it back with [`put`].
pub fn get() -> Buffer {
    BUFFER_POOL
        .lock()
        .pop()
        .unwrap_or_else(|| Buffer::with_capacity(INITIAL_CAPACITY))
}

/// Returns a buffer to the pool.
///
/// The buffer is reset but keeps its capacity. Zero-capacity buffers (the
/// detached placeholders left behind when an encoder gives up its output)
/// are dropped rather than pooled.
pub fn put(mut buf: Buffer) {
    if buf.capacity() == 0 {
        return;
    }
    buf.reset();
    let mut pool = BUFFER_POOL.lock();
    if pool.len() < MAX_POOLED {
        pool.push(buf);
    }
}

/// A growable byte buffer with append primitives for the textual types the
/// encoders emit.
///
/// `Buffer` is a thin wrapper around `Vec<u8>`; the typed appenders format
/// directly into the owned storage with no intermediate allocation.
#[derive(Debug, Default)]
pub struct Buffer {
    bs: Vec<u8>,
}

impl Buffer {
    /// Creates an empty, detached buffer with no backing storage.
    pub fn new() -> Self {
        Self { bs: Vec::new() }
    }

    /// Creates a buffer with the given pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bs: Vec::with_capacity(capacity),
        }
    }

    /// Appends a single byte.
    #[inline]
    pub fn append_byte(&mut self, b: u8) {
        self.bs.push(b);
    }

    /// Appends a byte slice verbatim.
    #[inline]
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.bs.extend_from_slice(bytes);
    }

    /// Appends a string verbatim, without quoting or escaping.
    #[inline]
    pub fn append_str(&mut self, s: &str) {
        self.bs.extend_from_slice(s.as_bytes());
    }

    /// Appends the decimal representation of a signed integer.
    pub fn append_int(&mut self, value: i64) {
        // io::Write on Vec<u8> is infallible.
        let _ = write!(self.bs, "{value}");
    }

    /// Appends the decimal representation of an unsigned integer.
    pub fn append_uint(&mut self, value: u64) {
        let _ = write!(self.bs, "{value}");
    }

    /// Appends a float in its shortest decimal form, in the requested
    /// width. The value must be finite; non-finite handling is the
    /// encoder's job.
    pub fn append_float(&mut self, value: f64, bits: u32) {
        if bits == 32 {
            let _ = write!(self.bs, "{}", value as f32);
        } else {
            let _ = write!(self.bs, "{value}");
        }
    }

    /// Appends `true` or `false`.
    pub fn append_bool(&mut self, value: bool) {
        self.bs
            .extend_from_slice(if value { b"true" } else { b"false" });
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.bs.len()
    }

    /// Whether the buffer holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bs.is_empty()
    }

    /// Current allocated capacity.
    pub fn capacity(&self) -> usize {
        self.bs.capacity()
    }

    /// The bytes written so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bs
    }

    /// A lossy string view of the buffer, for diagnostics and tests.
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bs)
    }

    /// Clears the buffer, keeping its capacity.
    pub fn reset(&mut self) {
        self.bs.clear();
    }

    /// Removes a single trailing newline, if present.
    pub fn trim_newline(&mut self) {
        if self.bs.last() == Some(&b'\n') {
            self.bs.pop();
        }
    }

    /// Consumes the buffer, yielding its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bs
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bs.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
