//! Output-sink composition.
//!
//! A [`WriteSyncer`] is a byte sink with a flush operation. Encoded lines
//! are written to one verbatim, trailing line terminator included; the
//! combinators here adapt plain writers ([`add_sync`]), serialize
//! concurrent access ([`lock`]), and fan writes out to several sinks
//! ([`multi`]). This subsystem never retries: every failure surfaces as a
//! returned error and policy belongs to the caller.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// A byte sink that can also flush any buffered data.
pub trait WriteSyncer: Send {
    /// Writes the payload, returning the number of bytes accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Flushes buffered data to its destination.
    fn sync(&mut self) -> io::Result<()>;

    /// Whether this syncer already serializes concurrent callers. Lets
    /// [`lock`] avoid layering one lock on another.
    #[doc(hidden)]
    fn is_serialized(&self) -> bool {
        false
    }
}

struct WriterWrapper<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriteSyncer for WriterWrapper<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Adapts any [`std::io::Write`] into a [`WriteSyncer`] with a no-op
/// flush.
pub fn add_sync<W: Write + Send + 'static>(writer: W) -> Box<dyn WriteSyncer> {
    Box::new(WriterWrapper { writer })
}

/// A syncer wrapped in a mutex so `write` and `sync` are each atomic with
/// respect to concurrent callers.
///
/// Cloning is cheap and shares the underlying sink, so every thread can
/// hold its own handle:
///
/// ```
/// use logline::write_syncer::{add_sync, LockedWriteSyncer, WriteSyncer};
///
/// let mut a = LockedWriteSyncer::new(add_sync(Vec::new()));
/// let mut b = a.clone();
/// a.write(b"one\n").unwrap();
/// b.write(b"two\n").unwrap();
/// ```
#[derive(Clone)]
pub struct LockedWriteSyncer {
    inner: Arc<Mutex<Box<dyn WriteSyncer>>>,
}

impl LockedWriteSyncer {
    pub fn new(ws: Box<dyn WriteSyncer>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ws)),
        }
    }
}

impl WriteSyncer for LockedWriteSyncer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write(buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.inner.lock().sync()
    }

    fn is_serialized(&self) -> bool {
        true
    }
}

/// Wraps a syncer in a mutex to make it safe for concurrent use.
///
/// Wrapping an already-serialized syncer is detected and returns it
/// unchanged rather than layering a second lock.
pub fn lock(ws: Box<dyn WriteSyncer>) -> Box<dyn WriteSyncer> {
    if ws.is_serialized() {
        return ws;
    }
    Box::new(LockedWriteSyncer::new(ws))
}

/// Failures collected from the members of a fan-out, in member order.
#[derive(Debug, Error)]
#[error("{}", format_error_list(.0))]
pub struct WriteSyncerErrors(pub Vec<io::Error>);

fn format_error_list(errors: &[io::Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn combine_errors(mut errors: Vec<io::Error>) -> Option<io::Error> {
    match errors.len() {
        0 => None,
        1 => Some(errors.remove(0)),
        _ => Some(io::Error::other(WriteSyncerErrors(errors))),
    }
}

struct MultiWriteSyncer {
    syncers: Vec<Box<dyn WriteSyncer>>,
}

/// Duplicates writes and sync calls to every given syncer.
///
/// A single-element fan-out degrades to returning that element directly.
pub fn multi(mut syncers: Vec<Box<dyn WriteSyncer>>) -> Box<dyn WriteSyncer> {
    if syncers.len() == 1 {
        return syncers.remove(0);
    }
    Box::new(MultiWriteSyncer { syncers })
}

impl WriteSyncer for MultiWriteSyncer {
    /// Every member receives the write attempt — a failing member never
    /// short-circuits the rest. When members accept different byte
    /// counts, the reported count starts at the first non-zero count and
    /// is lowered by any later member reporting fewer bytes.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0usize;
        let mut errors = Vec::new();
        for ws in &mut self.syncers {
            match ws.write(buf) {
                Ok(n) => {
                    if written == 0 && n != 0 {
                        written = n;
                    } else if n < written {
                        written = n;
                    }
                }
                Err(e) => errors.push(e),
            }
        }
        match combine_errors(errors) {
            None => Ok(written),
            Some(e) => Err(e),
        }
    }

    fn sync(&mut self) -> io::Result<()> {
        let mut errors = Vec::new();
        for ws in &mut self.syncers {
            if let Err(e) = ws.sync() {
                errors.push(e);
            }
        }
        match combine_errors(errors) {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}
