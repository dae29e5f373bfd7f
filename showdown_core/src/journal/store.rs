//! Buffered append-only file underneath the journal.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::warn;

const DELIMITER: &[u8] = b"\n";

/// Byte sink a store appends to.
pub(crate) trait Sink: Write {
    /// Current length in bytes.
    fn len(&self) -> io::Result<u64>;

    /// Cuts the sink back to `len` bytes.
    fn truncate(&self, len: u64) -> io::Result<()>;

    /// Pushes written bytes to stable storage.
    fn sync(&self) -> io::Result<()>;
}

impl Sink for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Append-only file with a running write position.
///
/// Opened with `O_APPEND`; the position starts at the current file length
/// so offsets keep increasing across reopen. A failed append leaves
/// nothing behind: its buffered bytes are dropped and any partial write is
/// cut off again.
pub(crate) struct Store<S: Sink = File> {
    // Only `None` while a failed append swaps the writer out.
    writer: Option<BufWriter<S>>,
    size: u64,
}

impl Store<File> {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Self::with_sink(file)
    }
}

impl<S: Sink> Store<S> {
    pub(crate) fn with_sink(sink: S) -> io::Result<Self> {
        let size = sink.len()?;
        Ok(Self {
            writer: Some(BufWriter::new(sink)),
            size,
        })
    }

    /// Writes `record` and the delimiter, then flushes to the file.
    ///
    /// Returns the position of the record's first byte.
    pub(crate) fn append(&mut self, record: &[u8]) -> io::Result<u64> {
        let position = self.size;
        match self.write_line(record) {
            Ok(()) => {
                self.size += (record.len() + DELIMITER.len()) as u64;
                Ok(position)
            }
            Err(e) => {
                self.discard(position);
                Err(e)
            }
        }
    }

    fn write_line(&mut self, record: &[u8]) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::other("journal writer is gone"))?;
        writer.write_all(record)?;
        writer.write_all(DELIMITER)?;
        writer.flush()
    }

    /// Drops unflushed bytes and cuts the sink back to `position`.
    fn discard(&mut self, position: u64) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        let (sink, _unflushed) = writer.into_parts();
        if let Err(e) = sink.truncate(position) {
            warn!(position, error = %e, "Failed to cut back a partial record");
            if let Ok(len) = sink.len() {
                self.size = len;
            }
        }
        self.writer = Some(BufWriter::new(sink));
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    /// Flushes outstanding bytes and releases the file handle.
    pub(crate) fn close(self) -> io::Result<()> {
        let Some(writer) = self.writer else {
            return Ok(());
        };
        let sink = writer.into_inner().map_err(|e| e.into_error())?;
        sink.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory sink that, while `failing` is set, takes a few bytes of
    /// each write and then errors, like a disk filling up mid-record.
    #[derive(Clone, Default)]
    struct FlakySink {
        bytes: Arc<Mutex<Vec<u8>>>,
        failing: Arc<AtomicBool>,
        short_write_done: Arc<AtomicBool>,
    }

    impl FlakySink {
        fn contents(&self) -> Vec<u8> {
            self.bytes.lock().unwrap().clone()
        }

        fn fail(&self, on: bool) {
            self.failing.store(on, Ordering::SeqCst);
            self.short_write_done.store(false, Ordering::SeqCst);
        }
    }

    impl Write for FlakySink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.failing.load(Ordering::SeqCst) {
                if self.short_write_done.swap(true, Ordering::SeqCst) {
                    return Err(io::Error::other("disk full"));
                }
                let taken = buf.len().min(3);
                self.bytes.lock().unwrap().extend_from_slice(&buf[..taken]);
                return Ok(taken);
            }
            self.bytes.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Sink for FlakySink {
        fn len(&self) -> io::Result<u64> {
            Ok(self.bytes.lock().unwrap().len() as u64)
        }

        fn truncate(&self, len: u64) -> io::Result<()> {
            self.bytes.lock().unwrap().truncate(len as usize);
            Ok(())
        }

        fn sync(&self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_positions_are_cumulative() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        let mut store = Store::open(&path).unwrap();

        assert_eq!(store.append(b"abc").unwrap(), 0);
        assert_eq!(store.append(b"de").unwrap(), 4);
        assert_eq!(store.size(), 7);
        store.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"abc\nde\n");
    }

    #[test]
    fn test_reopen_continues_from_file_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");

        let mut store = Store::open(&path).unwrap();
        store.append(b"first").unwrap();
        store.close().unwrap();

        let mut store = Store::open(&path).unwrap();
        assert_eq!(store.size(), 6);
        assert_eq!(store.append(b"second").unwrap(), 6);
    }

    #[test]
    fn test_failed_append_leaves_no_trace() {
        let sink = FlakySink::default();
        let mut store = Store::with_sink(sink.clone()).unwrap();
        assert_eq!(store.append(b"kept").unwrap(), 0);

        sink.fail(true);
        let err = store.append(b"lost record").unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(store.size(), 5);
        assert_eq!(sink.contents(), b"kept\n");

        sink.fail(false);
        assert_eq!(store.append(b"next").unwrap(), 5);
        assert_eq!(store.size(), 10);
        assert_eq!(sink.contents(), b"kept\nnext\n");
    }
}
