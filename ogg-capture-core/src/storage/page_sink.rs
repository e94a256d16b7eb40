use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use log::{error, warn};
use ogg_vorbis_codec::OggPage;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::models::error::RecorderError;

/// Where a closed sink's bytes ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    File(PathBuf),
    Memory(Vec<u8>),
    /// A caller-provided sink, by description.
    External(String),
}

/// Summary returned when a sink is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkOutput {
    pub target: SinkTarget,
    pub bytes_written: u64,
    /// SHA-256 hex digest of every byte written.
    pub checksum: String,
}

/// Destination for encoded pages.
///
/// Each page is written header first, then body, as one unit.
pub trait PageSink: Send {
    fn write_page(&mut self, page: OggPage) -> Result<(), RecorderError>;

    fn flush(&mut self) -> Result<(), RecorderError>;

    /// Flush and release the underlying resource.
    fn close(self: Box<Self>) -> Result<SinkOutput, RecorderError>;

    /// Human-readable target, for logs.
    fn describe(&self) -> String;
}

/// Running SHA-256 and byte count over written data.
#[derive(Default)]
pub struct ChecksumTracker {
    hasher: Sha256,
    bytes: u64,
}

impl ChecksumTracker {
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.bytes += data.len() as u64;
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn finish(self) -> (String, u64) {
        (hex_encode(&self.hasher.finalize()), self.bytes)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Blocking sink writing straight to a file.
pub struct FilePageSink {
    path: PathBuf,
    writer: BufWriter<File>,
    checksum: ChecksumTracker,
}

impl FilePageSink {
    /// Create the file, making parent directories and replacing any
    /// existing file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, RecorderError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RecorderError::IoFailure(format!("failed to create directory: {}", e))
            })?;
        }
        if path.exists() {
            warn!("FilePageSink: overwriting existing file {}", path.display());
            fs::remove_file(&path).map_err(|e| {
                RecorderError::IoFailure(format!("failed to delete existing file: {}", e))
            })?;
        }
        let file = File::create(&path)
            .map_err(|e| RecorderError::IoFailure(format!("failed to create file: {}", e)))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            checksum: ChecksumTracker::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageSink for FilePageSink {
    fn write_page(&mut self, page: OggPage) -> Result<(), RecorderError> {
        self.writer
            .write_all(&page.header)
            .and_then(|_| self.writer.write_all(&page.body))
            .map_err(|e| RecorderError::IoFailure(format!("write failed: {}", e)))?;
        self.checksum.update(&page.header);
        self.checksum.update(&page.body);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RecorderError> {
        self.writer
            .flush()
            .map_err(|e| RecorderError::IoFailure(format!("flush failed: {}", e)))
    }

    fn close(mut self: Box<Self>) -> Result<SinkOutput, RecorderError> {
        self.flush()?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| RecorderError::IoFailure(format!("sync failed: {}", e)))?;
        let Self { path, checksum, .. } = *self;
        let (checksum, bytes_written) = checksum.finish();
        Ok(SinkOutput {
            target: SinkTarget::File(path),
            bytes_written,
            checksum,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Blocking sink collecting pages in memory.
#[derive(Default)]
pub struct MemoryPageSink {
    buffer: Vec<u8>,
    checksum: ChecksumTracker,
}

impl MemoryPageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }
}

impl PageSink for MemoryPageSink {
    fn write_page(&mut self, page: OggPage) -> Result<(), RecorderError> {
        self.buffer.extend_from_slice(&page.header);
        self.buffer.extend_from_slice(&page.body);
        self.checksum.update(&page.header);
        self.checksum.update(&page.body);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RecorderError> {
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<SinkOutput, RecorderError> {
        let Self { buffer, checksum } = *self;
        let (checksum, bytes_written) = checksum.finish();
        Ok(SinkOutput {
            target: SinkTarget::Memory(buffer),
            bytes_written,
            checksum,
        })
    }

    fn describe(&self) -> String {
        format!("memory ({} bytes)", self.buffer.len())
    }
}

enum WriterCommand {
    Page(OggPage),
    Flush(Sender<Result<(), RecorderError>>),
}

/// Non-blocking sink: pages are handed to a single writer thread.
///
/// The channel preserves submission order, so the inner sink sees pages
/// exactly as they were written here. The first write error is kept and
/// returned from the next `write_page`, `flush` or `close`.
pub struct ThreadedPageSink {
    sender: Option<Sender<WriterCommand>>,
    handle: Option<thread::JoinHandle<Result<SinkOutput, RecorderError>>>,
    failure: Arc<Mutex<Option<RecorderError>>>,
    description: String,
}

impl ThreadedPageSink {
    pub fn spawn(inner: Box<dyn PageSink>) -> Result<Self, RecorderError> {
        let (sender, receiver) = mpsc::channel();
        let failure = Arc::new(Mutex::new(None));
        let description = format!("async {}", inner.describe());

        let worker_failure = Arc::clone(&failure);
        let handle = thread::Builder::new()
            .name("ogg-page-writer".into())
            .spawn(move || Self::run(inner, receiver, worker_failure))
            .map_err(|e| {
                RecorderError::IoFailure(format!("failed to spawn page writer thread: {}", e))
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            failure,
            description,
        })
    }

    fn run(
        mut inner: Box<dyn PageSink>,
        receiver: Receiver<WriterCommand>,
        failure: Arc<Mutex<Option<RecorderError>>>,
    ) -> Result<SinkOutput, RecorderError> {
        for command in receiver {
            match command {
                WriterCommand::Page(page) => {
                    if failure.lock().is_some() {
                        continue;
                    }
                    if let Err(e) = inner.write_page(page) {
                        error!("ThreadedPageSink: write to {} failed: {}", inner.describe(), e);
                        *failure.lock() = Some(e);
                    }
                }
                WriterCommand::Flush(reply) => {
                    let pending = failure.lock().clone();
                    let result = match pending {
                        Some(e) => Err(e),
                        None => inner.flush(),
                    };
                    let _ = reply.send(result);
                }
            }
        }
        inner.close()
    }

    fn check_failure(&self) -> Result<(), RecorderError> {
        match self.failure.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn send(&self, command: WriterCommand) -> Result<(), RecorderError> {
        self.sender
            .as_ref()
            .ok_or_else(|| RecorderError::IoFailure("page writer closed".into()))?
            .send(command)
            .map_err(|_| RecorderError::IoFailure("page writer thread stopped".into()))
    }
}

impl PageSink for ThreadedPageSink {
    fn write_page(&mut self, page: OggPage) -> Result<(), RecorderError> {
        self.check_failure()?;
        self.send(WriterCommand::Page(page))
    }

    /// Blocks until every page queued so far has been written.
    fn flush(&mut self) -> Result<(), RecorderError> {
        let (reply, done) = mpsc::channel();
        self.send(WriterCommand::Flush(reply))?;
        done.recv()
            .map_err(|_| RecorderError::IoFailure("page writer thread stopped".into()))?
    }

    fn close(mut self: Box<Self>) -> Result<SinkOutput, RecorderError> {
        drop(self.sender.take());
        let handle = self
            .handle
            .take()
            .ok_or_else(|| RecorderError::IoFailure("page writer already closed".into()))?;
        let output = handle
            .join()
            .map_err(|_| RecorderError::IoFailure("page writer thread panicked".into()))?;
        self.check_failure()?;
        output
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

impl Drop for ThreadedPageSink {
    fn drop(&mut self) {
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogg_vorbis_codec::{OggPacket, OggStream};

    fn pages(count: usize) -> Vec<OggPage> {
        let mut stream = OggStream::new(5);
        let mut out = Vec::new();
        for no in 0..count {
            let mut packet = OggPacket::new(vec![no as u8; 40], no as i64 * 128, no as i64);
            packet.eos = no + 1 == count;
            stream.packet_in(&packet).unwrap();
            out.extend(std::iter::from_fn(|| stream.flush()));
        }
        out
    }

    fn expected_bytes(pages: &[OggPage]) -> Vec<u8> {
        pages.iter().flat_map(|p| p.to_bytes()).collect()
    }

    fn sha256_hex(data: &[u8]) -> String {
        hex_encode(&Sha256::digest(data))
    }

    struct FailingSink {
        writes: usize,
        fail_at: usize,
    }

    impl PageSink for FailingSink {
        fn write_page(&mut self, _page: OggPage) -> Result<(), RecorderError> {
            self.writes += 1;
            if self.writes >= self.fail_at {
                return Err(RecorderError::IoFailure("disk full".into()));
            }
            Ok(())
        }

        fn flush(&mut self) -> Result<(), RecorderError> {
            Ok(())
        }

        fn close(self: Box<Self>) -> Result<SinkOutput, RecorderError> {
            Ok(SinkOutput {
                target: SinkTarget::External("failing".into()),
                bytes_written: 0,
                checksum: String::new(),
            })
        }

        fn describe(&self) -> String {
            "failing".into()
        }
    }

    #[test]
    fn memory_sink_writes_header_then_body() {
        let pages = pages(3);
        let mut sink = Box::new(MemoryPageSink::new());
        for page in pages.clone() {
            sink.write_page(page).unwrap();
        }
        let expected = expected_bytes(&pages);
        assert_eq!(sink.bytes(), expected.as_slice());

        let output = sink.close().unwrap();
        assert_eq!(output.target, SinkTarget::Memory(expected.clone()));
        assert_eq!(output.bytes_written, expected.len() as u64);
        assert_eq!(output.checksum, sha256_hex(&expected));
    }

    #[test]
    fn file_sink_creates_directories_and_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("take.ogg");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"stale contents that are longer than the new file").unwrap();

        let pages = pages(2);
        let mut sink = Box::new(FilePageSink::create(&path).unwrap());
        for page in pages.clone() {
            sink.write_page(page).unwrap();
        }
        let output = sink.close().unwrap();

        let written = fs::read(&path).unwrap();
        assert_eq!(written, expected_bytes(&pages));
        assert_eq!(&written[..4], b"OggS");
        assert_eq!(output.target, SinkTarget::File(path));
        assert_eq!(output.checksum, sha256_hex(&written));
    }

    #[test]
    fn threaded_sink_preserves_order() {
        let pages = pages(50);
        let mut sink: Box<dyn PageSink> =
            Box::new(ThreadedPageSink::spawn(Box::new(MemoryPageSink::new())).unwrap());
        for page in pages.clone() {
            sink.write_page(page).unwrap();
        }
        sink.flush().unwrap();
        let output = sink.close().unwrap();
        assert_eq!(output.target, SinkTarget::Memory(expected_bytes(&pages)));
    }

    #[test]
    fn threaded_sink_surfaces_worker_errors() {
        let mut sink = Box::new(
            ThreadedPageSink::spawn(Box::new(FailingSink {
                writes: 0,
                fail_at: 2,
            }))
            .unwrap(),
        );
        let mut pages = pages(4).into_iter();
        sink.write_page(pages.next().unwrap()).unwrap();
        sink.write_page(pages.next().unwrap()).unwrap();

        // the flush reply is sent after the failing write has been processed
        assert_eq!(
            sink.flush(),
            Err(RecorderError::IoFailure("disk full".into()))
        );
        assert!(sink.write_page(pages.next().unwrap()).is_err());
        assert!(sink.close().is_err());
    }

    #[test]
    fn dropping_threaded_sink_joins_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.ogg");
        {
            let mut sink =
                ThreadedPageSink::spawn(Box::new(FilePageSink::create(&path).unwrap())).unwrap();
            for page in pages(3) {
                sink.write_page(page).unwrap();
            }
        }
        // the handle is released and the queued pages reached the file
        assert_eq!(&fs::read(&path).unwrap()[..4], b"OggS");
        fs::remove_file(&path).unwrap();
    }
}
