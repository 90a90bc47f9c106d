//! stream/io.rs
//! Normalized input/output for the blocking bridges, plus adapters between
//! frame streams and async readers.

use std::io::{self, BufReader, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use futures::io::{AllowStdIo, AsyncBufRead};
use futures::stream::TryStreamExt;

use crate::constants::LINE_DELIMITER;
use crate::stream::encoder::FrameStream;
use crate::types::StreamError;

/// Canonical input abstraction
pub enum InputSource {
    Reader(Box<dyn Read + Send>),
    File(PathBuf),
    Memory(Vec<u8>),
}

/// Canonical output abstraction
pub enum OutputSink {
    Writer(Box<dyn Write + Send>),
    File(PathBuf),
    Memory,
}

/// Shared handle to output captured in memory.
pub type CapturedOutput = Arc<Mutex<Vec<u8>>>;

/// Normalize input source into a boxed reader
pub fn open_input(src: InputSource) -> Result<Box<dyn Read + Send>, StreamError> {
    let reader: Box<dyn Read + Send> = match src {
        InputSource::Reader(r) => r,
        InputSource::File(p) => Box::new(std::fs::File::open(p)?),
        InputSource::Memory(b) => Box::new(Cursor::new(b)),
    };
    Ok(reader)
}

/// Normalize output sink into a boxed writer
pub fn open_output(
    sink: OutputSink,
    with_buf: Option<bool>,
) -> Result<(Box<dyn Write + Send>, Option<CapturedOutput>), StreamError> {
    match sink {
        OutputSink::Writer(w) => Ok((w, None)),
        OutputSink::File(p) => Ok((Box::new(std::fs::File::create(p)?), None)),
        OutputSink::Memory => match with_buf {
            Some(true) => {
                let buf = Arc::new(Mutex::new(Vec::new()));
                let writer = SharedBufferWriter::new(buf.clone());
                Ok((Box::new(writer), Some(buf)))
            }
            _ => Ok((Box::new(io::sink()), None)),
        },
    }
}

/// Async line reader over a blocking source, for the decoder.
pub type SourceReader = AllowStdIo<BufReader<Box<dyn Read + Send>>>;

pub fn open_source_reader(src: InputSource) -> Result<SourceReader, StreamError> {
    Ok(AllowStdIo::new(BufReader::new(open_input(src)?)))
}

/// Feed an encoder's frames straight into a decoder without a transport.
pub fn frames_reader(frames: FrameStream) -> impl AsyncBufRead + Unpin + Send + 'static {
    frames
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
        .into_async_read()
}

/// Write one line and its terminator.
pub fn write_line<W: Write>(w: &mut W, line: &[u8]) -> Result<(), StreamError> {
    w.write_all(line)?;
    if line.last() != Some(&LINE_DELIMITER) {
        w.write_all(&[LINE_DELIMITER])?;
    }
    Ok(())
}

pub struct SharedBufferWriter {
    buf: CapturedOutput,
}

impl SharedBufferWriter {
    pub fn new(buf: CapturedOutput) -> Self {
        Self { buf }
    }
}

impl Write for SharedBufferWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut guard = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        guard.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
