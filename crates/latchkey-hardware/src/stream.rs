//! Line-oriented reader fed by an external decoder process.
//!
//! Each input line carries one decoded frame as `<bits> <value>`, for example
//! `4 7` for the key 7 or `26 1234567` for a badge. Blank lines and lines
//! starting with `#` are ignored; malformed lines are logged and skipped so
//! one bad line never takes the reader down.

use crate::{
    HardwareError, Result,
    traits::ReaderDevice,
    types::{DecodedEvent, DeviceInfo},
};
use std::io::{self, BufRead};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;

/// Lines queued between a blocking reader thread and the async side.
const THREAD_LINE_BUFFER: usize = 64;

enum LineSource {
    Async(Lines<BufReader<BoxedRead>>),
    // Fed by a detached OS thread, so a read that never returns cannot hold
    // up runtime shutdown.
    Thread(mpsc::Receiver<io::Result<String>>),
}

impl LineSource {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        match self {
            Self::Async(lines) => lines.next_line().await,
            Self::Thread(rx) => rx.recv().await.transpose(),
        }
    }
}

/// Reader device consuming decoded frames from a text stream.
pub struct StreamReader {
    // Only touched through `&mut self`; the mutex makes the source `Sync`.
    lines: Mutex<LineSource>,
    name: String,
}

impl std::fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamReader")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl StreamReader {
    /// Read frames from any async byte stream.
    pub fn new(input: impl AsyncRead + Send + Unpin + 'static, name: impl Into<String>) -> Self {
        let boxed: BoxedRead = Box::new(input);
        Self {
            lines: Mutex::new(LineSource::Async(BufReader::new(boxed).lines())),
            name: name.into(),
        }
    }

    /// Read frames from a blocking source on a dedicated thread.
    ///
    /// The thread is never joined. It ends at end of input, on a read error
    /// or once the reader is dropped and the next line cannot be delivered.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Io` if the thread cannot be spawned.
    pub fn from_blocking<R>(input: R, name: impl Into<String>) -> Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = mpsc::channel(THREAD_LINE_BUFFER);
        let thread_name = name.clone();

        std::thread::Builder::new()
            .name(format!("reader-{name}"))
            .spawn(move || {
                for line in input.lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
                debug!("Reader thread for {} finished", thread_name);
            })?;

        Ok(Self {
            lines: Mutex::new(LineSource::Thread(rx)),
            name,
        })
    }

    /// Read frames from the process's standard input.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Io` if the reader thread cannot be spawned.
    pub fn stdin() -> Result<Self> {
        Self::from_blocking(io::BufReader::new(io::stdin()), "stdin")
    }
}

/// Parse one line of decoder output.
///
/// Returns `Ok(None)` for blank and comment lines.
///
/// # Errors
///
/// Returns `HardwareError::InvalidData` if the line is not two unsigned
/// integers.
pub fn parse_frame_line(line: &str) -> Result<Option<DecodedEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let (Some(bits), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(HardwareError::invalid_data(format!(
            "expected '<bits> <value>', got {line:?}"
        )));
    };

    let bits: u8 = bits
        .parse()
        .map_err(|_| HardwareError::invalid_data(format!("invalid bit count {bits:?}")))?;
    let value: u64 = value
        .parse()
        .map_err(|_| HardwareError::invalid_data(format!("invalid value {value:?}")))?;

    Ok(Some(DecodedEvent::new(bits, value)))
}

impl ReaderDevice for StreamReader {
    async fn read_event(&mut self) -> Result<DecodedEvent> {
        loop {
            let Some(line) = self.lines.get_mut().next_line().await? else {
                return Err(HardwareError::disconnected(format!(
                    "{} reached end of input",
                    self.name
                )));
            };

            match parse_frame_line(&line) {
                Ok(Some(event)) => return Ok(event),
                Ok(None) => {}
                Err(e) => warn!("Skipping line from {}: {}", self.name, e),
            }
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Line decoder stream"))
    }
}
