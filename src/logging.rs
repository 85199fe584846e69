//! Tracing setup shared by the three binaries.
//!
//! The report tools log straight to stderr. The monitor cannot: while the
//! terminal is in raw mode any log line would tear the frame, so its
//! events are captured in a `LogBuffer` and dumped to stderr after the
//! terminal is restored.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

fn level_for(verbose: u8, quiet: bool) -> Level {
    if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            // One -v is enough to see every SQL statement sent.
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn filter_for(level: Level) -> EnvFilter {
    EnvFilter::from_default_env()
        .add_directive(format!("rpgtop={level}").parse().unwrap())
        .add_directive(format!("rpgstat={level}").parse().unwrap())
        .add_directive(format!("rpginfo={level}").parse().unwrap())
}

/// Initializes the tracing subscriber for the one-shot tools, writing to
/// stderr so report output on stdout stays clean.
pub fn init_logging(verbose: u8, quiet: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level_for(verbose, quiet)))
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Accumulates log output while the terminal is in raw mode.
#[derive(Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn contents(&self) -> String {
        self.inner
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }

    /// Writes everything captured so far to stderr. Called once the
    /// terminal is back in cooked mode.
    pub fn dump_to_stderr(&self) {
        if let Ok(buf) = self.inner.lock() {
            if !buf.is_empty() {
                let _ = io::stderr().write_all(&buf);
            }
        }
    }
}

pub struct BufferWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut b) = self.inner.lock() {
            b.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Initializes the tracing subscriber for the monitor and returns the
/// buffer its output lands in.
pub fn init_tui_logging(verbose: u8, quiet: bool) -> LogBuffer {
    let buffer = LogBuffer::default();
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level_for(verbose, quiet)))
        .with_target(false)
        .with_ansi(false)
        .with_writer(buffer.clone())
        .init();
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_captures_writes() {
        let buffer = LogBuffer::default();
        let mut w = buffer.make_writer();
        w.write_all(b"warn: stale snapshot\n").unwrap();
        assert!(buffer.contents().contains("stale snapshot"));
    }

    #[test]
    fn writers_share_one_buffer() {
        let buffer = LogBuffer::default();
        buffer.make_writer().write_all(b"first ").unwrap();
        buffer.make_writer().write_all(b"second").unwrap();
        assert_eq!(buffer.contents(), "first second");
    }

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(level_for(3, true), Level::ERROR);
        assert_eq!(level_for(0, false), Level::WARN);
        assert_eq!(level_for(1, false), Level::DEBUG);
    }
}
