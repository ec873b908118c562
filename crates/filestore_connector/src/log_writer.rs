//! Human-readable diagnostic sink.

use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// A shared writer for `#`-prefixed trace lines.
///
/// The sink is handed to a managed connection when it is built and stays
/// fixed for its lifetime. Lines are purely observational: a failing sink
/// never changes the outcome of the operation being traced. Structured
/// events are emitted through `tracing` independently of this sink.
#[derive(Clone)]
pub struct LogWriter {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl LogWriter {
    /// Wraps `writer` as a log sink.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Creates a sink that writes to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Writes one line. Write errors are ignored.
    pub fn println(&self, line: impl fmt::Display) {
        let mut sink = self.sink.lock();
        let _ = writeln!(sink, "{line}");
        let _ = sink.flush();
    }
}

impl fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogWriter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn lines_reach_sink() {
        let buffer = Buffer::default();
        let writer = LogWriter::new(buffer.clone());

        writer.println("#first");
        writer.clone().println(format_args!("#second {}", 2));

        let text = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert_eq!(text, "#first\n#second 2\n");
    }

    #[test]
    fn broken_sink_is_ignored() {
        let writer = LogWriter::new(Broken);
        writer.println("#dropped");
    }
}
