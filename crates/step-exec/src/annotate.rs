// The line-oriented filter between the child's raw output and the build
// log sink. Buffers bytes until a full line is available, decodes with the
// declared output encoding, and guarantees the final partial line is
// terminated when the stream closes, whatever the reason.

use std::io::Write;

/// A line without a newline longer than this is flushed in slices so one
/// pathological line cannot grow the buffer without bound.
const MAX_LINE_BYTES: usize = 16 * 1024;

/// Where annotated output lines go. Implementations decide whether that
/// means a console, a file, or an in-memory log.
pub trait OutputSink: Send {
    fn write_line(&mut self, line: &str);
}

/// Sink over any `std::io::Write`.
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn write_line(&mut self, line: &str) {
        let _ = writeln!(self.writer, "{line}");
        let _ = self.writer.flush();
    }
}

/// Character encoding used to decode the child's output bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl OutputEncoding {
    fn decode(self, bytes: &[u8]) -> String {
        match self {
            OutputEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            OutputEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Line-buffering annotator over a borrowed sink.
///
/// `process` accepts raw chunks as they arrive from the child; complete
/// lines are forwarded immediately, never batched until process exit.
/// `force_eol` must run once the stream is done — on every exit path —
/// so a trailing unterminated line still reaches the log.
pub struct ConsoleAnnotator<'a> {
    sink: &'a mut dyn OutputSink,
    encoding: OutputEncoding,
    buffer: Vec<u8>,
    lines_written: usize,
}

impl<'a> ConsoleAnnotator<'a> {
    pub fn new(sink: &'a mut dyn OutputSink, encoding: OutputEncoding) -> Self {
        Self {
            sink,
            encoding,
            buffer: Vec::new(),
            lines_written: 0,
        }
    }

    /// Consume one raw chunk of child output.
    pub fn process(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            self.emit(&line);
        }

        // A line that never ends still has to move through the log.
        while self.buffer.len() >= MAX_LINE_BYTES {
            let slice: Vec<u8> = self.buffer.drain(..MAX_LINE_BYTES).collect();
            self.emit(&slice);
        }
    }

    /// Terminate the trailing partial line, if any. Safe to call more
    /// than once; only the first call after data can emit.
    pub fn force_eol(&mut self) {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.emit(&rest);
        }
    }

    /// Number of lines forwarded to the sink so far.
    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    fn emit(&mut self, bytes: &[u8]) {
        let line = self.encoding.decode(bytes);
        self.sink.write_line(&line);
        self.lines_written += 1;
    }
}
