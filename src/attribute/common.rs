use std::io;

/// The value written to the caller column for events that no frame could be attributed to.
pub const UNATTRIBUTED: &str = "unattributed";

/// What to do with an event whose stack holds no frame that qualifies as its caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Unattributed {
    /// Emit the row anyway, with [`UNATTRIBUTED`] in the caller column.
    #[default]
    Sentinel,
    /// Drop the event without writing a row.
    Discard,
}

/// End-of-run counters for a single attribution pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Rows written to the output, not counting the header row.
    pub emitted: usize,
    /// Events dropped because their stack did not originate in the target binary.
    pub foreign: usize,
    /// Events with no qualifying caller frame (emitted or dropped depending on policy).
    pub unattributed: usize,
    /// Events that did not match the expected layout and were dropped.
    pub malformed: usize,
    /// Stack lines that could not be parsed into a frame.
    pub unparsed_frames: usize,
    /// Whether the input ended in the middle of an event, which was then dropped.
    pub truncated: bool,
}

impl Summary {
    pub(crate) fn log(&self) {
        if self.unattributed > 0 {
            warn!(
                "{} event(s) had no attributable caller frame",
                self.unattributed
            );
        }
        info!(
            "Emitted {} row(s); skipped {} foreign and {} malformed event(s)",
            self.emitted, self.foreign, self.malformed
        );
        if self.unparsed_frames > 0 {
            debug!("{} stack line(s) could not be parsed", self.unparsed_frames);
        }
    }
}

/// How a single non-blank line was classified by a [`Block`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LineKind {
    Header,
    Stack,
}

/// The in-flight accumulator for one event: a fixed number of header lines followed by any
/// number of stack lines.
#[derive(Clone, Debug)]
pub(crate) struct Block {
    header_lines: usize,
    header: Vec<String>,
    stack: Vec<String>,
}

impl Block {
    pub(crate) fn new(header_lines: usize) -> Self {
        Self {
            header_lines,
            header: Vec::with_capacity(header_lines),
            stack: Vec::new(),
        }
    }

    /// Adds a non-blank, trimmed line to the current event.
    pub(crate) fn push(&mut self, line: &str) -> LineKind {
        if self.header.len() < self.header_lines {
            self.header.push(line.to_owned());
            LineKind::Header
        } else {
            self.stack.push(line.to_owned());
            LineKind::Stack
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.header.is_empty() && self.stack.is_empty()
    }

    pub(crate) fn has_full_header(&self) -> bool {
        self.header.len() == self.header_lines
    }

    pub(crate) fn header(&self) -> &[String] {
        &self.header
    }

    pub(crate) fn stack(&self) -> &[String] {
        &self.stack
    }

    /// Empties the accumulator for the next event, keeping its allocations.
    pub(crate) fn reset(&mut self) {
        self.header.clear();
        self.stack.clear();
    }
}

/// Reads `reader` to the end, handing every blank-line-terminated event to `on_block`.
///
/// Blank lines with nothing accumulated are ignored. If the input ends while an event is still
/// open, that event is dropped and `Ok(true)` is returned.
pub(crate) fn segment<R, F>(mut reader: R, header_lines: usize, mut on_block: F) -> io::Result<bool>
where
    R: io::BufRead,
    F: FnMut(&Block) -> io::Result<()>,
{
    let mut block = Block::new(header_lines);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }

        let l = String::from_utf8_lossy(&line);
        let l = l.trim();
        if !l.is_empty() {
            block.push(l);
            continue;
        }

        if block.is_empty() {
            continue;
        }
        on_block(&block)?;
        block.reset();
    }

    if block.is_empty() {
        Ok(false)
    } else {
        warn!(
            "File ended in the middle of an event; dropping {} unterminated line(s)",
            block.header().len() + block.stack().len()
        );
        Ok(true)
    }
}

/// Whether a header field looks like a byte count.
pub(crate) fn is_numeric(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit())
}

/// Writes the fixed-schema CSV output: one header row, then one row per accepted event.
pub(crate) struct RecordWriter<W> {
    writer: W,
    columns: usize,
}

impl<W> RecordWriter<W>
where
    W: io::Write,
{
    /// Creates the writer and immediately writes the header row.
    pub(crate) fn new(mut writer: W, columns: &[&str]) -> io::Result<Self> {
        write_row(&mut writer, columns)?;
        Ok(Self {
            writer,
            columns: columns.len(),
        })
    }

    pub(crate) fn write<S>(&mut self, fields: &[S]) -> io::Result<()>
    where
        S: AsRef<str>,
    {
        debug_assert_eq!(fields.len(), self.columns);
        write_row(&mut self.writer, fields)
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

fn write_row<W, S>(writer: &mut W, fields: &[S]) -> io::Result<()>
where
    W: io::Write,
    S: AsRef<str>,
{
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        write_field(writer, field.as_ref())?;
    }
    writer.write_all(b"\n")
}

fn write_field<W>(writer: &mut W, field: &str) -> io::Result<()>
where
    W: io::Write,
{
    if field.contains(|c| c == ',' || c == '"' || c == '\n' || c == '\r') {
        write!(writer, "\"{}\"", field.replace('"', "\"\""))
    } else {
        writer.write_all(field.as_bytes())
    }
}
