use std::io;

use super::common::{self, Block, RecordWriter, Summary, Unattributed, UNATTRIBUTED};
use super::frame::Frame;
use super::resolve;
use super::Attribute;

/// The binary whose frames count as "the program under test" unless told otherwise.
pub const DEFAULT_TARGET: &str = "ruby";

/// The number of header lines (allocator, timestamp, bytes) each event starts with by default.
pub const DEFAULT_HEADER_LINES: usize = 3;

const COLUMNS: &[&str] = &["allocator", "timestamp", "bytes_requested", "caller"];
const TEST_TYPE_COLUMN: &str = "test_type";

/// `ustack` attribution configuration options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Library identity of the program under test, matched exactly. Default is `"ruby"`.
    pub target: String,

    /// Lines at the start of every event that are header fields rather than stack frames.
    /// Must be 3 or 4; the optional fourth line is a test-type tag. Default is 3.
    pub header_lines: usize,

    /// Test-type label to add as a final `test_type` column. Takes precedence over a fourth
    /// header line when both are present. Default is `None`.
    pub test_type: Option<String>,

    /// What to do with events that have no qualifying caller frame. Default is
    /// [`Unattributed::Sentinel`].
    pub unattributed: Unattributed,

    /// Log every stack rejected as foreign at warning level, rather than only at debug level.
    /// Default is `false`.
    pub report_foreign: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_owned(),
            header_lines: DEFAULT_HEADER_LINES,
            test_type: None,
            unattributed: Unattributed::default(),
            report_foreign: false,
        }
    }
}

/// An allocation attributor for per-event dtrace `ustack()` output.
///
/// Each event is a block of header lines followed by a leaf-first stack, terminated by a blank
/// line:
///
/// ```text
/// String.new
/// 1234567
/// 40
///               libc.so.1`malloc+0x10
///               ruby`rb_str_new+0x20
///               ruby`rb_eval+0x5
///
/// ```
///
/// To construct one, either use `ustack::Attributor::default()` or create an [`Options`] and
/// use `ustack::Attributor::from(options)`.
///
/// # Panics
///
/// `ustack::Attributor::from(options)` panics if `options.header_lines` is not 3 or 4.
#[derive(Clone, Default)]
pub struct Attributor {
    opt: Options,
}

impl From<Options> for Attributor {
    fn from(opt: Options) -> Self {
        assert!(
            matches!(opt.header_lines, 3 | 4),
            "ustack events have 3 or 4 header lines, not {}",
            opt.header_lines
        );
        Self { opt }
    }
}

impl Attribute for Attributor {
    fn attribute<R, W>(&mut self, reader: R, writer: W) -> io::Result<Summary>
    where
        R: io::BufRead,
        W: io::Write,
    {
        let mut summary = Summary::default();
        let mut out = RecordWriter::new(writer, &self.columns())?;

        let truncated = common::segment(reader, self.opt.header_lines, |block| {
            self.on_block(block, &mut out, &mut summary)
        })?;
        out.flush()?;

        summary.truncated = truncated;
        summary.log();
        Ok(summary)
    }

    fn is_applicable(&mut self, input: &str) -> Option<bool> {
        let mut position = 0;
        let mut found_stack_line = false;
        for line in input.lines() {
            let line = line.trim();
            if line.is_empty() {
                if position == 0 {
                    continue;
                }
                if position < self.opt.header_lines {
                    // An event that ended inside its header
                    return Some(false);
                }
                if found_stack_line {
                    return Some(true);
                }
                position = 0;
            } else if position < self.opt.header_lines {
                if line.contains('`') {
                    return Some(false);
                }
                position += 1;
            } else if line.contains('`') {
                found_stack_line = true;
                position += 1;
            } else {
                // This is neither a header nor a stack line
                return Some(false);
            }
        }

        None
    }
}

impl Attributor {
    fn includes_test_type(&self) -> bool {
        self.opt.test_type.is_some() || self.opt.header_lines > DEFAULT_HEADER_LINES
    }

    fn columns(&self) -> Vec<&'static str> {
        let mut columns = COLUMNS.to_vec();
        if self.includes_test_type() {
            columns.push(TEST_TYPE_COLUMN);
        }
        columns
    }

    // we have a complete event, like:
    //
    //     String.new
    //     1234567
    //     40
    //                   libc.so.1`malloc+0x10
    //                   ruby`rb_str_new+0x20
    //
    fn on_block<W>(
        &self,
        block: &Block,
        out: &mut RecordWriter<W>,
        summary: &mut Summary,
    ) -> io::Result<()>
    where
        W: io::Write,
    {
        if !block.has_full_header() {
            warn!(
                "Dropping event with {} of {} header lines: {:?}",
                block.header().len(),
                self.opt.header_lines,
                block.header()
            );
            summary.malformed += 1;
            return Ok(());
        }

        let header = block.header();
        let frames: Vec<_> = block
            .stack()
            .iter()
            .map(|line| Frame::from_backtick(line))
            .collect();
        summary.unparsed_frames += frames.iter().filter(|frame| frame.is_unparsed()).count();

        let caller = if frames.is_empty() {
            None
        } else if !resolve::validate_origin(&frames, &self.opt.target) {
            if self.opt.report_foreign {
                warn!("Skipping foreign stack: {:?}", block.stack());
            } else {
                debug!("Skipping foreign stack: {:?}", block.stack());
            }
            summary.foreign += 1;
            return Ok(());
        } else {
            resolve::forward_first_match(&frames, &self.opt.target).map(|frame| frame.function)
        };

        let caller = match caller {
            Some(caller) => caller,
            None => {
                summary.unattributed += 1;
                match self.opt.unattributed {
                    Unattributed::Discard => {
                        debug!("Dropping unattributed event: {:?}", header);
                        return Ok(());
                    }
                    Unattributed::Sentinel => UNATTRIBUTED,
                }
            }
        };

        if !common::is_numeric(&header[2]) {
            debug!("Passing through non-numeric byte count {:?}", header[2]);
        }

        let mut fields = vec![
            header[0].as_str(),
            header[1].as_str(),
            header[2].as_str(),
            caller,
        ];
        if self.includes_test_type() {
            let test_type = match self.opt.test_type {
                Some(ref test_type) => test_type.as_str(),
                None => header.get(3).map_or("", |tag| tag.as_str()),
            };
            fields.push(test_type);
        }

        out.write(&fields)?;
        summary.emitted += 1;
        Ok(())
    }
}
