use std::io;

use once_cell::sync::Lazy;
use regex::Regex;

use super::common::{self, RecordWriter, Summary, Unattributed, UNATTRIBUTED};
use super::frame::Frame;
use super::resolve;
use super::Attribute;

/// The line that separates the preamble from the histogram buckets.
pub const DATA_MARKER: &str = "----";

/// The library identity of the program under test, matched as a substring, by default.
pub const DEFAULT_TARGET: &str = "ruby";

/// The dynamic loader whose frames are used when no target frame qualifies, by default.
pub const DEFAULT_LOADER: &str = "ld-linux-x86-64.so.2";

/// The loader's generic entry stub, which never qualifies as a caller, by default.
pub const DEFAULT_LOADER_ENTRY: &str = "_dl_start_user";

const COLUMNS: &[&str] = &["bytes_requested", "count", "caller", "filename", "line_number"];

// 12 calls for 40 bytes: 0x4005d0 (libc.so.6) malloc|0x4f00a0 (ruby) rb_str_new [string.c:812]
static BUCKET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<count>\S+) calls? for (?P<bytes>\S+) bytes: (?P<frames>.*)$")
        .expect("the bucket pattern is valid")
});

/// `histogram` attribution configuration options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Substring identifying the program under test in a frame's library. Default is `"ruby"`.
    pub target: String,

    /// Library identity of the dynamic loader, matched exactly. Default is
    /// `"ld-linux-x86-64.so.2"`.
    pub loader: String,

    /// The loader function that is never reported as a caller. Default is `"_dl_start_user"`.
    pub loader_entry: String,

    /// What to do with buckets that have no qualifying caller frame. Default is
    /// [`Unattributed::Sentinel`].
    pub unattributed: Unattributed,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_owned(),
            loader: DEFAULT_LOADER.to_owned(),
            loader_entry: DEFAULT_LOADER_ENTRY.to_owned(),
            unattributed: Unattributed::default(),
        }
    }
}

/// An allocation attributor for aggregated allocation-size histograms.
///
/// Everything before a line holding just `----` is ignored. After it, every line is one bucket
/// of identically sized allocations that share a stack:
///
/// ```text
/// ----
/// 12 calls for 40 bytes: 0x4005d0 (libc.so.6) malloc|0x4f00a0 (ruby) rb_str_new [string.c:812]
/// 1 call for 8 bytes: 0x4005d0 (libc.so.6) malloc|0x4f1000 (ruby) rb_ary_new [array.c:90]
/// ```
///
/// To construct one, either use `histogram::Attributor::default()` or create an [`Options`]
/// and use `histogram::Attributor::from(options)`.
#[derive(Clone, Default)]
pub struct Attributor {
    opt: Options,
}

impl From<Options> for Attributor {
    fn from(opt: Options) -> Self {
        Self { opt }
    }
}

impl Attribute for Attributor {
    fn attribute<R, W>(&mut self, mut reader: R, writer: W) -> io::Result<Summary>
    where
        R: io::BufRead,
        W: io::Write,
    {
        let mut summary = Summary::default();
        let mut out = RecordWriter::new(writer, COLUMNS)?;
        let mut line = Vec::new();

        // skip the preamble -- the marker line starts the data
        let found_marker = loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                warn!("File ended before start of histogram data");
                break false;
            }
            if String::from_utf8_lossy(&line).trim() == DATA_MARKER {
                break true;
            }
        };

        if found_marker {
            loop {
                line.clear();
                if reader.read_until(b'\n', &mut line)? == 0 {
                    break;
                }
                let l = String::from_utf8_lossy(&line);
                let l = l.trim();
                if !line.ends_with(b"\n") {
                    if !l.is_empty() {
                        warn!("File ended in the middle of a bucket; dropping: {}", l);
                        summary.truncated = true;
                    }
                    break;
                }
                if !l.is_empty() {
                    self.on_bucket(l, &mut out, &mut summary)?;
                }
            }
        }
        out.flush()?;

        summary.log();
        Ok(summary)
    }

    fn is_applicable(&mut self, input: &str) -> Option<bool> {
        let mut found_marker = false;
        for line in input.lines() {
            let line = line.trim();
            if !found_marker {
                found_marker = line == DATA_MARKER;
            } else if line.is_empty() {
                continue;
            } else {
                return Some(BUCKET.is_match(line));
            }
        }

        None
    }
}

impl Attributor {
    fn on_bucket<W>(
        &self,
        line: &str,
        out: &mut RecordWriter<W>,
        summary: &mut Summary,
    ) -> io::Result<()>
    where
        W: io::Write,
    {
        let caps = match BUCKET.captures(line) {
            Some(caps) => caps,
            None => {
                warn!("Skipping malformed histogram line: {}", line);
                summary.malformed += 1;
                return Ok(());
            }
        };
        let count = caps.name("count").map_or("", |m| m.as_str());
        let bytes = caps.name("bytes").map_or("", |m| m.as_str());
        let frames: Vec<_> = caps
            .name("frames")
            .map_or("", |m| m.as_str())
            .split('|')
            .map(Frame::from_annotated)
            .collect();
        summary.unparsed_frames += frames.iter().filter(|frame| frame.is_unparsed()).count();

        if !common::is_numeric(count) || !common::is_numeric(bytes) {
            debug!("Passing through non-numeric bucket fields {:?} and {:?}", count, bytes);
        }

        let frame = resolve::reverse_last_match(&frames, &self.opt.target).or_else(|| {
            resolve::reverse_loader_match(&frames, &self.opt.loader, &self.opt.loader_entry)
        });

        let mut buffer = itoa::Buffer::new();
        let (caller, file, lineno) = match frame {
            Some(frame) => {
                let lineno = match frame.line {
                    Some(n) => buffer.format(n),
                    None => "",
                };
                (frame.function, frame.file.unwrap_or(""), lineno)
            }
            None => {
                summary.unattributed += 1;
                match self.opt.unattributed {
                    Unattributed::Discard => {
                        debug!("Dropping unattributed bucket: {}", line);
                        return Ok(());
                    }
                    Unattributed::Sentinel => (UNATTRIBUTED, "", ""),
                }
            }
        };

        out.write(&[bytes, count, caller, file, lineno])?;
        summary.emitted += 1;
        Ok(())
    }
}
