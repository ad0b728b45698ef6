/// Allocation attribution for per-event dtrace `ustack()` output.
///
/// See the [crate-level documentation] for details.
///
///   [crate-level documentation]: ../../index.html
pub mod ustack;

/// Allocation attribution for aggregated, address-annotated allocation histograms.
///
/// See the [crate-level documentation] for details.
///
///   [crate-level documentation]: ../../index.html
pub mod histogram;

/// Attempts to use whichever Attribute implementation is appropriate for a given input
pub mod guess;

/// Parsing of individual stack frame lines.
pub mod frame;

/// The frame selection strategies used to pick the responsible caller out of a stack.
///
/// The ustack strategy scans leaf-first and takes the first qualifying frame. The histogram
/// strategy scans from the root-ward end, so it takes the outermost qualifying frame.
pub mod resolve;

pub(crate) mod common;

pub use self::common::{Summary, Unattributed, UNATTRIBUTED};

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

const READER_CAPACITY: usize = 128 * 1024;

/// The abstract behavior of allocation attribution.
///
/// Implementors take the allocation stacks produced by a particular tracer configuration and
/// write one CSV row per attributable allocation event.
pub trait Attribute {
    /// Attributes the events in the provided `reader` and writes CSV rows to the provided
    /// `writer`.
    ///
    /// Malformed or foreign events are never an error; they are counted in the returned
    /// [`Summary`]. Only I/O failures are reported as errors.
    fn attribute<R, W>(&mut self, reader: R, writer: W) -> io::Result<Summary>
    where
        R: io::BufRead,
        W: io::Write;

    /// Attributes the contents of the given files (or of STDIN if `infiles` is empty) and writes
    /// CSV rows to the provided `writer`.
    ///
    /// Multiple files are read back to back as a single stream, so an event that starts at the
    /// end of one file continues into the next.
    fn attribute_files<P, W>(&mut self, infiles: &[P], writer: W) -> io::Result<Summary>
    where
        P: AsRef<Path>,
        W: Write,
    {
        if infiles.is_empty() {
            let stdio = io::stdin();
            let stdio_guard = stdio.lock();
            let reader = io::BufReader::with_capacity(READER_CAPACITY, stdio_guard);
            return self.attribute(reader, writer);
        }

        let mut input: Box<dyn Read> = Box::new(io::empty());
        for path in infiles {
            let file = File::open(path)?;
            input = Box::new(input.chain(file));
        }
        let reader = io::BufReader::with_capacity(READER_CAPACITY, input);
        self.attribute(reader, writer)
    }

    /// Attributes the given files (or STDIN) and writes the CSV to `outfile`, or to STDOUT if
    /// `outfile` is `-`.
    fn attribute_files_to<P, Q>(&mut self, infiles: &[P], outfile: Q) -> io::Result<Summary>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let outfile = outfile.as_ref();
        if outfile == Path::new("-") {
            let stdout = io::stdout();
            let mut writer = io::BufWriter::new(stdout.lock());
            let summary = self.attribute_files(infiles, &mut writer)?;
            writer.flush()?;
            return Ok(summary);
        }

        let mut writer = io::BufWriter::new(File::create(outfile)?);
        let summary = self.attribute_files(infiles, &mut writer)?;
        writer.flush()?;
        Ok(summary)
    }

    /// Returns whether this implementation is appropriate for the given input.
    ///
    /// - `None` means "not sure -- need more input"
    /// - `Some(true)` means "yes, this implementation should work with this string"
    /// - `Some(false)` means "no, this implementation definitely won't work"
    fn is_applicable(&mut self, input: &str) -> Option<bool>;
}
