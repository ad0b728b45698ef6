use std::io::prelude::*;
use std::io::{self, Cursor};

use super::common::Summary;
use super::{histogram, ustack, Attribute};

const LINES_PER_ITERATION: usize = 10;

/// Attributor configuration options.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Options used if the input turns out to be per-event `ustack` output.
    pub ustack: ustack::Options,

    /// Options used if the input turns out to be an aggregated histogram.
    pub histogram: histogram::Options,
}

/// An attributor that tries to find an appropriate implementation of `Attribute`
/// based on the input, then delegates to that attributor if one is found.
///
/// If no applicable attributor is found, an error will be logged and
/// nothing will be written.
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
        let mut histogram = histogram::Attributor::from(self.opt.histogram.clone());
        let mut ustack = ustack::Attributor::from(self.opt.ustack.clone());

        // Each Attribute impl gets its own flag in this array.
        // It gets set to true when the impl has been ruled out.
        let mut not_applicable = [false; 2];

        let mut buffer = Vec::new();
        loop {
            let mut eof = false;
            for _ in 0..LINES_PER_ITERATION {
                if reader.read_until(b'\n', &mut buffer)? == 0 {
                    eof = true;
                    break;
                }
            }
            let input = String::from_utf8_lossy(&buffer).into_owned();

            macro_rules! try_attribute_impl {
                ($attributor:ident, $index:expr) => {
                    if !not_applicable[$index] {
                        match $attributor.is_applicable(&input) {
                            Some(false) => {
                                // We can rule this attributor out.
                                not_applicable[$index] = true;
                            }
                            Some(true) => {
                                // We found an attributor that works! Let's use it.
                                info!("Using {} attributor", stringify!($attributor));
                                let cursor = Cursor::new(buffer).chain(reader);
                                return $attributor.attribute(cursor, writer);
                            }
                            None => (), // We're not yet sure if this attributor is appropriate
                        }
                    }
                };
            }
            try_attribute_impl!(histogram, 0);
            try_attribute_impl!(ustack, 1);

            if eof || not_applicable.iter().all(|&ruled_out| ruled_out) {
                break;
            }
        }

        error!("No applicable attribute implementation found for input");

        Ok(Summary::default())
    }

    fn is_applicable(&mut self, _line: &str) -> Option<bool> {
        unreachable!()
    }
}
