use std::io;
use std::path::PathBuf;

use alloctrace::attribute::ustack::{Attributor, Options};
use alloctrace::attribute::{Attribute, Unattributed};
use clap::{ArgAction, Parser};
use env_logger::Env;

#[derive(Debug, Parser)]
#[clap(
    name = "alloctrace-ustack",
    about,
    after_help = "\
[1] This processes the output of a dtrace script that prints the allocator, a timestamp and
    the requested size on separate lines, followed by a ustack(), for every allocation:
        dtrace -x bufsize=128m -s allocs.d -c 'ruby -e String.new' -o basic.dtrace

    The test type is a flag, not a leading argument. Write
        alloctrace-ustack -t basic allocations.csv basic.dtrace
    rather than
        alloctrace-ustack basic allocations.csv basic.dtrace
    "
)]
struct Opt {
    // ************* //
    // *** FLAGS *** //
    // ************* //
    /// Log every stack rejected as foreign
    #[clap(long = "report-foreign")]
    report_foreign: bool,

    /// Drop events with no attributable caller instead of writing them as "unattributed"
    #[clap(long = "discard-unattributed")]
    discard_unattributed: bool,

    /// Silence all log output
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,

    /// Verbose logging mode (-v, -vv, -vvv)
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    // *************** //
    // *** OPTIONS *** //
    // *************** //
    /// Test-type label added to every row as a final column
    #[clap(short = 't', long = "test-type", value_name = "STRING")]
    test_type: Option<String>,

    /// Library identity of the program under test
    #[clap(long = "target", default_value = "ruby", value_name = "STRING")]
    target: String,

    /// Header lines at the start of each event (the fourth is a test-type tag)
    #[clap(
        long = "header-lines",
        default_value = "3",
        value_name = "UINT",
        value_parser = clap::value_parser!(u8).range(3..=4)
    )]
    header_lines: u8,

    // ************ //
    // *** ARGS *** //
    // ************ //
    /// CSV output file, or STDOUT if "-"
    #[clap(value_name = "OUTFILE")]
    outfile: PathBuf,

    /// dtrace output files, or STDIN if not specified
    #[clap(value_name = "PATH")]
    infiles: Vec<PathBuf>,
}

impl Opt {
    fn into_parts(self) -> (Vec<PathBuf>, PathBuf, Options) {
        let options = Options {
            target: self.target,
            header_lines: usize::from(self.header_lines),
            test_type: self.test_type,
            unattributed: if self.discard_unattributed {
                Unattributed::Discard
            } else {
                Unattributed::Sentinel
            },
            report_foreign: self.report_foreign,
        };
        (self.infiles, self.outfile, options)
    }
}

fn main() -> io::Result<()> {
    let opt = Opt::parse();

    // Initialize logger
    if !opt.quiet {
        env_logger::Builder::from_env(Env::default().default_filter_or(match opt.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }))
        .format_timestamp(None)
        .init();
    }

    let (infiles, outfile, options) = opt.into_parts();
    Attributor::from(options).attribute_files_to(infiles.as_slice(), outfile)?;
    Ok(())
}
