use std::io;
use std::path::PathBuf;

use alloctrace::attribute::guess::{Attributor, Options};
use alloctrace::attribute::Attribute;
use clap::{ArgAction, Parser};
use env_logger::Env;

#[derive(Debug, Parser)]
#[clap(
    name = "alloctrace-guess",
    about,
    after_help = "\
[1] Attempts to find an appropriate attributor to use based on the input.
                  "
)]
struct Opt {
    /// Silence all log output
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,

    /// Verbose logging mode (-v, -vv, -vvv)
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Test-type label added to every row if the input is per-event ustack output
    #[clap(short = 't', long = "test-type", value_name = "STRING")]
    test_type: Option<String>,

    /// CSV output file, or STDOUT if "-"
    #[clap(value_name = "OUTFILE")]
    outfile: PathBuf,

    /// Input files, or STDIN if not specified
    #[clap(value_name = "PATH")]
    infiles: Vec<PathBuf>,
}

impl Opt {
    fn into_parts(self) -> (Vec<PathBuf>, PathBuf, Options) {
        let mut options = Options::default();
        options.ustack.test_type = self.test_type;
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
