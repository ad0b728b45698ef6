use std::io;
use std::path::PathBuf;

use alloctrace::attribute::histogram::{Attributor, Options};
use alloctrace::attribute::{Attribute, Unattributed};
use clap::{ArgAction, Parser};
use env_logger::Env;

#[derive(Debug, Parser)]
#[clap(
    name = "alloctrace-histogram",
    about,
    after_help = "\
[1] This processes an aggregated allocation histogram: a preamble, a line holding just ----,
    then one line per bucket, like:
        12 calls for 40 bytes: 0x4005d0 (libc.so.6) malloc|0x4f00a0 (ruby) rb_str_new [string.c:812]
    "
)]
struct Opt {
    // ************* //
    // *** FLAGS *** //
    // ************* //
    /// Drop buckets with no attributable caller instead of writing them as "unattributed"
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
    /// Substring identifying the program under test in a frame's library
    #[clap(long = "target", default_value = "ruby", value_name = "STRING")]
    target: String,

    /// Library identity of the dynamic loader
    #[clap(long = "loader", default_value = "ld-linux-x86-64.so.2", value_name = "STRING")]
    loader: String,

    /// Loader entry stub that is never reported as a caller
    #[clap(long = "loader-entry", default_value = "_dl_start_user", value_name = "STRING")]
    loader_entry: String,

    // ************ //
    // *** ARGS *** //
    // ************ //
    /// CSV output file, or STDOUT if "-"
    #[clap(value_name = "OUTFILE")]
    outfile: PathBuf,

    /// Histogram files, or STDIN if not specified
    #[clap(value_name = "PATH")]
    infiles: Vec<PathBuf>,
}

impl Opt {
    fn into_parts(self) -> (Vec<PathBuf>, PathBuf, Options) {
        let options = Options {
            target: self.target,
            loader: self.loader,
            loader_entry: self.loader_entry,
            unattributed: if self.discard_unattributed {
                Unattributed::Discard
            } else {
                Unattributed::Sentinel
            },
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
