//! `pmdpipe`: copy an openPMD series from one file to another

use clap::Parser;
use pmdpipe::logging::{init_logging, LogFormat, LogSettings};
use pmdpipe::pipe::{run, PipeOptions};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pmdpipe")]
#[command(about = "Chunked copy of an openPMD series between backends", long_about = None)]
struct Args {
    /// Series to read
    #[arg(long)]
    infile: Option<String>,
    /// Series to create
    #[arg(long)]
    outfile: Option<String>,
    /// Source backend options, JSON or @file
    #[arg(long, default_value = "{}")]
    inconfig: String,
    /// Sink backend options, JSON or @file
    #[arg(long, default_value = "{}")]
    outconfig: String,
    /// Run distributed over a message-passing communicator
    #[arg(long, overrides_with = "no_mpi")]
    mpi: bool,
    /// Run serially (default)
    #[arg(long = "no-mpi", overrides_with = "mpi")]
    no_mpi: bool,
    /// Log format, overrides PMDPIPE_LOG_FORMAT
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Attach source locations to log events
    #[arg(long)]
    log_locations: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut logging = LogSettings::from_env()
        .verbosity(args.verbose)
        .locations(args.log_locations);
    if let Some(format) = args.log_format {
        logging = logging.format(format);
    }
    if let Err(e) = init_logging(&logging) {
        eprintln!("cannot initialize logging: {e:#}");
    }

    let (Some(infile), Some(outfile)) = (args.infile, args.outfile) else {
        println!("Please specify parameters --infile and --outfile.");
        return ExitCode::from(1);
    };

    let options = PipeOptions {
        infile: infile.into(),
        outfile: outfile.into(),
        inconfig: args.inconfig,
        outconfig: args.outconfig,
        mpi: args.mpi && !args.no_mpi,
    };

    match run(&options) {
        Ok(stats) => {
            tracing::debug!(?stats, "copy complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "copy failed");
            eprintln!("pmdpipe: {e:#}");
            ExitCode::FAILURE
        }
    }
}
