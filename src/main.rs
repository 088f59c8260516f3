use std::io::{self, Write};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use parqlens::cli::{Cli, Command};
use parqlens::error::Error;
use parqlens::format::{format_into, Arg, OutBuf};
use parqlens::mem::pool::BlockPool;
use parqlens::show;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    let pool = BlockPool::new();
    let mut stdout = io::stdout();

    let result = match &cli.command {
        Command::Show { path } => show::show_metadata(path, &pool, &mut stdout),
        Command::Schema { path } => show::show_schema(path, &pool, &mut stdout),
        Command::Thrift { path } => show::dump_thrift(path, &mut stdout),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn report_failure(err: &Error) {
    let mut out = OutBuf::with_capacity(128);

    let rendered = format_into(
        &mut out,
        "Something wrong happened; error=%r\n",
        &[Arg::Int(err.code())],
    );

    if rendered.is_ok() {
        let _ = io::stderr().write_all(out.as_slice());
    }
}
