// src/main.rs
//
// xhtmlfix: repair HTML into well-formed XHTML.
//
// - Reads INPUT (or stdin when omitted or "-") as bytes; it must be UTF-8.
// - Writes to --output, back over INPUT with --in-place, or to stdout.
// - --check writes nothing and exits 1 when conversion would change the input.
//
// Logging goes to stderr. Level: -v (debug), -vv (trace), else $XHTMLFIX_LOG,
// else warn.

use clap::{ArgAction, Parser};
use log::{LevelFilter, Log, Metadata, Record};
use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// CLI flags
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Input file ("-" or omitted: stdin)
    input: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long, conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Overwrite the input file with the result
    #[arg(long, action = ArgAction::SetTrue, requires = "input")]
    in_place: bool,

    /// Write nothing; exit with status 1 if the input is not already clean
    #[arg(long, action = ArgAction::SetTrue)]
    check: bool,

    /// More logging on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/* ================================ Logging =============================== */

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn log_level(verbose: u8, env_level: Option<&str>) -> LevelFilter {
    match verbose {
        0 => env_level
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8) {
    let env_level = env::var("XHTMLFIX_LOG").ok();
    let level = log_level(verbose, env_level.as_deref());
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/* ================================== I/O ================================= */

fn is_stdin(path: Option<&Path>) -> bool {
    path.map_or(true, |p| p.as_os_str() == "-")
}

fn read_input(path: Option<&Path>) -> io::Result<Vec<u8>> {
    if is_stdin(path) {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    match path {
        Some(p) => fs::read(p),
        None => Ok(Vec::new()),
    }
}

/// Where the result goes, in precedence order.
#[derive(Debug, PartialEq, Eq)]
enum Sink<'a> {
    Nowhere,
    File(&'a Path),
    Stdout,
}

fn sink(cli: &Cli) -> Sink<'_> {
    if cli.check {
        Sink::Nowhere
    } else if let Some(out) = cli.output.as_deref() {
        Sink::File(out)
    } else if cli.in_place && !is_stdin(cli.input.as_deref()) {
        cli.input.as_deref().map_or(Sink::Stdout, Sink::File)
    } else {
        Sink::Stdout
    }
}

/// Convert according to `cli`. Returns false when `--check` found changes.
fn run(cli: &Cli) -> Result<bool, xhtmlfix::Error> {
    let src = read_input(cli.input.as_deref())?;
    let converted = xhtmlfix::convert_bytes(&src)?;
    let changed = converted.as_bytes() != src.as_slice();

    match sink(cli) {
        Sink::Nowhere => {
            if changed {
                log::warn!(
                    "{} is not well-formed XHTML",
                    cli.input
                        .as_deref()
                        .map_or_else(|| "<stdin>".into(), |p| p.display().to_string())
                );
                return Ok(false);
            }
        }
        Sink::File(path) => fs::write(path, converted)?,
        Sink::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(converted.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("xhtmlfix: {err}");
            ExitCode::from(2)
        }
    }
}
