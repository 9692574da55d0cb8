use anyhow::{Context, Error, Result};
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::time::Duration;
use termcolor::{BufferedStandardStream, ColorChoice};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use ipcount::{input::FileOrStdin, Config, Pipeline, Reporter};

/// Exit code for invalid settings, matching clap's usage errors.
const EXIT_CONFIG: u8 = 2;

/// Check if the error chain contains a broken pipe error.
#[inline(always)]
fn is_broken_pipe(err: &Error) -> bool {
    for cause in err.chain() {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::BrokenPipe {
                return true;
            }
        }
    }
    false
}

/// Check if the error chain starts from invalid settings.
fn is_configuration(err: &Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<ipcount::Error>())
        .any(ipcount::Error::is_configuration)
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Limit the number of results to the N most frequent addresses
    #[clap(short, long, value_name = "N")]
    max_results: Option<usize>,

    /// Do not look up hostnames
    #[clap(short, long)]
    numeric: bool,

    /// If multiple addresses are found on a line, count the Nth one, starting at 1
    #[clap(short, long, value_name = "N", default_value_t = 1)]
    key: usize,

    /// Only show addresses with at least this many occurrences
    #[clap(short, long, value_name = "N")]
    threshold: Option<u64>,

    /// Fail as soon as a line without an address is found
    #[clap(long)]
    pedantic: bool,

    /// Use a custom regex to find addresses instead of the built-in IPv4/IPv6 patterns
    #[clap(short, long, value_name = "REGEX", conflicts_with_all = &["no_ipv4", "no_ipv6"])]
    pattern: Option<String>,

    /// Every line holds a single address and nothing else
    #[clap(long, conflicts_with_all = &["pattern", "key"])]
    fixed_ips: bool,

    /// Format of each output line. Fields are {cnt}, {ip} and {host};
    /// use {{ and }} for literal braces
    #[clap(short, long, value_name = "TEMPLATE", env = "IPCOUNT_FORMAT")]
    format: Option<String>,

    /// Print one JSON object per address instead of formatted lines;
    /// takes precedence over --format
    #[clap(long)]
    json: bool,

    /// Use markers to highlight the addresses
    #[clap(short = 'C', long, value_enum, default_value_t = ArgsColorChoice::Auto)]
    color: ArgsColorChoice,

    /// Do not match IPv4 addresses
    #[clap(long)]
    no_ipv4: bool,

    /// Do not match IPv6 addresses
    #[clap(long)]
    no_ipv6: bool,

    /// Time limit for each hostname lookup, in milliseconds
    #[clap(long, value_name = "MS", default_value_t = 1000, env = "IPCOUNT_TIMEOUT_MS")]
    timeout_ms: u64,

    /// Number of hostname lookups in flight at once
    #[clap(long, value_name = "N", default_value_t = 32, env = "IPCOUNT_CONCURRENCY")]
    concurrency: usize,

    /// Log progress to stderr; repeat for more detail
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Input file(s) to process. Leave empty or use "-" to read from stdin
    #[clap(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    input: Vec<Utf8PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum ArgsColorChoice {
    Always,
    Never,
    Auto,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            selector_index: self.key,
            resolve_hostnames: !self.numeric,
            min_threshold: self.threshold,
            max_results: self.max_results,
            ipv4: !self.no_ipv4,
            ipv6: !self.no_ipv6,
            pattern: self.pattern.clone(),
            fixed_ips: self.fixed_ips,
            pedantic: self.pedantic,
            lookup_timeout: Duration::from_millis(self.timeout_ms),
            lookup_concurrency: self.concurrency,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var("IPCOUNT_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let err = match run_main() {
        Ok(code) => return code,
        Err(err) => err,
    };

    if is_broken_pipe(&err) {
        return ExitCode::SUCCESS;
    }

    if std::env::var("RUST_BACKTRACE").is_ok_and(|v| v == "1")
        && std::env::var("RUST_LIB_BACKTRACE").map_or(true, |v| v == "1")
    {
        let _ = writeln!(&mut io::stderr(), "{:?}", err);
    } else {
        let _ = writeln!(&mut io::stderr(), "{:#}", err);
    }

    if is_configuration(&err) {
        ExitCode::from(EXIT_CONFIG)
    } else {
        ExitCode::FAILURE
    }
}

fn run_main() -> Result<ExitCode> {
    let mut args = Args::parse();
    init_logging(args.verbose);

    // if no files specified, add stdin
    if args.input.is_empty() {
        args.input.push(Utf8PathBuf::from("-"));
    }

    // auto colors only when stdout is a terminal
    let colormode = match args.color {
        ArgsColorChoice::Auto => {
            if io::stdout().is_terminal() {
                ColorChoice::Always
            } else {
                ColorChoice::Never
            }
        }
        ArgsColorChoice::Always => ColorChoice::Always,
        ArgsColorChoice::Never => ColorChoice::Never,
    };

    // settings are checked before any input is read
    let pipeline = Pipeline::new(&args.config())?;
    let reporter = if args.json {
        Reporter::json()
    } else {
        Reporter::text(args.format.as_deref(), pipeline.resolves())?
    };

    let inputs: Vec<FileOrStdin> = args
        .input
        .into_iter()
        .map(FileOrStdin::from_path)
        .collect();
    let entries = pipeline.run(&inputs).context("failed to count addresses")?;

    let mut out = BufferedStandardStream::stdout(colormode);
    reporter
        .write(&mut out, &entries)
        .context("failed to write report")?;

    Ok(ExitCode::SUCCESS)
}
