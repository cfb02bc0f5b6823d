use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

#[cfg(unix)]
pub mod call;
pub mod channels;
pub mod codes;
#[cfg(unix)]
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a host with the built-in services until interrupted.
    #[cfg(unix)]
    Serve(ServeArgs),
    /// Invoke a channel on a running host and print the result.
    #[cfg(unix)]
    Call(CallArgs),
    /// List registered channels.
    Channels(ChannelsArgs),
    /// List the error code catalog.
    Codes,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        #[cfg(unix)]
        Command::Serve(args) => block_on(serve::run(args)),
        #[cfg(unix)]
        Command::Call(args) => block_on(call::run(args, format)),
        Command::Channels(args) => channels::run(args, format),
        Command::Codes => codes::run(format),
        Command::Version(args) => version::run(args),
    }
}

#[cfg(unix)]
fn block_on<F: std::future::Future<Output = CliResult<i32>>>(fut: F) -> CliResult<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            CliError::new(
                crate::exit::INTERNAL,
                format!("failed to start runtime: {err}"),
            )
        })?;
    runtime.block_on(fut)
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    #[arg(env = "HOSTCALL_SOCKET")]
    pub path: PathBuf,
    /// JSON file backing config:* (kept in memory when omitted).
    #[arg(long, env = "HOSTCALL_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Directory reported by log:get-path and swept by log:clean.
    #[arg(long, env = "HOSTCALL_LOG_DIR", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
    /// Version reported on system:app-version.
    #[arg(long, value_name = "VERSION")]
    pub app_version: Option<String>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Socket path to connect to.
    #[arg(env = "HOSTCALL_SOCKET")]
    pub path: PathBuf,
    /// Channel identifier, e.g. system:info.
    pub channel: String,
    /// Positional argument as JSON. Repeat for more arguments.
    #[arg(long = "arg", short = 'a', value_name = "JSON")]
    pub args: Vec<String>,
    /// Request timeout (e.g. 5s, 500ms).
    #[arg(long, env = "HOSTCALL_TIMEOUT", default_value = "10s")]
    pub timeout: String,
    /// Print the response envelope instead of failing on an error response.
    #[arg(long)]
    pub safe: bool,
}

#[derive(Args, Debug)]
pub struct ChannelsArgs {
    /// Only channels of this domain (e.g. window, file).
    #[arg(long)]
    pub domain: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
