//! Stderr diagnostics for the `hostcall` binary.
//!
//! Routed calls run inside an `ipc_call` span carrying `request_id` and
//! `channel`. At `debug` and `trace` the span is also reported when it
//! closes, with its busy and idle time, so `serve` logs one latency line
//! per call.

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl LogLevel {
    fn span_events(self) -> FmtSpan {
        match self {
            LogLevel::Debug | LogLevel::Trace => FmtSpan::CLOSE,
            _ => FmtSpan::NONE,
        }
    }
}

pub fn init_logging(format: LogFormat, level: LogLevel) {
    // Renderer lines are logged under `hostcall::renderer`; the target keeps
    // them apart from host output.
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::from(level))
        .with_span_events(level.span_events())
        .with_ansi(false)
        .with_target(true);

    let installed = match format {
        LogFormat::Text => builder.compact().try_init(),
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .try_init(),
    };
    if let Err(err) = installed {
        eprintln!("warning: logging not initialised: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_timing_only_when_debugging() {
        assert_eq!(LogLevel::Info.span_events(), FmtSpan::NONE);
        assert_eq!(LogLevel::Debug.span_events(), FmtSpan::CLOSE);
        assert_eq!(LogLevel::Trace.span_events(), FmtSpan::CLOSE);
    }

    #[test]
    fn off_silences_everything() {
        assert_eq!(LevelFilter::from(LogLevel::Off), LevelFilter::OFF);
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
    }
}
