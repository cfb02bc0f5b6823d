use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hostcall_protocol::{Channel, ChannelKind, Envelope, ErrorCode, Outcome};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn to_pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn kind_name(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::Invoke => "invoke",
        ChannelKind::Event => "event",
    }
}

/// A call result. Objects become key/value rows in table form.
pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_json(value)),
        OutputFormat::Pretty => println!("{}", to_pretty(value)),
        OutputFormat::Table => match value {
            Value::Object(map) => {
                let mut t = table(vec!["KEY", "VALUE"]);
                for (key, value) in map {
                    t.add_row(vec![key.clone(), scalar(value)]);
                }
                println!("{t}");
            }
            other => println!("{}", scalar(other)),
        },
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn print_envelope(envelope: &Envelope<Value>, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_json(envelope)),
        OutputFormat::Pretty => println!("{}", to_pretty(envelope)),
        OutputFormat::Table => {
            let mut t = table(vec!["SUCCESS", "DATA", "ERROR", "CODE"]);
            match &envelope.outcome {
                Outcome::Success(data) => {
                    t.add_row(vec!["true".to_string(), scalar(data), String::new(), String::new()]);
                }
                Outcome::Failure { error, error_code } => {
                    t.add_row(vec![
                        "false".to_string(),
                        String::new(),
                        error.clone(),
                        error_code.clone(),
                    ]);
                }
            }
            println!("{t}");
        }
    }
}

#[derive(Serialize)]
struct ChannelRow {
    channel: &'static str,
    domain: &'static str,
    kind: &'static str,
}

pub fn print_channels(channels: &[Channel], format: OutputFormat) {
    let rows: Vec<ChannelRow> = channels
        .iter()
        .map(|c| ChannelRow {
            channel: c.as_str(),
            domain: c.domain().as_str(),
            kind: kind_name(c.kind()),
        })
        .collect();
    match format {
        OutputFormat::Json => println!("{}", to_json(&rows)),
        OutputFormat::Table => {
            let mut t = table(vec!["CHANNEL", "DOMAIN", "KIND"]);
            for row in &rows {
                t.add_row(vec![row.channel, row.domain, row.kind]);
            }
            println!("{t}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!("{:<32} {:<8} {}", row.channel, row.domain, row.kind);
            }
        }
    }
}

#[derive(Serialize)]
struct CodeRow {
    code: &'static str,
    kind: &'static str,
    message: &'static str,
}

pub fn print_codes(format: OutputFormat) {
    let rows: Vec<CodeRow> = ErrorCode::ALL
        .iter()
        .map(|c| CodeRow {
            code: c.as_str(),
            kind: c.default_kind().as_str(),
            message: c.message(),
        })
        .collect();
    match format {
        OutputFormat::Json => println!("{}", to_json(&rows)),
        OutputFormat::Table => {
            let mut t = table(vec!["CODE", "KIND", "MESSAGE"]);
            for row in &rows {
                t.add_row(vec![row.code, row.kind, row.message]);
            }
            println!("{t}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!("{:<28} {:<18} {}", row.code, row.kind, row.message);
            }
        }
    }
}
