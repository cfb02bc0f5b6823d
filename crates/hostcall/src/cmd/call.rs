use std::sync::Arc;

use hostcall_client::{Client, ClientConfig};
use hostcall_transport::SocketTransport;
use serde_json::Value;

use crate::cmd::{parse_duration, CallArgs};
use crate::exit::{
    client_error, remote_exit_code, transport_error, CliError, CliResult, SUCCESS, USAGE,
};
use crate::output::{print_envelope, print_value, OutputFormat};

pub async fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let request_timeout = parse_duration(&args.timeout)?;
    let call_args = parse_args(&args.args)?;

    let transport = SocketTransport::connect(&args.path)
        .await
        .map_err(|err| transport_error("connect failed", err))?;
    let client = Client::with_config(Arc::new(transport), ClientConfig { request_timeout });

    if args.safe {
        let envelope = client.safe_invoke::<Value>(&args.channel, call_args).await;
        print_envelope(&envelope, format);
        return Ok(envelope.error_code().map_or(SUCCESS, remote_exit_code));
    }

    let value: Value = client
        .invoke(&args.channel, call_args)
        .await
        .map_err(|err| client_error("call failed", err))?;
    print_value(&value, format);
    Ok(SUCCESS)
}

fn parse_args(raw: &[String]) -> CliResult<Vec<Value>> {
    raw.iter()
        .enumerate()
        .map(|(i, arg)| {
            serde_json::from_str(arg).map_err(|err| {
                CliError::new(USAGE, format!("--arg #{} is not valid JSON: {err}", i + 1))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn args_are_json() {
        let parsed = parse_args(&["\"/tmp/a\"".to_string(), "{\"x\":1}".to_string()]).unwrap();
        assert_eq!(parsed, vec![json!("/tmp/a"), json!({"x": 1})]);
    }

    #[test]
    fn bare_words_are_usage_errors() {
        let err = parse_args(&["hello".to_string()]).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("--arg #1"));
    }
}
