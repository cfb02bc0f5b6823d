use hostcall_protocol::{Channel, Domain};

use crate::cmd::ChannelsArgs;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_channels, OutputFormat};

pub fn run(args: ChannelsArgs, format: OutputFormat) -> CliResult<i32> {
    let channels: Vec<Channel> = match args.domain.as_deref() {
        Some(name) => Domain::parse(name)
            .ok_or_else(|| {
                let known: Vec<&str> = Domain::ALL.iter().map(|d| d.as_str()).collect();
                CliError::new(
                    USAGE,
                    format!("unknown domain '{name}' (expected one of: {})", known.join(", ")),
                )
            })?
            .channels()
            .collect(),
        None => Channel::ALL.to_vec(),
    };
    print_channels(&channels, format);
    Ok(SUCCESS)
}
