use hostcall_host::{Host, HostConfig};
use tracing::{info, warn};

use crate::cmd::ServeArgs;
use crate::exit::{host_error, CliResult, SUCCESS};

pub async fn run(args: ServeArgs) -> CliResult<i32> {
    let mut config = HostConfig {
        config_path: args.config,
        ..HostConfig::default()
    };
    if let Some(dir) = args.log_dir {
        config.log_dir = dir;
    }
    if let Some(version) = args.app_version {
        config.app_version = version;
    }

    let host = Host::builder(config)
        .build()
        .map_err(|err| host_error("host setup failed", err))?;

    host.serve(&args.path, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for interrupt; serving until killed");
            std::future::pending::<()>().await;
        }
    })
    .await
    .map_err(|err| host_error("serve failed", err))?;

    info!("host stopped");
    Ok(SUCCESS)
}
