use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use hostcall_protocol::types::{CpuInfo, MemoryInfo, PerformanceInfo, SystemInfo};
use hostcall_protocol::{Channel, ErrorCode, ErrorKind};
use sysinfo::System;
use tokio::task::JoinError;

use crate::fault::Fault;
use crate::hub::ErrorHub;
use crate::router::{Router, RouterError};
use crate::wrap::{wrap, wrap_sync};

const MIB: u64 = 1024 * 1024;

/// Reads host and process figures through `sysinfo`.
pub struct SystemProbe {
    sys: Mutex<System>,
    started: Instant,
    app_version: String,
}

impl SystemProbe {
    pub fn new(app_version: impl Into<String>) -> Self {
        Self {
            sys: Mutex::new(System::new()),
            started: Instant::now(),
            app_version: app_version.into(),
        }
    }

    fn sys(&self) -> MutexGuard<'_, System> {
        self.sys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub fn info(&self) -> SystemInfo {
        let mut sys = self.sys();
        sys.refresh_memory();
        sys.refresh_cpu();

        let cpus = sys.cpus();
        let cpu = CpuInfo {
            model: cpus
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .filter(|brand| !brand.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            cores: cpus.len(),
            usage: sys.global_cpu_info().cpu_usage(),
        };

        SystemInfo {
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            os_version: System::os_version().unwrap_or_else(|| "unknown".to_string()),
            app_version: self.app_version.clone(),
            host_version: env!("CARGO_PKG_VERSION").to_string(),
            memory: MemoryInfo {
                total: sys.total_memory() / MIB,
                available: sys.available_memory() / MIB,
                used: sys.used_memory() / MIB,
            },
            cpu,
        }
    }

    pub fn performance(&self) -> PerformanceInfo {
        let uptime = self.started.elapsed().as_secs();
        let mut sys = self.sys();
        let process = sysinfo::get_current_pid().ok().and_then(|pid| {
            sys.refresh_process(pid);
            sys.process(pid)
                .map(|p| (p.memory(), p.virtual_memory(), p.cpu_usage()))
        });
        let (resident_memory, virtual_memory, cpu_usage) = process.unwrap_or((0, 0, 0.0));
        PerformanceInfo {
            resident_memory,
            virtual_memory,
            uptime,
            cpu_usage,
        }
    }
}

/// Run a `sysinfo` refresh off the async workers.
async fn sample<R, F>(probe: &Arc<SystemProbe>, read: F) -> Result<R, Fault>
where
    F: FnOnce(&SystemProbe) -> R + Send + 'static,
    R: Send + 'static,
{
    let probe = Arc::clone(probe);
    tokio::task::spawn_blocking(move || read(&probe))
        .await
        .map_err(join_fault)
}

fn join_fault(err: JoinError) -> Fault {
    if err.is_panic() {
        Fault::from_panic(&*err.into_panic())
    } else {
        Fault::new(
            ErrorKind::System,
            ErrorCode::InternalError,
            format!("系统信息采集被取消: {err}"),
        )
    }
}

pub(crate) fn register(
    router: &mut Router,
    hub: &Arc<ErrorHub>,
    probe: Arc<SystemProbe>,
) -> Result<(), RouterError> {
    let info_probe = Arc::clone(&probe);
    router.register(
        Channel::SystemInfo,
        wrap(Arc::clone(hub), move |_args| {
            let probe = Arc::clone(&info_probe);
            async move { sample(&probe, SystemProbe::info).await }
        }),
    )?;

    let version_probe = Arc::clone(&probe);
    router.register(
        Channel::SystemAppVersion,
        wrap_sync(Arc::clone(hub), move |_args| {
            Ok::<_, Fault>(version_probe.app_version().to_string())
        }),
    )?;

    router.register(
        Channel::SystemPerformance,
        wrap(Arc::clone(hub), move |_args| {
            let probe = Arc::clone(&probe);
            async move { sample(&probe, SystemProbe::performance).await }
        }),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_describes_this_host() {
        let probe = SystemProbe::new("9.9.9");
        let info = probe.info();
        assert_eq!(info.platform, std::env::consts::OS);
        assert_eq!(info.arch, std::env::consts::ARCH);
        assert_eq!(info.app_version, "9.9.9");
        assert!(info.memory.total >= info.memory.available);
    }

    #[test]
    fn performance_reports_this_process() {
        let probe = SystemProbe::new("1.0.0");
        let perf = probe.performance();
        assert!(perf.cpu_usage >= 0.0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sampling_runs_on_a_single_threaded_runtime() {
        let probe = Arc::new(SystemProbe::new("1.0.0"));
        let info = sample(&probe, SystemProbe::info).await.unwrap();
        assert_eq!(info.platform, std::env::consts::OS);
        let perf = sample(&probe, SystemProbe::performance).await.unwrap();
        assert!(perf.cpu_usage >= 0.0);
    }

    #[tokio::test]
    async fn panicking_sample_is_classified() {
        let probe = Arc::new(SystemProbe::new("1.0.0"));
        let err = sample(&probe, |_: &SystemProbe| -> u8 { panic!("sensor gone") })
            .await
            .unwrap_err()
            .into_classified();
        assert_eq!(err.code, ErrorCode::UnknownError);
        assert!(err.message.contains("sensor gone"));
    }
}
