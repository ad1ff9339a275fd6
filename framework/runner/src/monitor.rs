use propagation_probe_core::prelude::ShutdownListener;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Watch the probe process and warn when its CPU usage is high.
///
/// The scenarios time network calls, so a busy probe process can inflate every measurement.
/// This never stops the run, it only tells the user the numbers may be distorted.
pub(crate) fn start_monitor(mut shutdown_listener: ShutdownListener) {
    std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            let this_process_pid = Pid::from_u32(std::process::id());
            let mut sys = System::new();

            sys.refresh_cpu_usage();
            let cpu_count = sys.cpus().len().max(1);

            loop {
                if shutdown_listener.should_shutdown() {
                    break;
                }

                sys.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[this_process_pid]),
                    true,
                    ProcessRefreshKind::nothing().with_cpu(),
                );

                if let Some(process) = sys.process(this_process_pid) {
                    let usage = process.cpu_usage() / cpu_count as f32;
                    if usage > 10.0 {
                        log::warn!(
                            "High CPU usage while timing backends: the probe is using {usage:.2}% across {cpu_count} cores, measurements may be distorted"
                        );
                    }
                }

                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            }
        })
        .expect("Failed to start monitor thread");
}
