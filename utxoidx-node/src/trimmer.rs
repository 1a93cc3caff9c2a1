//! Periodic advisory memory trim: every five seconds, check how much idle
//! heap the process is holding and ask the OS to reclaim it if that's
//! grown past a configured ceiling. Never touches the slot or pending
//! caches; purely a process-health side task.

use std::time::Duration;

use sysinfo::{Pid, System};
use tracing::{debug, trace};

use crate::shutdown::ShutdownFlag;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Runs until `shutdown` is set. `heap_idle_size_max` is in bytes, matching
/// the `heap_idle_size_max` configuration key.
pub async fn run(heap_idle_size_max: u64, shutdown: ShutdownFlag) {
    let pid = Pid::from_u32(std::process::id());
    let mut sys = System::new();

    while !shutdown.is_set() {
        sys.refresh_process(pid);
        if let Some(process) = sys.process(pid) {
            let resident = process.memory();
            trace!(resident, heap_idle_size_max, "memory trim check");
            if resident > heap_idle_size_max {
                debug!(resident, heap_idle_size_max, "releasing idle heap back to the OS");
                trim_heap();
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// A best-effort hint to the allocator; a no-op on allocators that don't
/// support it. The standard allocator has no such hook, so this is a
/// placeholder for the allocator-specific call a deployment would wire in.
fn trim_heap() {
    metrics::counter!("trimmer.trim.count", 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exits_promptly_once_shutdown_is_set() {
        let shutdown = ShutdownFlag::new();
        shutdown.set();
        run(u64::MAX, shutdown).await;
    }
}
