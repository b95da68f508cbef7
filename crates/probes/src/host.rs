use humansize::{BINARY, format_size};
use serde::Serialize;
use std::time::Duration;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

/// Static facts about the machine, shown next to the check summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostInfo {
    pub hostname: String,
    pub os: String,
    pub uptime: Duration,
    pub memory_total: u64,
    pub memory_used: u64,
    pub load_average: [f64; 3],
}

impl HostInfo {
    pub fn collect() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        let load = System::load_average();

        Self {
            hostname: System::host_name().unwrap_or_else(|| "unknown".into()),
            os: System::long_os_version().unwrap_or_else(|| "unknown".into()),
            uptime: Duration::from_secs(System::uptime()),
            memory_total: system.total_memory(),
            memory_used: system.used_memory(),
            load_average: [load.one, load.five, load.fifteen],
        }
    }

    /// `used / total` in binary units, e.g. `1.50 GiB / 8 GiB`.
    pub fn memory(&self) -> String {
        format!(
            "{} / {}",
            format_size(self.memory_used, BINARY),
            format_size(self.memory_total, BINARY)
        )
    }

    pub fn uptime(&self) -> String {
        format_uptime(self.uptime)
    }

    pub fn load(&self) -> String {
        let [one, five, fifteen] = self.load_average;
        format!("{one:.2} {five:.2} {fifteen:.2}")
    }
}

/// Coarse `XdYhZm` rendering.
///
/// ```
/// # use probes::host::format_uptime;
/// # use std::time::Duration;
/// assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 1h 1m");
/// assert_eq!(format_uptime(Duration::from_secs(59)), "0m");
/// ```
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs() / 60;
    let (days, hours, minutes) = (total / 1440, (total / 60) % 24, total % 60);
    match (days, hours) {
        (0, 0) => format!("{minutes}m"),
        (0, _) => format!("{hours}h {minutes}m"),
        _ => format!("{days}d {hours}h {minutes}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_memory_and_load() {
        let info = HostInfo {
            hostname: "box".into(),
            os: "Linux".into(),
            uptime: Duration::from_secs(3_660),
            memory_total: 8 * 1024 * 1024 * 1024,
            memory_used: 1024 * 1024 * 1024,
            load_average: [0.5, 0.25, 0.75],
        };
        assert_eq!(info.memory(), "1 GiB / 8 GiB");
        assert_eq!(info.uptime(), "1h 1m");
        assert_eq!(info.load(), "0.50 0.25 0.75");
    }

    #[test]
    fn collect_reads_the_running_host() {
        let info = HostInfo::collect();
        assert!(info.memory_total > 0);
        assert!(!info.hostname.is_empty());
    }
}
