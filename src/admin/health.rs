//! Host resource usage for the admin dashboard, read from procfs and `df`.
//! Every figure is a percentage in 0..=100 and falls back to 0 when unavailable.

use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SystemHealth {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl SystemHealth {
    pub fn zero() -> Self {
        Self {
            cpu_usage: 0.0,
            memory_usage: 0.0,
            disk_usage: 0.0,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn pct(v: f64) -> f64 {
    round2(v.clamp(0.0, 100.0))
}

/// One-minute load average relative to the number of CPUs.
pub fn parse_cpu(loadavg: &str, cpus: usize) -> Option<f64> {
    let load: f64 = loadavg.split_whitespace().next()?.parse().ok()?;
    (cpus > 0).then(|| pct(load / cpus as f64 * 100.0))
}

/// `(MemTotal - MemAvailable) / MemTotal` from /proc/meminfo.
pub fn parse_memory(meminfo: &str) -> Option<f64> {
    let field = |name: &str| -> Option<f64> {
        meminfo
            .lines()
            .find(|l| l.starts_with(name))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    };
    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    (total > 0.0).then(|| pct((total - available) / total * 100.0))
}

/// Use% column of `df -P` output for the first filesystem listed.
pub fn parse_df(output: &str) -> Option<f64> {
    let line = output.lines().nth(1)?;
    let used = line.split_whitespace().nth(4)?.trim_end_matches('%');
    used.parse::<f64>().ok().map(pct)
}

pub async fn sample() -> SystemHealth {
    let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
    let cpu = tokio::fs::read_to_string("/proc/loadavg")
        .await
        .ok()
        .and_then(|s| parse_cpu(&s, cpus));
    let memory = tokio::fs::read_to_string("/proc/meminfo")
        .await
        .ok()
        .and_then(|s| parse_memory(&s));
    let disk = match tokio::process::Command::new("df").args(["-P", "/"]).output().await {
        Ok(out) if out.status.success() => parse_df(&String::from_utf8_lossy(&out.stdout)),
        _ => None,
    };
    debug!(?cpu, ?memory, ?disk, "system health sampled");
    SystemHealth {
        cpu_usage: cpu.unwrap_or(0.0),
        memory_usage: memory.unwrap_or(0.0),
        disk_usage: disk.unwrap_or(0.0),
        timestamp: OffsetDateTime::now_utc(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_from_loadavg() {
        assert_eq!(parse_cpu("1.00 0.50 0.25 1/200 1234", 4), Some(25.0));
        assert_eq!(parse_cpu("9.0 0 0", 2), Some(100.0));
        assert_eq!(parse_cpu("", 4), None);
        assert_eq!(parse_cpu("1.0", 0), None);
    }

    #[test]
    fn memory_from_meminfo() {
        let meminfo = "MemTotal:       16000000 kB\nMemFree:         1000000 kB\nMemAvailable:    4000000 kB\n";
        assert_eq!(parse_memory(meminfo), Some(75.0));
        assert_eq!(parse_memory("MemTotal: 0 kB\nMemAvailable: 0 kB"), None);
        assert_eq!(parse_memory("garbage"), None);
    }

    #[test]
    fn disk_from_df() {
        let out = "Filesystem     1024-blocks      Used Available Capacity Mounted on\n/dev/sda1        102400000  42000000  60400000      42% /\n";
        assert_eq!(parse_df(out), Some(42.0));
        assert_eq!(parse_df("header only"), None);
    }

    #[test]
    fn rounding() {
        assert_eq!(round2(3.14159), 3.14);
        assert_eq!(round2(2.005_1), 2.01);
    }

    #[tokio::test]
    async fn sample_stays_in_range() {
        let h = sample().await;
        for v in [h.cpu_usage, h.memory_usage, h.disk_usage] {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}
