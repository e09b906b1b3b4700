//! Description of the host the benchmark ran on.
//!
//! Embedded in the JSON report and printed before a run. Collection never
//! fails the run: a disk that cannot be queried is reported as an error
//! string.

use crate::results::round_to;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use sysinfo::{Disks, System};
use tracing::Span;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Everything collected about the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disk: DiskInfo,
    pub os: OsInfo,
    pub tool: ToolInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuInfo {
    pub processor: String,
    pub architecture: String,
    pub cores_physical: Option<usize>,
    pub cores_logical: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryInfo {
    pub total_gb: f64,
    pub available_gb: f64,
    pub used_percent: f64,
}

/// Usage of the filesystem holding the benchmark directories.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DiskInfo {
    Usage {
        total_gb: f64,
        free_gb: f64,
        used_percent: f64,
        #[serde(flatten)]
        partition: Option<Partition>,
    },
    Unavailable {
        error: String,
    },
}

/// Mounted filesystem the benchmark path lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub filesystem_type: String,
    pub mount_point: String,
    pub device: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OsInfo {
    pub system: String,
    pub release: String,
    pub version: String,
}

/// Build of this tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
    pub target: String,
}

impl SystemInfo {
    /// Collect host information; `benchmark_path` selects the disk.
    pub fn collect(benchmark_path: &Path, span: &Span) -> Self {
        tracing::info!(parent: span, "collecting_system_info");

        let mut sys = System::new();
        sys.refresh_all();

        let info = Self {
            cpu: cpu_info(&sys),
            memory: memory_info(&sys),
            disk: DiskInfo::collect(benchmark_path, span),
            os: OsInfo {
                system: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
                release: System::kernel_version().unwrap_or_else(|| "Unknown".to_string()),
                version: System::long_os_version().unwrap_or_else(|| "Unknown".to_string()),
            },
            tool: ToolInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                target: format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
            },
        };

        tracing::info!(
            parent: span,
            processor = %info.cpu.processor,
            cores = info.cpu.cores_logical,
            memory_gb = info.memory.total_gb,
            os = %info.os.system,
            "system_info_collected"
        );
        info
    }
}

fn cpu_info(sys: &System) -> CpuInfo {
    let processor = sys
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    CpuInfo {
        processor,
        architecture: std::env::consts::ARCH.to_string(),
        cores_physical: System::physical_core_count(),
        cores_logical: sys.cpus().len(),
    }
}

fn memory_info(sys: &System) -> MemoryInfo {
    let total = sys.total_memory();
    let available = sys.available_memory();
    MemoryInfo {
        total_gb: round_to(total as f64 / BYTES_PER_GB, 2),
        available_gb: round_to(available as f64 / BYTES_PER_GB, 2),
        used_percent: used_percent(total, total.saturating_sub(available)),
    }
}

fn used_percent(total: u64, used: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round_to(used as f64 / total as f64 * 100.0, 2)
    }
}

impl DiskInfo {
    /// Usage of the filesystem containing `path`.
    pub fn collect(path: &Path, span: &Span) -> Self {
        match disk_usage(path) {
            Ok((total, free, used)) => Self::Usage {
                total_gb: round_to(total as f64 / BYTES_PER_GB, 2),
                free_gb: round_to(free as f64 / BYTES_PER_GB, 2),
                used_percent: used_percent(total, used),
                partition: partition_for(path),
            },
            Err(error) => {
                tracing::warn!(parent: span, path = %path.display(), %error, "disk_info_failed");
                Self::Unavailable { error }
            }
        }
    }
}

/// Partition whose mount point is the longest prefix of `path`.
fn partition_for(path: &Path) -> Option<Partition> {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();
    let disk = longest_mount(&path, disks.list().iter().map(|d| (d.mount_point(), d)))?;
    Some(Partition {
        filesystem_type: disk.file_system().to_string_lossy().into_owned(),
        mount_point: disk.mount_point().display().to_string(),
        device: disk.name().to_string_lossy().into_owned(),
    })
}

fn longest_mount<'a, T>(path: &Path, mounts: impl IntoIterator<Item = (&'a Path, T)>) -> Option<T> {
    mounts
        .into_iter()
        .filter(|(mount, _)| path.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .map(|(_, item)| item)
}

/// `(total, free, used)` bytes; free is what an unprivileged user can allocate.
#[cfg(unix)]
#[allow(clippy::useless_conversion, clippy::unnecessary_cast)]
fn disk_usage(path: &Path) -> Result<(u64, u64, u64), String> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(|e| e.to_string())?;
    let fragment = stat.fragment_size() as u64;
    let total = u64::from(stat.blocks()) * fragment;
    let free = u64::from(stat.blocks_available()) * fragment;
    let used = total.saturating_sub(u64::from(stat.blocks_free()) * fragment);
    Ok((total, free, used))
}

#[cfg(not(unix))]
fn disk_usage(_path: &Path) -> Result<(u64, u64, u64), String> {
    Err("disk usage is not supported on this platform".to_string())
}

impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "SYSTEM INFORMATION")?;
        writeln!(f, "{rule}")?;

        writeln!(f, "\nCPU:")?;
        writeln!(f, "Processor: {}", self.cpu.processor)?;
        writeln!(f, "Architecture: {}", self.cpu.architecture)?;
        match self.cpu.cores_physical {
            Some(physical) => writeln!(f, "Cores: {physical} physical, {} logical", self.cpu.cores_logical)?,
            None => writeln!(f, "Cores: ? physical, {} logical", self.cpu.cores_logical)?,
        }

        writeln!(f, "\nMemory:")?;
        writeln!(f, "Total: {} GB", self.memory.total_gb)?;
        writeln!(f, "Available: {} GB", self.memory.available_gb)?;
        writeln!(f, "Used: {}%", self.memory.used_percent)?;

        writeln!(f, "\nDisk:")?;
        match &self.disk {
            DiskInfo::Usage {
                total_gb,
                free_gb,
                used_percent,
                partition,
            } => {
                if let Some(part) = partition {
                    writeln!(f, "Filesystem: {}", part.filesystem_type)?;
                    writeln!(f, "Mount Point: {}", part.mount_point)?;
                    writeln!(f, "Device: {}", part.device)?;
                }
                writeln!(f, "Total: {total_gb} GB")?;
                writeln!(f, "Free: {free_gb} GB")?;
                writeln!(f, "Used: {used_percent}%")?;
            }
            DiskInfo::Unavailable { error } => writeln!(f, "Unavailable: {error}")?,
        }

        writeln!(f, "\nOperating System:")?;
        writeln!(f, "System: {}", self.os.system)?;
        writeln!(f, "Release: {}", self.os.release)?;
        writeln!(f, "Version: {}", self.os.version)?;

        writeln!(f, "\nTool:")?;
        writeln!(f, "{} {} ({})", self.tool.name, self.tool.version, self.tool.target)?;
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_used_percent() {
        assert!((used_percent(200, 50) - 25.0).abs() < f64::EPSILON);
        assert!(used_percent(0, 0).abs() < f64::EPSILON);
    }

    #[cfg(unix)]
    #[test]
    fn test_disk_usage_of_temp_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let (total, free, used) = disk_usage(dir.path()).unwrap();
        assert!(total > 0);
        assert!(free <= total);
        assert!(used <= total);
    }

    #[test]
    fn test_longest_mount_prefix_wins() {
        let mounts = [
            (Path::new("/"), "root"),
            (Path::new("/dat"), "dat"),
            (Path::new("/data"), "data"),
            (Path::new("/data/other"), "other"),
        ];
        assert_eq!(longest_mount(Path::new("/data/bench/large"), mounts), Some("data"));
        assert_eq!(longest_mount(Path::new("/home/user"), mounts), Some("root"));
        assert_eq!(longest_mount(Path::new("relative"), mounts), None);
    }

    #[test]
    fn test_partition_fields_flatten_into_disk_json() {
        let disk = DiskInfo::Usage {
            total_gb: 100.0,
            free_gb: 40.0,
            used_percent: 60.0,
            partition: Some(Partition {
                filesystem_type: "ext4".to_string(),
                mount_point: "/".to_string(),
                device: "/dev/sda1".to_string(),
            }),
        };
        let json = serde_json::to_value(&disk).unwrap();
        assert_eq!(json["filesystem_type"], "ext4");
        assert_eq!(json["mount_point"], "/");
        assert_eq!(json["device"], "/dev/sda1");
        assert_eq!(json["total_gb"], 100.0);
    }

    #[test]
    fn test_missing_disk_is_reported_not_raised() {
        let disk = DiskInfo::collect(Path::new("/definitely/not/here"), &Span::none());
        assert!(matches!(disk, DiskInfo::Unavailable { .. }));

        let json = serde_json::to_value(&disk).unwrap();
        assert!(json.get("error").is_some());
    }

    #[test]
    fn test_display_sections() {
        let dir = tempfile::TempDir::new().unwrap();
        let info = SystemInfo::collect(dir.path(), &Span::none());
        let text = info.to_string();

        for heading in ["SYSTEM INFORMATION", "CPU:", "Memory:", "Disk:", "Operating System:"] {
            assert!(text.contains(heading), "missing {heading}");
        }
        assert_eq!(info.tool.name, "fsbench");
        assert!(text.contains(" physical, "));
    }
}
