//! Process memory probing.

use crate::pagination::PaginationConfig;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// How the process' memory compares to the configured budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryLevel {
    /// At or below `memory_threshold_mb`.
    Normal,
    /// Above `memory_threshold_mb`.
    Elevated,
    /// Above `warning_threshold_mb`.
    Critical,
}

impl MemoryLevel {
    pub fn classify(usage_mb: f64, config: &PaginationConfig) -> Self {
        if usage_mb > config.warning_threshold_mb {
            Self::Critical
        } else if usage_mb > config.memory_threshold_mb {
            Self::Elevated
        } else {
            Self::Normal
        }
    }
}

/// Resident memory of the current process in MB, `0.0` when the platform
/// doesn't tell.
pub fn process_memory_mb() -> f64 {
    resident_bytes().map_or(0.0, |bytes| bytes as f64 / BYTES_PER_MB)
}

/// Formats a size in MB with the most readable unit.
pub fn format_memory_size(size_mb: f64) -> String {
    if size_mb < 1.0 {
        format!("{:.1} KB", size_mb * 1024.0)
    } else if size_mb < 1024.0 {
        format!("{size_mb:.1} MB")
    } else {
        format!("{:.2} GB", size_mb / 1024.0)
    }
}

#[cfg(target_os = "linux")]
fn resident_bytes() -> Option<usize> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: usize = statm.split_whitespace().nth(1)?.parse().ok()?;
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

    usize::try_from(page_size).ok().map(|size| pages * size)
}

#[cfg(all(unix, not(target_os = "linux")))]
fn resident_bytes() -> Option<usize> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::uninit();
    let result = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if result.ne(&0) {
        return None;
    }

    // peak resident set, reported in bytes on the BSDs and macOS
    let usage = unsafe { usage.assume_init() };
    usize::try_from(usage.ru_maxrss).ok()
}

#[cfg(not(unix))]
fn resident_bytes() -> Option<usize> {
    None
}
