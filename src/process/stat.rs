//! Parsers for the per-process and system-wide files under /proc.
//!
//! Every reader takes the directory to read from so the parsers can be
//! exercised against fixture trees.

use once_cell::sync::Lazy;
use std::fs;
use std::io;
use std::path::Path;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    // SAFETY: sysconf is safe to call with _SC_CLK_TCK
    let tck = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if tck > 0 {
        tck as f64
    } else {
        100.0
    }
}

fn get_page_size() -> u64 {
    // SAFETY: sysconf is safe to call with _SC_PAGESIZE
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
}

/// System clock ticks per second (for CPU time calculation).
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Memory page size in bytes (for statm conversion).
pub static PAGE_SIZE: Lazy<u64> = Lazy::new(get_page_size);

/// Fields of `/proc/<pid>/stat` used for process snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct StatFields {
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    pub utime: u64,
    pub stime: u64,
    pub start_ticks: u64,
}

impl StatFields {
    /// Total CPU time (user + system) in seconds.
    pub fn cpu_time_seconds(&self) -> f64 {
        (self.utime + self.stime) as f64 / *CLK_TCK
    }

    /// Lifetime average CPU utilization given the current system uptime.
    pub fn cpu_percent(&self, uptime_seconds: f64) -> f64 {
        let age = uptime_seconds - self.start_ticks as f64 / *CLK_TCK;
        if age <= 0.0 {
            return 0.0;
        }
        (self.cpu_time_seconds() / age) * 100.0
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Parses the content of `/proc/<pid>/stat`.
///
/// The command name is enclosed in parentheses and may itself contain spaces
/// or parentheses, so fields are counted from the last `)`.
pub fn parse_stat(content: &str) -> io::Result<StatFields> {
    let open = content.find('(').ok_or_else(|| invalid("Missing '(' in stat"))?;
    let close = content.rfind(')').ok_or_else(|| invalid("Missing ')' in stat"))?;
    if close < open {
        return Err(invalid("Malformed command name in stat"));
    }

    let comm = content[open + 1..close].to_string();
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if rest.len() < 20 {
        return Err(invalid("Invalid stat format"));
    }

    let field = |idx: usize| -> io::Result<u64> {
        rest[idx]
            .parse()
            .map_err(|_| invalid(format!("Failed to parse stat field {}", idx + 3)))
    };

    Ok(StatFields {
        comm,
        state: rest[0].chars().next().unwrap_or('?'),
        ppid: field(1)? as u32,
        utime: field(11)?,
        stime: field(12)?,
        start_ticks: field(19)?,
    })
}

/// Reads a procfs text file. Command names are arbitrary bytes, so invalid
/// UTF-8 is replaced rather than rejected.
fn read_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn read_stat(proc_path: &Path) -> io::Result<StatFields> {
    let content = read_lossy(&proc_path.join("stat"))?;
    parse_stat(&content)
}

/// Reads the real UID from the `Uid:` line of `/proc/<pid>/status`.
pub fn read_real_uid(proc_path: &Path) -> io::Result<u32> {
    let content = read_lossy(&proc_path.join("status"))?;
    content
        .lines()
        .find_map(|line| line.strip_prefix("Uid:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| invalid("No Uid line in status"))
}

/// Reads resident set size in bytes from `/proc/<pid>/statm`.
pub fn read_rss_bytes(proc_path: &Path) -> io::Result<u64> {
    let content = fs::read_to_string(proc_path.join("statm"))?;
    let pages: u64 = content
        .split_whitespace()
        .nth(1)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| invalid("Invalid statm format"))?;
    Ok(pages * *PAGE_SIZE)
}

/// Reads `MemTotal` from `<proc_root>/meminfo`, in bytes.
pub fn read_mem_total_bytes(proc_root: &Path) -> io::Result<u64> {
    let content = fs::read_to_string(proc_root.join("meminfo"))?;
    content
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
        .ok_or_else(|| invalid("No MemTotal line in meminfo"))
}

/// Reads system uptime in seconds from `<proc_root>/uptime`.
pub fn read_uptime_seconds(proc_root: &Path) -> io::Result<f64> {
    let content = fs::read_to_string(proc_root.join("uptime"))?;
    content
        .split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| invalid("Invalid uptime format"))
}

/// Reads process name from comm file or extracts it from cmdline.
pub fn read_process_name(proc_path: &Path) -> Option<String> {
    if let Ok(s) = read_lossy(&proc_path.join("comm")) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let content = fs::read(proc_path.join("cmdline")).ok()?;
    let first = content.split(|&b| b == 0u8).next()?;
    let first = String::from_utf8_lossy(first);
    Path::new(first.as_ref())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STAT_LINE: &str = "1234 (test_process) S 1 1234 1234 0 -1 4194304 100 0 0 0 1000 500 0 0 20 0 1 0 12345 12345678 1234 18446744073709551615 4194304 4238788 140736466511168 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0";

    #[test]
    fn test_parse_stat_basic() {
        let stat = parse_stat(STAT_LINE).expect("valid stat");
        assert_eq!(stat.comm, "test_process");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.utime, 1000);
        assert_eq!(stat.stime, 500);
        assert_eq!(stat.start_ticks, 12345);
    }

    #[test]
    fn test_parse_stat_comm_with_spaces_and_parens() {
        let line = STAT_LINE.replace("(test_process)", "(Web Content (x))");
        let stat = parse_stat(&line).expect("valid stat");
        assert_eq!(stat.comm, "Web Content (x)");
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.utime, 1000);
    }

    #[test]
    fn test_parse_stat_too_short() {
        assert!(parse_stat("1234 (test) S 1 2 3").is_err());
        assert!(parse_stat("garbage").is_err());
    }

    #[test]
    fn test_cpu_percent_lifetime_average() {
        let stat = parse_stat(STAT_LINE).unwrap();
        // Process age is twice its CPU time.
        let start = 12345.0 / *CLK_TCK;
        let cpu = 1500.0 / *CLK_TCK;
        let pct = stat.cpu_percent(start + 2.0 * cpu);
        assert!((pct - 50.0).abs() < 0.01, "got {}", pct);
        assert_eq!(stat.cpu_percent(0.0), 0.0);
    }

    #[test]
    fn test_read_real_uid() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(
            dir.path().join("status"),
            "Name:\tbash\nState:\tS (sleeping)\nUid:\t1000\t1000\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\n",
        )
        .unwrap();
        assert_eq!(read_real_uid(dir.path()).unwrap(), 1000);
    }

    #[test]
    fn test_read_rss_bytes() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("statm"), "5000 250 100 10 0 300 0\n").unwrap();
        assert_eq!(read_rss_bytes(dir.path()).unwrap(), 250 * *PAGE_SIZE);
    }

    #[test]
    fn test_read_mem_total_and_uptime() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(
            dir.path().join("meminfo"),
            "MemTotal:       16384 kB\nMemFree:         1024 kB\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("uptime"), "3600.50 7000.00\n").unwrap();

        assert_eq!(read_mem_total_bytes(dir.path()).unwrap(), 16384 * 1024);
        assert!((read_uptime_seconds(dir.path()).unwrap() - 3600.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_read_process_name_falls_back_to_cmdline() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("cmdline"), b"/usr/bin/python3\0-m\0http.server\0").unwrap();
        assert_eq!(read_process_name(dir.path()).as_deref(), Some("python3"));

        std::fs::write(dir.path().join("comm"), "worker\n").unwrap();
        assert_eq!(read_process_name(dir.path()).as_deref(), Some("worker"));
    }
}
