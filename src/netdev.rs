//! Network interface counters reported alongside the process listing.
//!
//! Reads `/proc/net/dev` and sums the counters of every interface, loopback
//! included.

use serde::Serialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_NETDEV_PATH: &str = "/proc/net/dev";

/// Host-wide network I/O totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetworkTotals {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    pub dropin: u64,
    pub dropout: u64,
}

/// Parses the content of `/proc/net/dev` into summed totals.
pub fn parse_netdev(content: &str) -> NetworkTotals {
    let mut totals = NetworkTotals::default();

    // Skip the two header lines
    for line in content.lines().skip(2) {
        let Some((_, stats_str)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<u64> = stats_str
            .split_whitespace()
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        if values.len() < 16 {
            continue; // Skip malformed lines
        }

        totals.bytes_recv += values[0];
        totals.packets_recv += values[1];
        totals.errin += values[2];
        totals.dropin += values[3];
        totals.bytes_sent += values[8];
        totals.packets_sent += values[9];
        totals.errout += values[10];
        totals.dropout += values[11];
    }

    totals
}

pub fn read_network_totals(path: &Path) -> Result<NetworkTotals, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    Ok(parse_netdev(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  1000      10    0    0    0     0          0         0     1000      10    0    0    0     0       0          0
  eth0: 50000     400    2    3    0     0          0         0    20000     300    1    4    0     0       0          0
 bogus: 1 2 3
";

    #[test]
    fn test_parse_netdev_sums_interfaces() {
        let totals = parse_netdev(SAMPLE);
        assert_eq!(totals.bytes_recv, 51000);
        assert_eq!(totals.packets_recv, 410);
        assert_eq!(totals.errin, 2);
        assert_eq!(totals.dropin, 3);
        assert_eq!(totals.bytes_sent, 21000);
        assert_eq!(totals.packets_sent, 310);
        assert_eq!(totals.errout, 1);
        assert_eq!(totals.dropout, 4);
    }

    #[test]
    fn test_read_network_totals_missing_file() {
        assert!(read_network_totals(Path::new("/nonexistent/net/dev")).is_err());
    }
}
