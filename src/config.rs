//! Runtime configuration
//!
//! Everything is read from the environment; each binary resolves what it needs.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DATABASE_PATH_VAR: &str = "BPTRACK_DATABASE_PATH";
pub const BIND_ADDR_VAR: &str = "BPTRACK_BIND_ADDR";
pub const REPORT_PATH_VAR: &str = "BPTRACK_REPORT_PATH";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_REPORT_FILE: &str = "bp_analysis_report.html";
const DATABASE_FILE: &str = "patient_bp.db";

/// Get the database path from environment or use default
///
/// The default lives in `data/` under the project root when the binary runs
/// out of `target/debug` or `target/release`, otherwise next to the binary.
pub fn database_path() -> PathBuf {
    std::env::var(DATABASE_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(parent) = path.parent() {
                    if let Some(grandparent) = parent.parent() {
                        path = grandparent.to_path_buf();
                    }
                }
            }

            path.push("data");
            path.push(DATABASE_FILE);
            path
        })
}

/// Address the web server binds to
pub fn bind_addr() -> Result<SocketAddr, std::net::AddrParseError> {
    parse_bind_addr(std::env::var(BIND_ADDR_VAR).ok().as_deref())
}

fn parse_bind_addr(value: Option<&str>) -> Result<SocketAddr, std::net::AddrParseError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_BIND_ADDR)
        .parse()
}

/// Where the analysis report is written when no path is given on the command line
pub fn report_path() -> PathBuf {
    std::env::var(REPORT_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_REPORT_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_addr() {
        let addr = parse_bind_addr(None).unwrap();
        assert_eq!(addr.port(), 5000);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_blank_bind_addr_falls_back() {
        assert_eq!(parse_bind_addr(Some("  ")).unwrap().port(), 5000);
    }

    #[test]
    fn test_custom_bind_addr() {
        let addr = parse_bind_addr(Some("0.0.0.0:8080")).unwrap();
        assert_eq!(addr.port(), 8080);
        assert!(parse_bind_addr(Some("not-an-addr")).is_err());
    }

    #[test]
    fn test_default_database_file_name() {
        if std::env::var(DATABASE_PATH_VAR).is_err() {
            assert!(database_path().ends_with("data/patient_bp.db"));
        }
    }
}
