//! Configuration management for herakles-process-control.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use clap::ValueEnum;
use herakles_process_control::kill_list::DEFAULT_KILL_LIST_PATH;
use herakles_process_control::netdev::DEFAULT_NETDEV_PATH;
use herakles_process_control::process::linux::DEFAULT_PROC_ROOT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9216;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Process control
    #[serde(alias = "kill-list-path")]
    pub kill_list_path: Option<PathBuf>,
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    #[serde(alias = "netdev-path")]
    pub netdev_path: Option<PathBuf>,
    /// Seconds between background reconciliation passes (0 = disabled)
    #[serde(alias = "reconcile-interval-seconds")]
    pub reconcile_interval_seconds: Option<u64>,

    // Feature flags
    pub enable_health: Option<bool>,
    pub enable_telemetry: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            kill_list_path: Some(PathBuf::from(DEFAULT_KILL_LIST_PATH)),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            netdev_path: Some(PathBuf::from(DEFAULT_NETDEV_PATH)),
            reconcile_interval_seconds: Some(0),
            enable_health: Some(true),
            enable_telemetry: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    pub fn kill_list_path(&self) -> PathBuf {
        self.kill_list_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KILL_LIST_PATH))
    }

    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    /// Effective log level; an absent setting means `info`.
    pub fn log_level(&self) -> Result<LogLevel, String> {
        match self.log_level.as_deref() {
            None => Ok(LogLevel::Info),
            Some(s) => LogLevel::from_str(s.trim(), true)
                .map_err(|_| format!("Invalid log_level '{}'", s)),
        }
    }

    pub fn netdev_path(&self) -> PathBuf {
        self.netdev_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_NETDEV_PATH))
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.port == Some(0) {
        return Err("port must be between 1 and 65535".into());
    }

    if cfg
        .kill_list_path
        .as_ref()
        .is_some_and(|p| p.as_os_str().is_empty())
    {
        return Err("kill_list_path must not be empty".into());
    }

    cfg.log_level()?;

    if let Some(bind) = cfg.bind.as_deref() {
        if bind.parse::<std::net::IpAddr>().is_err() {
            return Err(format!("Invalid bind address '{}'", bind).into());
        }
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

/// Checks that a TLS input file exists, is readable and is not empty.
fn check_pem_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        return Err(format!("TLS {} file not found: {}", what, path).into());
    }
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Err(e) => Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into()),
        Ok(_) => Ok(()),
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(level) = args.log_level {
        if let Some(value) = level.to_possible_value() {
            config.log_level = Some(value.get_name().to_string());
        }
    }

    if let Some(path) = &args.kill_list {
        config.kill_list_path = Some(path.clone());
    }
    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(interval) = args.reconcile_interval {
        config.reconcile_interval_seconds = Some(interval);
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_telemetry {
        config.enable_telemetry = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Configuration loading with multiple format support.
///
/// Without an explicit path the first existing default location is used;
/// if none exists the built-in defaults apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/herakles/process-control.yaml",
                "/etc/herakles/process-control.yml",
                "/etc/herakles/process-control.json",
                "./herakles-process-control.yaml",
                "./herakles-process-control.yml",
                "./herakles-process-control.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    if !path.exists() {
        return Err(format!("Config file not found: {}", path.display()).into());
    }

    let content = fs::read_to_string(&path)?;
    let config = parse_config(&content, path.extension().and_then(|s| s.to_str()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses config content; the extension selects JSON or TOML, anything else is YAML.
pub fn parse_config(
    content: &str,
    extension: Option<&str>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

/// Renders configuration in the requested format
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_effective_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_port_zero_rejected() {
        let cfg = Config {
            port: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_tls_without_paths_rejected() {
        let cfg = Config {
            enable_tls: Some(true),
            ..Config::default()
        };
        let err = validate_effective_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("neither tls_cert_path nor tls_key_path"));
    }

    #[test]
    fn test_parse_config_formats() {
        let yaml = "port: 9300\nkill_list_path: /tmp/kl.json\nreconcile_interval_seconds: 15\n";
        let cfg = parse_config(yaml, Some("yaml")).unwrap();
        assert_eq!(cfg.port, Some(9300));
        assert_eq!(cfg.kill_list_path(), PathBuf::from("/tmp/kl.json"));
        assert_eq!(cfg.reconcile_interval_seconds, Some(15));
        // Fields absent from the file fall back to the accessor defaults.
        assert_eq!(cfg.proc_root(), PathBuf::from(DEFAULT_PROC_ROOT));

        let json = r#"{"port": 9400, "enable_health": false}"#;
        let cfg = parse_config(json, Some("json")).unwrap();
        assert_eq!(cfg.port, Some(9400));
        assert_eq!(cfg.enable_health, Some(false));

        let toml = "port = 9500\nkill-list-path = \"/srv/kl.json\"\n";
        let cfg = parse_config(toml, Some("toml")).unwrap();
        assert_eq!(cfg.port, Some(9500));
        assert_eq!(cfg.kill_list_path(), PathBuf::from("/srv/kl.json"));
    }

    #[test]
    fn test_log_level_from_file_unless_cli_given() {
        let file = parse_config("log_level: debug\n", Some("yaml")).unwrap();
        assert_eq!(file.log_level().unwrap(), LogLevel::Debug);

        let args = Args::parse_from(["herakles-process-control", "--no-config"]);
        assert_eq!(resolve_config(&args).unwrap().log_level().unwrap(), LogLevel::Info);

        let args = Args::parse_from(["herakles-process-control", "--no-config", "--log-level", "warn"]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.log_level.as_deref(), Some("warn"));
        assert_eq!(cfg.log_level().unwrap(), LogLevel::Warn);

        let bad = Config {
            log_level: Some("loud".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&bad).is_err());
    }

    #[test]
    fn test_cli_overrides_defaults() {
        let args = Args::parse_from([
            "herakles-process-control",
            "--no-config",
            "--port",
            "9999",
            "--kill-list",
            "/tmp/other.json",
            "--reconcile-interval",
            "60",
            "--disable-telemetry",
        ]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.port, Some(9999));
        assert_eq!(cfg.kill_list_path(), PathBuf::from("/tmp/other.json"));
        assert_eq!(cfg.reconcile_interval_seconds, Some(60));
        assert_eq!(cfg.enable_telemetry, Some(false));
        assert_eq!(cfg.enable_health, Some(true));
    }
}
