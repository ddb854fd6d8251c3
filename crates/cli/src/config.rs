//! `branchwatch.toml`: business timezone, registry location, thresholds,
//! probe and staging settings.
//!
//! Every section and key is optional.
//!
//! ```toml
//! [business]
//! timezone = "Africa/Cairo"
//! ambiguous_time = "earliest"   # earliest | latest | reject
//!
//! [registry]
//! path = "branch_data.json"
//!
//! [thresholds]
//! upload_staleness_minutes = 60
//! backup_staleness_hours = 1
//! log_size_gb = 20
//!
//! [probe]
//! enabled = true
//! network_prefix = "10.20."
//! host_suffix = ".10"
//! port = 1433
//! timeout_ms = 5000
//! concurrency = 8
//! server_prefix = "BR5"
//!
//! [staging]
//! snapshot_dir = "staging"
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use branchwatch_core::{AmbiguityPolicy, BusinessClock};
use branchwatch_ingest::DEFAULT_SERVER_PREFIX;
use branchwatch_monitor::Thresholds;
use branchwatch_probe::{
    ConnectivityProbe, EndpointTemplate, TcpDialBackend, DEFAULT_CONCURRENCY, DEFAULT_HOST_SUFFIX,
    DEFAULT_NETWORK_PREFIX, DEFAULT_PORT, DEFAULT_TIMEOUT,
};
use serde::Deserialize;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "branchwatch.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub business: BusinessSection,
    pub registry: RegistrySection,
    pub thresholds: ThresholdSection,
    pub probe: ProbeSection,
    pub staging: StagingSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusinessSection {
    pub timezone: String,
    pub ambiguous_time: AmbiguityPolicy,
}

impl Default for BusinessSection {
    fn default() -> Self {
        BusinessSection {
            timezone: "Africa/Cairo".to_string(),
            ambiguous_time: AmbiguityPolicy::Earliest,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySection {
    pub path: PathBuf,
}

impl Default for RegistrySection {
    fn default() -> Self {
        RegistrySection {
            path: PathBuf::from("branch_data.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdSection {
    pub upload_staleness_minutes: i64,
    pub backup_staleness_hours: i64,
    pub log_size_gb: u64,
}

impl Default for ThresholdSection {
    fn default() -> Self {
        ThresholdSection {
            upload_staleness_minutes: 60,
            backup_staleness_hours: 1,
            log_size_gb: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeSection {
    pub enabled: bool,
    pub network_prefix: String,
    pub host_suffix: String,
    pub port: u16,
    pub timeout_ms: u64,
    pub concurrency: usize,
    pub server_prefix: String,
}

impl Default for ProbeSection {
    fn default() -> Self {
        ProbeSection {
            enabled: true,
            network_prefix: DEFAULT_NETWORK_PREFIX.to_string(),
            host_suffix: DEFAULT_HOST_SUFFIX.to_string(),
            port: DEFAULT_PORT,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            concurrency: DEFAULT_CONCURRENCY,
            server_prefix: DEFAULT_SERVER_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StagingSection {
    pub snapshot_dir: PathBuf,
}

impl Default for StagingSection {
    fn default() -> Self {
        StagingSection {
            snapshot_dir: PathBuf::from("staging"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
}

impl Config {
    /// Read the config file. An explicit path must exist; without one the
    /// default file is used when present, and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        match explicit {
            Some(path) => Self::read(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::read(default)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn read(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn clock(&self) -> Result<BusinessClock, ConfigError> {
        BusinessClock::from_zone_name(&self.business.timezone, self.business.ambiguous_time)
            .map_err(ConfigError::Invalid)
    }

    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        let t = &self.thresholds;
        Thresholds::new(
            t.upload_staleness_minutes,
            t.backup_staleness_hours,
            t.log_size_gb,
        )
        .map_err(|e| ConfigError::Invalid(format!("[thresholds] {}", e)))
    }

    pub fn probe(&self) -> Result<ConnectivityProbe, ConfigError> {
        let p = &self.probe;
        if p.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "[probe] timeout_ms must be positive".to_string(),
            ));
        }
        Ok(ConnectivityProbe::new(Arc::new(TcpDialBackend))
            .with_template(EndpointTemplate {
                network_prefix: p.network_prefix.clone(),
                host_suffix: p.host_suffix.clone(),
                port: p.port,
            })
            .with_timeout(Duration::from_millis(p.timeout_ms))
            .with_concurrency(p.concurrency))
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_operations_settings() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.business.timezone, "Africa/Cairo");
        assert_eq!(config.thresholds.upload_staleness_minutes, 60);
        assert_eq!(config.thresholds.backup_staleness_hours, 1);
        assert_eq!(config.thresholds.log_size_gb, 20);
        assert_eq!(config.probe.port, 1433);
        assert_eq!(config.probe.timeout_ms, 5_000);
        assert!(config.probe.enabled);
        assert!(config.probe().is_ok());
        assert!(config.thresholds().is_ok());
        assert_eq!(config.clock().unwrap().to_string(), "Africa/Cairo");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            "[thresholds]\nlog_size_gb = 50\n\n[business]\nambiguous_time = \"reject\"\n",
        )
        .unwrap();
        assert_eq!(config.thresholds.log_size_gb, 50);
        assert_eq!(config.thresholds.upload_staleness_minutes, 60);
        assert_eq!(config.business.ambiguous_time, AmbiguityPolicy::Reject);
        assert_eq!(config.business.timezone, "Africa/Cairo");
    }

    #[test]
    fn invalid_values_are_reported() {
        let config: Config = toml::from_str("[thresholds]\nupload_staleness_minutes = 0\n").unwrap();
        assert!(matches!(config.thresholds(), Err(ConfigError::Invalid(_))));

        let config: Config = toml::from_str("[business]\ntimezone = \"Nowhere/City\"\n").unwrap();
        assert!(matches!(config.clock(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn oversized_log_limit_is_invalid() {
        let config: Config = toml::from_str("[thresholds]\nlog_size_gb = 20000000000\n").unwrap();
        let err = config.thresholds().unwrap_err();
        assert!(err.to_string().contains("gigabytes"), "{}", err);
    }

    #[test]
    fn zero_probe_timeout_is_invalid() {
        let config: Config = toml::from_str("[probe]\ntimeout_ms = 0\n").unwrap();
        assert!(matches!(config.probe(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("[thresholds]\nlogsize = 3\n").is_err());
    }

    #[test]
    fn read_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("branchwatch.toml");
        std::fs::write(&path, "[probe]\nport = \"not a port\"\n").unwrap();
        let err = Config::read(&path).unwrap_err();
        assert!(err.to_string().contains("branchwatch.toml"));

        let missing = Config::read(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
