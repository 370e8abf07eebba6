use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Top-level configuration for the gpsdmon collector.
///
/// Read once at session start and never mutated afterwards. Each `gather_*`
/// flag independently enables one record emission; `gather_satcount` and
/// `gather_sky` both derive from SKY reports but are gated separately.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Logging verbosity (trace, debug, info, warn, error). Default: "info".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// gpsd listening address to connect to. Default: "localhost:2947".
    #[serde(default = "default_url")]
    pub url: String,

    /// Connection establishment timeout. Default: 10s.
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Gather count of satellites visible and used. Default: true.
    #[serde(default = "default_true")]
    pub gather_satcount: bool,

    /// Gather SKY dilution-of-precision reports. Default: false.
    #[serde(default)]
    pub gather_sky: bool,

    /// Gather TPV time-position-velocity reports. Default: false.
    #[serde(default)]
    pub gather_tpv: bool,

    /// Gather GST pseudorange-statistics reports. Default: false.
    #[serde(default)]
    pub gather_gst: bool,

    /// Gather ATT attitude reports. Default: false.
    #[serde(default)]
    pub gather_att: bool,

    /// Gather PPS pulse-per-second reports. Default: false.
    #[serde(default)]
    pub gather_pps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            url: default_url(),
            connect_timeout: default_connect_timeout(),
            gather_satcount: true,
            gather_sky: false,
            gather_tpv: false,
            gather_gst: false,
            gather_att: false,
            gather_pps: false,
        }
    }
}

impl Config {
    /// Loads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validates the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("url is required");
        }

        if self.connect_timeout.is_zero() {
            bail!("connect_timeout must be positive");
        }

        if !self.any_gather_enabled() {
            bail!("at least one gather_* flag must be enabled");
        }

        Ok(())
    }

    /// True if any record emission is enabled.
    pub fn any_gather_enabled(&self) -> bool {
        self.gather_satcount
            || self.gather_sky
            || self.gather_tpv
            || self.gather_gst
            || self.gather_att
            || self.gather_pps
    }
}

// --- Default value functions ---

fn default_log_level() -> String {
    "info".to_string()
}

fn default_url() -> String {
    "localhost:2947".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").expect("empty config parses");

        assert_eq!(cfg.url, "localhost:2947");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert!(cfg.gather_satcount);
        assert!(!cfg.gather_sky);
        assert!(!cfg.gather_tpv);
        assert!(!cfg.gather_gst);
        assert!(!cfg.gather_att);
        assert!(!cfg.gather_pps);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn test_parse_overrides() {
        let yaml = r#"
url: "gps-host:2947"
connect_timeout: 3s
gather_satcount: false
gather_tpv: true
gather_pps: true
"#;
        let cfg: Config = serde_yaml::from_str(yaml).expect("parses");

        assert_eq!(cfg.url, "gps-host:2947");
        assert_eq!(cfg.connect_timeout, Duration::from_secs(3));
        assert!(!cfg.gather_satcount);
        assert!(cfg.gather_tpv);
        assert!(cfg.gather_pps);
        cfg.validate().expect("valid");
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let cfg = Config {
            url: String::new(),
            ..Config::default()
        };
        let err = cfg.validate().expect_err("should fail");
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_validate_rejects_all_gathers_disabled() {
        let cfg = Config {
            gather_satcount: false,
            ..Config::default()
        };
        let err = cfg.validate().expect_err("should fail");
        assert!(err.to_string().contains("gather_"));
    }
}
