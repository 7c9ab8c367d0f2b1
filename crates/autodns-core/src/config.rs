//! Configuration types for opnsense-auto-dns
//!
//! Configuration is layered: a JSON config file, then command-line flag
//! overrides, then environment variable overrides. The highest layer that
//! provides a non-empty value wins. [`FileConfig::validate`] is the startup
//! gate that turns the merged layers into [`Settings`].

use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default minutes between passes in loop mode
pub const DEFAULT_INTERVAL_MINUTES: u64 = 5;

/// Environment variable names, highest-precedence configuration layer
pub mod env {
    pub const OPNSENSE_HOST: &str = "OPNSENSE_HOST";
    pub const OPNSENSE_API_KEY: &str = "OPNSENSE_API_KEY";
    pub const OPNSENSE_API_SECRET: &str = "OPNSENSE_API_SECRET";
    pub const DOMAIN: &str = "DOMAIN";
    pub const HOSTNAMES: &str = "HOSTNAMES";
    pub const IP_ADDRESS: &str = "IP_ADDRESS";
    pub const INTERVAL: &str = "INTERVAL";
    pub const LOOP: &str = "LOOP";
    pub const IGNORE_CERT: &str = "IGNORE_CERT";
}

/// Config file contents
///
/// Every field is optional in the file itself; required fields are only
/// enforced by [`FileConfig::validate`] once all layers are merged.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileConfig {
    /// Management host of the OPNsense appliance (`host` or `host:port`)
    #[serde(default)]
    pub opnsense_host: String,

    /// API key
    #[serde(default)]
    pub opnsense_api_key: String,

    /// API secret
    #[serde(default)]
    pub opnsense_api_secret: String,

    /// Domain all host overrides live under
    #[serde(default)]
    pub domain: String,

    /// Hostnames to keep in sync; empty means "this machine's hostname"
    #[serde(default)]
    pub hostnames: Vec<String>,

    /// Pinned target address; empty means auto-detect
    #[serde(default)]
    pub ip_address: String,
}

impl std::fmt::Debug for FileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfig")
            .field("opnsense_host", &self.opnsense_host)
            .field("opnsense_api_key", &"<REDACTED>")
            .field("opnsense_api_secret", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("hostnames", &self.hostnames)
            .field("ip_address", &self.ip_address)
            .finish()
    }
}

impl FileConfig {
    /// Read and parse a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Using config file");
        Self::from_json(&data)
            .map_err(|e| Error::config(format!("cannot parse config file {}: {}", path.display(), e)))
    }

    /// Parse config file contents
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Layer `overrides` on top of the current values
    ///
    /// Only fields the overrides actually set are replaced.
    pub fn apply(&mut self, overrides: &ConfigOverrides, layer: &str) {
        if let Some(host) = &overrides.opnsense_host {
            debug!(layer, value = %host, "Overriding opnsense_host");
            self.opnsense_host = host.clone();
        }
        if let Some(key) = &overrides.opnsense_api_key {
            debug!(layer, "Overriding opnsense_api_key");
            self.opnsense_api_key = key.clone();
        }
        if let Some(secret) = &overrides.opnsense_api_secret {
            debug!(layer, "Overriding opnsense_api_secret");
            self.opnsense_api_secret = secret.clone();
        }
        if let Some(domain) = &overrides.domain {
            debug!(layer, value = %domain, "Overriding domain");
            self.domain = domain.clone();
        }
        if let Some(hostnames) = &overrides.hostnames {
            debug!(layer, ?hostnames, "Overriding hostnames");
            self.hostnames = hostnames.clone();
        }
        if let Some(ip) = &overrides.ip_address {
            debug!(layer, value = %ip, "Overriding ip_address");
            self.ip_address = ip.clone();
        }
    }

    /// Validate the merged configuration
    ///
    /// Host, key, secret and domain are required. A pinned IP must parse.
    /// Hostnames are trimmed and blank entries dropped.
    pub fn validate(&self) -> Result<Settings> {
        let required = [
            ("opnsense_host", &self.opnsense_host),
            ("opnsense_api_key", &self.opnsense_api_key),
            ("opnsense_api_secret", &self.opnsense_api_secret),
            ("domain", &self.domain),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{} is required", name)));
            }
        }

        let ip_address = match self.ip_address.trim() {
            "" => None,
            raw => Some(raw.parse::<IpAddr>().map_err(|_| {
                Error::config(format!("ip_address '{}' is not a valid IP address", raw))
            })?),
        };

        Ok(Settings {
            opnsense_host: self.opnsense_host.trim().to_string(),
            api_key: self.opnsense_api_key.clone(),
            api_secret: self.opnsense_api_secret.clone(),
            domain: self.domain.trim().to_string(),
            hostnames: clean_hostnames(&self.hostnames),
            ip_address,
        })
    }
}

/// A configuration layer above the config file
///
/// `None` means "not set by this layer". Empty strings are never treated as
/// set, so an empty flag or variable cannot blank out a lower layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub opnsense_host: Option<String>,
    pub opnsense_api_key: Option<String>,
    pub opnsense_api_secret: Option<String>,
    pub domain: Option<String>,
    pub hostnames: Option<Vec<String>>,
    pub ip_address: Option<String>,
}

impl ConfigOverrides {
    /// Read overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        Self {
            opnsense_host: get(env::OPNSENSE_HOST),
            opnsense_api_key: get(env::OPNSENSE_API_KEY),
            opnsense_api_secret: get(env::OPNSENSE_API_SECRET),
            domain: get(env::DOMAIN),
            hostnames: get(env::HOSTNAMES)
                .map(|v| v.split(',').map(str::to_string).collect::<Vec<_>>())
                .map(|v| clean_hostnames(&v))
                .filter(|v| !v.is_empty()),
            ip_address: get(env::IP_ADDRESS),
        }
    }

    /// Drop empty values, as if the layer never set them
    pub fn normalized(self) -> Self {
        let keep = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            opnsense_host: keep(self.opnsense_host),
            opnsense_api_key: keep(self.opnsense_api_key),
            opnsense_api_secret: keep(self.opnsense_api_secret),
            domain: keep(self.domain),
            hostnames: self
                .hostnames
                .map(|v| clean_hostnames(&v))
                .filter(|v| !v.is_empty()),
            ip_address: keep(self.ip_address),
        }
    }
}

/// Validated configuration a reconciliation run is built from
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Management host of the OPNsense appliance
    pub opnsense_host: String,
    /// API key
    pub api_key: String,
    /// API secret
    pub api_secret: String,
    /// Domain all host overrides live under
    pub domain: String,
    /// Hostnames to keep in sync; empty means "this machine's hostname"
    pub hostnames: Vec<String>,
    /// Pinned target address; `None` means auto-detect every pass
    pub ip_address: Option<IpAddr>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("opnsense_host", &self.opnsense_host)
            .field("api_key", &"<REDACTED>")
            .field("api_secret", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("hostnames", &self.hostnames)
            .field("ip_address", &self.ip_address)
            .finish()
    }
}

/// How the updater runs, independent of what it reconciles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Minutes to sleep between passes in loop mode
    pub interval_minutes: u64,
    /// Run passes forever instead of once
    pub run_loop: bool,
    /// Skip TLS certificate verification
    pub ignore_cert: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            run_loop: false,
            ignore_cert: false,
        }
    }
}

impl RunOptions {
    /// Apply `INTERVAL`, `LOOP` and `IGNORE_CERT` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_lookup(|name| std::env::var(name).ok());
    }

    /// Apply run options through an arbitrary variable lookup
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(env::INTERVAL).filter(|v| !v.is_empty()) {
            match raw.trim().parse::<u64>() {
                Ok(minutes) => {
                    debug!(value = minutes, "Overriding interval from environment");
                    self.interval_minutes = minutes;
                }
                Err(e) => warn!(value = %raw, err = %e, "Invalid INTERVAL environment variable"),
            }
        }

        if let Some(raw) = lookup(env::LOOP).filter(|v| !v.is_empty()) {
            match parse_bool(&raw) {
                Some(value) => {
                    debug!(value, "Overriding loop from environment");
                    self.run_loop = value;
                }
                None => warn!(value = %raw, "Invalid LOOP environment variable"),
            }
        }

        if let Some(raw) = lookup(env::IGNORE_CERT).filter(|v| !v.is_empty()) {
            match parse_bool(&raw) {
                Some(value) => {
                    debug!(value, "Overriding ignore-cert from environment");
                    self.ignore_cert = value;
                }
                None => warn!(value = %raw, "Invalid IGNORE_CERT environment variable"),
            }
        }
    }

    /// Validate run options
    pub fn validate(&self) -> Result<()> {
        if self.run_loop && self.interval_minutes == 0 {
            return Err(Error::config("interval must be at least 1 minute in loop mode"));
        }
        Ok(())
    }
}

/// Parse the boolean spellings operators commonly put in environment files
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn clean_hostnames(hostnames: &[String]) -> Vec<String> {
    hostnames
        .iter()
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn complete() -> FileConfig {
        FileConfig {
            opnsense_host: "fw.home.lan".to_string(),
            opnsense_api_key: "key".to_string(),
            opnsense_api_secret: "secret".to_string(),
            domain: "home.lan".to_string(),
            hostnames: vec![],
            ip_address: String::new(),
        }
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_required_fields_are_rejected_by_name() {
        for field in ["opnsense_host", "opnsense_api_key", "opnsense_api_secret", "domain"] {
            let mut config = complete();
            match field {
                "opnsense_host" => config.opnsense_host.clear(),
                "opnsense_api_key" => config.opnsense_api_key.clear(),
                "opnsense_api_secret" => config.opnsense_api_secret.clear(),
                _ => config.domain.clear(),
            }
            let err = config.validate().unwrap_err();
            assert!(matches!(err, Error::Config(_)));
            assert!(err.to_string().contains(field), "{err}");
        }
    }

    #[test]
    fn invalid_pinned_ip_is_rejected() {
        let mut config = complete();
        config.ip_address = "not-an-ip".to_string();
        assert!(config.validate().is_err());

        config.ip_address = "192.168.1.50".to_string();
        let settings = config.validate().unwrap();
        assert_eq!(settings.ip_address, Some("192.168.1.50".parse().unwrap()));
    }

    #[test]
    fn hostnames_are_trimmed_and_blank_entries_dropped() {
        let mut config = complete();
        config.hostnames = vec![" nas ".to_string(), "".to_string(), "media".to_string()];
        assert_eq!(config.validate().unwrap().hostnames, vec!["nas", "media"]);
    }

    #[test]
    fn environment_beats_flags_beats_file() {
        let mut config = FileConfig::from_json(
            r#"{"opnsense_host":"file-host","opnsense_api_key":"k","opnsense_api_secret":"s",
                "domain":"file.lan","hostnames":["a"]}"#,
        )
        .unwrap();

        let flags = ConfigOverrides {
            opnsense_host: Some("flag-host".to_string()),
            domain: Some("flag.lan".to_string()),
            ..Default::default()
        }
        .normalized();
        let env = ConfigOverrides::from_lookup(lookup(&[
            (env::OPNSENSE_HOST, "env-host"),
            (env::HOSTNAMES, "x, y,,z"),
        ]));

        config.apply(&flags, "flags");
        config.apply(&env, "environment");
        let settings = config.validate().unwrap();

        assert_eq!(settings.opnsense_host, "env-host");
        assert_eq!(settings.domain, "flag.lan");
        assert_eq!(settings.hostnames, vec!["x", "y", "z"]);
        assert_eq!(settings.api_key, "k");
    }

    #[test]
    fn empty_values_never_override() {
        let mut config = complete();
        let env = ConfigOverrides::from_lookup(lookup(&[(env::DOMAIN, ""), (env::HOSTNAMES, " , ")]));
        assert_eq!(env, ConfigOverrides::default());

        let flags = ConfigOverrides {
            domain: Some(String::new()),
            hostnames: Some(vec![]),
            ..Default::default()
        }
        .normalized();
        config.apply(&flags, "flags");
        assert_eq!(config.domain, "home.lan");
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"opnsense_host":"fw","opnsense_api_key":"k","opnsense_api_secret":"s","domain":"home.lan","ip_address":"10.0.0.9"}}"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.opnsense_host, "fw");
        assert_eq!(config.ip_address, "10.0.0.9");
        assert!(config.hostnames.is_empty());
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        assert!(matches!(
            FileConfig::load("/nonexistent/autodns.json"),
            Err(Error::Config(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(FileConfig::load(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn run_options_from_environment() {
        let mut options = RunOptions::default();
        options.apply_lookup(lookup(&[
            (env::INTERVAL, "10"),
            (env::LOOP, "true"),
            (env::IGNORE_CERT, "1"),
        ]));
        assert_eq!(
            options,
            RunOptions {
                interval_minutes: 10,
                run_loop: true,
                ignore_cert: true
            }
        );
    }

    #[test]
    fn invalid_run_option_values_are_ignored() {
        let mut options = RunOptions::default();
        options.apply_lookup(lookup(&[(env::INTERVAL, "soon"), (env::LOOP, "yes")]));
        assert_eq!(options, RunOptions::default());
    }

    #[test]
    fn zero_interval_rejected_only_in_loop_mode() {
        let mut options = RunOptions {
            interval_minutes: 0,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
        options.run_loop = true;
        assert!(options.validate().is_err());
    }

    #[test]
    fn debug_output_hides_credentials() {
        let config = complete();
        let debug = format!("{:?} {:?}", config, config.validate().unwrap());
        assert!(!debug.contains("secret\""));
        assert!(!debug.contains("\"key\""));
        assert!(debug.contains("<REDACTED>"));
    }
}
