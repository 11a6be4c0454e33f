//! Configuration management

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::console::ConsoleTiming;

/// Environment variable prefix (`AMC_PORT`, `AMC_TIMING__POLL_INTERVAL_MS`, ...)
const ENV_PREFIX: &str = "AMC";

const APP_DIR_NAME: &str = "auramon-console";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Operator host port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind")]
    pub bind: String,

    /// Base URL of the firmware server
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    #[serde(default)]
    pub timing: TimingConfig,
}

fn default_port() -> u16 {
    8090
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_backend_url() -> String {
    "http://127.0.0.1".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            save_debounce_ms: default_save_debounce_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_save_debounce_ms() -> u64 {
    600
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn backend_url(&self) -> Result<Url> {
        Url::parse(&self.backend_url)
            .with_context(|| format!("invalid backend_url {:?}", self.backend_url))
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address {:?}", self.bind))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Zero periods are refused: the poll timer cannot tick at zero and a
    /// zero request timeout fails every request.
    pub fn check_timing(&self) -> Result<()> {
        if self.timing.poll_interval_ms == 0 {
            bail!("timing.poll_interval_ms must be greater than zero");
        }
        if self.timing.request_timeout_secs == 0 {
            bail!("timing.request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timing.request_timeout_secs)
    }

    pub fn console_timing(&self) -> ConsoleTiming {
        ConsoleTiming {
            poll_interval: Duration::from_millis(self.timing.poll_interval_ms),
            save_debounce: Duration::from_millis(self.timing.save_debounce_ms),
        }
    }
}

/// Get config directory (AMC_CONFIG_DIR, XDG_CONFIG_HOME or ~/.config)
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AMC_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join(APP_DIR_NAME);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join(APP_DIR_NAME);
    }

    // Fallback to current directory
    PathBuf::from(".")
}

/// Load layered configuration: defaults, then `<config dir>/config.*`, then
/// `AMC_*` environment variables.
pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let config = ::config::Config::builder()
        .set_default("port", default_port() as i64)?
        .set_default("bind", default_bind())?
        .set_default("backend_url", default_backend_url())?
        // Load from config file if it exists
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // Override with environment variables (AMC_BACKEND_URL, AMC_TIMING__POLL_INTERVAL_MS, etc.)
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = config.try_deserialize()?;

    // Fail at startup rather than on the first request
    config.backend_url()?;
    config.listen_addr()?;
    config.check_timing()?;

    Ok(config)
}
