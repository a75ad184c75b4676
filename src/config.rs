use anyhow::{Context, Result, ensure};
use std::{env, path::PathBuf, sync::OnceLock, time::Duration};

/// Application configuration loaded and validated at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP server configuration
    pub ui: UiConfig,

    /// Network manager CLI configuration
    pub nmcli: NmcliConfig,

    /// Interfaces and profiles this service manages
    pub network: NetworkConfig,

    /// Optional TLS certificate configuration
    pub certificate: Option<CertificateConfig>,
}

#[derive(Clone, Debug)]
pub struct UiConfig {
    pub port: u16,
    pub web_root: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct NmcliConfig {
    pub binary_path: PathBuf,
    pub query_timeout: Duration,
    pub mutation_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct NetworkConfig {
    pub wifi_interface: String,
    pub wired_profile: String,
}

#[derive(Clone, Debug)]
pub struct CertificateConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl AppConfig {
    /// Get or load the application configuration
    ///
    /// # Panics
    /// Panics if configuration loading fails. Call [`AppConfig::load`] first
    /// to surface configuration errors gracefully.
    pub fn get() -> &'static Self {
        Self::cell()
            .get_or_init(|| Self::load_internal().expect("failed to load application configuration"))
    }

    /// Load and cache the configuration, returning an error if it is invalid
    pub fn load() -> Result<&'static Self> {
        if let Some(config) = Self::cell().get() {
            return Ok(config);
        }

        let config = Self::load_internal()?;
        Ok(Self::cell().get_or_init(|| config))
    }

    fn cell() -> &'static OnceLock<AppConfig> {
        static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();
        &APP_CONFIG
    }

    fn load_internal() -> Result<Self> {
        Ok(Self {
            ui: UiConfig::load()?,
            nmcli: NmcliConfig::load()?,
            network: NetworkConfig::load(),
            certificate: CertificateConfig::load(),
        })
    }
}

impl UiConfig {
    fn load() -> Result<Self> {
        let port = env::var("UI_PORT")
            .unwrap_or_else(|_| "9999".to_string())
            .parse::<u16>()
            .context("failed to parse UI_PORT: invalid format")?;

        let web_root = env::var("WEB_ROOT").ok().map(PathBuf::from);

        Ok(Self { port, web_root })
    }
}

impl NmcliConfig {
    fn load() -> Result<Self> {
        let binary_path = env::var("NMCLI_PATH")
            .unwrap_or_else(|_| "nmcli".to_string())
            .into();

        Ok(Self {
            binary_path,
            query_timeout: timeout_from_env("NMCLI_QUERY_TIMEOUT_SECS", 10)?,
            mutation_timeout: timeout_from_env("NMCLI_MUTATION_TIMEOUT_SECS", 30)?,
        })
    }
}

impl NetworkConfig {
    fn load() -> Self {
        let wifi_interface = env::var("WIFI_INTERFACE").unwrap_or_else(|_| "wlan0".to_string());
        let wired_profile =
            env::var("WIRED_PROFILE").unwrap_or_else(|_| "Wired connection 1".to_string());

        Self {
            wifi_interface,
            wired_profile,
        }
    }
}

impl CertificateConfig {
    fn load() -> Option<Self> {
        let cert_path = env::var("CERT_PATH").ok()?.into();
        let key_path = env::var("KEY_PATH").ok()?.into();

        Some(Self {
            cert_path,
            key_path,
        })
    }
}

fn timeout_from_env(name: &str, default_secs: u64) -> Result<Duration> {
    parse_timeout(name, env::var(name).ok().as_deref(), default_secs)
}

fn parse_timeout(name: &str, value: Option<&str>, default_secs: u64) -> Result<Duration> {
    let secs = match value {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .context(format!("failed to parse {name}: invalid format"))?,
        None => default_secs,
    };

    ensure!(secs > 0, "failed to parse {name}: timeout must be positive");

    Ok(Duration::from_secs(secs))
}
