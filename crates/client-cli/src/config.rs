use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_ENV: &str = "PRIMEFIELD_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Root of the web API; service names are appended to it
    pub base_url: String,
    pub company_id: String,
    pub timeout_secs: u64,
}

/// Location reported with login and registration calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: String,
    pub longitude: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// OS version string sent as `sDeviceVersion`
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub otp_countdown_secs: u32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_otp_countdown() -> u32 {
    120
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://86.96.193.135/srvsat/webapi".to_string(),
            company_id: "100".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: "25.2048".to_string(),
            longitude: "55.2708".to_string(),
            location: "Dubai, UAE".to_string(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            version: "Unknown".to_string(),
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            otp_countdown_secs: default_otp_countdown(),
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let proj_dirs = ProjectDirs::from("com", "primetech", "primefield")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Set a value by its dotted key, e.g. `backend.base_url`
    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            "backend.base_url" => self.backend.base_url = value,
            "backend.company_id" => self.backend.company_id = value,
            "backend.timeout_secs" => self.backend.timeout_secs = value.parse()?,
            "location.latitude" => self.location.latitude = value,
            "location.longitude" => self.location.longitude = value,
            "location.location" => self.location.location = value,
            "device.version" => self.device.version = value,
            "registration.otp_countdown_secs" => {
                self.registration.otp_countdown_secs = value.parse()?
            }
            _ => anyhow::bail!("Unknown config key: {}. Valid keys: {}", key, Self::KEYS.join(", ")),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        Ok(match key {
            "backend.base_url" => self.backend.base_url.clone(),
            "backend.company_id" => self.backend.company_id.clone(),
            "backend.timeout_secs" => self.backend.timeout_secs.to_string(),
            "location.latitude" => self.location.latitude.clone(),
            "location.longitude" => self.location.longitude.clone(),
            "location.location" => self.location.location.clone(),
            "device.version" => self.device.version.clone(),
            "registration.otp_countdown_secs" => self.registration.otp_countdown_secs.to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        })
    }

    pub const KEYS: &'static [&'static str] = &[
        "backend.base_url",
        "backend.company_id",
        "backend.timeout_secs",
        "location.latitude",
        "location.longitude",
        "location.location",
        "device.version",
        "registration.otp_countdown_secs",
    ];
}
