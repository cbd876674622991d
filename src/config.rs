use crate::device::DeviceType;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_DEVICE: &str = "lamp";

/// Load environment variables from a `.env` file in the working directory.
/// Variables that are already set win over the file.
pub fn load_dotenv() {
    let content = match fs::read_to_string(".env") {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        if std::env::var(key).is_err() {
            // SAFETY: called before the async runtime spawns any threads
            unsafe { std::env::set_var(key, value) };
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim(), unquoted)
        })
        .collect()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

/// One accessory entry as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "sharedWS")]
    pub shared_ws: bool,
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
}

impl Default for AccessoryConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            device: default_device(),
            name: None,
            shared_ws: false,
            device_type: None,
        }
    }
}

impl AccessoryConfig {
    /// Build a single accessory from `PILIGHT_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("PILIGHT_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PILIGHT_PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }
        if let Ok(device) = std::env::var("PILIGHT_DEVICE") {
            config.device = device;
        }
        if let Ok(name) = std::env::var("PILIGHT_NAME") {
            config.name = Some(name);
        }
        if let Ok(shared) = std::env::var("PILIGHT_SHARED_WS")
            && let Ok(s) = shared.parse()
        {
            config.shared_ws = s;
        }
        if let Ok(device_type) = std::env::var("PILIGHT_TYPE") {
            config.device_type = Some(device_type);
        }

        config
    }

    /// Resolve defaults into the immutable binding configuration.
    pub fn into_device_config(self) -> DeviceConfig {
        let device_type = self
            .device_type
            .as_deref()
            .map(DeviceType::parse_or_default)
            .unwrap_or_default();
        let name = self.name.unwrap_or_else(|| self.device.clone());

        DeviceConfig {
            host: self.host,
            port: self.port,
            device_id: self.device,
            name,
            device_type,
            shared_ws: self.shared_ws,
        }
    }
}

/// Immutable configuration of one device binding.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,
    pub device_id: String,
    pub name: String,
    pub device_type: DeviceType,
    pub shared_ws: bool,
}

impl DeviceConfig {
    /// WebSocket address of the pilight daemon.
    pub fn address(&self) -> String {
        format!("ws://{}:{}/", self.host, self.port)
    }

    /// Stable identifier of the accessory built from this binding.
    pub fn accessory_id(&self) -> String {
        format!("name={},{}", self.device_id, self.address())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        AccessoryConfig::default().into_device_config()
    }
}

/// Top-level bridge configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub accessories: Vec<AccessoryConfig>,
}

impl BridgeConfig {
    /// `<config dir>/pilight-bridge/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pilight-bridge").join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        if config.accessories.is_empty() {
            return Err(BridgeError::Config("no accessories configured".to_string()));
        }
        Ok(config)
    }

    /// Single-accessory configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            accessories: vec![AccessoryConfig::from_env()],
        }
    }

    pub fn device_configs(&self) -> Vec<DeviceConfig> {
        self.accessories
            .iter()
            .cloned()
            .map(AccessoryConfig::into_device_config)
            .collect()
    }
}
