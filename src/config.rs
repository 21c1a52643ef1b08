//! Configuration file handling
//!
//! The configuration lives in `~/.config/uhid-gamepad/config.toml` unless the
//! `UHID_GAMEPAD_CONFIG` environment variable points elsewhere. Every field has
//! a default, so a partial or missing file still yields a usable setup.
//!
//! ```toml
//! uhid_path = "/dev/uhid"
//! ready_timeout_secs = 10
//!
//! [device]
//! vendor_id = 0x046D
//! product_id = 0xC216
//! device_name = "Logitech Dual Action"
//!
//! [demo]
//! enabled = true
//! step_ms = 100
//! hold_secs = 30
//! button_count = 12
//! ```

use crate::device::uhid::UHID_PATH;
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_VENDOR_ID: u16 = 0x9999;
pub const DEFAULT_PRODUCT_ID: u16 = 0x9999;
/// Name the device registers under when none is configured.
pub const DEFAULT_DEVICE_NAME: &str = "asyncio-hid-gamepad";

const CONFIG_DIR: &str = ".config/uhid-gamepad";
const CONFIG_FILE: &str = "config.toml";
const CONFIG_ENV: &str = "UHID_GAMEPAD_CONFIG";

/// Identity the virtual device presents to the host.
///
/// Has no influence on the report format or the lifecycle.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_name: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            device_name: DEFAULT_DEVICE_NAME.to_string(),
        }
    }
}

/// Input sequence played by the binary after the device has started.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DemoConfig {
    /// Play the button and axis sweep at all
    pub enabled: bool,
    /// Pause between two demo frames in milliseconds
    pub step_ms: u64,
    /// How long to keep the device registered after the demo
    pub hold_secs: u64,
    /// Buttons 1..=button_count are clicked in order
    pub button_count: u8,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            step_ms: 100,
            hold_secs: 30,
            button_count: 12,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub uhid_path: PathBuf,
    /// Give up waiting for the host after this many seconds; wait forever if unset
    pub ready_timeout_secs: Option<u64>,
    pub device: DeviceConfig,
    pub demo: DemoConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            uhid_path: PathBuf::from(UHID_PATH),
            ready_timeout_secs: None,
            device: DeviceConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl AppConfig {
    /// Location of the configuration file, honouring `UHID_GAMEPAD_CONFIG`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        let mut path = get_home_dir();
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file {}: {}", path.display(), e))?;
        info!("Config saved to {}", path.display());
        Ok(())
    }

    /// Loads the file at `path`, writing the defaults there first if it does not exist.
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            return Self::load(path).await;
        }

        info!("No config at {}, writing defaults", path.display());
        let config = Self::default();
        if let Err(e) = config.save(path).await {
            warn!("Could not write default config, continuing with defaults: {}", e);
        }
        Ok(config)
    }
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}
