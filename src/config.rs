//! Driver configuration
//!
//! [`DriverConfig`] is what a config file or the command line provides;
//! [`DriverConfig::settings`] validates it into [`DriverSettings`], the only
//! form the driver accepts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::error;

/// Backend name reported when none is configured
pub const DEFAULT_BACKEND_NAME: &str = "FlashBladeShareDriver";

// =============================================================================
// Raw Configuration
// =============================================================================

/// Configuration as read from file and environment
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Name or address of the array management VIP
    pub flashblade_mgmt_vip: Option<String>,
    /// Name or address of the array data VIP
    pub flashblade_data_vip: Option<String>,
    /// API token of an administrative user
    pub flashblade_api: Option<String>,
    /// Eradicate filesystems and snapshots on delete. Data is not
    /// recoverable afterwards.
    pub flashblade_eradicate: bool,
    /// Backend name reported in stats
    pub share_backend_name: Option<String>,
    /// Verify the array's TLS certificate
    pub verify_ssl: bool,
    /// Per-request timeout of the array session
    pub request_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for DriverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverConfig")
            .field("flashblade_mgmt_vip", &self.flashblade_mgmt_vip)
            .field("flashblade_data_vip", &self.flashblade_data_vip)
            .field("flashblade_api", &self.flashblade_api.as_ref().map(|_| "***"))
            .field("flashblade_eradicate", &self.flashblade_eradicate)
            .field("share_backend_name", &self.share_backend_name)
            .field("verify_ssl", &self.verify_ssl)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl DriverConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Validate required options and produce driver settings
    pub fn settings(&self) -> Result<DriverSettings> {
        let api_token = required("flashblade_api", &self.flashblade_api)?;
        let management_address = required("flashblade_mgmt_vip", &self.flashblade_mgmt_vip)?;
        let data_address = required("flashblade_data_vip", &self.flashblade_data_vip)?;

        let backend_name = self
            .share_backend_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_NAME.to_string());

        Ok(DriverSettings {
            management_address,
            data_address,
            api_token,
            eradicate: self.flashblade_eradicate,
            backend_name,
            verify_ssl: self.verify_ssl,
            request_timeout: Duration::from_secs(self.request_timeout_secs.unwrap_or(30)),
        })
    }
}

fn required(option: &str, value: &Option<String>) -> Result<String> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => {
            let reason = format!("{} configuration parameter must be specified", option);
            error!("{}", reason);
            Err(Error::BadConfiguration(reason))
        }
    }
}

// =============================================================================
// Validated Settings
// =============================================================================

/// Validated driver settings
#[derive(Clone)]
pub struct DriverSettings {
    pub management_address: String,
    pub data_address: String,
    pub api_token: String,
    pub eradicate: bool,
    pub backend_name: String,
    pub verify_ssl: bool,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for DriverSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverSettings")
            .field("management_address", &self.management_address)
            .field("data_address", &self.data_address)
            .field("api_token", &"***")
            .field("eradicate", &self.eradicate)
            .field("backend_name", &self.backend_name)
            .field("verify_ssl", &self.verify_ssl)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
