//! Array API capability detection
//!
//! The array's API generation decides how NFS is switched on for new
//! filesystems. It is probed once at setup and never per call.

use crate::domain::array::{ApiVersions, NfsRule};
use serde::{Deserialize, Serialize};

/// First API version with separate NFSv3 / NFSv4.1 switches
pub const SPLIT_NFS_VERSIONS_API: &str = "1.6";

/// API generation of the connected array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiGeneration {
    /// Single NFS `enabled` switch
    Legacy,
    /// Separate v3 and v4.1 switches
    Modern,
}

impl ApiGeneration {
    /// Classify the array from its advertised API versions
    pub fn detect(versions: &ApiVersions) -> Self {
        if versions.supports(SPLIT_NFS_VERSIONS_API) {
            ApiGeneration::Modern
        } else {
            ApiGeneration::Legacy
        }
    }

    /// NFS settings for a freshly created filesystem: every version the
    /// array can serve is on, and nobody has access yet.
    pub fn initial_nfs_rule(&self) -> NfsRule {
        match self {
            ApiGeneration::Modern => NfsRule {
                v3_enabled: Some(true),
                v4_1_enabled: Some(true),
                rules: Some(String::new()),
                ..Default::default()
            },
            ApiGeneration::Legacy => NfsRule {
                enabled: Some(true),
                rules: Some(String::new()),
                ..Default::default()
            },
        }
    }

    /// NFS switches that stop serving a filesystem, rules left as they are
    pub fn disabled_nfs_rule(&self) -> NfsRule {
        match self {
            ApiGeneration::Modern => NfsRule {
                v3_enabled: Some(false),
                v4_1_enabled: Some(false),
                ..Default::default()
            },
            ApiGeneration::Legacy => NfsRule {
                enabled: Some(false),
                ..Default::default()
            },
        }
    }
}

impl std::fmt::Display for ApiGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiGeneration::Legacy => write!(f, "legacy"),
            ApiGeneration::Modern => write!(f, "modern"),
        }
    }
}
