//! Orchestrator-side records
//!
//! These are handed to the driver by the share orchestrator and are never
//! persisted or mutated here.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Share / Snapshot
// =============================================================================

/// Share record supplied by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Orchestrator share id
    pub id: String,
    /// Requested size in GiB
    pub size: u64,
    /// Share protocol as the orchestrator spells it (`NFS`, `CIFS`, ...)
    pub share_proto: String,
    /// Share instance id
    #[serde(default)]
    pub share_instance_id: String,
}

impl Share {
    /// Parse the share protocol
    pub fn protocol(&self) -> Result<ShareProtocol> {
        self.share_proto.parse()
    }
}

/// Snapshot record supplied by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Orchestrator snapshot id, used as the array snapshot suffix
    pub id: String,
    /// Instance id of the share the snapshot is taken from
    pub share_instance_id: String,
}

/// Protocols a share can be exported with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShareProtocol {
    Nfs,
    Cifs,
}

impl std::fmt::Display for ShareProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShareProtocol::Nfs => write!(f, "NFS"),
            ShareProtocol::Cifs => write!(f, "CIFS"),
        }
    }
}

impl std::str::FromStr for ShareProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NFS" => Ok(ShareProtocol::Nfs),
            "CIFS" => Ok(ShareProtocol::Cifs),
            other => Err(Error::UnsupportedProtocol(other.to_string())),
        }
    }
}

// =============================================================================
// Access Rules
// =============================================================================

/// Access type honoured by the driver
pub const ACCESS_TYPE_IP: &str = "ip";

/// Read-write access level
pub const ACCESS_LEVEL_RW: &str = "rw";

/// Read-only access level
pub const ACCESS_LEVEL_RO: &str = "ro";

/// One access rule of a share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    /// `ip`, `user`, `cert`, ...
    pub access_type: String,
    /// Client identifier (address or CIDR for `ip` rules)
    pub access_to: String,
    /// `rw` or `ro`
    pub access_level: String,
}

impl AccessRule {
    /// Convenience constructor for an `ip` rule
    pub fn ip(access_to: impl Into<String>, access_level: impl Into<String>) -> Self {
        Self {
            access_type: ACCESS_TYPE_IP.to_string(),
            access_to: access_to.into(),
            access_level: access_level.into(),
        }
    }
}

/// Outcome of an access update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccessUpdate {
    /// The full rule-string was written to the filesystem
    Applied { rules: String },
    /// The filesystem is gone; nothing to update
    ShareMissing,
    /// Access rules cannot be applied for this protocol yet
    Unsupported { protocol: ShareProtocol },
}

// =============================================================================
// Export Locations
// =============================================================================

/// Export location descriptor handed back to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportLocation {
    pub path: String,
    pub is_admin_only: bool,
    pub metadata: BTreeMap<String, String>,
}

// =============================================================================
// Stats
// =============================================================================

/// Backend stats record reported on every stats refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareStats {
    pub share_backend_name: String,
    pub vendor_name: String,
    pub driver_version: String,
    pub storage_protocol: String,
    pub data_reduction: f64,
    pub total_capacity_gb: f64,
    pub free_capacity_gb: f64,
    pub provisioned_capacity_gb: f64,
    pub snapshot_support: bool,
    pub create_share_from_snapshot_support: bool,
    pub mount_snapshot_support: bool,
    pub revert_to_snapshot_support: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_protocol_parse() {
        assert_eq!("NFS".parse::<ShareProtocol>().unwrap(), ShareProtocol::Nfs);
        assert_eq!("CIFS".parse::<ShareProtocol>().unwrap(), ShareProtocol::Cifs);
        assert_matches!(
            "SMB".parse::<ShareProtocol>(),
            Err(Error::UnsupportedProtocol(p)) if p == "SMB"
        );
        assert_matches!("nfs".parse::<ShareProtocol>(), Err(Error::UnsupportedProtocol(_)));
    }

    #[test]
    fn test_access_update_serialization() {
        let json = serde_json::to_value(AccessUpdate::Unsupported {
            protocol: ShareProtocol::Cifs,
        })
        .unwrap();
        assert_eq!(json["outcome"], "unsupported");
        assert_eq!(json["protocol"], "CIFS");
    }
}
