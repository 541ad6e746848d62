//! Array-side resource records
//!
//! These mirror the JSON objects of the FlashBlade REST API. Every attribute
//! is optional so the same type serves as a full resource description and as
//! a partial attribute patch for update calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Faults
// =============================================================================

/// Fault raised by the array API or its transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", display_fault(.status, .message))]
pub struct ApiFault {
    /// HTTP status of the failed call, when there was a response at all
    pub status: Option<u16>,
    /// Message reported by the array or the transport
    pub message: String,
}

fn display_fault(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("({}) {}", code, message),
        None => message.to_string(),
    }
}

impl ApiFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

// =============================================================================
// Protocol Rules
// =============================================================================

/// NFS export settings of a filesystem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NfsRule {
    /// Legacy single switch, used by arrays older than API 1.6
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v3_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v4_1_enabled: Option<bool>,
    /// Export rule-string, e.g. `10.0.0.1(rw,no_root_squash) `
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
}

impl NfsRule {
    /// Rule that only replaces the export rule-string
    pub fn rules(rules: impl Into<String>) -> Self {
        Self {
            rules: Some(rules.into()),
            ..Default::default()
        }
    }

    /// Whether any NFS version is served
    pub fn is_enabled(&self) -> bool {
        self.enabled == Some(true) || self.v3_enabled == Some(true) || self.v4_1_enabled == Some(true)
    }
}

/// Generic on/off protocol switch (SMB, HTTP)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ProtocolRule {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
        }
    }
}

// =============================================================================
// File Systems
// =============================================================================

/// A FlashBlade filesystem, or a patch of its attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSystem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Provisioned size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_limit_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_remove_directory_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_directory_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nfs: Option<NfsRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smb: Option<ProtocolRule>,
    /// Soft-delete flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destroyed: Option<bool>,
    /// Creation time in milliseconds since the epoch, set by the array
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
}

impl FileSystem {
    pub fn is_destroyed(&self) -> bool {
        self.destroyed == Some(true)
    }

    /// Apply the attributes set in `patch` on top of this filesystem
    pub fn apply(&mut self, patch: &FileSystem) {
        if let Some(provisioned) = patch.provisioned {
            self.provisioned = Some(provisioned);
        }
        if let Some(flag) = patch.hard_limit_enabled {
            self.hard_limit_enabled = Some(flag);
        }
        if let Some(flag) = patch.fast_remove_directory_enabled {
            self.fast_remove_directory_enabled = Some(flag);
        }
        if let Some(flag) = patch.snapshot_directory_enabled {
            self.snapshot_directory_enabled = Some(flag);
        }
        if let Some(nfs) = &patch.nfs {
            let current = self.nfs.get_or_insert_with(NfsRule::default);
            if nfs.enabled.is_some() {
                current.enabled = nfs.enabled;
            }
            if nfs.v3_enabled.is_some() {
                current.v3_enabled = nfs.v3_enabled;
            }
            if nfs.v4_1_enabled.is_some() {
                current.v4_1_enabled = nfs.v4_1_enabled;
            }
            if nfs.rules.is_some() {
                current.rules = nfs.rules.clone();
            }
        }
        if let Some(smb) = &patch.smb {
            self.smb = Some(smb.clone());
        }
        if let Some(destroyed) = patch.destroyed {
            self.destroyed = Some(destroyed);
        }
    }
}

/// Export of a filesystem as reported by the array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemExport {
    /// Filesystem the export belongs to
    pub name: String,
    /// Path relative to the data address, without leading slash
    pub export_path: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

// =============================================================================
// Snapshots
// =============================================================================

/// A FlashBlade filesystem snapshot, or a patch of its attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSystemSnapshot {
    /// Fully qualified `<source>,<suffix>` name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destroyed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
}

impl FileSystemSnapshot {
    pub fn is_destroyed(&self) -> bool {
        self.destroyed == Some(true)
    }
}

/// Suffix requested for a new snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSuffix {
    pub suffix: String,
}

impl SnapshotSuffix {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

// =============================================================================
// Space / Versions / Listings
// =============================================================================

/// Space accounting of the array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Space {
    /// Physical bytes in use
    pub total_physical: u64,
    /// Unique (provisioned) bytes
    pub unique: u64,
    /// Data reduction ratio
    pub data_reduction: f64,
}

/// One array-wide space record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArraySpace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Usable physical capacity in bytes
    pub capacity: u64,
    pub space: Space,
}

/// API versions advertised by the array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersions {
    #[serde(default)]
    pub versions: Vec<String>,
}

impl ApiVersions {
    pub fn supports(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }
}

/// Paged listing envelope used by every list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> ItemList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Take the first item, if any
    pub fn into_first(self) -> Option<T> {
        self.items.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = FileSystem {
            provisioned: Some(1024),
            ..Default::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"provisioned":1024}"#);
    }

    #[test]
    fn test_apply_patch() {
        let mut fs = FileSystem {
            name: Some("share-a-manila".into()),
            provisioned: Some(1),
            nfs: Some(NfsRule {
                v3_enabled: Some(true),
                v4_1_enabled: Some(true),
                rules: Some(String::new()),
                ..Default::default()
            }),
            ..Default::default()
        };

        fs.apply(&FileSystem {
            nfs: Some(NfsRule::rules("10.0.0.1(rw,no_root_squash) ")),
            ..Default::default()
        });

        let nfs = fs.nfs.as_ref().unwrap();
        assert_eq!(nfs.rules.as_deref(), Some("10.0.0.1(rw,no_root_squash) "));
        assert_eq!(nfs.v3_enabled, Some(true));
        assert_eq!(fs.provisioned, Some(1));
        assert!(!fs.is_destroyed());
    }

    #[test]
    fn test_fault_display() {
        assert_eq!(ApiFault::with_status(400, "bad name").to_string(), "(400) bad name");
        assert_eq!(ApiFault::new("connection reset").to_string(), "connection reset");
    }

    #[test]
    fn test_item_list_deserialize() {
        let list: ItemList<ArraySpace> = serde_json::from_str(
            r#"{"items":[{"capacity":1000,"space":{"total_physical":400,"unique":250,"data_reduction":1.5}}]}"#,
        )
        .unwrap();
        let first = list.into_first().unwrap();
        assert_eq!(first.capacity, 1000);
        assert_eq!(first.space.unique, 250);
    }
}
