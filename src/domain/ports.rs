//! Domain Ports - Core trait definitions for the share driver
//!
//! [`ArrayClient`] is the narrow capability interface the driver needs from
//! the array session; [`ShareDriver`] is the surface the share orchestrator
//! calls. Adapters on either side implement these traits.

use crate::domain::array::{
    ApiFault, ApiVersions, ArraySpace, FileSystem, FileSystemExport, FileSystemSnapshot,
    ItemList, SnapshotSuffix,
};
use crate::domain::share::{AccessRule, AccessUpdate, Share, ShareStats, Snapshot};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Result of a raw array call, before fault translation
pub type ApiResult<T> = std::result::Result<T, ApiFault>;

// =============================================================================
// Array Client Port
// =============================================================================

/// Port for the authenticated array session
#[async_trait]
pub trait ArrayClient: Send + Sync {
    /// Authenticate with an API token
    async fn login(&self, api_token: &str) -> ApiResult<()>;

    /// API versions the array understands
    async fn list_api_versions(&self) -> ApiResult<ApiVersions>;

    /// Array-wide space accounting
    async fn list_arrays_space(&self) -> ApiResult<ItemList<ArraySpace>>;

    /// Filesystems matching the given names exactly
    async fn list_file_systems(&self, names: &[String]) -> ApiResult<ItemList<FileSystem>>;

    /// Create a filesystem
    async fn create_file_systems(&self, file_system: &FileSystem) -> ApiResult<ItemList<FileSystem>>;

    /// Patch attributes of a filesystem
    async fn update_file_systems(&self, name: &str, attributes: &FileSystem) -> ApiResult<()>;

    /// Eradicate a destroyed filesystem
    async fn delete_file_systems(&self, name: &str) -> ApiResult<()>;

    /// Add an export to a filesystem
    async fn add_file_system_export(
        &self,
        name: &str,
        permissions: &[String],
    ) -> ApiResult<FileSystemExport>;

    /// Snapshots matching a filter expression
    async fn list_file_system_snapshots(
        &self,
        filter: &str,
    ) -> ApiResult<ItemList<FileSystemSnapshot>>;

    /// Snapshot the given source filesystems
    async fn create_file_system_snapshots(
        &self,
        sources: &[String],
        suffix: &SnapshotSuffix,
    ) -> ApiResult<ItemList<FileSystemSnapshot>>;

    /// Patch attributes of a snapshot
    async fn update_file_system_snapshots(
        &self,
        name: &str,
        attributes: &FileSystemSnapshot,
    ) -> ApiResult<()>;

    /// Eradicate a destroyed snapshot
    async fn delete_file_system_snapshots(&self, name: &str) -> ApiResult<()>;
}

// =============================================================================
// Share Driver Port
// =============================================================================

/// Port the share orchestrator drives
#[async_trait]
pub trait ShareDriver: Send + Sync {
    /// Create a share and return its export location
    async fn create_share(&self, share: &Share) -> Result<String>;

    /// Delete a share; absent shares are a no-op
    async fn delete_share(&self, share: &Share) -> Result<()>;

    /// Snapshot a share
    async fn create_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    /// Delete a snapshot; absent snapshots are a no-op
    async fn delete_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    /// Verify a share is exported
    async fn ensure_share(&self, share: &Share) -> Result<()>;

    /// Replace the access rules of a share with `access_rules`.
    ///
    /// `add_rules` and `delete_rules` are accepted for signature parity with
    /// the orchestrator and ignored.
    async fn update_access(
        &self,
        share: &Share,
        access_rules: &[AccessRule],
        add_rules: &[AccessRule],
        delete_rules: &[AccessRule],
    ) -> Result<AccessUpdate>;

    /// Grow a share to `new_size` GiB
    async fn extend_share(&self, share: &Share, new_size: u64) -> Result<()>;

    /// Shrink a share to `new_size` GiB
    async fn shrink_share(&self, share: &Share, new_size: u64) -> Result<()>;

    /// Number of network allocations a share server needs
    fn network_allocations_number(&self) -> u32;

    /// Refresh and return backend stats
    async fn update_share_stats(&self) -> Result<ShareStats>;

    /// Get driver name
    fn driver_name(&self) -> &str;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ArrayClientRef = Arc<dyn ArrayClient>;
