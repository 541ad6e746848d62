//! Share Lifecycle - The driver proper
//!
//! Maps the orchestrator's share, snapshot and access-rule lifecycle onto
//! FlashBlade filesystems and snapshots:
//! - create: provision a filesystem with one protocol enabled
//! - resize / access update: patch the filesystem in place
//! - delete: soft-delete (`destroyed`), then eradicate when configured
//!
//! Deletes, resizes and access updates of a resource that is already gone
//! succeed without touching the array.

use crate::config::DriverSettings;
use crate::domain::array::{FileSystem, FileSystemSnapshot, NfsRule, ProtocolRule, SnapshotSuffix};
use crate::domain::ports::{ArrayClientRef, ShareDriver};
use crate::domain::share::{
    AccessRule, AccessUpdate, ExportLocation, Share, ShareProtocol, ShareStats, Snapshot,
};
use crate::driver::access::render_nfs_rules;
use crate::driver::capability::ApiGeneration;
use crate::driver::capacity::{CapacityReport, GIB};
use crate::driver::locator::ResourceLocator;
use crate::driver::naming;
use crate::driver::shim::ArrayCall;
use crate::error::{Error, OptionalResource, Result};
use crate::metrics::DriverMetrics;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, error, info, warn};

// =============================================================================
// Driver
// =============================================================================

/// Share driver bound to one array session
pub struct FlashBladeShareDriver {
    settings: DriverSettings,
    array: ArrayClientRef,
    locator: ResourceLocator,
    generation: ApiGeneration,
    metrics: DriverMetrics,
    /// Stats of the last refresh
    stats: RwLock<Option<ShareStats>>,
}

impl std::fmt::Debug for FlashBladeShareDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashBladeShareDriver")
            .field("settings", &self.settings)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl FlashBladeShareDriver {
    /// Log into the array and probe its capabilities.
    ///
    /// The session established here is reused for the driver's lifetime.
    pub async fn setup(settings: DriverSettings, array: ArrayClientRef) -> Result<Self> {
        array.login(&settings.api_token).await.map_err(|fault| {
            error!("Exception when logging into the array: {}", fault);
            Error::LoginFailed(fault.to_string())
        })?;

        let versions = array
            .list_api_versions()
            .await
            .translate("list_api_versions")?;
        let generation = ApiGeneration::detect(&versions);

        info!(
            "Connected to FlashBlade {} (API generation: {}, eradicate: {})",
            settings.management_address, generation, settings.eradicate
        );

        let driver = Self {
            locator: ResourceLocator::new(array.clone()),
            metrics: DriverMetrics::new()?,
            stats: RwLock::new(None),
            settings,
            array,
            generation,
        };

        debug!("setup complete");
        Ok(driver)
    }

    /// API generation detected at setup
    pub fn generation(&self) -> ApiGeneration {
        self.generation
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &DriverMetrics {
        &self.metrics
    }

    /// `<data address>:/<path>`
    pub fn nfs_export_path(&self, export_path: &str) -> String {
        format!("{}:/{}", self.settings.data_address, export_path)
    }

    /// `\\<data address>\<path>`
    pub fn cifs_export_path(&self, export_path: &str) -> String {
        format!("\\\\{}\\{}", self.settings.data_address, export_path)
    }

    /// Add an export without permissions to a filesystem
    pub async fn create_export(&self, file_system: &FileSystem) -> Result<ExportLocation> {
        let name = file_system
            .name
            .as_deref()
            .ok_or_else(|| Error::InvalidShare("filesystem has no name".into()))?;

        let export = self
            .array
            .add_file_system_export(name, &[])
            .await
            .translate("add_file_system_export")?;

        Ok(ExportLocation {
            path: self.nfs_export_path(&export.export_path),
            is_admin_only: false,
            metadata: BTreeMap::new(),
        })
    }

    /// Stats of the last refresh, refreshing when asked to or when there
    /// are none yet
    pub async fn share_stats(&self, refresh: bool) -> Result<ShareStats> {
        if !refresh {
            let cached = self.stats.read().clone();
            if let Some(stats) = cached {
                return Ok(stats);
            }
        }
        self.update_share_stats().await
    }

    async fn refresh_stats(&self) -> Result<ShareStats> {
        let space = self
            .array
            .list_arrays_space()
            .await
            .translate("list_arrays_space")?
            .into_first()
            .ok_or_else(|| Error::BackendFault("array reported no space records".into()))?;

        let stats = CapacityReport::from_space(&space).to_stats(&self.settings.backend_name);
        self.metrics.observe_stats(&stats);
        *self.stats.write() = Some(stats.clone());
        Ok(stats)
    }

    async fn observe<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let result = call.await;
        self.metrics.record(operation, &result);
        result
    }

    // =========================================================================
    // Shares
    // =========================================================================

    async fn provision_share(&self, share: &Share) -> Result<String> {
        let protocol = share.protocol().map_err(|e| {
            error!("{}", e);
            e
        })?;

        let name = naming::share_name(share);
        let size = share.size.checked_mul(GIB).ok_or_else(|| {
            Error::InvalidShare(format!("share size {} GiB is out of range", share.size))
        })?;

        let mut file_system = FileSystem {
            name: Some(name.clone()),
            provisioned: Some(size),
            hard_limit_enabled: Some(true),
            fast_remove_directory_enabled: Some(true),
            snapshot_directory_enabled: Some(true),
            ..Default::default()
        };

        let location = match protocol {
            ShareProtocol::Nfs => {
                file_system.nfs = Some(self.generation.initial_nfs_rule());
                self.nfs_export_path(&name)
            }
            ShareProtocol::Cifs => {
                file_system.smb = Some(ProtocolRule::enabled(true));
                self.cifs_export_path(&name)
            }
        };

        info!("Creating {} share {} ({} bytes)", protocol, name, size);
        self.array
            .create_file_systems(&file_system)
            .await
            .translate("create_file_systems")?;

        Ok(location)
    }

    async fn destroy_share(&self, share: &Share) -> Result<()> {
        let name = naming::share_name(share);
        if self.locator.filesystem(&name).await.optional()?.is_none() {
            warn!("share {} not found on FlashBlade, skip delete", name);
            return Ok(());
        }

        info!("Destroying share {}", name);
        let attributes = FileSystem {
            nfs: Some(self.generation.disabled_nfs_rule()),
            smb: Some(ProtocolRule::enabled(false)),
            destroyed: Some(true),
            ..Default::default()
        };
        self.array
            .update_file_systems(&name, &attributes)
            .await
            .translate("update_file_systems")?;

        if self.settings.eradicate {
            info!("Eradicating share {}", name);
            self.array
                .delete_file_systems(&name)
                .await
                .translate("delete_file_systems")?;
        }
        Ok(())
    }

    /// Set the provisioned size; used for both grow and shrink. Guarding
    /// against shrinking below used space is left to the orchestrator.
    async fn resize_share(&self, share: &Share, new_size: u64) -> Result<()> {
        let name = naming::share_name(share);
        if self.locator.filesystem(&name).await.optional()?.is_none() {
            warn!("share {} not found on FlashBlade, skip extend", name);
            return Ok(());
        }

        let provisioned = new_size.checked_mul(GIB).ok_or_else(|| {
            Error::InvalidShare(format!("share size {} GiB is out of range", new_size))
        })?;

        info!("Resizing share {} to {} GiB", name, new_size);
        let attributes = FileSystem {
            provisioned: Some(provisioned),
            ..Default::default()
        };
        self.array
            .update_file_systems(&name, &attributes)
            .await
            .translate("update_file_systems")
    }

    async fn update_nfs_access(
        &self,
        share: &Share,
        access_rules: &[AccessRule],
    ) -> Result<AccessUpdate> {
        let name = naming::share_name(share);
        if self.locator.filesystem(&name).await.optional()?.is_none() {
            warn!("share {} not found on FlashBlade, skip update nfs access", name);
            return Ok(AccessUpdate::ShareMissing);
        }

        let rules = render_nfs_rules(access_rules)?;
        debug!("rules are {:?}, update nfs access of {}", rules, name);

        let attributes = FileSystem {
            nfs: Some(NfsRule::rules(rules.clone())),
            ..Default::default()
        };
        self.array
            .update_file_systems(&name, &attributes)
            .await
            .translate("update_file_systems")?;

        Ok(AccessUpdate::Applied { rules })
    }

    async fn apply_access(
        &self,
        share: &Share,
        access_rules: &[AccessRule],
    ) -> Result<AccessUpdate> {
        match share.protocol()? {
            ShareProtocol::Nfs => self.update_nfs_access(share, access_rules).await,
            ShareProtocol::Cifs => {
                warn!(
                    "access rules for CIFS share {} are not supported yet",
                    naming::share_name(share)
                );
                Ok(AccessUpdate::Unsupported {
                    protocol: ShareProtocol::Cifs,
                })
            }
        }
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    async fn take_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let source = naming::snapshot_source_name(snapshot);
        match self.locator.filesystem(&source).await.optional()? {
            Some(fs) if !fs.is_destroyed() => {}
            _ => {
                let message = format!("share {} not found on FlashBlade, skip create", source);
                error!("{}", message);
                return Err(Error::InvalidShare(message));
            }
        }

        info!("Creating snapshot {}", naming::snapshot_name(snapshot));
        self.array
            .create_file_system_snapshots(&[source], &SnapshotSuffix::new(snapshot.id.clone()))
            .await
            .translate("create_file_system_snapshots")?;
        Ok(())
    }

    async fn destroy_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let filter = naming::snapshot_filter(snapshot);
        let name = naming::snapshot_name(snapshot);
        if self.locator.snapshot(&filter).await.optional()?.is_none() {
            warn!("snapshot {} not found on FlashBlade, skip delete", name);
            return Ok(());
        }

        info!("Destroying snapshot {}", name);
        let attributes = FileSystemSnapshot {
            destroyed: Some(true),
            ..Default::default()
        };
        self.array
            .update_file_system_snapshots(&name, &attributes)
            .await
            .translate("update_file_system_snapshots")?;

        if self.settings.eradicate {
            info!("Eradicating snapshot {}", name);
            self.array
                .delete_file_system_snapshots(&name)
                .await
                .translate("delete_file_system_snapshots")?;
        }
        Ok(())
    }
}

#[async_trait]
impl ShareDriver for FlashBladeShareDriver {
    async fn create_share(&self, share: &Share) -> Result<String> {
        self.observe("create_share", self.provision_share(share)).await
    }

    async fn delete_share(&self, share: &Share) -> Result<()> {
        self.observe("delete_share", self.destroy_share(share)).await
    }

    async fn create_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.observe("create_snapshot", self.take_snapshot(snapshot)).await
    }

    async fn delete_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.observe("delete_snapshot", self.destroy_snapshot(snapshot)).await
    }

    /// Every share on a FlashBlade is exported from creation on, so there
    /// is nothing to check.
    async fn ensure_share(&self, share: &Share) -> Result<()> {
        debug!("ensure share {}: nothing to do", naming::share_name(share));
        Ok(())
    }

    async fn update_access(
        &self,
        share: &Share,
        access_rules: &[AccessRule],
        _add_rules: &[AccessRule],
        _delete_rules: &[AccessRule],
    ) -> Result<AccessUpdate> {
        self.observe("update_access", self.apply_access(share, access_rules))
            .await
    }

    async fn extend_share(&self, share: &Share, new_size: u64) -> Result<()> {
        self.observe("extend_share", self.resize_share(share, new_size)).await
    }

    async fn shrink_share(&self, share: &Share, new_size: u64) -> Result<()> {
        self.observe("shrink_share", self.resize_share(share, new_size)).await
    }

    fn network_allocations_number(&self) -> u32 {
        0
    }

    async fn update_share_stats(&self) -> Result<ShareStats> {
        self.observe("update_share_stats", self.refresh_stats()).await
    }

    fn driver_name(&self) -> &str {
        &self.settings.backend_name
    }
}
