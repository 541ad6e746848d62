//! Resource lookup
//!
//! The single point through which lifecycle operations check that a
//! filesystem or snapshot exists. Lookups never mutate the array.

use crate::domain::array::{FileSystem, FileSystemSnapshot};
use crate::domain::ports::ArrayClientRef;
use crate::driver::shim::ArrayCall;
use crate::error::{Error, Result};
use tracing::debug;

/// Read-only lookups against the array
#[derive(Clone)]
pub struct ResourceLocator {
    array: ArrayClientRef,
}

impl ResourceLocator {
    pub fn new(array: ArrayClientRef) -> Self {
        Self { array }
    }

    /// Find a filesystem by exact name
    pub async fn filesystem(&self, name: &str) -> Result<FileSystem> {
        let names = vec![name.to_string()];
        let found = self
            .array
            .list_file_systems(&names)
            .await
            .translate("list_file_systems")?
            .into_first();

        match found {
            Some(fs) => Ok(fs),
            None => {
                debug!("Filesystem not found on FlashBlade by name: {}", name);
                Err(Error::filesystem_not_found(name))
            }
        }
    }

    /// Find a snapshot with a `source='..' and suffix='..'` filter
    pub async fn snapshot(&self, filter: &str) -> Result<FileSystemSnapshot> {
        self.array
            .list_file_system_snapshots(filter)
            .await
            .translate("list_file_system_snapshots")?
            .into_first()
            .ok_or_else(|| {
                debug!("Snapshot not found on the FlashBlade by its name: {}", filter);
                Error::snapshot_not_found(filter)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::MemoryArray;
    use crate::domain::array::{ApiFault, SnapshotSuffix};
    use crate::domain::ports::ArrayClient;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    async fn seeded() -> (ResourceLocator, Arc<MemoryArray>) {
        let array = Arc::new(MemoryArray::new());
        array
            .create_file_systems(&FileSystem {
                name: Some("share-a-manila".into()),
                provisioned: Some(1 << 30),
                ..Default::default()
            })
            .await
            .unwrap();
        array
            .create_file_system_snapshots(&["share-a-manila".to_string()], &SnapshotSuffix::new("s1"))
            .await
            .unwrap();
        array.clear_calls();
        (ResourceLocator::new(array.clone()), array)
    }

    #[tokio::test]
    async fn test_locate_filesystem() {
        let (locator, array) = seeded().await;

        let fs = locator.filesystem("share-a-manila").await.unwrap();
        assert_eq!(fs.provisioned, Some(1 << 30));

        assert_matches!(
            locator.filesystem("share-b-manila").await,
            Err(Error::ResourceNotFound { kind, name }) if kind == "FileSystem" && name == "share-b-manila"
        );
        assert!(array.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_locate_snapshot() {
        let (locator, _array) = seeded().await;

        let snap = locator
            .snapshot("source='share-a-manila' and suffix='s1'")
            .await
            .unwrap();
        assert_eq!(snap.name.as_deref(), Some("share-a-manila,s1"));

        assert_matches!(
            locator.snapshot("source='share-a-manila' and suffix='s9'").await,
            Err(Error::ResourceNotFound { .. })
        );
    }

    #[tokio::test]
    async fn test_locate_fault_is_not_a_miss() {
        let (locator, array) = seeded().await;
        array.inject_fault("list_file_systems", ApiFault::with_status(503, "busy"));
        assert_matches!(
            locator.filesystem("share-a-manila").await,
            Err(Error::BackendFault(_))
        );
    }
}
