//! Array-side resource names
//!
//! Names are pure functions of orchestrator ids; no id mapping is stored.

use crate::domain::share::{Share, Snapshot};

/// Filesystem name of a share
pub fn share_name(share: &Share) -> String {
    format!("share-{}-manila", share.id)
}

/// Filesystem name a snapshot is taken from
pub fn snapshot_source_name(snapshot: &Snapshot) -> String {
    format!("share-{}-manila", snapshot.share_instance_id)
}

/// Fully qualified `<source>,<suffix>` snapshot name
pub fn snapshot_name(snapshot: &Snapshot) -> String {
    format!("{},{}", snapshot_source_name(snapshot), snapshot.id)
}

/// Filter expression selecting one snapshot by source and suffix
pub fn snapshot_filter(snapshot: &Snapshot) -> String {
    format!(
        "source='{}' and suffix='{}'",
        snapshot_source_name(snapshot),
        snapshot.id
    )
}
