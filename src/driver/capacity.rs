//! Capacity reporting
//!
//! Converts the array's space accounting into the stats record the
//! orchestrator schedules against. Only the first array-space record is
//! considered: one driver instance talks to exactly one array.

use crate::domain::array::ArraySpace;
use crate::domain::share::ShareStats;

/// Bytes per GiB
pub const GIB: u64 = 1 << 30;

/// Vendor reported in stats
pub const VENDOR_NAME: &str = "PURE STORAGE";

/// Driver version reported in stats
pub const DRIVER_VERSION: &str = "10.0";

/// Protocols reported in stats
pub const STORAGE_PROTOCOL: &str = "NFS_CIFS";

/// Array capacity in bytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityReport {
    pub free_bytes: u64,
    pub total_bytes: u64,
    pub provisioned_bytes: u64,
    pub data_reduction: f64,
}

impl CapacityReport {
    /// Derive capacity from an array space record
    pub fn from_space(space: &ArraySpace) -> Self {
        Self {
            free_bytes: space.capacity.saturating_sub(space.space.total_physical),
            total_bytes: space.capacity,
            provisioned_bytes: space.space.unique,
            data_reduction: space.space.data_reduction,
        }
    }

    /// Build the stats record, capacities in GiB
    pub fn to_stats(&self, backend_name: &str) -> ShareStats {
        ShareStats {
            share_backend_name: backend_name.to_string(),
            vendor_name: VENDOR_NAME.to_string(),
            driver_version: DRIVER_VERSION.to_string(),
            storage_protocol: STORAGE_PROTOCOL.to_string(),
            data_reduction: self.data_reduction,
            total_capacity_gb: to_gib(self.total_bytes),
            free_capacity_gb: to_gib(self.free_bytes),
            provisioned_capacity_gb: to_gib(self.provisioned_bytes),
            snapshot_support: true,
            create_share_from_snapshot_support: false,
            mount_snapshot_support: false,
            revert_to_snapshot_support: false,
        }
    }
}

fn to_gib(bytes: u64) -> f64 {
    bytes as f64 / GIB as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::array::Space;

    fn space(capacity: u64, total_physical: u64, unique: u64) -> ArraySpace {
        ArraySpace {
            name: None,
            capacity,
            space: Space {
                total_physical,
                unique,
                data_reduction: 2.5,
            },
        }
    }

    #[test]
    fn test_capacity_in_bytes() {
        let report = CapacityReport::from_space(&space(1000, 400, 250));
        assert_eq!(report.free_bytes, 600);
        assert_eq!(report.total_bytes, 1000);
        assert_eq!(report.provisioned_bytes, 250);
    }

    #[test]
    fn test_stats_in_gib() {
        let stats = CapacityReport::from_space(&space(10 * GIB, 4 * GIB, GIB / 2)).to_stats("fb1");
        assert_eq!(stats.total_capacity_gb, 10.0);
        assert_eq!(stats.free_capacity_gb, 6.0);
        assert_eq!(stats.provisioned_capacity_gb, 0.5);
        assert_eq!(stats.data_reduction, 2.5);
        assert_eq!(stats.storage_protocol, "NFS_CIFS");
        assert!(stats.snapshot_support);
        assert!(!stats.create_share_from_snapshot_support);
        assert!(!stats.mount_snapshot_support);
        assert!(!stats.revert_to_snapshot_support);
    }

    #[test]
    fn test_overcommitted_array_reports_no_free_space() {
        let report = CapacityReport::from_space(&space(100, 150, 10));
        assert_eq!(report.free_bytes, 0);
    }
}
