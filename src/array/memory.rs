//! In-memory simulated array
//!
//! Keeps filesystems and snapshots in process memory and enforces the same
//! rules the real array does: names are unique, only destroyed resources can
//! be eradicated, snapshots need a live source. Every call is recorded and a
//! one-shot fault can be injected per operation.

use crate::domain::array::{
    ApiFault, ApiVersions, ArraySpace, FileSystem, FileSystemExport, FileSystemSnapshot,
    ItemList, SnapshotSuffix, Space,
};
use crate::domain::ports::{ApiResult, ArrayClient};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Default simulated capacity: 100 TiB
const DEFAULT_CAPACITY_BYTES: u64 = 100 << 40;

// =============================================================================
// Call Log
// =============================================================================

/// One recorded array call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayCallRecord {
    /// Client method name
    pub operation: &'static str,
    /// Resource name, filter or source list the call targeted
    pub target: String,
}

impl ArrayCallRecord {
    /// Whether the call changes array state
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self.operation,
            "login" | "list_api_versions" | "list_arrays_space" | "list_file_systems"
                | "list_file_system_snapshots"
        )
    }
}

// =============================================================================
// Array State
// =============================================================================

#[derive(Debug, Default)]
struct ArrayState {
    file_systems: BTreeMap<String, FileSystem>,
    snapshots: BTreeMap<String, FileSystemSnapshot>,
    exports: BTreeMap<String, Vec<FileSystemExport>>,
}

/// Simulated array
pub struct MemoryArray {
    versions: Vec<String>,
    capacity: u64,
    api_token: Option<String>,
    state: RwLock<ArrayState>,
    calls: Mutex<Vec<ArrayCallRecord>>,
    faults: Mutex<BTreeMap<&'static str, ApiFault>>,
}

impl Default for MemoryArray {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryArray {
    /// Create an empty array speaking API 1.0 through 1.8
    pub fn new() -> Self {
        Self {
            versions: ["1.0", "1.1", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7", "1.8"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
            capacity: DEFAULT_CAPACITY_BYTES,
            api_token: None,
            state: RwLock::new(ArrayState::default()),
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(BTreeMap::new()),
        }
    }

    /// Advertise a different set of API versions
    pub fn with_api_versions(mut self, versions: &[&str]) -> Self {
        self.versions = versions.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Set the usable physical capacity
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Only accept this API token on login
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Make the next call of `operation` fail with `fault`
    pub fn inject_fault(&self, operation: &'static str, fault: ApiFault) {
        self.faults.lock().insert(operation, fault);
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<ArrayCallRecord> {
        self.calls.lock().clone()
    }

    /// Calls that changed, or tried to change, array state
    pub fn mutations(&self) -> Vec<ArrayCallRecord> {
        self.calls.lock().iter().filter(|c| c.is_mutation()).cloned().collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Current state of a filesystem
    pub async fn file_system(&self, name: &str) -> Option<FileSystem> {
        self.state.read().await.file_systems.get(name).cloned()
    }

    /// Current state of a snapshot by fully qualified name
    pub async fn snapshot(&self, name: &str) -> Option<FileSystemSnapshot> {
        self.state.read().await.snapshots.get(name).cloned()
    }

    /// Exports added to a filesystem
    pub async fn exports(&self, name: &str) -> Vec<FileSystemExport> {
        self.state
            .read()
            .await
            .exports
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, operation: &'static str, target: impl Into<String>) -> ApiResult<()> {
        let target = target.into();
        debug!(operation, target = %target, "Simulated array call");
        self.calls.lock().push(ArrayCallRecord { operation, target });
        match self.faults.lock().remove(operation) {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn missing(kind: &str, name: &str) -> ApiFault {
    ApiFault::with_status(400, format!("{} '{}' does not exist", kind, name))
}

/// Parse `key='value' and key='value'` filter expressions
fn parse_filter(filter: &str) -> ApiResult<BTreeMap<String, String>> {
    let mut terms = BTreeMap::new();
    for term in filter.split(" and ") {
        let (key, value) = term
            .trim()
            .split_once('=')
            .ok_or_else(|| ApiFault::with_status(400, format!("invalid filter: {}", filter)))?;
        let value = value
            .trim()
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
            .ok_or_else(|| ApiFault::with_status(400, format!("invalid filter: {}", filter)))?;
        terms.insert(key.trim().to_string(), value.to_string());
    }
    Ok(terms)
}

// =============================================================================
// ArrayClient
// =============================================================================

#[async_trait]
impl ArrayClient for MemoryArray {
    async fn login(&self, api_token: &str) -> ApiResult<()> {
        self.record("login", "")?;
        match &self.api_token {
            Some(expected) if expected != api_token => {
                Err(ApiFault::with_status(401, "invalid API token"))
            }
            _ => Ok(()),
        }
    }

    async fn list_api_versions(&self) -> ApiResult<ApiVersions> {
        self.record("list_api_versions", "")?;
        Ok(ApiVersions {
            versions: self.versions.clone(),
        })
    }

    async fn list_arrays_space(&self) -> ApiResult<ItemList<ArraySpace>> {
        self.record("list_arrays_space", "")?;
        let state = self.state.read().await;
        let unique: u64 = state
            .file_systems
            .values()
            .filter(|fs| !fs.is_destroyed())
            .filter_map(|fs| fs.provisioned)
            .sum();

        Ok(ItemList::new(vec![ArraySpace {
            name: Some("simulated".to_string()),
            capacity: self.capacity,
            space: Space {
                total_physical: unique,
                unique,
                data_reduction: 1.0,
            },
        }]))
    }

    async fn list_file_systems(&self, names: &[String]) -> ApiResult<ItemList<FileSystem>> {
        self.record("list_file_systems", names.join(","))?;
        let state = self.state.read().await;
        Ok(ItemList::new(
            names
                .iter()
                .filter_map(|name| state.file_systems.get(name).cloned())
                .collect(),
        ))
    }

    async fn create_file_systems(&self, file_system: &FileSystem) -> ApiResult<ItemList<FileSystem>> {
        let name = file_system
            .name
            .clone()
            .ok_or_else(|| ApiFault::with_status(400, "file system name is required"))?;
        self.record("create_file_systems", name.clone())?;

        let mut state = self.state.write().await;
        if state.file_systems.contains_key(&name) {
            return Err(ApiFault::with_status(
                400,
                format!("file system '{}' already exists", name),
            ));
        }

        let mut created = file_system.clone();
        created.destroyed = Some(false);
        created.created = Some(now_millis());
        state.file_systems.insert(name, created.clone());

        Ok(ItemList::new(vec![created]))
    }

    async fn update_file_systems(&self, name: &str, attributes: &FileSystem) -> ApiResult<()> {
        self.record("update_file_systems", name)?;
        let mut state = self.state.write().await;
        let fs = state
            .file_systems
            .get_mut(name)
            .ok_or_else(|| missing("file system", name))?;
        fs.apply(attributes);
        Ok(())
    }

    async fn delete_file_systems(&self, name: &str) -> ApiResult<()> {
        self.record("delete_file_systems", name)?;
        let mut state = self.state.write().await;
        let fs = state
            .file_systems
            .get(name)
            .ok_or_else(|| missing("file system", name))?;
        if !fs.is_destroyed() {
            return Err(ApiFault::with_status(
                400,
                format!("file system '{}' must be destroyed before eradication", name),
            ));
        }
        state.file_systems.remove(name);
        state.exports.remove(name);
        Ok(())
    }

    async fn add_file_system_export(
        &self,
        name: &str,
        permissions: &[String],
    ) -> ApiResult<FileSystemExport> {
        self.record("add_file_system_export", name)?;
        let mut state = self.state.write().await;
        if !state.file_systems.contains_key(name) {
            return Err(missing("file system", name));
        }

        let export = FileSystemExport {
            name: name.to_string(),
            export_path: name.to_string(),
            permissions: permissions.to_vec(),
        };
        state
            .exports
            .entry(name.to_string())
            .or_default()
            .push(export.clone());
        Ok(export)
    }

    async fn list_file_system_snapshots(
        &self,
        filter: &str,
    ) -> ApiResult<ItemList<FileSystemSnapshot>> {
        self.record("list_file_system_snapshots", filter)?;
        let terms = parse_filter(filter)?;
        let state = self.state.read().await;

        let matches = |snap: &FileSystemSnapshot| {
            terms.iter().all(|(key, value)| {
                let field = match key.as_str() {
                    "name" => snap.name.as_deref(),
                    "source" => snap.source.as_deref(),
                    "suffix" => snap.suffix.as_deref(),
                    _ => None,
                };
                field == Some(value.as_str())
            })
        };

        Ok(ItemList::new(
            state.snapshots.values().filter(|s| matches(*s)).cloned().collect(),
        ))
    }

    async fn create_file_system_snapshots(
        &self,
        sources: &[String],
        suffix: &SnapshotSuffix,
    ) -> ApiResult<ItemList<FileSystemSnapshot>> {
        self.record("create_file_system_snapshots", sources.join(","))?;
        let mut state = self.state.write().await;

        let mut created = Vec::with_capacity(sources.len());
        for source in sources {
            match state.file_systems.get(source) {
                Some(fs) if !fs.is_destroyed() => {}
                _ => return Err(missing("file system", source)),
            }

            let name = format!("{},{}", source, suffix.suffix);
            if state.snapshots.contains_key(&name) {
                return Err(ApiFault::with_status(
                    400,
                    format!("snapshot '{}' already exists", name),
                ));
            }

            let snapshot = FileSystemSnapshot {
                name: Some(name.clone()),
                source: Some(source.clone()),
                suffix: Some(suffix.suffix.clone()),
                destroyed: Some(false),
                created: Some(now_millis()),
            };
            state.snapshots.insert(name, snapshot.clone());
            created.push(snapshot);
        }

        Ok(ItemList::new(created))
    }

    async fn update_file_system_snapshots(
        &self,
        name: &str,
        attributes: &FileSystemSnapshot,
    ) -> ApiResult<()> {
        self.record("update_file_system_snapshots", name)?;
        let mut state = self.state.write().await;
        let snapshot = state
            .snapshots
            .get_mut(name)
            .ok_or_else(|| missing("snapshot", name))?;
        if let Some(destroyed) = attributes.destroyed {
            snapshot.destroyed = Some(destroyed);
        }
        Ok(())
    }

    async fn delete_file_system_snapshots(&self, name: &str) -> ApiResult<()> {
        self.record("delete_file_system_snapshots", name)?;
        let mut state = self.state.write().await;
        let snapshot = state
            .snapshots
            .get(name)
            .ok_or_else(|| missing("snapshot", name))?;
        if !snapshot.is_destroyed() {
            return Err(ApiFault::with_status(
                400,
                format!("snapshot '{}' must be destroyed before eradication", name),
            ));
        }
        state.snapshots.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs(name: &str) -> FileSystem {
        FileSystem {
            name: Some(name.to_string()),
            provisioned: Some(1 << 30),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_eradicate_requires_destroy() {
        let array = MemoryArray::new();
        array.create_file_systems(&fs("share-a-manila")).await.unwrap();

        let err = array.delete_file_systems("share-a-manila").await.unwrap_err();
        assert_eq!(err.status, Some(400));

        array
            .update_file_systems(
                "share-a-manila",
                &FileSystem {
                    destroyed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        array.delete_file_systems("share-a-manila").await.unwrap();
        assert!(array.file_system("share-a-manila").await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_filter() {
        let array = MemoryArray::new();
        array.create_file_systems(&fs("share-a-manila")).await.unwrap();
        array
            .create_file_system_snapshots(&["share-a-manila".to_string()], &SnapshotSuffix::new("s1"))
            .await
            .unwrap();

        let hit = array
            .list_file_system_snapshots("source='share-a-manila' and suffix='s1'")
            .await
            .unwrap();
        assert_eq!(hit.items.len(), 1);
        assert_eq!(hit.items[0].name.as_deref(), Some("share-a-manila,s1"));

        let miss = array
            .list_file_system_snapshots("source='share-a-manila' and suffix='s2'")
            .await
            .unwrap();
        assert!(miss.items.is_empty());

        assert!(array.list_file_system_snapshots("garbage").await.is_err());
    }

    #[tokio::test]
    async fn test_injected_fault_is_one_shot() {
        let array = MemoryArray::new();
        array.inject_fault("list_arrays_space", ApiFault::new("session expired"));

        assert!(array.list_arrays_space().await.is_err());
        assert!(array.list_arrays_space().await.is_ok());
        assert_eq!(array.calls().len(), 2);
        assert!(array.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_login_checks_token() {
        let array = MemoryArray::new().with_api_token("T-good");
        assert!(array.login("T-good").await.is_ok());
        assert_eq!(array.login("T-bad").await.unwrap_err().status, Some(401));
    }
}
