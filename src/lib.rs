//! FlashBlade Share Driver
//!
//! Maps a share orchestrator's lifecycle (create, delete, snapshot, resize,
//! access control and capacity reporting) onto the filesystem and snapshot
//! primitives of a FlashBlade array.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                  REST API / CLI (api, main)                   │
//! ├───────────────────────────────────────────────────────────────┤
//! │                 Lifecycle Manager (driver)                    │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │
//! │  │  Naming  │ │  Access  │ │ Capacity │ │ Resource Locator │  │
//! │  └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │
//! │                 Error Translation Shim                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │                    Array Client (array)                       │
//! │        ┌───────────────────┐  ┌────────────────────┐          │
//! │        │ REST (FlashBlade) │  │ Memory (simulated) │          │
//! │        └───────────────────┘  └────────────────────┘          │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`api`]: HTTP surface over the driver
//! - [`array`]: Array client implementations
//! - [`config`]: Driver configuration and validation
//! - [`domain`]: Records and port traits
//! - [`driver`]: Share lifecycle mapping
//! - [`error`]: Error types and handling
//! - [`metrics`]: Prometheus metrics

pub mod api;
pub mod array;
pub mod config;
pub mod domain;
pub mod driver;
pub mod error;
pub mod metrics;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, RestRouter};

pub use array::{ArrayFactory, MemoryArray, RestArrayClient};

pub use config::{DriverConfig, DriverSettings};

pub use domain::ports::{ArrayClient, ArrayClientRef, ShareDriver};

pub use domain::share::{
    AccessRule, AccessUpdate, ExportLocation, Share, ShareProtocol, ShareStats, Snapshot,
};

pub use driver::{ApiGeneration, FlashBladeShareDriver};

pub use error::{Error, Result};

pub use metrics::DriverMetrics;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
