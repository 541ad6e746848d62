//! Array Session Adapters
//!
//! Provides implementations of the array port:
//! - REST: the FlashBlade management API
//! - Memory: a simulated array for tests and dry runs

pub mod memory;
pub mod rest;

pub use memory::*;
pub use rest::*;

use crate::config::DriverSettings;
use crate::domain::ports::ArrayClientRef;
use crate::error::Result;
use std::sync::Arc;
use tracing::warn;

/// Factory for creating array clients
pub struct ArrayFactory;

impl ArrayFactory {
    /// Create the array client for `settings`; `simulate` swaps in an
    /// in-memory array.
    pub fn create(settings: &DriverSettings, simulate: bool) -> Result<ArrayClientRef> {
        if simulate {
            warn!(
                "Using simulated array instead of {}",
                settings.management_address
            );
            return Ok(Arc::new(MemoryArray::new().with_api_token(settings.api_token.clone())));
        }
        Ok(Arc::new(RestArrayClient::new(settings)?))
    }
}
