//! Share Driver Module
//!
//! The mapping layer between the orchestrator's share lifecycle and the
//! array's filesystem primitives.

pub mod access;
pub mod capability;
pub mod capacity;
pub mod lifecycle;
pub mod locator;
pub mod naming;
pub mod shim;

pub use access::*;
pub use capability::*;
pub use capacity::*;
pub use lifecycle::*;
pub use locator::*;
pub use shim::*;
