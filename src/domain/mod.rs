//! Domain layer - Records and port definitions
//!
//! This module defines the records exchanged with the orchestrator and the
//! array, plus the traits (ports) that adapters implement.

pub mod array;
pub mod ports;
pub mod share;

pub use array::*;
pub use ports::*;
pub use share::*;
