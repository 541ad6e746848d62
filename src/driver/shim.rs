//! Array fault translation
//!
//! Every array call goes through [`ArrayCall::translate`], which logs the
//! fault and re-raises it as [`Error::BackendFault`]. Nothing else in the
//! driver inspects [`ApiFault`].

use crate::domain::array::ApiFault;
use crate::error::{Error, Result};
use tracing::error;

/// Conversion of raw array results into driver results
pub trait ArrayCall<T> {
    /// Convert an array fault, naming the failed operation in the log
    fn translate(self, operation: &'static str) -> Result<T>;
}

impl<T> ArrayCall<T> for std::result::Result<T, ApiFault> {
    fn translate(self, operation: &'static str) -> Result<T> {
        self.map_err(|fault| {
            error!(operation, status = ?fault.status, "Caught exception from array: {}", fault);
            Error::BackendFault(fault.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_fault_becomes_backend_fault() {
        let raw: std::result::Result<(), ApiFault> =
            Err(ApiFault::with_status(503, "array busy"));
        assert_matches!(
            raw.translate("update_file_systems"),
            Err(Error::BackendFault(msg)) if msg == "(503) array busy"
        );
    }

    #[test]
    fn test_success_passes_through() {
        let raw: std::result::Result<u32, ApiFault> = Ok(3);
        assert_eq!(raw.translate("list_file_systems").unwrap(), 3);
    }
}
