//! Store trait definitions

use suncap_api::SunEventRecord;

use crate::StoreResult;

/// Single-slot cache of the most recently fetched sun events.
///
/// Holds at most one record; `save` replaces whatever was there.
pub trait SunEventCache: Send + Sync {
    /// Load the cached record, if any
    fn load(&self) -> StoreResult<Option<SunEventRecord>>;

    /// Replace the cached record
    fn save(&self, record: &SunEventRecord) -> StoreResult<()>;
}
