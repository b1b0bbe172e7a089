use serde::Deserialize;
use serde::Serialize;

pub mod replacer;

/// Index of a frame slot in the buffer pool, in range [0, pool_size).
pub type FrameId = usize;

/// The kind of access that touched a frame. Recorded for future policies,
/// the lru-k replacer accepts it without differentiating.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AccessType {
    Unknown,
    Lookup,
    Scan,
    Index,
}
