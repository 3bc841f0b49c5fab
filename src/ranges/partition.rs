// src/ranges/partition.rs
use crate::types::{CidrBlock, Shard};

/// Split `blocks` into exactly `workers` contiguous shards.
///
/// Every shard holds `ceil(N / workers)` blocks except trailing ones, which
/// may be short or empty. A worker count of zero is treated as one.
pub fn partition(blocks: Vec<CidrBlock>, workers: usize) -> Vec<Shard> {
    let workers = workers.max(1);
    let per_shard = blocks.len().div_ceil(workers);

    let mut iter = blocks.into_iter();
    (0..workers)
        .map(|index| Shard {
            index,
            blocks: iter.by_ref().take(per_shard).collect(),
        })
        .collect()
}

/// Clamp a user-supplied worker count to at least one.
pub fn normalize_workers(requested: i64) -> usize {
    if requested <= 0 {
        1
    } else {
        usize::try_from(requested).unwrap_or(usize::MAX)
    }
}
