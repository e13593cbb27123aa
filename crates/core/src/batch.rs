//! Fixed-size batching of transfer items
//!
//! Only one batch is resident at a time during a sync run, which bounds the
//! memory held by in-flight object bodies.

use crate::error::{Error, Result};

/// Items per batch when none is configured
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Split `items` into consecutive groups of `size`
///
/// Returns `ceil(n / size)` slices; every slice but the last holds exactly
/// `size` items. Empty input yields no batches. A size of zero is a
/// configuration error.
pub fn batch<T>(items: &[T], size: usize) -> Result<Vec<&[T]>> {
    if size == 0 {
        return Err(Error::Config("batch size must be greater than 0".into()));
    }
    Ok(items.chunks(size).collect())
}
