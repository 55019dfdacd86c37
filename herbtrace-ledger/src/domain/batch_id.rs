//! Batch identifier generation
//!
//! Identifiers have the form `BATCH-<epoch millis>`. Within one process the
//! generator never hands out the same value twice: a second request in the
//! same millisecond gets the next millisecond. Cross-process collisions are
//! left to the repository's uniqueness constraint.

use std::sync::atomic::{AtomicI64, Ordering};

pub const BATCH_ID_PREFIX: &str = "BATCH-";

/// Format a batch id from epoch milliseconds
pub fn format_batch_id(millis: i64) -> String {
    format!("{}{}", BATCH_ID_PREFIX, millis)
}

/// Whether `id` has the `BATCH-<digits>` shape
pub fn is_batch_id(id: &str) -> bool {
    id.strip_prefix(BATCH_ID_PREFIX)
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Monotonic batch id source
#[derive(Debug, Default)]
pub struct BatchIdGenerator {
    last_issued: AtomicI64,
}

impl BatchIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for a record created at `now_millis`
    ///
    /// Returns the id and the millisecond value it encodes, which is
    /// `now_millis` unless that was already issued.
    pub fn next(&self, now_millis: i64) -> (String, i64) {
        let mut current = self.last_issued.load(Ordering::Acquire);
        loop {
            let candidate = now_millis.max(current + 1);
            match self.last_issued.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return (format_batch_id(candidate), candidate),
                Err(actual) => current = actual,
            }
        }
    }
}
