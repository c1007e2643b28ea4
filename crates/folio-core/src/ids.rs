//! Identifier allocation
//!
//! Two kinds of IDs are handed out:
//!
//! - **Item IDs**: random fixed-length decimal numbers, unique against the
//!   IDs already present in a listing. These are persisted.
//! - **Session-scoped IDs**: a monotonically increasing counter owned by an
//!   [`IdAllocator`]. Used for transient list entries such as images in an
//!   edit session, where uniqueness only has to hold while the process runs.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use thiserror::Error;

use crate::models::CommonItem;

/// Digits in a freshly allocated item ID
pub const DEFAULT_ID_LENGTH: usize = 4;

/// Largest supported ID length (10^18 still fits in a u64)
pub const MAX_ID_LENGTH: usize = 18;

/// Random draws tried before falling back to a linear probe
const RANDOM_ATTEMPTS: usize = 32;

/// Errors from item ID allocation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdError {
    #[error("ID length must be between 1 and 18, got {0}")]
    InvalidLength(usize),

    #[error("No free ID left with up to 18 digits")]
    Exhausted,
}

/// Generate a random `len`-digit ID that is not in `existing`
pub fn random_id(existing: &HashSet<u64>, len: usize) -> Result<u64, IdError> {
    random_id_with(&mut rand::rng(), existing, len)
}

/// Generate a fresh item ID with the default length for a listing
pub fn random_item_id(items: &[CommonItem]) -> Result<u64, IdError> {
    let existing: HashSet<u64> = items.iter().map(|item| item.id()).collect();
    random_id(&existing, DEFAULT_ID_LENGTH)
}

/// Generate a random ID using the given RNG
///
/// The result has exactly `len` digits with a non-zero leading digit
/// whenever such a value is still free. After [`RANDOM_ATTEMPTS`] colliding
/// draws the remaining search is a linear probe from a random start, which
/// finds a free value within `existing.len() + 1` steps. Only when every
/// `len`-digit value is taken does the length grow by one.
pub fn random_id_with<R: Rng>(
    rng: &mut R,
    existing: &HashSet<u64>,
    len: usize,
) -> Result<u64, IdError> {
    if len == 0 || len > MAX_ID_LENGTH {
        return Err(IdError::InvalidLength(len));
    }

    for width in len..=MAX_ID_LENGTH {
        let (low, high) = digit_range(width);

        for _ in 0..RANDOM_ATTEMPTS {
            let candidate = rng.random_range(low..high);
            if !existing.contains(&candidate) {
                return Ok(candidate);
            }
        }

        let span = high - low;
        let start = rng.random_range(0..span);
        let probes = span.min(existing.len() as u64 + 1);
        for step in 0..probes {
            let candidate = low + (start + step) % span;
            if !existing.contains(&candidate) {
                return Ok(candidate);
            }
        }

        tracing::debug!(width, "all {}-digit IDs taken, widening", width);
    }

    Err(IdError::Exhausted)
}

/// Inclusive lower and exclusive upper bound of `width`-digit numbers
fn digit_range(width: usize) -> (u64, u64) {
    let high = 10u64.pow(width as u32);
    (high / 10, high)
}

/// Session-scoped ID counter
///
/// Construct one per session and share it (usually behind an `Arc`) with
/// every component that needs transient IDs.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator starting at 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next ID
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Peek at the ID the next call will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Start over from 0
    pub fn reset(&self) {
        self.next.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn digits(n: u64) -> usize {
        n.to_string().len()
    }

    #[test]
    fn test_random_id_has_requested_length() {
        let existing = HashSet::new();
        for len in 1..=MAX_ID_LENGTH {
            let id = random_id(&existing, len).unwrap();
            assert_eq!(digits(id), len, "id {} for len {}", id, len);
        }
    }

    #[test]
    fn test_random_id_avoids_existing() {
        let existing: HashSet<u64> = (1000..9990).collect();
        for _ in 0..50 {
            let id = random_id(&existing, 4).unwrap();
            assert_eq!(digits(id), 4);
            assert!(!existing.contains(&id));
            assert!(id >= 9990);
        }
    }

    #[test]
    fn test_random_id_single_free_slot() {
        let mut existing: HashSet<u64> = (1..10).collect();
        existing.remove(&7);
        assert_eq!(random_id(&existing, 1).unwrap(), 7);
    }

    #[test]
    fn test_random_id_widens_when_full() {
        let existing: HashSet<u64> = (1..10).collect();
        let id = random_id(&existing, 1).unwrap();
        assert_eq!(digits(id), 2);
    }

    #[test]
    fn test_random_id_invalid_length() {
        let existing = HashSet::new();
        assert_eq!(random_id(&existing, 0), Err(IdError::InvalidLength(0)));
        assert_eq!(random_id(&existing, 19), Err(IdError::InvalidLength(19)));
    }

    #[test]
    fn test_random_item_id_against_listing() {
        let mut items = Vec::new();
        for id in 1000..1100 {
            let mut item = crate::models::create_new_item(crate::models::Category::Articles);
            item.base_mut().id = id;
            items.push(item);
        }
        let id = random_item_id(&items).unwrap();
        assert_eq!(digits(id), DEFAULT_ID_LENGTH);
        assert!(!items.iter().any(|item| item.id() == id));
    }

    #[test]
    fn test_allocator_starts_at_zero_and_increases() {
        let ids = IdAllocator::new();
        let taken: Vec<u64> = (0..5).map(|_| ids.next_id()).collect();
        assert_eq!(taken, vec![0, 1, 2, 3, 4]);
        assert_eq!(ids.peek(), 5);
    }

    #[test]
    fn test_allocator_reset() {
        let ids = IdAllocator::new();
        ids.next_id();
        ids.next_id();
        ids.reset();
        assert_eq!(ids.next_id(), 0);
    }

    #[test]
    fn test_allocator_unique_across_threads() {
        let ids = Arc::new(IdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..100).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(all.len(), 400);
    }
}
