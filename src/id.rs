//! Time-ordered 64-bit identifier generator.
//!
//! Ids are laid out as `(timestamp_ms << 22) | sequence`:
//!
//! ```text
//!  63                               22 21                 0
//! +-----------------------------------+--------------------+
//! |   milliseconds since Unix epoch   |  sequence (22 bit) |
//! +-----------------------------------+--------------------+
//! ```
//!
//! The generator keeps the last issued id in a single atomic and advances it
//! with a compare-and-swap loop, so concurrent callers never receive the same
//! id. When more than 2^22 ids are requested within one millisecond the
//! sequence carries into the next millisecond, and when the wall clock moves
//! backwards the generator keeps counting from the last issued timestamp.
//! Ids are unique per generator instance only; there are no node bits.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of low bits holding the per-millisecond sequence.
pub const SEQUENCE_BITS: u32 = 22;

/// Mask selecting the sequence part of an id.
pub const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

/// Generator of process-unique, strictly increasing ids.
pub struct IdGenerator {
    last: AtomicU64,
    clock: Clock,
}

impl IdGenerator {
    /// Create a generator driven by the system wall clock.
    pub fn new() -> Self {
        Self::with_clock(system_millis)
    }

    /// Create a generator with a custom millisecond clock.
    pub fn with_clock(clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self {
            last: AtomicU64::new(0),
            clock: Box::new(clock),
        }
    }

    /// Issue the next id.
    pub fn next_id(&self) -> u64 {
        let floor = (self.clock)() << SEQUENCE_BITS;
        let mut last = self.last.load(Ordering::Acquire);

        loop {
            let candidate = floor.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator")
            .field("last", &self.last.load(Ordering::Relaxed))
            .finish()
    }
}

/// Millisecond timestamp encoded in an id.
pub fn timestamp_of(id: u64) -> u64 {
    id >> SEQUENCE_BITS
}

/// Sequence number encoded in an id.
pub fn sequence_of(id: u64) -> u64 {
    id & SEQUENCE_MASK
}

fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn scripted_clock(start: u64) -> (Arc<AtomicU64>, IdGenerator) {
        let now = Arc::new(AtomicU64::new(start));
        let clock = Arc::clone(&now);
        let generator = IdGenerator::with_clock(move || clock.load(Ordering::SeqCst));
        (now, generator)
    }

    #[test]
    fn test_layout() {
        let (_now, generator) = scripted_clock(1_700_000_000_000);

        let id = generator.next_id();

        assert_eq!(timestamp_of(id), 1_700_000_000_000);
        assert_eq!(sequence_of(id), 0);
        assert_eq!(id, 1_700_000_000_000 << 22);
    }

    #[test]
    fn test_same_millisecond_increments_sequence() {
        let (_now, generator) = scripted_clock(1_000);

        let ids: Vec<u64> = (0..5).map(|_| generator.next_id()).collect();

        for (i, id) in ids.iter().enumerate() {
            assert_eq!(timestamp_of(*id), 1_000);
            assert_eq!(sequence_of(*id), i as u64);
        }
    }

    #[test]
    fn test_new_millisecond_resets_sequence() {
        let (now, generator) = scripted_clock(1_000);

        generator.next_id();
        generator.next_id();
        now.store(1_001, Ordering::SeqCst);
        let id = generator.next_id();

        assert_eq!(timestamp_of(id), 1_001);
        assert_eq!(sequence_of(id), 0);
    }

    #[test]
    fn test_clock_rollback_never_reissues() {
        let (now, generator) = scripted_clock(5_000);

        let before = generator.next_id();
        now.store(4_000, Ordering::SeqCst);
        let after = generator.next_id();

        assert!(after > before);
        assert_eq!(timestamp_of(after), 5_000);
        assert_eq!(sequence_of(after), 1);
    }

    #[test]
    fn test_sequence_overflow_carries_into_next_millisecond() {
        let (_now, generator) = scripted_clock(7_000);
        generator
            .last
            .store((7_000 << SEQUENCE_BITS) | SEQUENCE_MASK, Ordering::SeqCst);

        let id = generator.next_id();

        assert_eq!(timestamp_of(id), 7_001);
        assert_eq!(sequence_of(id), 0);
    }

    #[test]
    fn test_system_clock_ids_strictly_increase() {
        let generator = IdGenerator::new();

        let mut previous = generator.next_id();
        for _ in 0..10_000 {
            let id = generator.next_id();
            assert!(id > previous);
            previous = id;
        }
    }

    #[test]
    fn test_concurrent_callers_get_distinct_ids() {
        let generator = Arc::new(IdGenerator::new());
        const THREADS: usize = 8;
        const PER_THREAD: usize = 5_000;

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let generator = Arc::clone(&generator);
                thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| generator.next_id())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), THREADS * PER_THREAD);
    }

    #[test]
    fn test_independent_generators() {
        let (_a_now, a) = scripted_clock(10);
        let (_b_now, b) = scripted_clock(10);

        a.next_id();
        a.next_id();

        assert_eq!(sequence_of(b.next_id()), 0);
    }
}
