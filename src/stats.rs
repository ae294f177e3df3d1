// ============================================================================
// stats.rs - Shared Search Counters and Termination Gate
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide counters shared by workers, collector and monitor.
///
/// `found` only moves through `try_claim_slot`, so it can never exceed the
/// target. `attempts` is best-effort: workers flush local batches into it,
/// so a read may lag the true count by up to one batch per worker.
pub struct SearchStats {
    target: u64,
    found: AtomicU64,
    attempts: AtomicU64,
    started: Instant,
}

impl SearchStats {
    pub fn new(target: u64) -> Self {
        Self {
            target,
            found: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    /// Atomically claim one of the remaining result slots. A check followed
    /// by a separate increment would over-claim under concurrent callers;
    /// this must stay a single compare-and-increment.
    pub fn try_claim_slot(&self) -> bool {
        self.found
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |found| {
                if found < self.target {
                    Some(found + 1)
                } else {
                    None
                }
            })
            .is_ok()
    }

    /// Fast-path exit check consulted by workers at batch boundaries.
    pub fn is_satisfied(&self) -> bool {
        self.found.load(Ordering::SeqCst) >= self.target
    }

    pub fn found(&self) -> u64 {
        self.found.load(Ordering::SeqCst)
    }

    /// Fold a worker-local attempt batch into the shared counter.
    pub fn flush_attempts(&self, delta: u64) {
        if delta > 0 {
            self.attempts.fetch_add(delta, Ordering::Relaxed);
        }
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn overall_rate(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.attempts() as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_claims_stop_at_target() {
        let stats = SearchStats::new(3);
        assert!(!stats.is_satisfied());

        assert!(stats.try_claim_slot());
        assert!(stats.try_claim_slot());
        assert!(stats.try_claim_slot());
        assert!(stats.is_satisfied());

        assert!(!stats.try_claim_slot());
        assert_eq!(stats.found(), 3);
    }

    #[test]
    fn test_concurrent_claims_never_exceed_target() {
        let stats = Arc::new(SearchStats::new(100));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let stats = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                let mut claimed = 0u64;
                for _ in 0..1000 {
                    if stats.try_claim_slot() {
                        claimed += 1;
                    }
                }
                claimed
            }));
        }

        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 100);
        assert_eq!(stats.found(), 100);
    }

    #[test]
    fn test_attempt_batches_accumulate() {
        let stats = SearchStats::new(1);
        stats.flush_attempts(1000);
        stats.flush_attempts(0);
        stats.flush_attempts(500);
        assert_eq!(stats.attempts(), 1500);
    }
}
