use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::config::{ProgressConfig, SearchConfig};
use crate::monitor::ProgressMonitor;
use crate::pattern::VanityPattern;
use crate::stats::SearchStats;
use crate::wallet::KeyDeriver;

/// A candidate that matched the pattern and claimed one of the target slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub address: String,
    pub mnemonic: String,
    pub worker_id: usize,
}

/// Final result of a search run. `matches` is in arrival order at the
/// collector, which is non-deterministic across runs.
#[derive(Debug)]
pub struct SearchOutcome {
    pub matches: Vec<Match>,
    pub attempts: u64,
    pub elapsed: Duration,
    /// All workers stopped before the target was met
    pub exhausted: bool,
}

impl SearchOutcome {
    pub fn reached_target(&self) -> bool {
        !self.exhausted
    }

    pub fn overall_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            0.0
        }
    }
}

struct WorkerContext {
    id: usize,
    pattern: Arc<VanityPattern>,
    stats: Arc<SearchStats>,
    stop: Arc<AtomicBool>,
    results: Sender<Match>,
    batch_size: u64,
    max_consecutive_failures: u32,
}

/// Decrements the live-worker count however the worker exits, panics
/// included, so the collector's liveness check stays truthful.
struct LivenessGuard(Arc<AtomicUsize>);

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn worker_loop<D: KeyDeriver>(ctx: WorkerContext, mut deriver: D, live_workers: Arc<AtomicUsize>) {
    let _liveness = LivenessGuard(live_workers);
    let mut local_attempts: u64 = 0;
    let mut consecutive_failures: u32 = 0;

    debug!("worker {} started", ctx.id);
    loop {
        // Batch boundary: consult the termination gate and the stop flag.
        // Cancellation latency is therefore at most one batch.
        if local_attempts == 0 && (ctx.stats.is_satisfied() || ctx.stop.load(Ordering::Relaxed)) {
            debug!("worker {} stopping", ctx.id);
            return;
        }

        match deriver.derive_once() {
            Ok(candidate) => {
                consecutive_failures = 0;
                if ctx.pattern.matches(&candidate.address) && ctx.stats.try_claim_slot() {
                    let found = Match {
                        address: candidate.address,
                        mnemonic: candidate.mnemonic,
                        worker_id: ctx.id,
                    };
                    // Blocking send: backpressure when the collector is slow.
                    // Matches are never dropped.
                    if ctx.results.send(found).is_err() {
                        ctx.stats.flush_attempts(local_attempts + 1);
                        return;
                    }
                }
            }
            Err(err) => {
                consecutive_failures += 1;
                debug!("worker {}: derivation failed: {}", ctx.id, err);
                if consecutive_failures >= ctx.max_consecutive_failures {
                    warn!(
                        "worker {}: {} consecutive derivation failures, stopping",
                        ctx.id, consecutive_failures
                    );
                    ctx.stats.flush_attempts(local_attempts + 1);
                    return;
                }
            }
        }

        local_attempts += 1;
        if local_attempts >= ctx.batch_size {
            ctx.stats.flush_attempts(local_attempts);
            local_attempts = 0;
        }
    }
}

/// Orchestrates a search run: spawns workers and the progress monitor,
/// drains the bounded result channel, then shuts everything down.
pub struct SearchEngine {
    search: SearchConfig,
    progress: ProgressConfig,
    pattern: Arc<VanityPattern>,
}

impl SearchEngine {
    pub fn new(search: SearchConfig, progress: ProgressConfig, pattern: VanityPattern) -> Self {
        Self {
            search,
            progress,
            pattern: Arc::new(pattern),
        }
    }

    /// Run the search to completion. `make_deriver` is called once per
    /// worker so each thread owns its own deriver.
    pub fn run<D, F>(&self, mut make_deriver: F) -> SearchOutcome
    where
        D: KeyDeriver + 'static,
        F: FnMut(usize) -> D,
    {
        let stats = Arc::new(SearchStats::new(self.search.target_count));
        let stop = Arc::new(AtomicBool::new(false));
        let live_workers = Arc::new(AtomicUsize::new(self.search.worker_count));
        let (results_tx, results_rx) = bounded::<Match>(self.search.channel_capacity);

        info!(
            "starting search: target {} | {} workers | batch size {} | channel capacity {}",
            self.search.target_count,
            self.search.worker_count,
            self.search.attempt_batch_size,
            self.search.channel_capacity
        );

        let mut workers = Vec::with_capacity(self.search.worker_count);
        for worker_id in 0..self.search.worker_count {
            let deriver = make_deriver(worker_id);
            let ctx = WorkerContext {
                id: worker_id,
                pattern: Arc::clone(&self.pattern),
                stats: Arc::clone(&stats),
                stop: Arc::clone(&stop),
                results: results_tx.clone(),
                batch_size: self.search.attempt_batch_size,
                max_consecutive_failures: self.search.max_consecutive_failures,
            };
            let live = Arc::clone(&live_workers);
            workers.push(thread::spawn(move || worker_loop(ctx, deriver, live)));
        }
        // The collector holds only the receiving side; once every worker is
        // gone the channel disconnects.
        drop(results_tx);

        let monitor = ProgressMonitor::spawn(
            Arc::clone(&stats),
            Arc::clone(&stop),
            Duration::from_secs(self.progress.interval_secs),
        );

        let (matches, exhausted) = self.collect(&results_rx, &live_workers, &stats);

        stop.store(true, Ordering::SeqCst);
        self.join_workers(workers);
        if monitor.join().is_err() {
            warn!("progress monitor panicked");
        }

        SearchOutcome {
            attempts: stats.attempts(),
            elapsed: stats.elapsed(),
            matches,
            exhausted,
        }
    }

    fn collect(
        &self,
        results: &Receiver<Match>,
        live_workers: &AtomicUsize,
        stats: &SearchStats,
    ) -> (Vec<Match>, bool) {
        let target = self.search.target_count;
        let mut matches = Vec::with_capacity(target as usize);

        while (matches.len() as u64) < target {
            match results.recv_timeout(self.search.recv_timeout()) {
                Ok(found) => {
                    info!(
                        "worker {} found match {}/{}: {}",
                        found.worker_id,
                        matches.len() + 1,
                        target,
                        found.address
                    );
                    matches.push(found);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if live_workers.load(Ordering::SeqCst) == 0 {
                        // Workers may have pushed a match right before dying
                        while let Ok(found) = results.try_recv() {
                            matches.push(found);
                        }
                        if (matches.len() as u64) < target {
                            warn!(
                                "all workers stopped after {} of {} matches ({} attempts)",
                                matches.len(),
                                target,
                                stats.attempts()
                            );
                            return (matches, true);
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(
                        "all workers stopped after {} of {} matches ({} attempts)",
                        matches.len(),
                        target,
                        stats.attempts()
                    );
                    return (matches, true);
                }
            }
        }

        debug!("collector: target reached, shutting down");
        (matches, false)
    }

    /// Cooperative shutdown: workers notice the stop flag at their next
    /// batch boundary. A thread that overruns the grace period is detached
    /// and dies with the process.
    fn join_workers(&self, workers: Vec<thread::JoinHandle<()>>) {
        let grace = self.search.shutdown_grace();
        let deadline = Instant::now() + grace;

        for (id, handle) in workers.into_iter().enumerate() {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                if handle.join().is_err() {
                    warn!("worker {} panicked", id);
                }
            } else {
                warn!("worker {} did not stop within {:?}, detaching", id, grace);
            }
        }
    }
}
