// monitor.rs - Periodic Progress Reporting

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::stats::SearchStats;
use crate::utils;

/// How often the sleeping monitor re-checks the stop flag, so shutdown is
/// never delayed by a full reporting interval.
const STOP_POLL: Duration = Duration::from_millis(200);

/// Samples the shared counters on its own schedule and reports the
/// instantaneous and overall rates. Read-only; never blocks the workers or
/// the collector.
pub struct ProgressMonitor;

impl ProgressMonitor {
    pub fn spawn(
        stats: Arc<SearchStats>,
        stop: Arc<AtomicBool>,
        interval: Duration,
    ) -> thread::JoinHandle<()> {
        thread::spawn(move || Self::run(stats, stop, interval))
    }

    fn run(stats: Arc<SearchStats>, stop: Arc<AtomicBool>, interval: Duration) {
        let bar = ProgressBar::new(stats.target());
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );

        let mut last_attempts = 0u64;
        let mut last_sample = Instant::now();

        loop {
            let wake = Instant::now() + interval;
            while Instant::now() < wake {
                if stop.load(Ordering::Relaxed) || stats.is_satisfied() {
                    bar.set_position(stats.found());
                    bar.finish_with_message(format!(
                        "{} attempts",
                        utils::format_number(stats.attempts())
                    ));
                    return;
                }
                thread::sleep(STOP_POLL);
            }

            let attempts = stats.attempts();
            let found = stats.found();
            let now = Instant::now();
            let window = now.duration_since(last_sample).as_secs_f64();
            let instant_rate = if window > 0.0 {
                attempts.saturating_sub(last_attempts) as f64 / window
            } else {
                0.0
            };

            bar.set_position(found);
            bar.set_message(format!(
                "{} attempts | {:.0}/s",
                utils::format_number(attempts),
                instant_rate
            ));
            info!(
                "progress: {} attempts | found {}/{} | elapsed {} | {:.2}/s now | {:.2}/s avg",
                utils::format_number(attempts),
                found,
                stats.target(),
                utils::format_duration(stats.elapsed().as_secs_f64()),
                instant_rate,
                stats.overall_rate()
            );

            last_attempts = attempts;
            last_sample = now;
        }
    }
}
