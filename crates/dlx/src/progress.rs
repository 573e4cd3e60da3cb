//! Byte-level progress reporting.
//!
//! The engine only pushes numbers into a [`ProgressSink`]; rendering is the
//! caller's business. Sinks are shared by every concurrent part task, so
//! implementations must tolerate concurrent `add` calls.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use indicatif::ProgressBar;

pub trait ProgressSink: Send + Sync {
    /// A new download of `total` bytes begins.
    fn start(&self, total: u64);

    /// `delta` more bytes are accounted for.
    fn add(&self, delta: u64);

    /// The download completed.
    fn finish(&self);
}

impl ProgressSink for ProgressBar {
    fn start(&self, total: u64) {
        self.reset();
        self.set_length(total);
    }

    fn add(&self, delta: u64) {
        self.inc(delta);
    }

    fn finish(&self) {
        ProgressBar::finish(self);
    }
}

/// Discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _total: u64) {}
    fn add(&self, _delta: u64) {}
    fn finish(&self) {}
}

/// Keeps running totals; handy for tests and summaries.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    total: AtomicU64,
    done: AtomicU64,
    finished: AtomicBool,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl ProgressSink for ProgressCounter {
    fn start(&self, total: u64) {
        self.total.store(total, Ordering::Release);
        self.done.store(0, Ordering::Release);
        self.finished.store(false, Ordering::Release);
    }

    fn add(&self, delta: u64) {
        self.done.fetch_add(delta, Ordering::AcqRel);
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counter_accumulates_across_threads() {
        let counter = Arc::new(ProgressCounter::new());
        counter.start(4000);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.add(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.done(), 4000);
        assert!(!counter.is_finished());
        counter.finish();
        assert!(counter.is_finished());
    }

    #[test]
    fn progress_bar_tracks_length_and_position() {
        let bar = ProgressBar::hidden();
        ProgressSink::start(&bar, 100);
        ProgressSink::add(&bar, 40);
        assert_eq!(bar.length(), Some(100));
        assert_eq!(bar.position(), 40);
    }
}
