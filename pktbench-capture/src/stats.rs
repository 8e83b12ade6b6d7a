//! Capture and injection counters

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Point-in-time traffic statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureStats {
    /// Frames handed to the test bench
    pub frames: u64,
    pub bytes: u64,
    /// Frames dropped by the kernel (pcap only)
    pub dropped: u64,
    /// Frames dropped by the interface (pcap only)
    pub if_dropped: u64,
    pub duration: Duration,
}

impl CaptureStats {
    /// Merge the kernel's drop counters into a snapshot
    pub fn with_pcap_stats(mut self, stats: pcap::Stat) -> Self {
        self.dropped = u64::from(stats.dropped);
        self.if_dropped = u64::from(stats.if_dropped);
        self
    }

    /// Drops as a percentage of all frames seen
    pub fn drop_rate(&self) -> f64 {
        let total = self.frames + self.dropped;
        if total == 0 {
            return 0.0;
        }
        (self.dropped as f64 / total as f64) * 100.0
    }
}

impl fmt::Display for CaptureStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames ({} bytes) in {:.2}s, {} dropped ({:.2}%), {} dropped by interface",
            self.frames,
            self.bytes,
            self.duration.as_secs_f64(),
            self.dropped,
            self.drop_rate(),
            self.if_dropped
        )
    }
}

/// Thread-safe frame and byte counters
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    frames: Arc<AtomicU64>,
    bytes: Arc<AtomicU64>,
    start_time: Instant,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            bytes: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Count one frame of `size` bytes
    pub fn record_frame(&self, size: usize) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            frames: self.frames.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            duration: self.start_time.elapsed(),
            ..Default::default()
        }
    }
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
