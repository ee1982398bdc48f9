use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Percentage shared between a download task and the UI that polls it.
///
/// Stored as the bit pattern of an `f32` so both sides can touch it without a lock.
#[derive(Clone, Debug, Default)]
pub struct ProgressCounter {
    bits: Arc<AtomicU32>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, percent: f32) {
        let clamped = percent.clamp(0.0, 100.0);
        self.bits.store(clamped.to_bits(), Ordering::SeqCst);
    }

    #[must_use]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::SeqCst))
    }

    pub fn finish(&self) {
        self.set(100.0);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.get() >= 100.0
    }
}

/// Render a human-friendly transfer speed string.
#[must_use]
pub fn format_speed(bytes_per_sec: f32) -> String {
    const KIB: f32 = 1024.0;
    const MIB: f32 = KIB * 1024.0;

    if bytes_per_sec < KIB {
        format!("{bytes_per_sec:.0} B/s")
    } else if bytes_per_sec < MIB {
        format!("{:.1} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.1} MB/s", bytes_per_sec / MIB)
    }
}

/// Compute download progress as a percentage, capped at 100.
#[must_use]
pub fn progress_percent(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => ((downloaded as f32 / total as f32) * 100.0).min(100.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_speed_human_readable() {
        assert_eq!(format_speed(512.0), "512 B/s");
        assert_eq!(format_speed(2_048.0), "2.0 KB/s");
        assert_eq!(format_speed(5_242_880.0), "5.0 MB/s");
    }

    #[test]
    fn calculates_progress_percent() {
        assert_eq!(progress_percent(0, Some(10)), 0.0);
        assert_eq!(progress_percent(5, Some(10)), 50.0);
        assert_eq!(progress_percent(10, Some(10)), 100.0);
        assert_eq!(progress_percent(12, Some(10)), 100.0);
        assert_eq!(progress_percent(5, None), 0.0);
    }

    #[test]
    fn progress_counter_is_shared_between_clones() {
        let counter = ProgressCounter::new();
        let worker = counter.clone();
        worker.set(42.5);
        assert_eq!(counter.get(), 42.5);
        worker.set(250.0);
        assert!(counter.is_finished());
        assert_eq!(counter.get(), 100.0);
    }
}
