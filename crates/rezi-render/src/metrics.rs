//! Render path metrics: execution-strategy counters, distinct from any
//! semantic change-tracking upstream. Retained as a cross-cutting
//! diagnostics module exposed as an atomic struct plus an immutable
//! snapshot, in the shape the corpus's render-metrics scaffold already used.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RenderPathMetrics {
    /// Frames that took the full-repaint path.
    pub full_frames: AtomicU64,
    /// Frames that took the partial-commit path.
    pub partial_frames: AtomicU64,
    /// Frames that took the render-only path (no commit/layout change).
    pub render_only_frames: AtomicU64,
    /// Partial-commit frames escalated to full repaint (layout instability
    /// or a dirty subtree spanning the whole tree).
    pub escalations: AtomicU64,
    /// Scroll-copy `blitRect` ops emitted.
    pub scroll_copy_shifts: AtomicU64,
    /// Scroll-copy opportunities suppressed (overlapping absolute sibling or
    /// non-trivial parent transparency).
    pub scroll_copy_suppressed: AtomicU64,
    /// Render-cache hits across all frames.
    pub cache_hits: AtomicU64,
    /// Render-cache misses (projection recomputed).
    pub cache_misses: AtomicU64,
    /// Duration, in nanoseconds, of the most recently completed frame.
    pub last_frame_ns: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderPathMetricsSnapshot {
    pub full_frames: u64,
    pub partial_frames: u64,
    pub render_only_frames: u64,
    pub escalations: u64,
    pub scroll_copy_shifts: u64,
    pub scroll_copy_suppressed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub last_frame_ns: u64,
}

impl RenderPathMetrics {
    pub fn snapshot(&self) -> RenderPathMetricsSnapshot {
        RenderPathMetricsSnapshot {
            full_frames: self.full_frames.load(Ordering::Relaxed),
            partial_frames: self.partial_frames.load(Ordering::Relaxed),
            render_only_frames: self.render_only_frames.load(Ordering::Relaxed),
            escalations: self.escalations.load(Ordering::Relaxed),
            scroll_copy_shifts: self.scroll_copy_shifts.load(Ordering::Relaxed),
            scroll_copy_suppressed: self.scroll_copy_suppressed.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            last_frame_ns: self.last_frame_ns.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_frame_ns(&self, ns: u64) {
        self.last_frame_ns.store(ns, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reads_back_recorded_counters() {
        let m = RenderPathMetrics::default();
        m.full_frames.fetch_add(3, Ordering::Relaxed);
        m.record_frame_ns(500);
        let snap = m.snapshot();
        assert_eq!(snap.full_frames, 3);
        assert_eq!(snap.last_frame_ns, 500);
    }
}
