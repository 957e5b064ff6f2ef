use serde::Serialize;
use std::time::Instant;

use crate::camera::types::Extent;

/// Collects render-side statistics for a camera bridge.
///
/// Owned by the render thread; the only cross-thread figure (frames
/// signalled by the producer) is passed in when taking a snapshot.
pub struct DiagnosticStats {
    update_count: u64,
    frames_drained: u64,
    publish_count: u64,
    failed_updates: u64,
    start_time: Instant,
    last_update_time: Option<Instant>,
    resolution: Option<Extent>,
}

/// Snapshot of diagnostic stats for the host UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub fps: f64,
    pub frames_signaled: u64,
    pub frames_drained: u64,
    pub update_count: u64,
    pub coalesced_frames: u64,
    pub coalesce_rate: f64,
    pub publish_count: u64,
    pub failed_updates: u64,
    pub resolution: Option<Extent>,
}

impl DiagnosticStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            update_count: 0,
            frames_drained: 0,
            publish_count: 0,
            failed_updates: 0,
            start_time: Instant::now(),
            last_update_time: None,
            resolution: None,
        }
    }

    /// Record an update pass that drained `drained` frame notifications.
    pub fn record_update(&mut self, drained: u32, resolution: Extent) {
        self.update_count += 1;
        self.frames_drained += u64::from(drained);
        self.last_update_time = Some(Instant::now());
        self.resolution = Some(resolution);
    }

    /// Record a transform published to the render pipeline.
    pub fn record_publish(&mut self) {
        self.publish_count += 1;
    }

    /// Record a drained frame that could not be latched.
    pub fn record_failure(&mut self) {
        self.failed_updates += 1;
    }

    /// New images per second since the stats were (re)started.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.update_count as f64 / elapsed
    }

    /// Notifications that were folded into another frame's update pass.
    pub fn coalesced_frames(&self) -> u64 {
        self.frames_drained.saturating_sub(self.update_count)
    }

    /// Coalesced notifications as a percentage (0.0 - 100.0) of all drained.
    pub fn coalesce_rate(&self) -> f64 {
        if self.frames_drained == 0 {
            return 0.0;
        }
        (self.coalesced_frames() as f64 / self.frames_drained as f64) * 100.0
    }

    /// Time since the last successful update pass.
    pub fn since_last_update(&self) -> Option<std::time::Duration> {
        self.last_update_time.map(|t| t.elapsed())
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self, frames_signaled: u64) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            fps: self.fps(),
            frames_signaled,
            frames_drained: self.frames_drained,
            update_count: self.update_count,
            coalesced_frames: self.coalesced_frames(),
            coalesce_rate: self.coalesce_rate(),
            publish_count: self.publish_count,
            failed_updates: self.failed_updates,
            resolution: self.resolution,
        }
    }
}

impl Default for DiagnosticStats {
    fn default() -> Self {
        Self::new()
    }
}
