//=========================================================================
// Frame Profiler
//=========================================================================
//
// Accumulates how long each phase takes across frames. The engine records
// one sample per phase per tick and closes the frame afterwards; every
// `log_period` frames a per-phase average is written at debug level.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

use log::debug;

//=== Internal Dependencies ===============================================

use crate::core::manager::Phase;
use crate::core::service::Service;

//=== FrameProfiler =======================================================

/// Per-phase frame timing, registered as a service under
/// [`FrameProfiler::ID`].
#[derive(Debug, Clone)]
pub struct FrameProfiler {
    enabled: bool,
    log_period: u64,
    frames: u64,
    totals: [Duration; Phase::ALL.len()],
}

impl FrameProfiler {
    /// Reserved injector id.
    pub const ID: &'static str = "profiler";

    /// A `log_period` of zero disables the periodic summary.
    pub fn new(enabled: bool, log_period: u64) -> Self {
        Self {
            enabled,
            log_period,
            frames: 0,
            totals: [Duration::ZERO; Phase::ALL.len()],
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    //--- Recording --------------------------------------------------------

    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        if self.enabled {
            self.totals[phase.index()] += elapsed;
        }
    }

    /// Closes the current frame.
    pub fn end_frame(&mut self) {
        if !self.enabled {
            return;
        }
        self.frames += 1;

        if self.log_period > 0 && self.frames % self.log_period == 0 {
            let summary: Vec<String> = Phase::ALL
                .iter()
                .map(|phase| format!("{}={:?}", phase, self.average(*phase)))
                .collect();
            debug!(
                target: "engine::profiler",
                "{} frames, avg per phase: {}",
                self.frames,
                summary.join(" ")
            );
        }
    }

    //--- Queries ----------------------------------------------------------

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Time spent in `phase` across every recorded frame.
    pub fn total(&self, phase: Phase) -> Duration {
        self.totals[phase.index()]
    }

    pub fn average(&self, phase: Phase) -> Duration {
        match u32::try_from(self.frames) {
            Ok(0) => Duration::ZERO,
            Ok(frames) => self.total(phase) / frames,
            Err(_) => self.total(phase).div_f64(self.frames as f64),
        }
    }

    pub fn reset(&mut self) {
        self.frames = 0;
        self.totals = [Duration::ZERO; Phase::ALL.len()];
    }
}

impl Default for FrameProfiler {
    fn default() -> Self {
        Self::new(true, 300)
    }
}

impl Service for FrameProfiler {
    fn destroy(&mut self) {
        if self.enabled && self.frames > 0 {
            debug!(target: "engine::profiler", "Profiler closed after {} frames", self.frames);
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_over_closed_frames() {
        let mut profiler = FrameProfiler::new(true, 0);

        profiler.record(Phase::Update, Duration::from_millis(4));
        profiler.end_frame();
        profiler.record(Phase::Update, Duration::from_millis(2));
        profiler.end_frame();

        assert_eq!(profiler.frames(), 2);
        assert_eq!(profiler.total(Phase::Update), Duration::from_millis(6));
        assert_eq!(profiler.average(Phase::Update), Duration::from_millis(3));
        assert_eq!(profiler.average(Phase::Draw), Duration::ZERO);
    }

    #[test]
    fn disabled_profiler_records_nothing() {
        let mut profiler = FrameProfiler::new(false, 1);

        profiler.record(Phase::Draw, Duration::from_millis(9));
        profiler.end_frame();

        assert_eq!(profiler.frames(), 0);
        assert_eq!(profiler.total(Phase::Draw), Duration::ZERO);
    }

    #[test]
    fn reset_clears_totals() {
        let mut profiler = FrameProfiler::default();
        profiler.record(Phase::PreDraw, Duration::from_millis(1));
        profiler.end_frame();

        profiler.reset();

        assert_eq!(profiler.frames(), 0);
        assert_eq!(profiler.average(Phase::PreDraw), Duration::ZERO);
    }
}
