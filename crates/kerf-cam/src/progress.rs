//! Weighted progress reporting and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{CamError, Result};

/// Receives `(fraction, label)` updates with `fraction` in `0..=1`.
pub trait ProgressSink: Sync {
    /// Report progress.
    fn update(&self, fraction: f64, label: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(f64, &str) + Sync,
{
    fn update(&self, fraction: f64, label: &str) {
        self(fraction, label)
    }
}

/// A sink that drops every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _: f64, _: &str) {}
}

/// Shared flag a caller sets to stop a job at the next operation boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CamError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Named pipeline phases and their share of the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Dense top-down pass building the full shadow.
    Mapping,
    /// Roughing shadow accumulation.
    Roughing,
    /// Roughing ring offsets.
    RoughOffset,
    /// Outline passes.
    Outline,
    /// Raster build and contouring.
    Contour,
}

impl Phase {
    /// Relative weight.
    pub fn weight(self) -> f64 {
        match self {
            Phase::Mapping => 1.5,
            Phase::Roughing => 1.0,
            Phase::RoughOffset => 1.0,
            Phase::Outline => 0.5,
            Phase::Contour => 4.0,
        }
    }

    /// Default label.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Mapping => "mapping",
            Phase::Roughing => "roughing",
            Phase::RoughOffset => "rough offset",
            Phase::Outline => "outline",
            Phase::Contour => "contour",
        }
    }
}

/// Maps `(completed, total)` within the current phase onto overall progress.
pub struct PhaseTracker<'a> {
    sink: &'a dyn ProgressSink,
    phases: Vec<Phase>,
    total: f64,
    finished: f64,
    current: Option<usize>,
}

impl<'a> PhaseTracker<'a> {
    /// Track the given phases in order.
    pub fn new(sink: &'a dyn ProgressSink, phases: Vec<Phase>) -> Self {
        let total = phases.iter().map(|p| p.weight()).sum::<f64>().max(f64::EPSILON);
        Self {
            sink,
            phases,
            total,
            finished: 0.0,
            current: None,
        }
    }

    /// Advance to `phase`, closing out every phase before it.
    pub fn enter(&mut self, phase: Phase) {
        let Some(pos) = self.phases.iter().position(|p| *p == phase) else {
            return;
        };
        self.finished = self.phases[..pos].iter().map(|p| p.weight()).sum();
        self.current = Some(pos);
        self.sink.update(self.finished / self.total, phase.label());
    }

    /// Report `completed` of `total` steps within the current phase.
    pub fn step(&self, completed: usize, total: usize, label: Option<&str>) {
        let Some(pos) = self.current else {
            return;
        };
        let phase = self.phases[pos];
        let within = if total == 0 {
            1.0
        } else {
            (completed as f64 / total as f64).clamp(0.0, 1.0)
        };
        let fraction = (self.finished + within * phase.weight()) / self.total;
        self.sink.update(fraction.min(1.0), label.unwrap_or(phase.label()));
    }

    /// Report completion.
    pub fn finish(&mut self) {
        self.finished = self.total;
        self.sink.update(1.0, "done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_weighted_phases() {
        let seen = Mutex::new(Vec::new());
        let sink = |f: f64, label: &str| seen.lock().unwrap().push((f, label.to_string()));
        let mut tracker = PhaseTracker::new(&sink, vec![Phase::Mapping, Phase::Contour]);
        tracker.enter(Phase::Mapping);
        tracker.step(1, 2, None);
        tracker.enter(Phase::Contour);
        tracker.step(2, 2, Some("contour x"));
        tracker.finish();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen[0], (0.0, "mapping".to_string()));
        assert!((seen[1].0 - 0.75 / 5.5).abs() < 1e-12);
        assert!((seen[2].0 - 1.5 / 5.5).abs() < 1e-12);
        assert!((seen[3].0 - 1.0).abs() < 1e-12);
        assert_eq!(seen[3].1, "contour x");
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        let shared = token.clone();
        shared.cancel();
        assert!(matches!(token.check(), Err(CamError::Cancelled)));
    }
}
