// src/matcher/progress.rs
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, debug, trace};
use crate::error::{Error, Result};

// Resolution of the progress bar; fractions are scaled to this many steps.
const BAR_STEPS: u64 = 1000;

/// Coarse-grained stages reported to a progress sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Binning { table: usize },
    Scoring,
    Resolution,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Binning { table } => write!(f, "Binning rows for table {}", table + 1),
            Phase::Scoring => write!(f, "Scoring candidate pairs"),
            Phase::Resolution => write!(f, "Resolving matches"),
        }
    }
}

/// Receives progress for a running match. Within a phase the reported
/// fraction never decreases and stays within `[0, 1]`.
pub trait ProgressSink: Send + Sync {
    fn start_phase(&self, phase: Phase);
    fn set_level(&self, fraction: f64);
    fn end_phase(&self);
    fn log_message(&self, _message: &str) {}
}

/// Reports phases through the `log` facade.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn start_phase(&self, phase: Phase) {
        info!("{}", phase);
    }

    fn set_level(&self, fraction: f64) {
        trace!("progress {:.1}%", fraction * 100.0);
    }

    fn end_phase(&self) {
        debug!("phase complete");
    }

    fn log_message(&self, message: &str) {
        info!("{}", message);
    }
}

/// Drives an `indicatif` bar, one pass of the bar per phase.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(BAR_STEPS);
        bar.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:<28} [{bar:40.cyan/blue}] {percent:>3}% ({elapsed_precise})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"));
        Self { bar }
    }

    pub fn from_bar(bar: ProgressBar) -> Self {
        bar.set_length(BAR_STEPS);
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn start_phase(&self, phase: Phase) {
        self.bar.reset();
        self.bar.set_message(phase.to_string());
    }

    fn set_level(&self, fraction: f64) {
        self.bar.set_position((fraction * BAR_STEPS as f64).round() as u64);
    }

    fn end_phase(&self) {
        self.bar.set_position(BAR_STEPS);
    }

    fn log_message(&self, message: &str) {
        self.bar.println(message);
    }
}

/// Shared abort flag, polled cooperatively by the matcher.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clears a previous cancellation so the token can be reused.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Lifecycle of one matching call. Transitions only move forward;
/// `Aborted` is reachable from any state that is not terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchState {
    Init,
    Binning,
    Scoring,
    Resolution,
    Done,
    Aborted,
}

impl MatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchState::Done | MatchState::Aborted)
    }

    pub fn can_advance_to(&self, next: MatchState) -> bool {
        use MatchState::*;
        match (*self, next) {
            (Done, _) | (Aborted, _) => false,
            (_, Aborted) => true,
            (Init, Binning) | (Binning, Scoring) | (Scoring, Resolution) | (Resolution, Done) => true,
            _ => false,
        }
    }
}

/// Per-call bookkeeping between the matcher and its sink: enforces the
/// state machine, keeps fractions monotonic and polls for cancellation.
pub(crate) struct PhaseTracker<'a> {
    sink: Option<&'a dyn ProgressSink>,
    cancel: &'a CancelToken,
    state: MatchState,
    phase: Option<Phase>,
    level: f64,
    phase_start: Instant,
}

impl<'a> PhaseTracker<'a> {
    pub(crate) fn new(sink: Option<&'a dyn ProgressSink>, cancel: &'a CancelToken) -> Self {
        Self {
            sink,
            cancel,
            state: MatchState::Init,
            phase: None,
            level: 0.0,
            phase_start: Instant::now(),
        }
    }

    pub(crate) fn state(&self) -> MatchState {
        self.state
    }

    /// Moves the state machine forward, polling for cancellation first.
    pub(crate) fn enter(&mut self, next: MatchState) -> Result<()> {
        self.checkpoint()?;
        self.transition(next)
    }

    fn transition(&mut self, next: MatchState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::invalid_state(format!("{:?} -> {:?}", self.state, next)));
        }
        debug!("Match state {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }

    pub(crate) fn start_phase(&mut self, phase: Phase) -> Result<()> {
        self.checkpoint()?;
        self.phase = Some(phase);
        self.level = 0.0;
        self.phase_start = Instant::now();
        if let Some(sink) = self.sink {
            sink.start_phase(phase);
            sink.set_level(0.0);
        }
        Ok(())
    }

    /// Reports a fraction of the current phase. Values below the last
    /// reported level are ignored.
    pub(crate) fn set_level(&mut self, fraction: f64) {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        if fraction <= self.level {
            return;
        }
        self.level = fraction;
        if let Some(sink) = self.sink {
            sink.set_level(fraction);
        }
    }

    pub(crate) fn end_phase(&mut self) -> Result<()> {
        self.set_level(1.0);
        if let Some(phase) = self.phase.take() {
            debug!("{} took {:?}", phase, self.phase_start.elapsed());
            if let Some(sink) = self.sink {
                sink.end_phase();
            }
        }
        self.checkpoint()
    }

    pub(crate) fn log_message(&self, message: &str) {
        if let Some(sink) = self.sink {
            sink.log_message(message);
        }
    }

    /// Polls the cancel flag; on cancellation the call is aborted.
    pub(crate) fn checkpoint(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            self.abort();
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if self.phase.take().is_some() {
            if let Some(sink) = self.sink {
                sink.end_phase();
            }
        }
        info!("Matching cancelled during {:?}", self.state);
        self.state = MatchState::Aborted;
    }

    pub(crate) fn finish(&mut self) -> Result<()> {
        self.transition(MatchState::Done)
    }
}
