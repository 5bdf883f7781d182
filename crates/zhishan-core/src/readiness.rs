//! Scene readiness - counts tile completions and fires the ready signal once
//!
//! Tiles complete in any order. Once every expected tile has either landed or
//! been skipped, the tracker waits a short settle delay so the last tile's
//! geometry reaches the GPU, then reports readiness exactly once. It never
//! resets; a reload builds a fresh tracker.

use std::time::Duration;

/// Summary handed out with the ready signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessOutcome {
    pub loaded: usize,
    pub skipped: usize,
}

impl ReadinessOutcome {
    /// True when at least one tile was dropped on the way
    pub fn is_degraded(&self) -> bool {
        self.skipped > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessPhase {
    /// Still waiting for tiles
    Waiting,
    /// All tiles accounted for, waiting out the settle delay
    Settling { since: Duration },
    /// Ready signal has been handed out
    Ready,
}

#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    expected: usize,
    completed: usize,
    skipped: usize,
    settle: Duration,
    phase: ReadinessPhase,
}

impl ReadinessTracker {
    pub fn new(expected: usize, settle: Duration) -> Self {
        Self {
            expected,
            completed: 0,
            skipped: 0,
            settle,
            phase: ReadinessPhase::Waiting,
        }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn phase(&self) -> ReadinessPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == ReadinessPhase::Ready
    }

    /// Record one finished tile. Calls past the threshold are ignored.
    ///
    /// Returns whether the call was counted.
    pub fn notify_tile_loaded(&mut self, now: Duration) -> bool {
        if self.completed >= self.expected {
            return false;
        }
        self.completed += 1;
        self.arm_if_complete(now);
        true
    }

    /// Drop one tile from the expected total (failed or timed out).
    ///
    /// Returns whether the call changed anything.
    pub fn skip_tile(&mut self, now: Duration) -> bool {
        if self.phase != ReadinessPhase::Waiting || self.completed >= self.expected {
            return false;
        }
        self.expected -= 1;
        self.skipped += 1;
        self.arm_if_complete(now);
        true
    }

    /// Advance the settle timer. Returns the outcome exactly once.
    pub fn poll(&mut self, now: Duration) -> Option<ReadinessOutcome> {
        self.arm_if_complete(now);

        match self.phase {
            ReadinessPhase::Settling { since } if now.saturating_sub(since) >= self.settle => {
                self.phase = ReadinessPhase::Ready;
                Some(ReadinessOutcome {
                    loaded: self.completed,
                    skipped: self.skipped,
                })
            }
            _ => None,
        }
    }

    fn arm_if_complete(&mut self, now: Duration) {
        if self.phase == ReadinessPhase::Waiting && self.completed >= self.expected {
            self.phase = ReadinessPhase::Settling { since: now };
        }
    }
}
