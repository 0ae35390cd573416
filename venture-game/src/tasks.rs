//! Cooperative timed tasks.
//!
//! Progress animations (idea validation, campaign ticks) run as a task that a
//! host ticks on a fixed cadence. When the work finishes the task writes into
//! the game state exactly once. Cancelling the token before that write
//! guarantees the write never happens.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::state::GameState;

/// A unit of work advanced one tick at a time.
pub trait ProgressWork {
    type Output;

    /// Advance by one tick, returning the output once the work is done.
    fn step(&mut self) -> Option<Self::Output>;

    /// Completion percentage, 0..=100.
    fn progress(&self) -> u8;

    /// Single write into the shared state.
    fn commit(output: Self::Output, state: &mut GameState);
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running { progress: u8 },
    Finished,
    Cancelled,
    Committed,
}

impl TaskStatus {
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

pub struct TimedTask<W: ProgressWork> {
    work: W,
    token: CancellationToken,
    output: Option<W::Output>,
    status: TaskStatus,
    period: Duration,
}

impl<W: ProgressWork> fmt::Debug for TimedTask<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedTask")
            .field("status", &self.status)
            .field("period", &self.period)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<W: ProgressWork> TimedTask<W> {
    #[must_use]
    pub fn new(work: W, period: Duration) -> Self {
        let progress = work.progress();
        Self {
            work,
            token: CancellationToken::new(),
            output: None,
            status: TaskStatus::Running { progress },
            period,
        }
    }

    /// Handle the host keeps to cancel on teardown.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub const fn work(&self) -> &W {
        &self.work
    }

    pub fn cancel(&mut self) {
        self.token.cancel();
        if !matches!(self.status, TaskStatus::Committed) {
            self.status = TaskStatus::Cancelled;
            self.output = None;
        }
    }

    /// Advance one tick.
    pub fn tick(&mut self) -> TaskStatus {
        if self.token.is_cancelled() && !matches!(self.status, TaskStatus::Committed) {
            self.status = TaskStatus::Cancelled;
            self.output = None;
        }
        if let TaskStatus::Running { .. } = self.status {
            match self.work.step() {
                Some(output) => {
                    self.output = Some(output);
                    self.status = TaskStatus::Finished;
                }
                None => {
                    self.status = TaskStatus::Running {
                        progress: self.work.progress(),
                    };
                }
            }
        }
        self.status
    }

    /// Tick until the work is no longer running.
    pub fn run_to_end(&mut self) -> TaskStatus {
        while self.tick().is_running() {}
        self.status
    }

    /// Write the finished output into the state. Returns `false` when the
    /// task is still running, was cancelled, or already committed.
    pub fn commit(&mut self, state: &mut GameState) -> bool {
        if self.token.is_cancelled() {
            self.status = TaskStatus::Cancelled;
            self.output = None;
            return false;
        }
        match self.output.take() {
            Some(output) if self.status == TaskStatus::Finished => {
                W::commit(output, state);
                self.status = TaskStatus::Committed;
                true
            }
            other => {
                self.output = other;
                false
            }
        }
    }

    /// Tick on the task period until the work stops running.
    #[cfg(feature = "async")]
    pub async fn drive(&mut self) -> TaskStatus {
        if self.period.is_zero() {
            return self.run_to_end();
        }
        let mut interval = tokio::time::interval(self.period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let status = self.tick();
            if !status.is_running() {
                return status;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown {
        left: u8,
    }

    impl ProgressWork for Countdown {
        type Output = i64;

        fn step(&mut self) -> Option<i64> {
            self.left = self.left.saturating_sub(1);
            (self.left == 0).then_some(7)
        }

        fn progress(&self) -> u8 {
            100 - self.left * 25
        }

        fn commit(output: i64, state: &mut GameState) {
            state.update_score(output);
        }
    }

    #[test]
    fn finished_task_commits_exactly_once() {
        let mut state = GameState::default();
        let mut task = TimedTask::new(Countdown { left: 4 }, Duration::ZERO);
        assert_eq!(task.tick(), TaskStatus::Running { progress: 25 });
        assert!(!task.commit(&mut state));
        assert_eq!(task.run_to_end(), TaskStatus::Finished);
        assert!(task.commit(&mut state));
        assert!(!task.commit(&mut state));
        assert_eq!(state.score, 7);
        assert_eq!(task.status(), TaskStatus::Committed);
    }

    #[test]
    fn cancelled_task_never_writes() {
        let mut state = GameState::default();
        let mut task = TimedTask::new(Countdown { left: 2 }, Duration::ZERO);
        let token = task.token();
        task.run_to_end();
        token.cancel();
        assert!(!task.commit(&mut state));
        assert_eq!(task.status(), TaskStatus::Cancelled);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn cancel_stops_ticking() {
        let mut task = TimedTask::new(Countdown { left: 3 }, Duration::ZERO);
        task.cancel();
        assert_eq!(task.tick(), TaskStatus::Cancelled);
        assert_eq!(task.work().left, 3);
    }
}
