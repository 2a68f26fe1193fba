use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    instrumentation::{instrumented, CycleRecorder},
    pipeline::Cycle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Runs a [`Cycle`] immediately and then once per `interval`, recording
/// every outcome.
///
/// Cycles never overlap. Cancellation is observed only between cycles: a
/// cycle that is in flight when the token fires runs to completion and is
/// recorded, after which no further cycle starts.
pub struct Scheduler<C, R> {
    cycle: C,
    recorder: R,
    interval: Duration,
    credential: String,
    state: watch::Sender<SchedulerState>,
}

impl<C, R> Scheduler<C, R>
where
    C: Cycle,
    R: CycleRecorder,
{
    pub fn new(cycle: C, recorder: R, interval: Duration, credential: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            cycle,
            recorder,
            interval,
            credential: credential.into(),
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn transition(&self, to: SchedulerState) {
        tracing::debug!(state = ?to, "scheduler state");
        self.state.send_replace(to);
    }

    /// Drive the loop until `shutdown` is cancelled. Returns the number of
    /// cycles executed.
    pub async fn run(self, shutdown: CancellationToken) -> u64 {
        let mut cycles: u64 = 0;

        if !shutdown.is_cancelled() {
            tracing::info!(interval_secs = self.interval.as_secs(), "scheduler started");
            loop {
                self.transition(SchedulerState::Running);
                let res = instrumented(&self.recorder, || self.cycle.run_cycle(&self.credential)).await;
                cycles += 1;
                if let Err(e) = res {
                    tracing::error!(error = %e, cycle = cycles, "cycle failed");
                }
                self.transition(SchedulerState::Idle);

                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        }

        self.transition(SchedulerState::Stopped);
        tracing::info!(cycles, "scheduler stopped");
        cycles
    }
}
