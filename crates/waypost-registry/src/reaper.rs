//! Background removal of services the directory reports as critical.
//!
//! Reaping is directory-wide: any critical service is deregistered, whoever
//! registered it. A host runs at most one reaper task. Once started it polls
//! until [`CriticalServiceReaper::shutdown`] is called or the process exits.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use metrics::counter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};
use waypost_core::{DirectoryClient, HealthState, ReaperSchedule, RegistryError};

/// Outcome of one reaping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub found: usize,
    pub deregistered: usize,
    pub failed: usize,
}

enum ReaperState {
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

pub struct CriticalServiceReaper {
    directory: Arc<dyn DirectoryClient>,
    schedule: ReaperSchedule,
    span: Span,
    cancel: CancellationToken,
    state: Mutex<ReaperState>,
}

impl CriticalServiceReaper {
    /// Logs go to the span that is current when the reaper is built.
    pub fn new(directory: Arc<dyn DirectoryClient>, schedule: ReaperSchedule) -> Self {
        Self {
            directory,
            schedule,
            span: Span::current(),
            cancel: CancellationToken::new(),
            state: Mutex::new(ReaperState::Idle),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn schedule(&self) -> ReaperSchedule {
        self.schedule
    }

    fn lock_state(&self) -> MutexGuard<'_, ReaperState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns the polling task on the current Tokio runtime.
    ///
    /// Returns false when a task is already running or the reaper has been
    /// shut down.
    pub fn start(&self) -> bool {
        let mut state = self.lock_state();
        match &*state {
            ReaperState::Running(handle) if !handle.is_finished() => {
                debug!(parent: &self.span, "critical service reaper already running");
                return false;
            }
            ReaperState::Stopped => {
                debug!(parent: &self.span, "critical service reaper was shut down, not restarting");
                return false;
            }
            ReaperState::Running(_) => {
                warn!(parent: &self.span, "critical service reaper exited unexpectedly, restarting");
            }
            ReaperState::Idle => {}
        }

        let task = run(self.directory.clone(), self.schedule, self.cancel.clone())
            .instrument(self.span.clone());
        *state = ReaperState::Running(tokio::spawn(task));
        true
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.lock_state(), ReaperState::Running(handle) if !handle.is_finished())
    }

    /// Cancels the polling task and waits for it to finish. Terminal.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let previous = {
            let mut state = self.lock_state();
            std::mem::replace(&mut *state, ReaperState::Stopped)
        };
        if let ReaperState::Running(handle) = previous {
            if let Err(e) = handle.await {
                warn!(parent: &self.span, error = %e, "critical service reaper task failed");
            }
        }
    }

    /// Runs a single pass immediately, independent of the background task.
    pub async fn reap_once(&self) -> Result<PassReport, RegistryError> {
        reap_critical(self.directory.as_ref())
            .instrument(self.span.clone())
            .await
    }
}

/// Deregisters every service currently in critical state.
///
/// A failed deregistration is logged and counted; the remaining ids are still
/// attempted. Only a failed state query fails the pass.
pub async fn reap_critical(directory: &dyn DirectoryClient) -> Result<PassReport, RegistryError> {
    let critical = directory.services_in_state(HealthState::Critical).await?;
    let mut report = PassReport {
        found: critical.len(),
        ..PassReport::default()
    };

    for service_id in &critical {
        match directory.deregister_service(service_id).await {
            Ok(()) => {
                report.deregistered += 1;
                debug!(%service_id, "deregistered critical service");
            }
            Err(e) => {
                report.failed += 1;
                warn!(%service_id, error = %e, "failed to deregister critical service");
            }
        }
    }
    Ok(report)
}

async fn run(directory: Arc<dyn DirectoryClient>, schedule: ReaperSchedule, cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(schedule.initial_delay) => {}
    }
    info!(interval = ?schedule.interval, "Starting to remove services in critical state");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = reap_critical(directory.as_ref()) => record_pass(outcome),
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(schedule.interval) => {}
        }
    }
    info!("Critical service reaper stopped");
}

fn record_pass(outcome: Result<PassReport, RegistryError>) {
    counter!("waypost_reaper_passes_total").increment(1);
    match outcome {
        Ok(report) => {
            counter!("waypost_reaper_deregistered_total").increment(report.deregistered as u64);
            if report.failed > 0 {
                counter!("waypost_reaper_pass_failures_total").increment(1);
                error!(
                    found = report.found,
                    failed = report.failed,
                    "Error while removing critical services"
                );
            } else if report.deregistered > 0 {
                info!(count = report.deregistered, "Removed critical services");
            }
        }
        Err(e) => {
            counter!("waypost_reaper_pass_failures_total").increment(1);
            error!(error = %e, "Error while removing critical services");
        }
    }
}
