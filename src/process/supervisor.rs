use crate::config::{ServiceSpec, SupervisorSettings};
use crate::error::{MeshrunError, Result};
use crate::process::launcher;
use crate::process::types::{
    ServiceReport, ServiceState, StopOutcome, SupervisedService, SupervisionTable,
};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Overall state of a supervision run
///
/// Transitions are one-way: Monitoring -> ShuttingDown -> Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Monitoring,
    ShuttingDown,
    Stopped,
}

/// Owns the supervision table and drives the launch, monitor, and shutdown
/// phases of a run
///
/// A single control task touches the table, so no locking is involved: the
/// supervised processes run in parallel as OS processes, but the supervisor
/// only observes and signals them.
pub struct Supervisor {
    settings: SupervisorSettings,
    table: SupervisionTable,
    state: SupervisorState,
}

impl Supervisor {
    pub fn new(settings: SupervisorSettings) -> Self {
        Self {
            settings,
            table: SupervisionTable::new(),
            state: SupervisorState::Monitoring,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn table(&self) -> &SupervisionTable {
        &self.table
    }

    /// Launch every spec in order, tracking the ones that come up
    ///
    /// A failed launch is reported and skipped; the run proceeds with
    /// whatever subset started. Only a fully failed launch phase is fatal.
    ///
    /// # Returns
    /// * `Ok(count)` - Number of services now being tracked
    /// * `Err(MeshrunError::NoServicesStarted)` - Nothing came up
    pub async fn launch_all(&mut self, specs: &[ServiceSpec]) -> Result<usize> {
        for spec in specs {
            match launcher::launch(spec, self.settings.startup_grace()).await {
                Ok(service) => {
                    self.table.track(service);
                }
                Err(e) => {
                    error!("Skipping service '{}': {}", spec.name, e);
                }
            }
        }

        if self.table.is_empty() {
            return Err(MeshrunError::NoServicesStarted);
        }

        Ok(self.table.len())
    }

    /// Check liveness of every running service once, without blocking
    ///
    /// The first time a service is observed dead it is warned about and
    /// marked `Exited`; later polls skip it. Dead services are never
    /// restarted.
    ///
    /// # Returns
    /// Names of services newly observed dead during this poll
    pub fn poll_services(&mut self) -> Vec<String> {
        let mut newly_exited = Vec::new();

        for service in self.table.iter_mut() {
            if service.state != ServiceState::Running {
                continue;
            }

            match service.child.try_wait() {
                Ok(Some(status)) => {
                    warn!(
                        "Service '{}' stopped unexpectedly ({})",
                        service.name, status
                    );
                    service.mark_exited();
                    newly_exited.push(service.name.clone());
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Liveness check failed for service '{}': {}", service.name, e);
                }
            }
        }

        newly_exited
    }

    /// Monitor the tracked services until the cancellation signal fires,
    /// then run the shutdown protocol
    ///
    /// Liveness is polled on a fixed interval; cancellation is observed
    /// between ticks, so shutdown begins within one poll interval of the
    /// signal. The signal is one-shot: once taken, the supervisor commits
    /// to the shutdown path.
    pub async fn run_until(
        &mut self,
        mut shutdown: oneshot::Receiver<()>,
    ) -> Result<Vec<ServiceReport>> {
        if self.table.is_empty() {
            return Err(MeshrunError::NoServicesStarted);
        }

        info!(
            "Monitoring {} service(s) (poll interval: {}s)",
            self.table.len(),
            self.settings.poll_interval_secs
        );

        let mut ticker = tokio::time::interval(self.settings.poll_interval());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_services();
                }
                _ = &mut shutdown => {
                    info!("Received shutdown signal, stopping all services");
                    break;
                }
            }
        }

        Ok(self.shutdown().await)
    }

    /// Stop every tracked service, in launch order, with the escalating
    /// protocol: SIGTERM, bounded wait, SIGKILL
    ///
    /// Shutdown is best-effort and total: each service gets exactly one
    /// terminate-then-possibly-kill attempt, and a failure on one never
    /// blocks the teardown of its siblings.
    pub async fn shutdown(&mut self) -> Vec<ServiceReport> {
        self.state = SupervisorState::ShuttingDown;

        let stop_timeout = self.settings.stop_timeout();
        let mut reports = Vec::with_capacity(self.table.len());

        for service in self.table.iter_mut() {
            let outcome = stop_service(service, stop_timeout).await;
            match &outcome {
                StopOutcome::Failed(reason) => {
                    error!("Error stopping service '{}': {}", service.name, reason);
                }
                _ => {
                    info!("Service '{}' {}", service.name, outcome);
                }
            }
            reports.push(ServiceReport {
                name: service.name.clone(),
                outcome,
            });
        }

        self.state = SupervisorState::Stopped;
        info!("All services stopped");

        reports
    }
}

/// Run the escalating stop protocol against a single service
async fn stop_service(service: &mut SupervisedService, stop_timeout: Duration) -> StopOutcome {
    if service.state != ServiceState::Running {
        debug!("Service '{}' already dead, nothing to stop", service.name);
        return StopOutcome::AlreadyExited;
    }

    service.mark_stopping();

    let pid = Pid::from_raw(service.pid as i32);

    debug!(
        "Stopping service '{}' (PID: {}) with SIGTERM",
        service.name, service.pid
    );

    if let Err(e) = signal::kill(pid, Signal::SIGTERM) {
        if e == Errno::ESRCH {
            // Vanished between the last poll and the signal
            let _ = service.child.try_wait();
            service.mark_exited();
            return StopOutcome::AlreadyExited;
        }
        return StopOutcome::Failed(format!("Failed to send SIGTERM: {}", e));
    }

    match tokio::time::timeout(stop_timeout, service.child.wait()).await {
        Ok(Ok(status)) => {
            debug!(
                "Service '{}' exited gracefully with status: {:?}",
                service.name, status
            );
            service.mark_stopped();
            StopOutcome::Graceful
        }
        Ok(Err(e)) => StopOutcome::Failed(format!("Wait failed: {}", e)),
        Err(_) => {
            warn!(
                "Service '{}' did not exit within {:?}, sending SIGKILL",
                service.name, stop_timeout
            );
            if let Err(e) = signal::kill(pid, Signal::SIGKILL) {
                return StopOutcome::Failed(format!("Failed to send SIGKILL: {}", e));
            }
            let _ = service.child.wait().await;
            service.mark_killed();
            StopOutcome::Killed
        }
    }
}
