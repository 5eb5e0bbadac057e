use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::process::Child;

/// Lifecycle state of a single supervised service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    /// Survived the startup grace period and is being monitored
    Running,
    /// Observed dead during monitoring; warned about once, never restarted
    Exited,
    /// Graceful stop in progress
    Stopping,
    /// Exited within the stop timeout after SIGTERM
    Stopped,
    /// Did not exit within the stop timeout and was SIGKILLed
    Killed,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceState::Running => write!(f, "running"),
            ServiceState::Exited => write!(f, "exited"),
            ServiceState::Stopping => write!(f, "stopping"),
            ServiceState::Stopped => write!(f, "stopped"),
            ServiceState::Killed => write!(f, "killed"),
        }
    }
}

/// A successfully launched service owned by the supervisor
#[derive(Debug)]
pub struct SupervisedService {
    pub name: String,
    pub pid: u32,
    pub child: Child,
    pub state: ServiceState,
    /// Conventional port for operator messages; never bound or probed
    pub port: Option<u16>,
    pub started_at: SystemTime,
}

impl SupervisedService {
    pub fn new(name: String, pid: u32, child: Child, port: Option<u16>) -> Self {
        Self {
            name,
            pid,
            child,
            state: ServiceState::Running,
            port,
            started_at: SystemTime::now(),
        }
    }

    pub fn mark_exited(&mut self) {
        self.state = ServiceState::Exited;
    }

    pub fn mark_stopping(&mut self) {
        self.state = ServiceState::Stopping;
    }

    pub fn mark_stopped(&mut self) {
        self.state = ServiceState::Stopped;
    }

    pub fn mark_killed(&mut self) {
        self.state = ServiceState::Killed;
    }
}

/// Ordered collection of all services that survived the launch phase.
///
/// Insertion order is launch order, and shutdown walks the same order.
/// Entries are never added after monitoring begins; only their state changes.
#[derive(Debug, Default)]
pub struct SupervisionTable {
    services: Vec<SupervisedService>,
}

impl SupervisionTable {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
        }
    }

    pub fn track(&mut self, service: SupervisedService) {
        self.services.push(service);
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SupervisedService> {
        self.services.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SupervisedService> {
        self.services.iter_mut()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SupervisedService> {
        self.services.iter().find(|s| s.name == name)
    }
}

/// How one service's shutdown attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopOutcome {
    /// Exited on its own within the stop timeout after SIGTERM
    Graceful,
    /// Ignored SIGTERM past the stop timeout and was SIGKILLed
    Killed,
    /// Was already dead when shutdown reached it
    AlreadyExited,
    /// Signaling or waiting failed; shutdown of the others continued
    Failed(String),
}

impl std::fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopOutcome::Graceful => write!(f, "stopped gracefully"),
            StopOutcome::Killed => write!(f, "force killed"),
            StopOutcome::AlreadyExited => write!(f, "already exited"),
            StopOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Final per-service shutdown record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReport {
    pub name: String,
    pub outcome: StopOutcome,
}
