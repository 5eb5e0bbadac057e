// Process module - launch, monitoring, and shutdown of supervised services

pub mod launcher;
mod supervisor;
mod types;

pub use launcher::launch;
pub use supervisor::{Supervisor, SupervisorState};
pub use types::{
    ServiceReport, ServiceState, StopOutcome, SupervisedService, SupervisionTable,
};
