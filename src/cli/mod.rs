// CLI module - argument parsing and run orchestration

pub mod output;

use crate::config::{MeshConfig, SupervisorSettings};
use crate::error::Result;
use crate::process::Supervisor;
use clap::Parser;
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;
use tracing::info;

/// meshrun - launch and supervise a fixed set of services
#[derive(Parser)]
#[command(name = "meshrun")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML or JSON service configuration file.
    /// Defaults to the built-in registry + gateway pair.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds to wait after spawning before judging startup success
    #[arg(long)]
    startup_grace: Option<u64>,

    /// Seconds between liveness polls
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Seconds to wait for a graceful exit before force-killing
    #[arg(long)]
    stop_timeout: Option<u64>,
}

impl Cli {
    /// Run the supervisor until cancelled
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute().await
    }

    /// Execute one full supervision run: launch, monitor, shut down
    async fn execute(&self) -> Result<()> {
        let config = self.effective_config()?;

        output::print_banner();

        let mut supervisor = Supervisor::new(config.supervisor.clone());

        let pb = output::create_progress_bar(&format!(
            "Launching {} service(s)...",
            config.services.len()
        ));
        match supervisor.launch_all(&config.services).await {
            Ok(count) => {
                output::finish_progress_success(
                    pb,
                    &format!("{}/{} service(s) started", count, config.services.len()),
                );
            }
            Err(e) => {
                output::finish_progress_error(pb, "Failed to start any services");
                return Err(e);
            }
        }

        output::print_running_summary(supervisor.table());

        let shutdown = Self::setup_signal_handlers();
        let reports = supervisor.run_until(shutdown).await?;

        output::print_report(&reports);

        Ok(())
    }

    /// Resolve the run configuration: config file or built-in defaults,
    /// with CLI flags overriding either
    fn effective_config(&self) -> Result<MeshConfig> {
        let mut config = match &self.config {
            Some(path) => MeshConfig::from_file(path)?,
            None => MeshConfig {
                services: MeshConfig::default_services(),
                supervisor: SupervisorSettings::default(),
            },
        };

        if let Some(secs) = self.startup_grace {
            config.supervisor.startup_grace_secs = secs;
        }
        if let Some(secs) = self.poll_interval {
            config.supervisor.poll_interval_secs = secs;
        }
        if let Some(secs) = self.stop_timeout {
            config.supervisor.stop_timeout_secs = secs;
        }

        config.validate()?;

        Ok(config)
    }

    /// Listen for SIGINT/SIGTERM and turn the first one into the one-shot
    /// cancellation signal the monitor loop selects on
    fn setup_signal_handlers() -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT");
                }
            }

            let _ = tx.send(());
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_config_defaults() {
        let cli = Cli {
            config: None,
            startup_grace: None,
            poll_interval: None,
            stop_timeout: None,
        };

        let config = cli.effective_config().unwrap();
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.supervisor.startup_grace_secs, 2);
    }

    #[test]
    fn test_effective_config_flag_overrides() {
        let cli = Cli {
            config: None,
            startup_grace: Some(1),
            poll_interval: Some(3),
            stop_timeout: Some(7),
        };

        let config = cli.effective_config().unwrap();
        assert_eq!(config.supervisor.startup_grace_secs, 1);
        assert_eq!(config.supervisor.poll_interval_secs, 3);
        assert_eq!(config.supervisor.stop_timeout_secs, 7);
    }

    #[test]
    fn test_effective_config_rejects_zero_poll_interval() {
        let cli = Cli {
            config: None,
            startup_grace: None,
            poll_interval: Some(0),
            stop_timeout: None,
        };

        assert!(cli.effective_config().is_err());
    }
}
