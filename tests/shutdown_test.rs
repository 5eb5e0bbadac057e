use meshrun::config::{ServiceSpec, SupervisorSettings};
use meshrun::process::{ServiceState, StopOutcome, Supervisor, SupervisorState};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

fn spec(name: &str, script: &str, args: &[&str]) -> ServiceSpec {
    ServiceSpec {
        name: name.to_string(),
        script: PathBuf::from(script),
        args: args.iter().map(|s| s.to_string()).collect(),
        cwd: None,
        env: HashMap::new(),
        port: None,
    }
}

fn settings() -> SupervisorSettings {
    SupervisorSettings {
        startup_grace_secs: 1,
        poll_interval_secs: 1,
        stop_timeout_secs: 2,
    }
}

#[tokio::test]
async fn test_graceful_and_forced_outcomes() {
    let mut supervisor = Supervisor::new(settings());

    supervisor
        .launch_all(&[
            spec("polite", "/bin/sleep", &["30"]),
            spec("stubborn", "/bin/sh", &["-c", "trap '' TERM; sleep 30"]),
        ])
        .await
        .unwrap();

    let start = Instant::now();
    let reports = supervisor.shutdown().await;
    let elapsed = start.elapsed();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].name, "polite");
    assert_eq!(reports[0].outcome, StopOutcome::Graceful);
    assert_eq!(reports[1].name, "stubborn");
    assert_eq!(reports[1].outcome, StopOutcome::Killed);

    // Worst case is one stop timeout per tracked service
    assert!(elapsed < Duration::from_secs(2 * 2 + 1));
    assert_eq!(supervisor.state(), SupervisorState::Stopped);
}

#[tokio::test]
async fn test_dead_service_never_blocks_siblings() {
    let mut supervisor = Supervisor::new(settings());

    supervisor
        .launch_all(&[
            spec("short-lived", "/bin/sleep", &["2"]),
            spec("long-lived", "/bin/sleep", &["30"]),
        ])
        .await
        .unwrap();

    // Outlive the first service, then observe its death
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let newly_exited = supervisor.poll_services();
    assert_eq!(newly_exited, vec!["short-lived".to_string()]);

    let reports = supervisor.shutdown().await;

    assert_eq!(reports[0].outcome, StopOutcome::AlreadyExited);
    assert_eq!(reports[1].outcome, StopOutcome::Graceful);
}

#[tokio::test]
async fn test_unexpected_exit_warned_once_within_a_poll() {
    let mut supervisor = Supervisor::new(settings());

    supervisor
        .launch_all(&[spec("flaky", "/bin/sleep", &["2"])])
        .await
        .unwrap();

    // The sleep ends on its own shortly after the grace period
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let first_poll = supervisor.poll_services();
    assert_eq!(first_poll, vec!["flaky".to_string()]);
    assert_eq!(
        supervisor.table().find_by_name("flaky").unwrap().state,
        ServiceState::Exited
    );

    // No repeated alerts and no restart
    assert!(supervisor.poll_services().is_empty());
    assert_eq!(
        supervisor.table().find_by_name("flaky").unwrap().state,
        ServiceState::Exited
    );
}

// The end-to-end run: one service survives launch, monitoring ticks,
// cancellation arrives, the survivor stops gracefully.
#[tokio::test]
async fn test_full_supervision_run() {
    let mut supervisor = Supervisor::new(settings());

    let count = supervisor
        .launch_all(&[
            spec("a", "/bin/sleep", &["30"]),
            spec("b", "/bin/sh", &["-c", "exit 1"]),
        ])
        .await
        .unwrap();

    assert_eq!(count, 1);
    assert!(supervisor.table().find_by_name("a").is_some());
    assert!(supervisor.table().find_by_name("b").is_none());

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        // Let at least one monitor tick pass before cancelling
        tokio::time::sleep(Duration::from_millis(1200)).await;
        let _ = tx.send(());
    });

    let reports = supervisor.run_until(rx).await.unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].name, "a");
    assert_eq!(reports[0].outcome, StopOutcome::Graceful);
    assert_eq!(supervisor.state(), SupervisorState::Stopped);
}

#[tokio::test]
async fn test_shutdown_latency_bounded_by_poll_interval() {
    let mut supervisor = Supervisor::new(settings());

    supervisor
        .launch_all(&[spec("svc", "/bin/sleep", &["30"])])
        .await
        .unwrap();

    let (tx, rx) = oneshot::channel();
    let cancelled_at = Instant::now();
    let _ = tx.send(());

    let reports = supervisor.run_until(rx).await.unwrap();
    let latency = cancelled_at.elapsed();

    assert_eq!(reports[0].outcome, StopOutcome::Graceful);
    // Cancellation is observed within one poll interval, and the single
    // service stops well inside its timeout
    assert!(latency < Duration::from_secs(1 + 2));
}
