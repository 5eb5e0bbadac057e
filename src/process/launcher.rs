use crate::config::ServiceSpec;
use crate::error::{MeshrunError, Result};
use crate::process::types::SupervisedService;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{error, info};

/// Launch a service and verify it survives its startup grace period
///
/// The child is spawned with stdout and stderr captured as pipes so
/// diagnostics never interleave with the supervisor's own terminal. The
/// grace wait is a fixed delay, not a readiness probe: a process still
/// alive when it elapses is judged started.
///
/// # Arguments
/// * `spec` - Service specification (command, args, cwd, env)
/// * `startup_grace` - How long to wait before judging startup success
///
/// # Returns
/// * `Ok(SupervisedService)` - Process alive after the grace period
/// * `Err(MeshrunError::SpawnFailed)` - The OS could not start the process
/// * `Err(MeshrunError::EarlyExit)` - Process died inside the grace window
pub async fn launch(spec: &ServiceSpec, startup_grace: Duration) -> Result<SupervisedService> {
    info!("Starting service '{}'", spec.name);

    // Build the command
    let mut command = Command::new(&spec.script);

    if !spec.args.is_empty() {
        command.args(&spec.args);
    }

    if let Some(ref cwd) = spec.cwd {
        command.current_dir(cwd);
    }

    for (key, value) in &spec.env {
        command.env(key, value);
    }

    // Capture output so failure diagnostics can be retrieved later
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    // A spawn failure (missing executable, permissions) is reported
    // immediately, without burning the grace period
    let mut child = command
        .spawn()
        .map_err(|e| MeshrunError::SpawnFailed(spec.name.clone(), e.to_string()))?;

    let pid = child.id().ok_or_else(|| {
        MeshrunError::SpawnFailed(spec.name.clone(), "no PID for spawned process".to_string())
    })?;

    tokio::time::sleep(startup_grace).await;

    match child.try_wait() {
        Ok(None) => {
            info!("Service '{}' started successfully (PID: {})", spec.name, pid);
            Ok(SupervisedService::new(
                spec.name.clone(),
                pid,
                child,
                spec.port,
            ))
        }
        Ok(Some(status)) => {
            let stderr = drain_stderr(&mut child).await;
            error!(
                "Service '{}' exited during startup with {}: {}",
                spec.name,
                status,
                stderr.trim()
            );
            Err(MeshrunError::EarlyExit {
                service: spec.name.clone(),
                stderr,
            })
        }
        Err(e) => Err(MeshrunError::SpawnFailed(spec.name.clone(), e.to_string())),
    }
}

/// Drain whatever the dead child wrote to its captured stderr
async fn drain_stderr(child: &mut Child) -> String {
    let mut buf = Vec::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::types::ServiceState;
    use std::collections::HashMap;
    use std::path::PathBuf;

    const TEST_GRACE: Duration = Duration::from_millis(300);

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

    #[tokio::test]
    async fn test_launch_long_running_process() {
        let spec = spec("sleeper", "/bin/sleep", &["30"]);

        let mut service = launch(&spec, TEST_GRACE).await.unwrap();
        assert_eq!(service.name, "sleeper");
        assert_eq!(service.state, ServiceState::Running);
        assert!(service.pid > 0);

        let _ = service.child.start_kill();
    }

    #[tokio::test]
    async fn test_launch_captures_output_pipes() {
        let spec = spec("pipes", "/bin/sleep", &["30"]);

        let mut service = launch(&spec, TEST_GRACE).await.unwrap();
        assert!(service.child.stdout.is_some());
        assert!(service.child.stderr.is_some());

        let _ = service.child.start_kill();
    }

    #[tokio::test]
    async fn test_launch_early_exit_captures_stderr() {
        let spec = spec(
            "crasher",
            "/bin/sh",
            &["-c", "echo 'boot failure' >&2; exit 1"],
        );

        let result = launch(&spec, TEST_GRACE).await;

        match result {
            Err(MeshrunError::EarlyExit { service, stderr }) => {
                assert_eq!(service, "crasher");
                assert!(stderr.contains("boot failure"));
            }
            other => panic!("Expected EarlyExit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_launch_early_exit_clean_status() {
        // Even a zero-status exit inside the grace window is a startup failure
        let spec = spec("quitter", "/bin/true", &[]);

        let result = launch(&spec, TEST_GRACE).await;
        assert!(matches!(result, Err(MeshrunError::EarlyExit { .. })));
    }

    #[tokio::test]
    async fn test_launch_missing_executable_fails_fast() {
        let spec = spec("ghost", "/nonexistent/binary", &[]);

        let start = std::time::Instant::now();
        let result = launch(&spec, Duration::from_secs(5)).await;
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(MeshrunError::SpawnFailed(_, _))));
        // Spawn failures must not block for the grace period
        assert!(elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_launch_with_env_and_cwd() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut spec = spec("env-test", "/bin/sh", &["-c", "sleep 30"]);
        spec.cwd = Some(temp_dir.path().to_path_buf());
        spec.env
            .insert("MESH_ROLE".to_string(), "registry".to_string());

        let mut service = launch(&spec, TEST_GRACE).await.unwrap();
        assert_eq!(service.state, ServiceState::Running);

        let _ = service.child.start_kill();
    }
}
