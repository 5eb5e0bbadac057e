use crate::error::{MeshrunError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Specification of one supervised service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Service name (unique identifier)
    pub name: String,

    /// Path to the script or executable to run
    pub script: PathBuf,

    /// Command-line arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for the service
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Conventional port, shown in operator messages only.
    /// The supervisor never binds or probes it.
    #[serde(default)]
    pub port: Option<u16>,
}

/// Timing settings for the supervision run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// How long to wait after spawning before judging startup success (in seconds)
    #[serde(default = "default_startup_grace")]
    pub startup_grace_secs: u64,

    /// How often to poll service liveness (in seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Timeout before a graceful stop escalates to SIGKILL (in seconds)
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,
}

// Default value functions for serde
fn default_startup_grace() -> u64 {
    2
}

fn default_poll_interval() -> u64 {
    1
}

fn default_stop_timeout() -> u64 {
    5
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            startup_grace_secs: default_startup_grace(),
            poll_interval_secs: default_poll_interval(),
            stop_timeout_secs: default_stop_timeout(),
        }
    }
}

impl SupervisorSettings {
    /// Get startup grace as Duration
    pub fn startup_grace(&self) -> Duration {
        Duration::from_secs(self.startup_grace_secs)
    }

    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Get stop timeout as Duration
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

/// Full run configuration: which services to launch, and how to supervise them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    #[serde(default)]
    pub services: Vec<ServiceSpec>,

    #[serde(default)]
    pub supervisor: SupervisorSettings,
}

impl MeshConfig {
    /// The built-in service pair: registry first, then gateway.
    ///
    /// Mirrors the mesh simulation this supervisor fronts. Ports are
    /// operator documentation, not bindings.
    pub fn default_services() -> Vec<ServiceSpec> {
        vec![
            ServiceSpec {
                name: "service-registry".to_string(),
                script: PathBuf::from("python3"),
                args: vec!["registry.py".to_string()],
                cwd: None,
                env: HashMap::new(),
                port: Some(8081),
            },
            ServiceSpec {
                name: "service-mesh-gateway".to_string(),
                script: PathBuf::from("python3"),
                args: vec!["gateway.py".to_string()],
                cwd: None,
                env: HashMap::new(),
                port: Some(8080),
            },
        ]
    }

    /// Load a run configuration from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<MeshConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MeshrunError::ConfigError(format!("Failed to read config file: {}", e)))?;

        // Determine format based on file extension
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(MeshrunError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        // Expand environment variables in all service specs
        for spec in &mut config.services {
            spec.expand_env_vars();
        }

        config.validate()?;

        Ok(config)
    }

    /// Parse TOML configuration file
    fn parse_toml(contents: &str) -> Result<MeshConfig> {
        let config: MeshConfig = toml::from_str(contents)
            .map_err(|e| MeshrunError::InvalidConfig(format!("Failed to parse TOML: {}", e)))?;

        if config.services.is_empty() {
            return Err(MeshrunError::InvalidConfig(
                "No service configuration found in file".to_string(),
            ));
        }

        Ok(config)
    }

    /// Parse JSON configuration file
    fn parse_json(contents: &str) -> Result<MeshConfig> {
        let config: MeshConfig = serde_json::from_str(contents)
            .map_err(|e| MeshrunError::InvalidConfig(format!("Failed to parse JSON: {}", e)))?;

        if config.services.is_empty() {
            return Err(MeshrunError::InvalidConfig(
                "No service configuration found in file".to_string(),
            ));
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for spec in &self.services {
            spec.validate()?;
        }

        // Service names key the supervision table; duplicates would make
        // status lines ambiguous
        let mut seen = std::collections::HashSet::new();
        for spec in &self.services {
            if !seen.insert(&spec.name) {
                return Err(MeshrunError::ConfigValidationError(format!(
                    "Duplicate service name: {}",
                    spec.name
                )));
            }
        }

        if self.supervisor.poll_interval_secs == 0 {
            return Err(MeshrunError::ConfigValidationError(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }

        if self.supervisor.stop_timeout_secs == 0 {
            return Err(MeshrunError::ConfigValidationError(
                "stop_timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl ServiceSpec {
    /// Validate a single service spec
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(MeshrunError::MissingConfigField("name".to_string()));
        }

        if self.script.as_os_str().is_empty() {
            return Err(MeshrunError::MissingConfigField("script".to_string()));
        }

        // Validate working directory exists if specified
        if let Some(ref cwd) = self.cwd {
            if !cwd.exists() {
                return Err(MeshrunError::ConfigValidationError(format!(
                    "Working directory does not exist: {}",
                    cwd.display()
                )));
            }
            if !cwd.is_dir() {
                return Err(MeshrunError::ConfigValidationError(format!(
                    "Working directory is not a directory: {}",
                    cwd.display()
                )));
            }
        }

        Ok(())
    }

    /// Expand environment variables in spec fields
    fn expand_env_vars(&mut self) {
        self.script = Self::expand_env_in_path(&self.script);

        if let Some(ref cwd) = self.cwd {
            self.cwd = Some(Self::expand_env_in_path(cwd));
        }

        self.args = self
            .args
            .iter()
            .map(|arg| Self::expand_env_in_string(arg))
            .collect();

        self.env = self
            .env
            .iter()
            .map(|(k, v)| (k.clone(), Self::expand_env_in_string(v)))
            .collect();
    }

    /// Expand environment variables in a string
    fn expand_env_in_string(s: &str) -> String {
        let mut result = s.to_string();

        // Handle $VAR and ${VAR} syntax
        for (key, value) in std::env::vars() {
            result = result.replace(&format!("${{{}}}", key), &value);
            result = result.replace(&format!("${}", key), &value);
        }

        result
    }

    /// Expand environment variables in a path
    fn expand_env_in_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = Self::expand_env_in_string(&path_str);
        PathBuf::from(expanded)
    }
}
