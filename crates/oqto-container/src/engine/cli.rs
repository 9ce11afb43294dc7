//! Engine client backed by the Docker or Podman command line.

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use super::error::{EngineError, EngineResult};
use super::types::{
    ContainerConfig, ContainerCreated, ContainerInspect, HostConfig, ImageFilter, ImageSummary,
    NetworkingConfig, PullOptions, RemoveOptions, StartOptions,
};
use super::validate::{
    validate_container_id, validate_container_name, validate_env_entry, validate_image_reference,
    validate_port_spec,
};
use super::{EngineClient, EngineConnector, PullStream};
use crate::settings::EngineSettings;

/// Container runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    /// Docker runtime (default for macOS/Windows dev)
    Docker,
    /// Podman runtime (default for Linux)
    #[default]
    Podman,
}

impl RuntimeType {
    /// Get the default binary name for this runtime.
    pub fn default_binary(&self) -> &'static str {
        match self {
            RuntimeType::Docker => "docker",
            RuntimeType::Podman => "podman",
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeType::Docker => write!(f, "docker"),
            RuntimeType::Podman => write!(f, "podman"),
        }
    }
}

/// Engine client that shells out to `docker` or `podman`.
#[derive(Debug, Clone)]
pub struct CliEngine {
    /// The runtime type (docker or podman)
    runtime_type: RuntimeType,
    /// Path to the container binary
    binary: String,
    /// Stop grace period applied when a stop call passes no timeout.
    default_stop_timeout: Option<u32>,
}

impl Default for CliEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CliEngine {
    /// Create a new CLI engine with auto-detection.
    ///
    /// Prefers Docker on macOS, otherwise Podman, then Docker.
    pub fn new() -> Self {
        Self::with_type(Self::detect_runtime())
    }

    /// Create a CLI engine for a specific runtime type.
    pub fn with_type(runtime_type: RuntimeType) -> Self {
        Self {
            binary: runtime_type.default_binary().to_string(),
            runtime_type,
            default_stop_timeout: None,
        }
    }

    /// Create a CLI engine with a custom binary path.
    pub fn with_binary(runtime_type: RuntimeType, binary: impl Into<String>) -> Self {
        Self {
            runtime_type,
            binary: binary.into(),
            default_stop_timeout: None,
        }
    }

    /// Build an engine from loaded settings.
    pub fn from_settings(settings: &EngineSettings) -> Self {
        let engine = match (settings.runtime, &settings.binary) {
            (Some(rt), Some(binary)) => Self::with_binary(rt, binary.clone()),
            (Some(rt), None) => Self::with_type(rt),
            (None, Some(binary)) => Self::with_binary(Self::detect_runtime(), binary.clone()),
            (None, None) => Self::new(),
        };
        engine.stop_timeout(settings.stop_timeout_secs)
    }

    /// Set the stop grace period used when callers pass no timeout.
    pub fn stop_timeout(mut self, seconds: Option<u32>) -> Self {
        self.default_stop_timeout = seconds;
        self
    }

    /// Get the runtime type.
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    /// Get the binary this engine invokes.
    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn detect_runtime() -> RuntimeType {
        #[cfg(target_os = "macos")]
        {
            if Self::is_binary_available("docker") {
                return RuntimeType::Docker;
            }
        }

        if Self::is_binary_available("podman") {
            RuntimeType::Podman
        } else if Self::is_binary_available("docker") {
            RuntimeType::Docker
        } else {
            // Fall back to podman, will fail at health check
            RuntimeType::Podman
        }
    }

    /// Check if a binary is available in PATH.
    fn is_binary_available(name: &str) -> bool {
        std::process::Command::new("which")
            .arg(name)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Run the binary and return its output, failing on a non-zero exit.
    async fn output(&self, command: &str, args: &[String]) -> EngineResult<std::process::Output> {
        debug!("{} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A cancelled call drops this future; the command must not outlive it
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EngineError::NoRuntimeAvailable,
                _ => EngineError::command_failed(command, e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::command_failed(command, stderr.trim()));
        }

        Ok(output)
    }

    /// Check if the container runtime is available and working.
    pub async fn health_check(&self) -> EngineResult<String> {
        let args = ["version", "--format", "json"].map(String::from);
        let output = self.output("version", &args).await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn create_args(
        config: &ContainerConfig,
        host_config: &HostConfig,
        networking_config: &NetworkingConfig,
        name: &str,
    ) -> EngineResult<Vec<String>> {
        validate_image_reference(&config.image)?;

        let mut owned_args: Vec<String> = vec!["create".to_string()];

        // An empty name lets the engine pick one
        if !name.is_empty() {
            validate_container_name(name)?;
            owned_args.push("--name".to_string());
            owned_args.push(name.to_string());
        }

        for entry in &config.env {
            validate_env_entry(entry)?;
            owned_args.push("-e".to_string());
            owned_args.push(entry.clone());
        }

        for port in &config.exposed_ports {
            validate_port_spec(port)?;
            owned_args.push("--expose".to_string());
            owned_args.push(port.clone());
        }

        if host_config.publish_all_ports {
            owned_args.push("--publish-all".to_string());
        }

        if host_config.auto_remove {
            owned_args.push("--rm".to_string());
        }

        if let Some(ref network) = networking_config.network {
            owned_args.push("--network".to_string());
            owned_args.push(network.clone());
        }

        for alias in &networking_config.aliases {
            owned_args.push("--network-alias".to_string());
            owned_args.push(alias.clone());
        }

        owned_args.push(config.image.clone());
        Ok(owned_args)
    }

    fn parse_image_list(stdout: &str) -> EngineResult<Vec<ImageSummary>> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(vec![]);
        }

        // Podman prints a JSON array, Docker prints one object per line
        if trimmed.starts_with('[') {
            return serde_json::from_str(trimmed)
                .map_err(|e| EngineError::ParseError(e.to_string()));
        }

        trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| EngineError::ParseError(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl EngineClient for CliEngine {
    async fn list_images(&self, filter: &ImageFilter) -> EngineResult<Vec<ImageSummary>> {
        let mut args: Vec<String> = vec!["images".to_string()];
        for reference in filter.references() {
            validate_image_reference(reference)?;
            args.push("--filter".to_string());
            args.push(format!("reference={}", reference));
        }
        args.push("--format".to_string());
        args.push("json".to_string());

        let output = self.output("images", &args).await?;
        Self::parse_image_list(&String::from_utf8_lossy(&output.stdout))
    }

    async fn pull_image(
        &self,
        reference: &str,
        options: &PullOptions,
    ) -> EngineResult<PullStream> {
        validate_image_reference(reference)?;

        let mut args: Vec<String> = vec!["pull".to_string()];
        if let Some(ref platform) = options.platform {
            args.push("--platform".to_string());
            args.push(platform.clone());
        }
        args.push(reference.to_string());

        let output = match self.output("pull", &args).await {
            Ok(output) => output,
            Err(EngineError::CommandFailed { message, .. }) if is_missing_image(&message) => {
                return Err(EngineError::ImageNotFound(reference.to_string()));
            }
            Err(e) => return Err(e),
        };
        info!("Pulled image {}", reference);
        Ok(Box::pin(Cursor::new(output.stdout)))
    }

    async fn create_container(
        &self,
        config: &ContainerConfig,
        host_config: &HostConfig,
        networking_config: &NetworkingConfig,
        name: &str,
    ) -> EngineResult<ContainerCreated> {
        let args = Self::create_args(config, host_config, networking_config, name)?;
        let output = self.output("create", &args).await?;

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(EngineError::ParseError(
                "create returned no container id".to_string(),
            ));
        }

        let warnings = String::from_utf8_lossy(&output.stderr)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(ContainerCreated { id, warnings })
    }

    async fn start_container(
        &self,
        container_id: &str,
        options: &StartOptions,
    ) -> EngineResult<()> {
        validate_container_id(container_id)?;

        let mut args: Vec<String> = vec!["start".to_string()];
        if let Some(ref keys) = options.detach_keys {
            args.push("--detach-keys".to_string());
            args.push(keys.clone());
        }
        args.push(container_id.to_string());

        self.output("start", &args).await?;
        Ok(())
    }

    async fn inspect_container(&self, container_id: &str) -> EngineResult<ContainerInspect> {
        validate_container_id(container_id)?;

        let args: Vec<String> = vec![
            "inspect".to_string(),
            "--type".to_string(),
            "container".to_string(),
            container_id.to_string(),
        ];

        let output = match self.output("inspect", &args).await {
            Ok(output) => output,
            Err(EngineError::CommandFailed { message, .. })
                if message.to_lowercase().contains("no such") =>
            {
                return Err(EngineError::ContainerNotFound(container_id.to_string()));
            }
            Err(e) => return Err(e),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let containers: Vec<ContainerInspect> =
            serde_json::from_str(&stdout).map_err(|e| EngineError::ParseError(e.to_string()))?;

        containers
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::ContainerNotFound(container_id.to_string()))
    }

    async fn stop_container(
        &self,
        container_id: &str,
        timeout: Option<Duration>,
    ) -> EngineResult<()> {
        validate_container_id(container_id)?;

        let mut args: Vec<String> = vec!["stop".to_string()];

        if let Some(t) = stop_seconds(timeout, self.default_stop_timeout) {
            args.push("-t".to_string());
            args.push(t.to_string());
        }

        args.push(container_id.to_string());

        self.output("stop", &args).await?;
        Ok(())
    }

    async fn remove_container(
        &self,
        container_id: &str,
        options: &RemoveOptions,
    ) -> EngineResult<()> {
        validate_container_id(container_id)?;

        let mut args: Vec<String> = vec!["rm".to_string()];

        if options.force {
            args.push("-f".to_string());
        }

        if options.remove_volumes {
            args.push("-v".to_string());
        }

        args.push(container_id.to_string());

        self.output("rm", &args).await?;
        Ok(())
    }
}

/// Grace period for `stop -t`, rounded up to whole seconds so a short
/// timeout never becomes an immediate kill.
fn stop_seconds(timeout: Option<Duration>, default_secs: Option<u32>) -> Option<u64> {
    match timeout {
        Some(t) => Some(t.as_secs() + u64::from(t.subsec_nanos() > 0)),
        None => default_secs.map(u64::from),
    }
}

/// Registry answers for a reference that does not exist.
fn is_missing_image(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    stderr.contains("manifest unknown")
        || stderr.contains("repository does not exist")
        || stderr.contains("pull access denied")
}

/// Connects to the engine described by [`EngineSettings`].
#[derive(Debug, Clone, Default)]
pub struct CliConnector {
    settings: EngineSettings,
}

impl CliConnector {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl EngineConnector for CliConnector {
    async fn connect(&self) -> EngineResult<Arc<dyn EngineClient>> {
        // Runtime detection probes PATH with blocking process calls
        let settings = self.settings.clone();
        let engine = tokio::task::spawn_blocking(move || CliEngine::from_settings(&settings))
            .await
            .map_err(|e| EngineError::Io(std::io::Error::other(e)))?;
        engine.health_check().await?;
        info!(
            "Container runtime ({}) is available at {}",
            engine.runtime_type(),
            engine.binary()
        );
        Ok(Arc::new(engine))
    }
}
