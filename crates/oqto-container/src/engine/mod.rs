//! Container engine abstraction.
//!
//! [`EngineClient`] is the narrow interface sessions drive. [`CliEngine`]
//! implements it on top of the Docker or Podman CLI; tests substitute their
//! own implementations.

mod cli;
mod error;
mod types;
mod validate;

pub use cli::{CliConnector, CliEngine, RuntimeType};
pub use error::{EngineError, EngineResult};
pub use types::{
    ContainerConfig, ContainerCreated, ContainerInspect, HostConfig, ImageFilter, ImageSummary,
    NetworkSettings, NetworkingConfig, PullOptions, RemoveOptions, StartOptions,
};
pub use validate::{
    validate_container_id, validate_container_name, validate_env_entry, validate_image_reference,
    validate_port_spec,
};

use async_trait::async_trait;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;

/// Progress output of an image pull.
///
/// Dropping the stream closes it.
pub type PullStream = Pin<Box<dyn AsyncRead + Send>>;

/// Container engine primitives consumed by sessions and handles.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// List local images matching `filter`.
    async fn list_images(&self, filter: &ImageFilter) -> EngineResult<Vec<ImageSummary>>;

    /// Pull an image, returning its progress stream.
    async fn pull_image(&self, reference: &str, options: &PullOptions)
    -> EngineResult<PullStream>;

    /// Create (but do not start) a container.
    async fn create_container(
        &self,
        config: &ContainerConfig,
        host_config: &HostConfig,
        networking_config: &NetworkingConfig,
        name: &str,
    ) -> EngineResult<ContainerCreated>;

    /// Start a created container.
    async fn start_container(&self, container_id: &str, options: &StartOptions)
    -> EngineResult<()>;

    /// Inspect a container.
    async fn inspect_container(&self, container_id: &str) -> EngineResult<ContainerInspect>;

    /// Stop a running container. `None` uses the engine's grace period.
    async fn stop_container(
        &self,
        container_id: &str,
        timeout: Option<Duration>,
    ) -> EngineResult<()>;

    /// Remove a container.
    async fn remove_container(
        &self,
        container_id: &str,
        options: &RemoveOptions,
    ) -> EngineResult<()>;
}

/// Factory for engine clients.
///
/// Sessions take one of these instead of reaching for a global constructor,
/// so callers and tests decide how the engine is reached.
#[async_trait]
pub trait EngineConnector: Send + Sync {
    async fn connect(&self) -> EngineResult<Arc<dyn EngineClient>>;
}
