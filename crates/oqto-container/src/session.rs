//! Session: runs containers against one engine client.

use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::engine::{
    CliConnector, ContainerConfig, EngineClient, EngineConnector, EngineError, EngineResult,
    HostConfig, ImageFilter, NetworkingConfig, PullOptions, RemoveOptions, StartOptions,
};
use crate::handle::Handle;
use crate::settings::EngineSettings;

/// Side channel for failures that are also returned to the caller.
pub trait FailureReporter: Send + Sync {
    /// An image pull failed; `run` is about to return `err`.
    fn pull_failed(&self, reference: &str, err: &EngineError);
}

/// Reports failures through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFailureReporter;

impl FailureReporter for LogFailureReporter {
    fn pull_failed(&self, reference: &str, err: &EngineError) {
        error!("{}", pull_failure_message(reference, err));
    }
}

fn pull_failure_message(reference: &str, err: &EngineError) -> String {
    format!("unable to pull image: {} ({})", err, reference)
}

/// Binds one engine client to the `run` workflow.
///
/// ```ignore
/// use oqto_container::Session;
///
/// let session = Session::connect().await?;
/// let handle = session
///     .run("mongo", "mongo", &["BANANA=YELLOW"], &["27017/tcp"])
///     .await?;
/// println!("address: {}", handle.get_address().await?);
/// handle.stop_and_remove().await?;
/// ```
pub struct Session {
    engine: Arc<dyn EngineClient>,
    ctx: ExecutionContext,
    reporter: Arc<dyn FailureReporter>,
    cleanup_on_start_failure: bool,
}

impl Session {
    /// Create a session over an existing engine client.
    pub fn new(engine: Arc<dyn EngineClient>) -> Self {
        Self {
            engine,
            ctx: ExecutionContext::new(),
            reporter: Arc::new(LogFailureReporter),
            cleanup_on_start_failure: true,
        }
    }

    /// Connect to the engine configured for this process.
    ///
    /// Fails if settings cannot be loaded or no engine answers.
    pub async fn connect() -> EngineResult<Self> {
        let settings = EngineSettings::load()?;
        Self::connect_with(&CliConnector::new(settings)).await
    }

    /// Connect through an explicit connector.
    pub async fn connect_with(connector: &dyn EngineConnector) -> EngineResult<Self> {
        let engine = connector.connect().await?;
        Ok(Self::new(engine))
    }

    /// Replace the failure reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Use a caller-provided execution context.
    pub fn with_context(mut self, ctx: ExecutionContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Leave a created container in place when it fails to start.
    pub fn preserve_failed_containers(mut self) -> Self {
        self.cleanup_on_start_failure = false;
        self
    }

    /// The session's execution context.
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Cancel the session's context, aborting in-flight and future engine
    /// calls made by this session and its handles.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    /// Pull `image_reference` if needed, then create and start a container.
    ///
    /// Errors from the engine are returned unchanged. Ports are passed to the
    /// engine exactly as given; no protocol is assumed.
    pub async fn run<E, P>(
        &self,
        name: &str,
        image_reference: &str,
        env_vars: &[E],
        exposed_ports: &[P],
    ) -> EngineResult<Handle>
    where
        E: AsRef<str>,
        P: AsRef<str>,
    {
        self.ensure_image(image_reference).await?;

        let config = ContainerConfig::new(image_reference)
            .envs(env_vars.iter().map(|e| e.as_ref()))
            .expose(exposed_ports.iter().map(|p| p.as_ref()));

        let created = self
            .ctx
            .run(
                "create",
                self.engine.create_container(
                    &config,
                    &HostConfig::default(),
                    &NetworkingConfig::default(),
                    name,
                ),
            )
            .await?;
        for warning in &created.warnings {
            warn!("Engine warning creating {}: {}", name, warning);
        }
        debug!("Created container {} ({})", name, created.id);

        let started = self
            .ctx
            .run(
                "start",
                self.engine
                    .start_container(&created.id, &StartOptions::default()),
            )
            .await;

        if let Err(e) = started {
            if self.cleanup_on_start_failure {
                self.discard_unstarted(&created.id).await;
            }
            return Err(e);
        }

        info!(
            "Started container {} ({}) from {}",
            name, created.id, image_reference
        );
        Ok(Handle::new(created.id, self.engine.clone(), self.ctx.clone()))
    }

    /// Make sure the image exists locally, pulling it when the exact
    /// reference is not listed.
    async fn ensure_image(&self, image_reference: &str) -> EngineResult<()> {
        let filter = ImageFilter::reference(image_reference);
        let images = self
            .ctx
            .run("list images", self.engine.list_images(&filter))
            .await?;

        if !images.is_empty() {
            debug!("Image {} present locally", image_reference);
            return Ok(());
        }

        info!("Pulling image {}", image_reference);
        if let Err(e) = self.pull(image_reference).await {
            self.reporter.pull_failed(image_reference, &e);
            return Err(e);
        }
        Ok(())
    }

    async fn pull(&self, image_reference: &str) -> EngineResult<()> {
        let mut stream = self
            .ctx
            .run(
                "pull",
                self.engine
                    .pull_image(image_reference, &PullOptions::default()),
            )
            .await?;

        // The stream is dropped (closed) when this function returns, on every path
        let drained = self
            .ctx
            .run("pull", async {
                Ok::<_, EngineError>(tokio::io::copy(&mut stream, &mut tokio::io::sink()).await?)
            })
            .await?;
        debug!("Drained {} bytes of pull output for {}", drained, image_reference);
        Ok(())
    }

    /// Best-effort removal of a container whose start failed.
    ///
    /// Runs outside the execution context so a cancelled start is still
    /// cleaned up, and forces removal since the start may have taken effect.
    async fn discard_unstarted(&self, container_id: &str) {
        let options = RemoveOptions {
            force: true,
            ..RemoveOptions::default()
        };
        let removed = self.engine.remove_container(container_id, &options).await;

        match removed {
            Ok(()) => debug!("Removed unstarted container {}", container_id),
            Err(e) => warn!(
                "Failed to remove unstarted container {}: {}",
                container_id, e
            ),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("ctx", &self.ctx)
            .field("cleanup_on_start_failure", &self.cleanup_on_start_failure)
            .finish_non_exhaustive()
    }
}
