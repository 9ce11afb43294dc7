//! Lifecycle handle for one container started by a [`Session`](crate::Session).

use log::{debug, info};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::context::ExecutionContext;
use crate::engine::{EngineClient, EngineError, EngineResult, RemoveOptions};

/// A container created and started by [`Session::run`](crate::Session::run).
///
/// The handle shares the session's engine client and execution context. Its
/// container id never changes, so a handle can be used from several tasks at
/// once.
pub struct Handle {
    id: String,
    engine: Arc<dyn EngineClient>,
    ctx: ExecutionContext,
    removed: AtomicBool,
}

impl Handle {
    pub(crate) fn new(id: String, engine: Arc<dyn EngineClient>, ctx: ExecutionContext) -> Self {
        Self {
            id,
            engine,
            ctx,
            removed: AtomicBool::new(false),
        }
    }

    /// Engine-assigned container id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether [`stop_and_remove`](Self::stop_and_remove) has succeeded.
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> EngineResult<()> {
        if self.is_removed() {
            return Err(EngineError::ContainerRemoved(self.id.clone()));
        }
        Ok(())
    }

    /// Address of the container on the engine's default network.
    ///
    /// Returns an empty string when the container has no network settings
    /// yet (not attached, or stopped); that is not an error.
    pub async fn get_address(&self) -> EngineResult<String> {
        self.ensure_live()?;

        let info = self
            .ctx
            .run("inspect", self.engine.inspect_container(&self.id))
            .await?;

        let address = info
            .network_settings
            .map(|settings| settings.ip_address)
            .unwrap_or_default();
        debug!("Container {} address: {:?}", self.id, address);
        Ok(address)
    }

    /// Stop the container, then remove it.
    ///
    /// Remove is only attempted after stop succeeds; a stop failure is
    /// returned as-is and the container may still be running.
    pub async fn stop_and_remove(&self) -> EngineResult<()> {
        self.ensure_live()?;

        debug!("Stopping container {}", self.id);
        self.ctx
            .run("stop", self.engine.stop_container(&self.id, None))
            .await?;

        debug!("Removing container {}", self.id);
        self.ctx
            .run(
                "remove",
                self.engine
                    .remove_container(&self.id, &RemoveOptions::default()),
            )
            .await?;

        self.removed.store(true, Ordering::Release);
        info!("Stopped and removed container {}", self.id);
        Ok(())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("removed", &self.is_removed())
            .finish()
    }
}
