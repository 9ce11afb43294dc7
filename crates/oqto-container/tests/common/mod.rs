//! Test utilities: a scriptable fake engine and a recording failure reporter.
#![allow(dead_code)]

use async_trait::async_trait;
use oqto_container::engine::{
    ContainerConfig, ContainerCreated, ContainerInspect, EngineClient, EngineError, EngineResult,
    HostConfig, ImageFilter, ImageSummary, NetworkingConfig, PullOptions, PullStream,
    RemoveOptions, StartOptions,
};
use oqto_container::FailureReporter;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, ReadBuf};

pub const NONE: &[&str] = &[];

/// Install a test logger once per process.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An engine error carrying `message`, compared by its display string.
pub fn engine_error(message: &str) -> EngineError {
    EngineError::command_failed("test", message)
}

/// Every call the fake engine received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListImages(Vec<String>),
    PullImage(String),
    CreateContainer {
        config: ContainerConfig,
        host_config: HostConfig,
        networking_config: NetworkingConfig,
        name: String,
    },
    StartContainer(String),
    InspectContainer(String),
    StopContainer(String, Option<Duration>),
    RemoveContainer(String, RemoveOptions),
}

/// Pull output that counts how often it is closed (dropped).
pub struct TrackedStream {
    data: io::Cursor<Vec<u8>>,
    fail_read: bool,
    closes: Arc<AtomicUsize>,
}

impl TrackedStream {
    pub fn new(closes: Arc<AtomicUsize>) -> Self {
        Self {
            data: io::Cursor::new(b"{\"status\":\"Pull complete\"}\n".to_vec()),
            fail_read: false,
            closes,
        }
    }

    /// A stream whose first read fails.
    pub fn failing(closes: Arc<AtomicUsize>) -> Self {
        let mut stream = Self::new(closes);
        stream.fail_read = true;
        stream
    }
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.fail_read {
            return Poll::Ready(Err(io::Error::other("connection reset during pull")));
        }
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

type ListFn = Box<dyn Fn(&ImageFilter) -> EngineResult<Vec<ImageSummary>> + Send + Sync>;
type PullFn = Box<dyn Fn(&str) -> EngineResult<PullStream> + Send + Sync>;
type CreateFn = Box<dyn Fn(&ContainerConfig, &str) -> EngineResult<ContainerCreated> + Send + Sync>;
type IdFn = Box<dyn Fn(&str) -> EngineResult<()> + Send + Sync>;
type InspectFn = Box<dyn Fn(&str) -> EngineResult<ContainerInspect> + Send + Sync>;

/// Engine double with per-operation overrides.
///
/// Without overrides: no images are listed, pulls succeed with a tracked
/// stream, create returns `fake-container-id`, everything else succeeds.
#[derive(Default)]
pub struct FakeEngine {
    list_images: Option<ListFn>,
    pull_image: Option<PullFn>,
    create_container: Option<CreateFn>,
    start_container: Option<IdFn>,
    inspect_container: Option<InspectFn>,
    stop_container: Option<IdFn>,
    remove_container: Option<IdFn>,
    stall_start: bool,
    calls: Mutex<Vec<Call>>,
    pull_closes: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_list_images(
        mut self,
        f: impl Fn(&ImageFilter) -> EngineResult<Vec<ImageSummary>> + Send + Sync + 'static,
    ) -> Self {
        self.list_images = Some(Box::new(f));
        self
    }

    /// Report the image as present locally.
    pub fn with_local_image(self) -> Self {
        self.on_list_images(|filter| {
            Ok(vec![ImageSummary {
                id: "sha256:local".to_string(),
                repository: filter.references()[0].clone(),
                ..Default::default()
            }])
        })
    }

    pub fn on_pull_image(
        mut self,
        f: impl Fn(&str) -> EngineResult<PullStream> + Send + Sync + 'static,
    ) -> Self {
        self.pull_image = Some(Box::new(f));
        self
    }

    pub fn on_create_container(
        mut self,
        f: impl Fn(&ContainerConfig, &str) -> EngineResult<ContainerCreated> + Send + Sync + 'static,
    ) -> Self {
        self.create_container = Some(Box::new(f));
        self
    }

    /// Make create return `id`.
    pub fn with_container_id(self, id: &'static str) -> Self {
        self.on_create_container(move |_, _| Ok(ContainerCreated::new(id)))
    }

    pub fn on_start_container(
        mut self,
        f: impl Fn(&str) -> EngineResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.start_container = Some(Box::new(f));
        self
    }

    /// Make start hang until the caller gives up on it.
    pub fn stall_start(mut self) -> Self {
        self.stall_start = true;
        self
    }

    pub fn on_inspect_container(
        mut self,
        f: impl Fn(&str) -> EngineResult<ContainerInspect> + Send + Sync + 'static,
    ) -> Self {
        self.inspect_container = Some(Box::new(f));
        self
    }

    pub fn on_stop_container(
        mut self,
        f: impl Fn(&str) -> EngineResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.stop_container = Some(Box::new(f));
        self
    }

    pub fn on_remove_container(
        mut self,
        f: impl Fn(&str) -> EngineResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.remove_container = Some(Box::new(f));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Close counter shared with the default pull stream.
    pub fn pull_closes(&self) -> Arc<AtomicUsize> {
        self.pull_closes.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    pub fn pulls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::PullImage(reference) => Some(reference),
                _ => None,
            })
            .collect()
    }

    pub fn creates(&self) -> usize {
        self.count(|c| matches!(c, Call::CreateContainer { .. }))
    }

    pub fn removes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::RemoveContainer(id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl EngineClient for FakeEngine {
    async fn list_images(&self, filter: &ImageFilter) -> EngineResult<Vec<ImageSummary>> {
        self.record(Call::ListImages(filter.references().to_vec()));
        match &self.list_images {
            Some(f) => f(filter),
            None => Ok(Vec::new()),
        }
    }

    async fn pull_image(
        &self,
        reference: &str,
        _options: &PullOptions,
    ) -> EngineResult<PullStream> {
        self.record(Call::PullImage(reference.to_string()));
        match &self.pull_image {
            Some(f) => f(reference),
            None => Ok(Box::pin(TrackedStream::new(self.pull_closes.clone()))),
        }
    }

    async fn create_container(
        &self,
        config: &ContainerConfig,
        host_config: &HostConfig,
        networking_config: &NetworkingConfig,
        name: &str,
    ) -> EngineResult<ContainerCreated> {
        self.record(Call::CreateContainer {
            config: config.clone(),
            host_config: host_config.clone(),
            networking_config: networking_config.clone(),
            name: name.to_string(),
        });
        match &self.create_container {
            Some(f) => f(config, name),
            None => Ok(ContainerCreated::new("fake-container-id")),
        }
    }

    async fn start_container(
        &self,
        container_id: &str,
        _options: &StartOptions,
    ) -> EngineResult<()> {
        self.record(Call::StartContainer(container_id.to_string()));
        if self.stall_start {
            std::future::pending::<()>().await;
        }
        match &self.start_container {
            Some(f) => f(container_id),
            None => Ok(()),
        }
    }

    async fn inspect_container(&self, container_id: &str) -> EngineResult<ContainerInspect> {
        self.record(Call::InspectContainer(container_id.to_string()));
        match &self.inspect_container {
            Some(f) => f(container_id),
            None => Ok(ContainerInspect::default()),
        }
    }

    async fn stop_container(
        &self,
        container_id: &str,
        timeout: Option<Duration>,
    ) -> EngineResult<()> {
        self.record(Call::StopContainer(container_id.to_string(), timeout));
        match &self.stop_container {
            Some(f) => f(container_id),
            None => Ok(()),
        }
    }

    async fn remove_container(
        &self,
        container_id: &str,
        options: &RemoveOptions,
    ) -> EngineResult<()> {
        self.record(Call::RemoveContainer(container_id.to_string(), *options));
        match &self.remove_container {
            Some(f) => f(container_id),
            None => Ok(()),
        }
    }
}

/// Failure reporter that remembers what it was told.
#[derive(Default)]
pub struct RecordingReporter {
    pulls: Mutex<Vec<(String, String)>>,
}

impl RecordingReporter {
    /// `(reference, error message)` pairs reported so far.
    pub fn pull_failures(&self) -> Vec<(String, String)> {
        self.pulls.lock().unwrap().clone()
    }
}

impl FailureReporter for RecordingReporter {
    fn pull_failed(&self, reference: &str, err: &EngineError) {
        self.pulls
            .lock()
            .unwrap()
            .push((reference.to_string(), err.to_string()));
    }
}
