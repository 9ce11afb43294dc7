//! Container lifecycle sessions over a container engine.
//!
//! A [`Session`] pulls an image when it is missing, creates and starts a
//! container with the given environment and exposed ports, and hands back a
//! [`Handle`] for reading the container's address and tearing it down.
//!
//! The engine is reached through the [`EngineClient`] trait; [`CliEngine`]
//! drives Docker or Podman and is what [`Session::connect`] uses.

pub mod context;
pub mod engine;
pub mod handle;
pub mod session;
pub mod settings;

pub use context::ExecutionContext;
pub use engine::{
    CliConnector, CliEngine, EngineClient, EngineConnector, EngineError, EngineResult,
    RuntimeType,
};
pub use handle::Handle;
pub use session::{FailureReporter, LogFailureReporter, Session};
pub use settings::EngineSettings;
