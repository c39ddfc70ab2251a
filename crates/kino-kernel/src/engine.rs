//! Collaborator traits
//!
//! The kernel drives two external objects: an adaptive streaming engine it
//! owns, and a playback surface the host owns. Both are reached only through
//! the narrow capability sets below, so any engine (or a test double) can sit
//! behind the kernel.

use crate::{config::CustomConfig, events::{EngineEvent, ErrorData}};
use std::sync::Arc;

/// Callback the engine invokes for a subscribed event: `(event_name, data)`
pub type EngineHandler = Arc<dyn Fn(&str, &ErrorData) + Send + Sync>;

/// Shared handle to the host's rendering element
pub type SurfaceRef = Arc<dyn PlaybackSurface>;

/// Media rendering element (e.g. a video element or a native video sink)
pub trait PlaybackSurface: Send + Sync {
    /// Whether this is a renderable element the engine can attach to
    fn is_element(&self) -> bool;

    /// Start or resume playback
    fn play(&self) -> anyhow::Result<()>;

    /// Pause playback
    fn pause(&self) -> anyhow::Result<()>;

    /// Set the playback position in seconds. The surface may clamp.
    fn set_current_time(&self, seconds: f64);

    /// Current playback position in seconds
    fn current_time(&self) -> f64;
}

/// Adaptive streaming engine (manifest parsing, segment loading, buffering, ABR)
pub trait StreamingEngine: Send {
    /// Construct an engine from the merged custom configuration
    fn create(config: &CustomConfig) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Whether the engine can run in this environment
    fn is_supported() -> bool
    where
        Self: Sized;

    /// Load a manifest
    fn load_source(&mut self, uri: &str) -> anyhow::Result<()>;

    /// Start or resume loading segments
    fn start_load(&mut self) -> anyhow::Result<()>;

    /// Stop loading segments
    fn stop_load(&mut self) -> anyhow::Result<()>;

    /// Attach the engine's output to a surface
    fn attach_media(&mut self, surface: &SurfaceRef) -> anyhow::Result<()>;

    /// Release every engine resource
    fn destroy(&mut self) -> anyhow::Result<()>;

    /// Subscribe a handler to a named event
    fn on(&mut self, event: EngineEvent, handler: EngineHandler);

    /// Unsubscribe a handler previously passed to [`StreamingEngine::on`].
    /// Handlers are identified by pointer (`Arc::ptr_eq`).
    fn off(&mut self, event: EngineEvent, handler: &EngineHandler);
}
