//! HLS Kernel - uniform playback control over an adaptive streaming engine
//!
//! The kernel owns the engine, borrows the host's surface, and relays every
//! engine ERROR to its own subscribers twice: once as `error`, once under the
//! engine's event name.

use crate::{
    config::{CustomConfig, KernelConfig},
    engine::{EngineHandler, StreamingEngine, SurfaceRef},
    events::{EngineEvent, ErrorData, EventEmitter, KernelEvent, ListenerId, ERROR_EVENT},
    types::{KernelId, KernelState},
    Error, Result, VERSION,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument};

/// Playback kernel wrapping a single streaming engine instance
pub struct HlsKernel<E: StreamingEngine> {
    /// Unique kernel ID
    id: KernelId,
    /// Host-owned rendering element
    surface: SurfaceRef,
    /// Base configuration (source URI etc.)
    config: KernelConfig,
    /// Engine configuration after merging overrides
    custom_config: CustomConfig,
    /// Owned streaming engine
    engine: E,
    /// Subscriber hub
    events: Arc<EventEmitter>,
    /// ERROR relay registered on the engine
    error_handler: EngineHandler,
    /// Whether `error_handler` is currently registered
    bound: bool,
    /// Lifecycle state
    state: KernelState,
}

impl<E: StreamingEngine> HlsKernel<E> {
    /// Whether the wrapped engine can run in this environment
    pub fn is_support() -> bool {
        E::is_supported()
    }

    /// Create a kernel, constructing the engine with [`StreamingEngine::create`]
    pub fn new(surface: SurfaceRef, config: Value, custom_config: Value) -> Result<Self> {
        Self::with_engine(surface, config, custom_config, E::create)
    }

    /// Create a kernel, constructing the engine through `factory`.
    ///
    /// Inputs are validated before `factory` runs, so a rejected surface or
    /// config never produces an engine.
    pub fn with_engine<F>(
        surface: SurfaceRef,
        config: Value,
        custom_config: Value,
        factory: F,
    ) -> Result<Self>
    where
        F: FnOnce(&CustomConfig) -> anyhow::Result<E>,
    {
        if !surface.is_element() {
            return Err(Error::invalid_argument(
                "video element passed in kino-kernel must be a renderable element",
            ));
        }
        let config = KernelConfig::from_value(config)?;
        let custom_config = CustomConfig::merged(custom_config)?;

        let engine = factory(&custom_config)?;

        let id = KernelId::new();
        let events = Arc::new(EventEmitter::new());
        let error_handler = Self::error_relay(id, events.clone());

        let mut kernel = Self {
            id,
            surface,
            config,
            custom_config,
            engine,
            events,
            error_handler,
            bound: false,
            state: KernelState::Active,
        };
        kernel.bind_events(false)?;
        kernel.attach_media()?;

        info!(kernel_id = %kernel.id, src = ?kernel.config.src(), "Kernel created");

        Ok(kernel)
    }

    /// Build the ERROR relay. It captures the emitter, not the kernel, so it
    /// stays valid wherever the engine stores it.
    fn error_relay(id: KernelId, events: Arc<EventEmitter>) -> EngineHandler {
        Arc::new(move |event: &str, data: &ErrorData| {
            events.emit(ERROR_EVENT, data);
            events.emit(event, data);
            error!(
                target: "kino_kernel",
                kernel_id = %id,
                event,
                error_type = %data.error_type,
                details = %data.details,
                fatal = data.fatal,
                "Engine error"
            );
        })
    }

    fn ensure_active(&self, operation: &'static str) -> Result<()> {
        match self.state {
            KernelState::Active => Ok(()),
            state => Err(Error::InvalidState {
                operation,
                state: state.to_string(),
            }),
        }
    }

    /// Transition to new state
    fn set_state(&mut self, operation: &'static str, new_state: KernelState) -> Result<()> {
        let current = self.state;

        if !current.can_transition_to(new_state) {
            return Err(Error::InvalidState {
                operation,
                state: current.to_string(),
            });
        }

        self.state = new_state;
        info!(kernel_id = %self.id, from = %current, to = %new_state, "State transition");

        Ok(())
    }

    /// Subscribe (`remove = false`) or unsubscribe (`remove = true`) the
    /// ERROR relay on the engine. Repeated calls are no-ops.
    pub fn bind_events(&mut self, remove: bool) -> Result<()> {
        if remove {
            if self.bound {
                self.engine.off(EngineEvent::Error, &self.error_handler);
                self.bound = false;
                debug!(kernel_id = %self.id, "Error relay unbound");
            }
        } else {
            self.ensure_active("bind events")?;
            if !self.bound {
                self.engine.on(EngineEvent::Error, self.error_handler.clone());
                self.bound = true;
                debug!(kernel_id = %self.id, "Error relay bound");
            }
        }
        Ok(())
    }

    /// Load the configured source
    #[instrument(skip(self), fields(kernel_id = %self.id))]
    pub fn load(&mut self) -> Result<()> {
        self.ensure_active("load")?;
        let src = self.config.require_src()?;
        debug!(src, "Loading source");
        self.engine.load_source(src)?;
        Ok(())
    }

    /// Start or resume engine loading
    pub fn start_load(&mut self) -> Result<()> {
        self.ensure_active("start load")?;
        debug!(kernel_id = %self.id, "Start load");
        self.engine.start_load()?;
        Ok(())
    }

    /// Halt engine loading
    pub fn stop_load(&mut self) -> Result<()> {
        self.ensure_active("stop load")?;
        debug!(kernel_id = %self.id, "Stop load");
        self.engine.stop_load()?;
        Ok(())
    }

    /// (Re-)attach the surface to the engine
    pub fn attach_media(&mut self) -> Result<()> {
        self.ensure_active("attach media")?;
        debug!(kernel_id = %self.id, "Attaching media");
        self.engine.attach_media(&self.surface)?;
        Ok(())
    }

    /// Start playback on the surface
    pub fn play(&self) -> Result<()> {
        self.ensure_active("play")?;
        debug!(kernel_id = %self.id, "Play");
        self.surface.play()?;
        Ok(())
    }

    /// Pause playback on the surface
    pub fn pause(&self) -> Result<()> {
        self.ensure_active("pause")?;
        debug!(kernel_id = %self.id, "Pause");
        self.surface.pause()?;
        Ok(())
    }

    /// Move the surface's playhead. No bounds checks; the surface may clamp.
    pub fn seek(&self, seconds: f64) -> Result<()> {
        self.ensure_active("seek")?;
        debug!(kernel_id = %self.id, to = seconds, "Seeking");
        self.surface.set_current_time(seconds);
        Ok(())
    }

    /// Restart the pipeline: stop loading, then load the source again
    #[instrument(skip(self), fields(kernel_id = %self.id))]
    pub fn refresh(&mut self) -> Result<()> {
        self.ensure_active("refresh")?;
        let src = self.config.require_src()?;
        info!(src, "Refreshing");
        self.engine.stop_load()?;
        self.engine.load_source(src)?;
        Ok(())
    }

    /// Unbind the error relay, then tear the engine down.
    ///
    /// The kernel is destroyed even if the engine's teardown fails.
    #[instrument(skip(self), fields(kernel_id = %self.id))]
    pub fn destroy(&mut self) -> Result<()> {
        self.ensure_active("destroy")?;
        self.bind_events(true)?;
        self.set_state("destroy", KernelState::Destroyed)?;
        info!("Destroying kernel");
        self.engine.destroy()?;
        Ok(())
    }

    /// Subscribe to a kernel event (`error` or an engine error event name)
    pub fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&ErrorData) + Send + Sync + 'static,
    {
        self.events.on(event, listener)
    }

    /// Subscribe for a single emission
    pub fn once<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&ErrorData) + Send + Sync + 'static,
    {
        self.events.once(event, listener)
    }

    /// Unsubscribe a listener
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.events.off(event, id)
    }

    /// Emit an event to this kernel's subscribers
    pub fn emit(&self, event: &str, data: &ErrorData) -> usize {
        self.events.emit(event, data)
    }

    /// Stream every emission
    pub fn subscribe(&self) -> broadcast::Receiver<KernelEvent> {
        self.events.subscribe()
    }

    /// Get kernel ID
    pub fn id(&self) -> KernelId {
        self.id
    }

    /// Get lifecycle state
    pub fn state(&self) -> KernelState {
        self.state
    }

    /// Get base configuration
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Get merged engine configuration
    pub fn custom_config(&self) -> &CustomConfig {
        &self.custom_config
    }

    /// Get the surface handle
    pub fn surface(&self) -> &SurfaceRef {
        &self.surface
    }

    /// Get the wrapped engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Library version
    pub fn version(&self) -> &'static str {
        VERSION
    }
}

impl<E: StreamingEngine> std::fmt::Debug for HlsKernel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HlsKernel")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("config", &self.config)
            .field("bound", &self.bound)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, CallLog, RecordingEngine, RecordingSurface};
    use serde_json::json;

    fn kernel(log: &CallLog) -> HlsKernel<RecordingEngine> {
        let surface: SurfaceRef = Arc::new(RecordingSurface::new(log.clone()));
        let engine = RecordingEngine::with_log(log.clone());
        HlsKernel::with_engine(surface, json!({ "src": "a.m3u8" }), json!({}), move |_| Ok(engine))
            .unwrap()
    }

    #[test]
    fn test_construction_order() {
        let log = CallLog::new();
        let kernel = kernel(&log);

        assert_eq!(kernel.state(), KernelState::Active);
        assert_eq!(log.calls(), vec![Call::On(EngineEvent::Error), Call::AttachMedia]);
    }

    #[test]
    fn test_bind_events_is_idempotent() {
        let log = CallLog::new();
        let mut kernel = kernel(&log);
        log.clear();

        kernel.bind_events(false).unwrap();
        assert!(log.calls().is_empty());

        kernel.bind_events(true).unwrap();
        kernel.bind_events(true).unwrap();
        assert_eq!(log.calls(), vec![Call::Off(EngineEvent::Error)]);
        assert_eq!(kernel.engine().probe().handler_count(), 0);
    }

    #[test]
    fn test_operations_after_destroy_are_rejected() {
        let log = CallLog::new();
        let mut kernel = kernel(&log);
        kernel.destroy().unwrap();
        log.clear();

        assert!(matches!(kernel.load(), Err(Error::InvalidState { operation: "load", .. })));
        assert!(matches!(kernel.start_load(), Err(Error::InvalidState { .. })));
        assert!(matches!(kernel.stop_load(), Err(Error::InvalidState { .. })));
        assert!(matches!(kernel.attach_media(), Err(Error::InvalidState { .. })));
        assert!(matches!(kernel.play(), Err(Error::InvalidState { .. })));
        assert!(matches!(kernel.pause(), Err(Error::InvalidState { .. })));
        assert!(matches!(kernel.seek(3.0), Err(Error::InvalidState { .. })));
        assert!(matches!(kernel.refresh(), Err(Error::InvalidState { .. })));
        assert!(matches!(kernel.destroy(), Err(Error::InvalidState { .. })));
        assert!(matches!(kernel.bind_events(false), Err(Error::InvalidState { .. })));
        assert!(log.calls().is_empty());
    }

    #[test]
    fn test_set_state_rejects_invalid_transitions() {
        let log = CallLog::new();
        let mut kernel = kernel(&log);

        assert!(matches!(
            kernel.set_state("activate", KernelState::Active),
            Err(Error::InvalidState { operation: "activate", .. })
        ));
        assert_eq!(kernel.state(), KernelState::Active);

        kernel.set_state("destroy", KernelState::Destroyed).unwrap();
        assert_eq!(kernel.state(), KernelState::Destroyed);

        let err = kernel.set_state("destroy", KernelState::Destroyed).unwrap_err();
        assert_eq!(err.to_string(), "Cannot destroy in destroyed state");
    }

    #[test]
    fn test_load_without_src() {
        let log = CallLog::new();
        let surface: SurfaceRef = Arc::new(RecordingSurface::new(log.clone()));
        let engine = RecordingEngine::with_log(log.clone());
        let mut kernel =
            HlsKernel::with_engine(surface, json!({}), Value::Null, move |_| Ok(engine)).unwrap();

        assert!(matches!(kernel.load(), Err(Error::InvalidConfig(_))));
        assert!(matches!(kernel.refresh(), Err(Error::InvalidConfig(_))));
        assert!(!log.calls().contains(&Call::StopLoad));
    }

    #[test]
    fn test_version() {
        let log = CallLog::new();
        assert_eq!(kernel(&log).version(), env!("CARGO_PKG_VERSION"));
    }
}
