//! Recording doubles for the engine and surface traits.
//!
//! Both doubles append to a shared [`CallLog`], so a test can assert on the
//! exact interleaving of engine and surface calls. [`EngineProbe`] reaches
//! the handlers an engine holds and raises simulated events through them.

use crate::{
    config::CustomConfig,
    engine::{EngineHandler, PlaybackSurface, StreamingEngine, SurfaceRef},
    events::{EngineEvent, ErrorData},
};
use anyhow::bail;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A recorded collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create,
    LoadSource(String),
    StartLoad,
    StopLoad,
    AttachMedia,
    Destroy,
    On(EngineEvent),
    Off(EngineEvent),
    Play,
    Pause,
    SetCurrentTime(f64),
}

/// Shared, ordered call log
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: Call) {
        lock(&self.0).push(call);
    }

    /// Snapshot of every call so far
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.0).clone()
    }

    /// Index of the first occurrence of `call`
    pub fn position(&self, call: &Call) -> Option<usize> {
        lock(&self.0).iter().position(|c| c == call)
    }

    pub fn clear(&self) {
        lock(&self.0).clear();
    }
}

type Handlers = Arc<Mutex<Vec<(EngineEvent, EngineHandler)>>>;

/// Handle onto the handlers registered with a [`RecordingEngine`]
#[derive(Clone)]
pub struct EngineProbe {
    handlers: Handlers,
}

impl EngineProbe {
    /// Fire an ERROR event the way the engine would. Returns the number of
    /// handlers reached.
    pub fn raise_error(&self, event_name: &str, data: &ErrorData) -> usize {
        let handlers: Vec<EngineHandler> = lock(&self.handlers)
            .iter()
            .filter(|(event, _)| *event == EngineEvent::Error)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in &handlers {
            handler(event_name, data);
        }
        handlers.len()
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        lock(&self.handlers).len()
    }
}

/// Streaming engine double that records every call
pub struct RecordingEngine {
    log: CallLog,
    handlers: Handlers,
    config: Option<CustomConfig>,
    fail_on: Option<&'static str>,
    error_on_destroy: Option<(String, ErrorData)>,
}

impl RecordingEngine {
    /// Engine recording into `log`
    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            handlers: Arc::default(),
            config: None,
            fail_on: None,
            error_on_destroy: None,
        }
    }

    /// Make one operation (`"load_source"`, `"start_load"`, `"stop_load"`,
    /// `"attach_media"` or `"destroy"`) return an error
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    /// Raise an ERROR through registered handlers while tearing down
    pub fn error_on_destroy(mut self, event_name: impl Into<String>, data: ErrorData) -> Self {
        self.error_on_destroy = Some((event_name.into(), data));
        self
    }

    pub fn probe(&self) -> EngineProbe {
        EngineProbe {
            handlers: self.handlers.clone(),
        }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Configuration passed to [`StreamingEngine::create`]
    pub fn config(&self) -> Option<&CustomConfig> {
        self.config.as_ref()
    }

    fn check(&self, operation: &'static str) -> anyhow::Result<()> {
        if self.fail_on == Some(operation) {
            bail!("{} failed", operation);
        }
        Ok(())
    }
}

impl StreamingEngine for RecordingEngine {
    fn create(config: &CustomConfig) -> anyhow::Result<Self> {
        let mut engine = Self::with_log(CallLog::new());
        engine.log.record(Call::Create);
        engine.config = Some(config.clone());
        Ok(engine)
    }

    fn is_supported() -> bool {
        true
    }

    fn load_source(&mut self, uri: &str) -> anyhow::Result<()> {
        self.log.record(Call::LoadSource(uri.to_string()));
        self.check("load_source")
    }

    fn start_load(&mut self) -> anyhow::Result<()> {
        self.log.record(Call::StartLoad);
        self.check("start_load")
    }

    fn stop_load(&mut self) -> anyhow::Result<()> {
        self.log.record(Call::StopLoad);
        self.check("stop_load")
    }

    fn attach_media(&mut self, _surface: &SurfaceRef) -> anyhow::Result<()> {
        self.log.record(Call::AttachMedia);
        self.check("attach_media")
    }

    fn destroy(&mut self) -> anyhow::Result<()> {
        self.log.record(Call::Destroy);
        if let Some((event_name, data)) = &self.error_on_destroy {
            self.probe().raise_error(event_name, data);
        }
        lock(&self.handlers).clear();
        self.check("destroy")
    }

    fn on(&mut self, event: EngineEvent, handler: EngineHandler) {
        self.log.record(Call::On(event));
        lock(&self.handlers).push((event, handler));
    }

    fn off(&mut self, event: EngineEvent, handler: &EngineHandler) {
        self.log.record(Call::Off(event));
        lock(&self.handlers).retain(|(e, h)| !(*e == event && Arc::ptr_eq(h, handler)));
    }
}

/// Playback surface double that records every call
pub struct RecordingSurface {
    log: CallLog,
    element: bool,
    reject_play: bool,
    reject_pause: bool,
    current_time: Mutex<f64>,
}

impl RecordingSurface {
    /// Renderable surface recording into `log`
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            element: true,
            reject_play: false,
            reject_pause: false,
            current_time: Mutex::new(0.0),
        }
    }

    /// A surface that is not a renderable element
    pub fn detached(log: CallLog) -> Self {
        Self {
            element: false,
            ..Self::new(log)
        }
    }

    /// Make `play()` fail, as with an autoplay policy rejection
    pub fn rejecting_play(mut self) -> Self {
        self.reject_play = true;
        self
    }

    /// Make `pause()` fail
    pub fn rejecting_pause(mut self) -> Self {
        self.reject_pause = true;
        self
    }
}

impl PlaybackSurface for RecordingSurface {
    fn is_element(&self) -> bool {
        self.element
    }

    fn play(&self) -> anyhow::Result<()> {
        self.log.record(Call::Play);
        if self.reject_play {
            bail!("play() request was rejected");
        }
        Ok(())
    }

    fn pause(&self) -> anyhow::Result<()> {
        self.log.record(Call::Pause);
        if self.reject_pause {
            bail!("pause() request was rejected");
        }
        Ok(())
    }

    fn set_current_time(&self, seconds: f64) {
        self.log.record(Call::SetCurrentTime(seconds));
        *lock(&self.current_time) = seconds;
    }

    fn current_time(&self) -> f64 {
        *lock(&self.current_time)
    }
}
