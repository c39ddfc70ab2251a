//! Kino Kernel - HLS playback kernel for Kino
//!
//! A thin control surface over an adaptive streaming engine:
//! - Load, start/stop loading, refresh
//! - Play, pause, seek on the host's playback surface
//! - Engine ERROR events relayed to kernel subscribers
//!
//! Manifest parsing, segment fetching, buffering and ABR all live inside the
//! wrapped engine.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       HlsKernel                           │
//! │                                                           │
//! │  KernelConfig ──┐                   ┌──► EventEmitter ──► │ subscribers
//! │  CustomConfig ──┼──► StreamingEngine│     ('error', name) │
//! │                 │        │  ERROR ──┘                     │
//! │                 │        ▼                                │
//! │                 └──► PlaybackSurface (play/pause/seek)    │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use kino_kernel::{HlsKernel, testing::{CallLog, RecordingEngine, RecordingSurface}};
//! use serde_json::json;
//!
//! let log = CallLog::new();
//! let surface = Arc::new(RecordingSurface::new(log.clone()));
//! let mut kernel: HlsKernel<RecordingEngine> =
//!     HlsKernel::new(surface, json!({ "src": "a.m3u8" }), json!({})).unwrap();
//!
//! kernel.on("error", |data| eprintln!("stream error: {}", data.details));
//! kernel.load().unwrap();
//! kernel.play().unwrap();
//! kernel.destroy().unwrap();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod kernel;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod types;

pub use config::{deep_merge, default_custom_config, CustomConfig, KernelConfig};
pub use engine::{EngineHandler, PlaybackSurface, StreamingEngine, SurfaceRef};
pub use error::{Error, Result};
pub use events::{EngineEvent, ErrorData, EventEmitter, KernelEvent, ListenerId, ERROR_EVENT};
pub use kernel::HlsKernel;
pub use types::{KernelId, KernelState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "Kino Kernel initialized");
}
