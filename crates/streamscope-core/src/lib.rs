//! Streamscope Core - stream source dispatcher and metadata inspector
//!
//! This crate decides how a stream URL is played and narrates what happens:
//! - URL classification and strategy selection
//! - Lifecycle management of the single playback session
//! - Event routing from the streaming engines and the media element
//! - Metadata rendering with collaborator gating
//! - Native text track cue mirroring
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Streamscope Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │  Capability  │  │   Adaptive   │  │    Legacy    │          │
//! │  │   Detector   │  │    Engine    │  │    Engine    │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │  events         │                   │
//! │         │          ┌──────┴─────────────────┴──┐                │
//! │         │          │       Event Channel       │                │
//! │         │          └──────────────┬────────────┘                │
//! │         │                         │                             │
//! │         │                  ┌──────┴──────┐                      │
//! │         └─────────────────►│  Lifecycle  │◄──── Media Element   │
//! │                            │   Manager   │                      │
//! │                            └──────┬──────┘                      │
//! │                                   │                             │
//! │  ┌──────────────┐          ┌──────┴──────┐                      │
//! │  │   Subtitle   │─────────►│  Metadata   │                      │
//! │  │    Bridge    │          │    Sink     │                      │
//! │  └──────────────┘          └─────────────┘                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use streamscope_core::headless::{HeadlessAdaptive, HeadlessLegacy, HeadlessMedia};
//! use streamscope_core::{LifecycleManager, MemorySurface, PlaybackState, StreamConfig};
//!
//! let (mut manager, mut inbox) = LifecycleManager::new(
//!     StreamConfig::default(),
//!     HeadlessMedia::new(),
//!     HeadlessAdaptive::new(true),
//!     HeadlessLegacy::new(true),
//!     MemorySurface::default(),
//! );
//!
//! let state = manager.load_stream("https://x/live/master.m3u8").unwrap();
//! assert_eq!(state, PlaybackState::AdaptiveActive);
//! manager.pump(&mut inbox);
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod classify;
pub mod record;
pub mod events;
pub mod media;
pub mod engine;
pub mod sink;
pub mod subtitles;
pub mod manager;
pub mod headless;

pub use error::{Error, Result};
pub use types::*;
pub use config::{AdaptiveConfig, ExampleStream, LegacyConfig, StreamConfig};
pub use classify::{classify_url, select_strategy, Capabilities, CapabilityProbe, UrlClass};
pub use record::EventRecord;
pub use events::{
    AdaptiveEvent, Envelope, Inbox, LegacyEvent, LegacySignal, MediaEvent, Notifier, Origin,
    Signal,
};
pub use media::{Cue, MediaElement, MediaError, MediaStatus, PlaybackSupport, TrackDescriptor, TrackId, TrackMode};
pub use engine::{AdaptiveBackend, AdaptiveEngine, LegacyBackend, LegacyEngine, LegacySource};
pub use sink::{MemorySurface, MetadataSink, MetadataSurface};
pub use subtitles::SubtitleBridge;
pub use manager::LifecycleManager;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "Streamscope Core initialized");
}
