//! Core types for Streamscope

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle manager states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No session attached
    Idle,
    /// Adaptive (HLS) engine owns the media element
    AdaptiveActive,
    /// Legacy-container (FLV) engine owns the media element
    LegacyActive,
    /// Media element plays the URL directly
    NativeActive,
}

impl PlaybackState {
    /// True when some strategy is attached to the media element
    pub fn is_active(&self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::AdaptiveActive => write!(f, "adaptive"),
            PlaybackState::LegacyActive => write!(f, "legacy"),
            PlaybackState::NativeActive => write!(f, "native"),
        }
    }
}

/// Playback strategy picked for a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Adaptive engine loads the manifest
    Adaptive,
    /// Legacy-container engine plays a live FLV relay
    Legacy,
    /// Directly playable media URL
    Native,
    /// Adaptive manifest handed to a runtime that plays it natively
    NativeManifest,
}

impl Strategy {
    /// State the manager enters for this strategy
    pub fn state(&self) -> PlaybackState {
        match self {
            Strategy::Adaptive => PlaybackState::AdaptiveActive,
            Strategy::Legacy => PlaybackState::LegacyActive,
            Strategy::Native | Strategy::NativeManifest => PlaybackState::NativeActive,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Adaptive => write!(f, "adaptive"),
            Strategy::Legacy => write!(f, "legacy-container"),
            Strategy::Native => write!(f, "native"),
            Strategy::NativeManifest => write!(f, "native-manifest"),
        }
    }
}

/// Which collaborator currently narrates the metadata surface.
///
/// Stands in for the `adaptive-active` / `legacy-active` flag pair: at most
/// one of them can be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gate {
    #[default]
    Open,
    Adaptive,
    Legacy,
}

impl Gate {
    pub fn adaptive_active(&self) -> bool {
        matches!(self, Gate::Adaptive)
    }

    pub fn legacy_active(&self) -> bool {
        matches!(self, Gate::Legacy)
    }

    /// Whether a render with the given allowances passes this gate
    pub fn allows(&self, allow_adaptive: bool, allow_legacy: bool) -> bool {
        match self {
            Gate::Open => true,
            Gate::Adaptive => allow_adaptive,
            Gate::Legacy => allow_legacy,
        }
    }
}

/// State of the subtitle toggle control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    /// Toggle is checked (bridge enabled)
    pub subtitles_checked: bool,
    /// Toggle can be changed by the user
    pub subtitles_available: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            subtitles_checked: false,
            subtitles_available: true,
        }
    }
}
