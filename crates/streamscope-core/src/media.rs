//! Media element contract
//!
//! The playable surface shared by every strategy. The lifecycle manager is its
//! only owner; engines borrow it while attaching.

use crate::events::{MediaEvent, Notifier};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Readable status fields of the media element
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatus {
    /// Playback position in seconds
    pub current_time: f64,
    /// Duration in seconds; NaN before metadata, infinite for live streams
    pub duration: f64,
    pub paused: bool,
    pub ended: bool,
    /// HAVE_NOTHING (0) .. HAVE_ENOUGH_DATA (4)
    pub ready_state: u16,
    /// NETWORK_EMPTY (0) .. NETWORK_NO_SOURCE (3)
    pub network_state: u16,
}

impl Default for MediaStatus {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: f64::NAN,
            paused: true,
            ended: false,
            ready_state: 0,
            network_state: 0,
        }
    }
}

/// Error reported by the media element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaError {
    pub code: u16,
    pub message: Option<String>,
}

/// Answer of a `canPlayType` probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackSupport {
    No,
    Maybe,
    Probably,
}

impl PlaybackSupport {
    /// Parse the DOM answer (`""`, `"maybe"`, `"probably"`)
    pub fn from_dom(answer: &str) -> Self {
        match answer {
            "probably" => PlaybackSupport::Probably,
            "maybe" => PlaybackSupport::Maybe,
            _ => PlaybackSupport::No,
        }
    }

    pub fn is_playable(&self) -> bool {
        !matches!(self, PlaybackSupport::No)
    }
}

/// Identity of a text track on the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

/// Text track mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackMode {
    /// Not loaded, no cue events
    Disabled,
    /// Cues are tracked and fire events but are not rendered
    Hidden,
    /// Cues are tracked and rendered
    Showing,
}

impl TrackMode {
    pub fn name(&self) -> &'static str {
        match self {
            TrackMode::Disabled => "disabled",
            TrackMode::Hidden => "hidden",
            TrackMode::Showing => "showing",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "disabled" => Some(TrackMode::Disabled),
            "hidden" => Some(TrackMode::Hidden),
            "showing" => Some(TrackMode::Showing),
            _ => None,
        }
    }
}

/// Descriptor of a text track as shown in cue records
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDescriptor {
    pub id: Option<String>,
    pub kind: Option<String>,
    pub label: Option<String>,
    pub language: Option<String>,
    pub in_band_metadata_track_dispatch_type: Option<String>,
    pub mode: Option<TrackMode>,
}

impl TrackDescriptor {
    /// Descriptor with a kind; empty DOM strings map to `None`
    pub fn new(kind: &str, label: &str, language: &str) -> Self {
        Self {
            id: None,
            kind: non_empty(kind),
            label: non_empty(label),
            language: non_empty(language),
            in_band_metadata_track_dispatch_type: None,
            mode: Some(TrackMode::Disabled),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = non_empty(id);
        self
    }

    pub fn with_dispatch_type(mut self, dispatch_type: &str) -> Self {
        self.in_band_metadata_track_dispatch_type = non_empty(dispatch_type);
        self
    }

    pub fn with_mode(mut self, mode: TrackMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// An active cue reduced to its identity, interval and content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    pub id: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Structured payload of data cues (ID3 frames and the like)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Cue {
    pub fn text(id: &str, start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            id: non_empty(id),
            start_time,
            end_time,
            text: Some(text.into()),
            value: None,
        }
    }

    pub fn data(id: &str, start_time: f64, end_time: f64, value: Value) -> Self {
        Self {
            id: non_empty(id),
            start_time,
            end_time,
            text: None,
            value: Some(value),
        }
    }
}

/// Map an empty DOM string to `None`
pub fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// The playable surface
pub trait MediaElement {
    fn pause(&mut self);

    /// Point the element at a directly playable URL
    fn set_source(&mut self, url: &str);

    /// Drop the current source attribute
    fn clear_source(&mut self);

    /// Reset the element (`load()`), detaching any media source
    fn reset(&mut self);

    /// Fire-and-forget play request; a refusal is published as
    /// [`Signal::PlayRejected`](crate::events::Signal::PlayRejected)
    fn request_play(&mut self, notifier: Notifier);

    fn status(&self) -> MediaStatus;

    fn error(&self) -> Option<MediaError>;

    fn can_play_type(&self, mime: &str) -> PlaybackSupport;

    /// Publish the given lifecycle events
    fn bind_events(&mut self, events: &[MediaEvent], notifier: Notifier);

    /// Tracks currently in the track list
    fn text_tracks(&self) -> Vec<TrackId>;

    fn track_info(&self, track: TrackId) -> Option<TrackDescriptor>;

    fn set_track_mode(&mut self, track: TrackId, mode: TrackMode);

    fn active_cues(&self, track: TrackId) -> Vec<Cue>;

    /// Publish cue changes of one track
    fn listen_cue_change(&mut self, track: TrackId, notifier: Notifier);

    fn unlisten_cue_change(&mut self, track: TrackId);

    /// Publish track additions and removals
    fn observe_track_list(&mut self, notifier: Notifier);

    fn unobserve_track_list(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_playback_support() {
        assert_eq!(PlaybackSupport::from_dom(""), PlaybackSupport::No);
        assert!(PlaybackSupport::from_dom("maybe").is_playable());
        assert!(PlaybackSupport::from_dom("probably").is_playable());
    }

    #[test]
    fn test_descriptor_json() {
        let track = TrackDescriptor::new("metadata", "", "en").with_mode(TrackMode::Hidden);
        assert_eq!(
            serde_json::to_value(&track).unwrap(),
            json!({
                "id": null,
                "kind": "metadata",
                "label": null,
                "language": "en",
                "inBandMetadataTrackDispatchType": null,
                "mode": "hidden"
            })
        );
    }

    #[test]
    fn test_cue_json_skips_missing_content() {
        let cue = Cue::data("", 1.0, 2.5, json!({"key": "TIT2", "data": "Song"}));
        assert_eq!(
            serde_json::to_value(&cue).unwrap(),
            json!({
                "id": null,
                "startTime": 1.0,
                "endTime": 2.5,
                "value": {"key": "TIT2", "data": "Song"}
            })
        );
    }

    #[test]
    fn test_status_json_nan_duration() {
        let status = serde_json::to_value(MediaStatus::default()).unwrap();
        assert_eq!(status["duration"], Value::Null);
        assert_eq!(status["paused"], json!(true));
    }
}
