//! Streaming engine contracts
//!
//! The manager consumes these interfaces; segment fetching, demuxing and ABR
//! all stay inside the implementations.

use crate::config::AdaptiveConfig;
use crate::events::{AdaptiveEvent, LegacyEvent, Notifier};
use crate::media::MediaElement;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Factory and capability probe for the adaptive (HLS) engine
pub trait AdaptiveBackend<M: MediaElement> {
    type Engine: AdaptiveEngine<M>;

    /// Whether the engine can run in this runtime
    fn is_supported(&self) -> bool;

    /// Construct an engine instance
    fn create(&self, config: &AdaptiveConfig) -> Result<Self::Engine>;
}

/// One adaptive engine instance
pub trait AdaptiveEngine<M: MediaElement> {
    fn load_source(&mut self, url: &str);

    fn attach_media(&mut self, media: &mut M);

    /// Publish `event` through `notifier`, payload included
    fn on(&mut self, event: AdaptiveEvent, notifier: Notifier);

    /// Release the media element and every engine resource
    fn destroy(&mut self);
}

/// Source descriptor for the legacy-container player factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySource {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub is_live: bool,
}

/// Factory and capability probe for the legacy-container (FLV) player
pub trait LegacyBackend<M: MediaElement> {
    type Engine: LegacyEngine<M>;

    fn is_supported(&self) -> bool;

    fn create(&self, source: &LegacySource) -> Result<Self::Engine>;
}

/// One legacy-container player instance
pub trait LegacyEngine<M: MediaElement> {
    fn attach_media_element(&mut self, media: &mut M);

    /// Start fetching the source
    fn load(&mut self);

    fn on(&mut self, event: LegacyEvent, notifier: Notifier);

    fn destroy(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_source_json() {
        let source = LegacySource {
            kind: "flv".to_string(),
            url: "https://x/live.flv".to_string(),
            is_live: true,
        };
        assert_eq!(
            serde_json::to_value(&source).unwrap(),
            json!({"type": "flv", "url": "https://x/live.flv", "isLive": true})
        );
    }
}
