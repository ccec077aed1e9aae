//! Track subtitle bridge
//!
//! Mirrors native in-band text track cues into the metadata sink. Each track
//! gets at most one cue-change binding; enable and disable are idempotent.

use crate::media::{MediaElement, TrackId, TrackMode};
use crate::record::EventRecord;
use crate::sink::{MetadataSink, MetadataSurface};
use crate::events::Notifier;
use std::collections::BTreeSet;
use tracing::debug;

/// Cue-change bindings for the media element's text tracks
#[derive(Debug, Default)]
pub struct SubtitleBridge {
    enabled: bool,
    bindings: BTreeSet<TrackId>,
}

impl SubtitleBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_bound(&self, track: TrackId) -> bool {
        self.bindings.contains(&track)
    }

    /// Tracks with an active binding
    pub fn bindings(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.bindings.iter().copied()
    }

    /// Bind every present track and observe the track list.
    ///
    /// Returns `false` if already enabled.
    pub fn enable<M, S>(&mut self, media: &mut M, sink: &mut MetadataSink<S>, notifier: Notifier) -> bool
    where
        M: MediaElement,
        S: MetadataSurface,
    {
        if self.enabled {
            return false;
        }
        self.enabled = true;

        let tracks = media.text_tracks();
        for track in &tracks {
            self.attach(media, *track, &notifier);
        }
        media.observe_track_list(notifier);

        debug!(tracks = tracks.len(), "Text track bridge enabled");
        sink.render(
            &EventRecord::new("TextTrack")
                .with("message", "Native TextTrack API enabled.")
                .with("trackCount", tracks.len()),
            false,
            false,
        );
        true
    }

    /// Unbind every track and stop observing the track list.
    ///
    /// Returns `false` if already disabled.
    pub fn disable<M, S>(&mut self, media: &mut M, sink: &mut MetadataSink<S>) -> bool
    where
        M: MediaElement,
        S: MetadataSurface,
    {
        if !self.enabled {
            return false;
        }
        self.enabled = false;

        // Includes tracks that left the list without a removal notice
        let bound: Vec<TrackId> = self.bindings.iter().copied().collect();
        for track in bound {
            self.detach(media, track);
        }
        media.unobserve_track_list();

        debug!("Text track bridge disabled");
        sink.render(
            &EventRecord::new("TextTrack").with("message", "Native TextTrack API disabled."),
            false,
            false,
        );
        true
    }

    /// A track appeared in the track list
    pub fn track_added<M: MediaElement>(&mut self, media: &mut M, track: TrackId, notifier: &Notifier) {
        if self.enabled {
            self.attach(media, track, notifier);
        }
    }

    /// A track left the track list
    pub fn track_removed<M: MediaElement>(&mut self, media: &mut M, track: TrackId) {
        self.detach(media, track);
    }

    /// Record describing the track and its currently active cues.
    ///
    /// `None` for tracks without a binding.
    pub fn cue_change<M: MediaElement>(&self, media: &M, track: TrackId) -> Option<EventRecord> {
        if !self.bindings.contains(&track) {
            return None;
        }
        let descriptor = media.track_info(track)?;
        Some(
            EventRecord::new("TextTrack.cuechange")
                .with("track", descriptor)
                .with("activeCues", media.active_cues(track)),
        )
    }

    fn attach<M: MediaElement>(&mut self, media: &mut M, track: TrackId, notifier: &Notifier) {
        if self.bindings.contains(&track) {
            return;
        }
        let mode = media.track_info(track).and_then(|info| info.mode);
        if mode == Some(TrackMode::Disabled) {
            media.set_track_mode(track, TrackMode::Hidden);
        }
        media.listen_cue_change(track, notifier.clone());
        self.bindings.insert(track);
        debug!(%track, "Cue listener attached");
    }

    fn detach<M: MediaElement>(&mut self, media: &mut M, track: TrackId) {
        if !self.bindings.remove(&track) {
            return;
        }
        media.unlisten_cue_change(track);
        debug!(%track, "Cue listener detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{channel, Origin};
    use crate::headless::HeadlessMedia;
    use crate::media::{Cue, TrackDescriptor};
    use crate::sink::MemorySurface;

    fn setup() -> (HeadlessMedia, MetadataSink<MemorySurface>, Notifier) {
        let (sender, _inbox) = channel();
        (
            HeadlessMedia::new(),
            MetadataSink::new(MemorySurface::default()),
            sender.notifier(Origin::Element),
        )
    }

    #[test]
    fn test_enable_is_idempotent() {
        let (mut media, mut sink, notifier) = setup();
        let track = media.add_track(TrackDescriptor::new("metadata", "ID3", ""));
        let mut bridge = SubtitleBridge::new();

        assert!(bridge.enable(&mut media, &mut sink, notifier.clone()));
        assert!(!bridge.enable(&mut media, &mut sink, notifier));
        assert_eq!(media.cue_listener_count(track), 1);
        assert_eq!(bridge.bindings().count(), 1);
        assert!(sink.surface().log.contains("\"trackCount\": 1"));
    }

    #[test]
    fn test_disabled_track_promoted_to_hidden() {
        let (mut media, mut sink, notifier) = setup();
        let disabled = media.add_track(TrackDescriptor::new("subtitles", "English", "en"));
        let showing = media.add_track(
            TrackDescriptor::new("captions", "CC1", "en").with_mode(TrackMode::Showing),
        );
        let mut bridge = SubtitleBridge::new();
        bridge.enable(&mut media, &mut sink, notifier);

        assert_eq!(media.track_mode(disabled), Some(TrackMode::Hidden));
        assert_eq!(media.track_mode(showing), Some(TrackMode::Showing));
    }

    #[test]
    fn test_disable_unbinds_everything() {
        let (mut media, mut sink, notifier) = setup();
        let track = media.add_track(TrackDescriptor::new("metadata", "", ""));
        let mut bridge = SubtitleBridge::new();

        assert!(!bridge.disable(&mut media, &mut sink));
        bridge.enable(&mut media, &mut sink, notifier);
        assert!(bridge.disable(&mut media, &mut sink));
        assert!(!bridge.disable(&mut media, &mut sink));

        assert_eq!(media.cue_listener_count(track), 0);
        assert!(!media.is_observing_tracks());
        assert!(sink.surface().log.contains("Native TextTrack API disabled."));
    }

    #[test]
    fn test_added_tracks_ignored_while_disabled() {
        let (mut media, _sink, notifier) = setup();
        let mut bridge = SubtitleBridge::new();
        let track = media.add_track(TrackDescriptor::new("metadata", "", ""));

        bridge.track_added(&mut media, track, &notifier);
        assert!(!bridge.is_bound(track));
    }

    #[test]
    fn test_cue_change_record() {
        let (mut media, mut sink, notifier) = setup();
        let track = media.add_track(
            TrackDescriptor::new("metadata", "", "")
                .with_id("id3")
                .with_dispatch_type("com.apple.streaming"),
        );
        let mut bridge = SubtitleBridge::new();
        bridge.enable(&mut media, &mut sink, notifier);
        media.set_active_cues(track, vec![Cue::text("1", 0.0, 4.0, "Hello")]);

        let record = bridge.cue_change(&media, track).unwrap();
        assert_eq!(record.event(), Some("TextTrack.cuechange"));
        assert_eq!(record.get("track").unwrap()["id"], "id3");
        assert_eq!(record.get("track").unwrap()["mode"], "hidden");
        assert_eq!(record.get("activeCues").unwrap()[0]["text"], "Hello");

        bridge.track_removed(&mut media, track);
        assert!(bridge.cue_change(&media, track).is_none());
    }
}
