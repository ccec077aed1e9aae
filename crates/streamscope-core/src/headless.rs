//! Headless collaborators
//!
//! In-memory media element and scripted engines. They keep a ledger of every
//! call so the CLI can replay load sequences without a browser and tests can
//! assert on the lifecycle.

use crate::config::{AdaptiveConfig, NATIVE_MANIFEST_MIME};
use crate::engine::{AdaptiveBackend, AdaptiveEngine, LegacyBackend, LegacyEngine, LegacySource};
use crate::events::{AdaptiveEvent, LegacyEvent, LegacySignal, MediaEvent, Notifier, Signal};
use crate::media::{
    Cue, MediaElement, MediaError, MediaStatus, PlaybackSupport, TrackDescriptor, TrackId,
    TrackMode,
};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Calls made on the headless media element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    Pause,
    SetSource(String),
    ClearSource,
    Reset,
    Play,
}

/// How the headless runtime answers play requests
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AutoplayPolicy {
    #[default]
    Allow,
    Block(String),
}

#[derive(Debug)]
struct HeadlessTrack {
    id: TrackId,
    descriptor: TrackDescriptor,
    active_cues: Vec<Cue>,
    listeners: Vec<Notifier>,
}

/// In-memory media element
#[derive(Debug, Default)]
pub struct HeadlessMedia {
    source: Option<String>,
    status: MediaStatus,
    error: Option<MediaError>,
    autoplay: AutoplayPolicy,
    native_manifest: bool,
    calls: Vec<MediaCall>,
    events: Option<Notifier>,
    bind_count: usize,
    tracks: Vec<HeadlessTrack>,
    track_observer: Option<Notifier>,
    next_track: u32,
}

impl HeadlessMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_autoplay(mut self, policy: AutoplayPolicy) -> Self {
        self.autoplay = policy;
        self
    }

    /// Answer `maybe` for native adaptive-manifest playback
    pub fn with_native_manifest(mut self, supported: bool) -> Self {
        self.native_manifest = supported;
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn calls(&self) -> &[MediaCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// How many times lifecycle events were bound
    pub fn bind_count(&self) -> usize {
        self.bind_count
    }

    pub fn set_status(&mut self, status: MediaStatus) {
        self.status = status;
    }

    pub fn set_error(&mut self, error: Option<MediaError>) {
        self.error = error;
    }

    /// Publish a lifecycle event if events are bound
    pub fn fire(&self, event: MediaEvent) {
        if let Some(notifier) = &self.events {
            notifier.send(Signal::Media(event));
        }
    }

    /// Add a text track, notifying the track list observer
    pub fn add_track(&mut self, descriptor: TrackDescriptor) -> TrackId {
        self.next_track += 1;
        let id = TrackId(self.next_track);
        self.tracks.push(HeadlessTrack {
            id,
            descriptor,
            active_cues: Vec::new(),
            listeners: Vec::new(),
        });
        if let Some(observer) = &self.track_observer {
            observer.send(Signal::TrackAdded(id));
        }
        id
    }

    /// Remove a text track, notifying the track list observer
    pub fn remove_track(&mut self, track: TrackId) {
        let before = self.tracks.len();
        self.tracks.retain(|t| t.id != track);
        if self.tracks.len() != before {
            if let Some(observer) = &self.track_observer {
                observer.send(Signal::TrackRemoved(track));
            }
        }
    }

    /// Replace a track's active cues and fire its cue-change listeners
    pub fn set_active_cues(&mut self, track: TrackId, cues: Vec<Cue>) {
        if let Some(entry) = self.track_mut(track) {
            entry.active_cues = cues;
            for listener in &entry.listeners {
                listener.send(Signal::CueChange(track));
            }
        }
    }

    pub fn track_mode(&self, track: TrackId) -> Option<TrackMode> {
        self.track(track).and_then(|t| t.descriptor.mode)
    }

    pub fn cue_listener_count(&self, track: TrackId) -> usize {
        self.track(track).map_or(0, |t| t.listeners.len())
    }

    pub fn is_observing_tracks(&self) -> bool {
        self.track_observer.is_some()
    }

    fn track(&self, track: TrackId) -> Option<&HeadlessTrack> {
        self.tracks.iter().find(|t| t.id == track)
    }

    fn track_mut(&mut self, track: TrackId) -> Option<&mut HeadlessTrack> {
        self.tracks.iter_mut().find(|t| t.id == track)
    }
}

impl MediaElement for HeadlessMedia {
    fn pause(&mut self) {
        self.calls.push(MediaCall::Pause);
        self.status.paused = true;
    }

    fn set_source(&mut self, url: &str) {
        self.calls.push(MediaCall::SetSource(url.to_string()));
        self.source = Some(url.to_string());
    }

    fn clear_source(&mut self) {
        self.calls.push(MediaCall::ClearSource);
        self.source = None;
    }

    fn reset(&mut self) {
        self.calls.push(MediaCall::Reset);
        self.status = MediaStatus::default();
        self.error = None;
    }

    fn request_play(&mut self, notifier: Notifier) {
        self.calls.push(MediaCall::Play);
        match &self.autoplay {
            AutoplayPolicy::Allow => {
                self.status.paused = false;
                self.fire(MediaEvent::Play);
            }
            AutoplayPolicy::Block(reason) => notifier.send(Signal::PlayRejected {
                reason: reason.clone(),
            }),
        }
    }

    fn status(&self) -> MediaStatus {
        self.status
    }

    fn error(&self) -> Option<MediaError> {
        self.error.clone()
    }

    fn can_play_type(&self, mime: &str) -> PlaybackSupport {
        match mime {
            NATIVE_MANIFEST_MIME if self.native_manifest => PlaybackSupport::Maybe,
            "audio/mpeg" | "audio/aac" => PlaybackSupport::Probably,
            _ => PlaybackSupport::No,
        }
    }

    fn bind_events(&mut self, _events: &[MediaEvent], notifier: Notifier) {
        self.bind_count += 1;
        self.events = Some(notifier);
    }

    fn text_tracks(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id).collect()
    }

    fn track_info(&self, track: TrackId) -> Option<TrackDescriptor> {
        self.track(track).map(|t| t.descriptor.clone())
    }

    fn set_track_mode(&mut self, track: TrackId, mode: TrackMode) {
        if let Some(entry) = self.track_mut(track) {
            entry.descriptor.mode = Some(mode);
        }
    }

    fn active_cues(&self, track: TrackId) -> Vec<Cue> {
        self.track(track)
            .map(|t| t.active_cues.clone())
            .unwrap_or_default()
    }

    fn listen_cue_change(&mut self, track: TrackId, notifier: Notifier) {
        if let Some(entry) = self.track_mut(track) {
            entry.listeners.push(notifier);
        }
    }

    fn unlisten_cue_change(&mut self, track: TrackId) {
        if let Some(entry) = self.track_mut(track) {
            entry.listeners.clear();
        }
    }

    fn observe_track_list(&mut self, notifier: Notifier) {
        self.track_observer = Some(notifier);
    }

    fn unobserve_track_list(&mut self) {
        self.track_observer = None;
    }
}

#[derive(Debug)]
struct Instance<E> {
    attached: bool,
    loaded: bool,
    subscriptions: Vec<(E, Notifier)>,
}

/// Book-keeping shared by a headless backend and its engines
#[derive(Debug)]
pub struct EngineLedger<E, P> {
    created: Vec<P>,
    destroyed: usize,
    sources: Vec<String>,
    live: BTreeMap<u64, Instance<E>>,
}

impl<E, P> Default for EngineLedger<E, P> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            destroyed: 0,
            sources: Vec::new(),
            live: BTreeMap::new(),
        }
    }
}

impl<E: Copy + Eq, P> EngineLedger<E, P> {
    /// Creation parameters of every engine, oldest first
    pub fn created(&self) -> &[P] {
        &self.created
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed
    }

    /// URLs handed to engines
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Engines not destroyed yet
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Live engines attached to a media element
    pub fn attached(&self) -> usize {
        self.live.values().filter(|i| i.attached).count()
    }

    /// Whether the newest live engine started loading
    pub fn loaded(&self) -> bool {
        self.live
            .values()
            .next_back()
            .is_some_and(|instance| instance.loaded)
    }

    /// Subscriptions to `event` on the newest live engine
    pub fn subscriptions(&self, event: E) -> usize {
        self.live.values().next_back().map_or(0, |instance| {
            instance
                .subscriptions
                .iter()
                .filter(|(subscribed, _)| *subscribed == event)
                .count()
        })
    }

    fn register(&mut self, params: P) -> u64 {
        self.created.push(params);
        let id = self.created.len() as u64;
        self.live.insert(
            id,
            Instance {
                attached: false,
                loaded: false,
                subscriptions: Vec::new(),
            },
        );
        id
    }

    fn instance(&mut self, id: u64) -> Option<&mut Instance<E>> {
        self.live.get_mut(&id)
    }

    fn release(&mut self, id: u64) {
        if self.live.remove(&id).is_some() {
            self.destroyed += 1;
        }
    }

    /// Notifiers of the newest live engine subscribed to `event`
    fn subscribers(&self, event: E) -> Vec<Notifier> {
        self.live.values().next_back().map_or_else(Vec::new, |instance| {
            instance
                .subscriptions
                .iter()
                .filter(|(subscribed, _)| *subscribed == event)
                .map(|(_, notifier)| notifier.clone())
                .collect()
        })
    }
}

type SharedLedger<E, P> = Arc<Mutex<EngineLedger<E, P>>>;

fn lock<E, P>(ledger: &SharedLedger<E, P>) -> MutexGuard<'_, EngineLedger<E, P>> {
    ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scripted adaptive engine factory
#[derive(Debug, Clone)]
pub struct HeadlessAdaptive {
    supported: bool,
    fail_create: bool,
    ledger: SharedLedger<AdaptiveEvent, AdaptiveConfig>,
}

impl HeadlessAdaptive {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            fail_create: false,
            ledger: Arc::default(),
        }
    }

    /// Make every construction fail
    pub fn failing(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn ledger(&self) -> MutexGuard<'_, EngineLedger<AdaptiveEvent, AdaptiveConfig>> {
        lock(&self.ledger)
    }

    /// Emit an event from the newest live engine; returns whether anyone listened
    pub fn emit(&self, event: AdaptiveEvent, payload: Value) -> bool {
        let subscribers = self.ledger().subscribers(event);
        for notifier in &subscribers {
            notifier.send(Signal::Adaptive {
                event,
                payload: payload.clone(),
            });
        }
        !subscribers.is_empty()
    }
}

/// Engine created by [`HeadlessAdaptive`]
#[derive(Debug)]
pub struct HeadlessAdaptiveEngine {
    id: u64,
    ledger: SharedLedger<AdaptiveEvent, AdaptiveConfig>,
}

impl<M: MediaElement> AdaptiveBackend<M> for HeadlessAdaptive {
    type Engine = HeadlessAdaptiveEngine;

    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, config: &AdaptiveConfig) -> Result<Self::Engine> {
        if self.fail_create {
            return Err(Error::collaborator("adaptive engine", "construction failed"));
        }
        let id = self.ledger().register(config.clone());
        Ok(HeadlessAdaptiveEngine {
            id,
            ledger: Arc::clone(&self.ledger),
        })
    }
}

impl<M: MediaElement> AdaptiveEngine<M> for HeadlessAdaptiveEngine {
    fn load_source(&mut self, url: &str) {
        let mut ledger = lock(&self.ledger);
        ledger.sources.push(url.to_string());
        if let Some(instance) = ledger.instance(self.id) {
            instance.loaded = true;
        }
    }

    fn attach_media(&mut self, _media: &mut M) {
        if let Some(instance) = lock(&self.ledger).instance(self.id) {
            instance.attached = true;
        }
    }

    fn on(&mut self, event: AdaptiveEvent, notifier: Notifier) {
        if let Some(instance) = lock(&self.ledger).instance(self.id) {
            instance.subscriptions.push((event, notifier));
        }
    }

    fn destroy(&mut self) {
        lock(&self.ledger).release(self.id);
    }
}

/// Scripted legacy-container player factory
#[derive(Debug, Clone)]
pub struct HeadlessLegacy {
    supported: bool,
    fail_create: bool,
    ledger: SharedLedger<LegacyEvent, LegacySource>,
}

impl HeadlessLegacy {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            fail_create: false,
            ledger: Arc::default(),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn ledger(&self) -> MutexGuard<'_, EngineLedger<LegacyEvent, LegacySource>> {
        lock(&self.ledger)
    }

    /// Emit a signal from the newest live player; returns whether anyone listened
    pub fn emit(&self, signal: LegacySignal) -> bool {
        let subscribers = self.ledger().subscribers(signal.kind());
        for notifier in &subscribers {
            notifier.send(Signal::Legacy(signal.clone()));
        }
        !subscribers.is_empty()
    }
}

/// Player created by [`HeadlessLegacy`]
#[derive(Debug)]
pub struct HeadlessLegacyEngine {
    id: u64,
    ledger: SharedLedger<LegacyEvent, LegacySource>,
}

impl<M: MediaElement> LegacyBackend<M> for HeadlessLegacy {
    type Engine = HeadlessLegacyEngine;

    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, source: &LegacySource) -> Result<Self::Engine> {
        if self.fail_create {
            return Err(Error::collaborator("legacy player", "construction failed"));
        }
        let mut ledger = self.ledger();
        ledger.sources.push(source.url.clone());
        let id = ledger.register(source.clone());
        Ok(HeadlessLegacyEngine {
            id,
            ledger: Arc::clone(&self.ledger),
        })
    }
}

impl<M: MediaElement> LegacyEngine<M> for HeadlessLegacyEngine {
    fn attach_media_element(&mut self, _media: &mut M) {
        if let Some(instance) = lock(&self.ledger).instance(self.id) {
            instance.attached = true;
        }
    }

    fn load(&mut self) {
        if let Some(instance) = lock(&self.ledger).instance(self.id) {
            instance.loaded = true;
        }
    }

    fn on(&mut self, event: LegacyEvent, notifier: Notifier) {
        if let Some(instance) = lock(&self.ledger).instance(self.id) {
            instance.subscriptions.push((event, notifier));
        }
    }

    fn destroy(&mut self) {
        lock(&self.ledger).release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{channel, Origin};
    use serde_json::json;

    #[test]
    fn test_engine_ledger_lifecycle() {
        let backend = HeadlessAdaptive::new(true);
        let mut engine =
            AdaptiveBackend::<HeadlessMedia>::create(&backend, &AdaptiveConfig::default()).unwrap();
        let mut media = HeadlessMedia::new();

        AdaptiveEngine::<HeadlessMedia>::load_source(&mut engine, "https://x/a.m3u8");
        engine.attach_media(&mut media);
        assert_eq!(backend.ledger().live(), 1);
        assert_eq!(backend.ledger().attached(), 1);
        assert!(backend.ledger().loaded());

        AdaptiveEngine::<HeadlessMedia>::destroy(&mut engine);
        assert_eq!(backend.ledger().live(), 0);
        assert_eq!(backend.ledger().destroyed(), 1);
        assert_eq!(backend.ledger().sources(), ["https://x/a.m3u8".to_string()]);
    }

    #[test]
    fn test_emit_reaches_subscribers_only() {
        let (sender, mut inbox) = channel();
        let backend = HeadlessLegacy::new(true);
        let source = LegacySource {
            kind: "flv".into(),
            url: "https://x/live.flv".into(),
            is_live: true,
        };
        let mut engine = LegacyBackend::<HeadlessMedia>::create(&backend, &source).unwrap();
        LegacyEngine::<HeadlessMedia>::on(
            &mut engine,
            LegacyEvent::MediaInfo,
            sender.notifier(Origin::Element),
        );

        assert!(backend.emit(LegacySignal::MediaInfo(json!({"hasAudio": true}))));
        assert!(!backend.emit(LegacySignal::LoadingComplete));

        let envelope = inbox.try_next().unwrap();
        assert_eq!(
            envelope.signal,
            Signal::Legacy(LegacySignal::MediaInfo(json!({"hasAudio": true})))
        );
        assert!(inbox.try_next().is_none());
    }

    #[test]
    fn test_blocked_autoplay_publishes_rejection() {
        let (sender, mut inbox) = channel();
        let mut media = HeadlessMedia::new().with_autoplay(AutoplayPolicy::Block("NotAllowedError".into()));
        media.request_play(sender.notifier(Origin::Element));

        assert_eq!(
            inbox.try_next().map(|env| env.signal),
            Some(Signal::PlayRejected {
                reason: "NotAllowedError".into()
            })
        );
        assert!(media.status().paused);
    }

    #[test]
    fn test_native_manifest_probe() {
        let media = HeadlessMedia::new().with_native_manifest(true);
        assert!(media.can_play_type(NATIVE_MANIFEST_MIME).is_playable());
        assert!(!HeadlessMedia::new().can_play_type(NATIVE_MANIFEST_MIME).is_playable());
    }
}
