//! Stream lifecycle manager - owns the single playback session
//!
//! Coordinates:
//! - Input validation and teardown of the previous session
//! - Strategy selection through the capability detector
//! - Engine construction, attachment and event subscription
//! - Autoplay requests
//! - Routing of inbound events into the metadata sink

use crate::{
    classify::{classify_url, select_strategy, CapabilityProbe},
    config::StreamConfig,
    engine::{AdaptiveBackend, AdaptiveEngine, LegacyBackend, LegacyEngine, LegacySource},
    events::{
        channel, AdaptiveEvent, Envelope, EventSender, Inbox, LegacyEvent, LegacySignal,
        MediaEvent, Notifier, Origin, Signal,
    },
    media::MediaElement,
    record::EventRecord,
    sink::{MetadataSink, MetadataSurface},
    subtitles::SubtitleBridge,
    types::*,
    Error, Result,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

const ADAPTIVE_ENABLED: &str = "HLS.js playback enabled.";
const LEGACY_ENABLED: &str = "FLV.js playback enabled.";
const NATIVE_ENABLED: &str = "Non-HLS stream detected. Using native audio playback.";
const NATIVE_MANIFEST_LOADED: &str = "Native HLS loaded.";
const ADAPTIVE_UNSUPPORTED: &str = "Adaptive streaming is not supported in this runtime.";
const AUTOPLAY_BLOCKED: &str = "Autoplay was blocked by the browser. Click play to start.";

/// The active playback session
enum Session<AE, LE> {
    None,
    Adaptive { id: SessionId, engine: AE },
    Legacy { id: SessionId, engine: LE },
    Native { id: SessionId, announce_on_metadata: bool },
}

impl<AE, LE> Session<AE, LE> {
    fn id(&self) -> Option<SessionId> {
        match self {
            Session::None => None,
            Session::Adaptive { id, .. }
            | Session::Legacy { id, .. }
            | Session::Native { id, .. } => Some(*id),
        }
    }
}

/// Capability probe answered by the live collaborators
struct RuntimeProbe<'a, M, A, L> {
    media: &'a M,
    adaptive: &'a A,
    legacy: &'a L,
    native_manifest_mime: &'a str,
}

impl<M, A, L> CapabilityProbe for RuntimeProbe<'_, M, A, L>
where
    M: MediaElement,
    A: AdaptiveBackend<M>,
    L: LegacyBackend<M>,
{
    fn adaptive_supported(&mut self) -> bool {
        self.adaptive.is_supported()
    }

    fn legacy_supported(&mut self) -> bool {
        self.legacy.is_supported()
    }

    fn native_manifest_supported(&mut self) -> bool {
        self.media
            .can_play_type(self.native_manifest_mime)
            .is_playable()
    }
}

/// Lifecycle manager owning the media element, both engine factories and the
/// metadata sink
pub struct LifecycleManager<M, A, L, S>
where
    M: MediaElement,
    A: AdaptiveBackend<M>,
    L: LegacyBackend<M>,
    S: MetadataSurface,
{
    config: StreamConfig,
    media: M,
    adaptive: A,
    legacy: L,
    sink: MetadataSink<S>,
    subtitles: SubtitleBridge,
    session: Session<A::Engine, L::Engine>,
    state: PlaybackState,
    controls: ControlState,
    media_bound: bool,
    sender: EventSender,
}

impl<M, A, L, S> LifecycleManager<M, A, L, S>
where
    M: MediaElement,
    A: AdaptiveBackend<M>,
    L: LegacyBackend<M>,
    S: MetadataSurface,
{
    /// Create a manager and the inbox its collaborators publish into
    pub fn new(config: StreamConfig, media: M, adaptive: A, legacy: L, surface: S) -> (Self, Inbox) {
        let (sender, inbox) = channel();
        let mut manager = Self {
            config,
            media,
            adaptive,
            legacy,
            sink: MetadataSink::new(surface),
            subtitles: SubtitleBridge::new(),
            session: Session::None,
            state: PlaybackState::Idle,
            controls: ControlState::default(),
            media_bound: false,
            sender,
        };
        if manager.config.subtitles_on_start {
            manager.set_subtitles_enabled(true);
        }
        (manager, inbox)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn gate(&self) -> Gate {
        self.sink.gate()
    }

    pub fn controls(&self) -> ControlState {
        self.controls
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Id of the active session, if any
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.id()
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn sink(&self) -> &MetadataSink<S> {
        &self.sink
    }

    pub fn surface(&self) -> &S {
        self.sink.surface()
    }

    pub fn subtitles(&self) -> &SubtitleBridge {
        &self.subtitles
    }

    pub fn adaptive_backend(&self) -> &A {
        &self.adaptive
    }

    pub fn legacy_backend(&self) -> &L {
        &self.legacy
    }

    /// Load the configured default stream
    pub fn load_default(&mut self) -> Result<PlaybackState> {
        let url = self.config.default_url.clone();
        self.load_stream(&url)
    }

    /// Replace the current session with one playing `url`.
    ///
    /// Empty input is reported and leaves the current session untouched.
    /// Every other request first tears the previous session down.
    #[instrument(skip(self))]
    pub fn load_stream(&mut self, url: &str) -> Result<PlaybackState> {
        let url = url.trim();
        if url.is_empty() {
            warn!("Rejected empty stream URL");
            self.sink.render(
                &EventRecord::new("ERROR").with("message", "Stream URL is empty."),
                true,
                true,
            );
            return Err(Error::EmptyUrl);
        }

        self.teardown();
        self.bind_media_events();

        let class = classify_url(url);
        let strategy = select_strategy(
            &class,
            &mut RuntimeProbe {
                media: &self.media,
                adaptive: &self.adaptive,
                legacy: &self.legacy,
                native_manifest_mime: &self.config.native_manifest_mime,
            },
        );
        debug!(?class, ?strategy, "Strategy selected");

        match strategy {
            Some(Strategy::Adaptive) => self.start_adaptive(url),
            Some(Strategy::Legacy) => self.start_legacy(url),
            Some(Strategy::Native) => Ok(self.start_native(url, false)),
            Some(Strategy::NativeManifest) => Ok(self.start_native(url, true)),
            None => self.reject_unsupported(url),
        }
    }

    /// Release the active engine and detach the media element
    pub fn teardown(&mut self) {
        match std::mem::replace(&mut self.session, Session::None) {
            Session::Adaptive { id, mut engine } => {
                engine.destroy();
                debug!(session = %id, "Adaptive engine destroyed");
            }
            Session::Legacy { id, mut engine } => {
                engine.destroy();
                debug!(session = %id, "Legacy player destroyed");
            }
            Session::Native { .. } | Session::None => {}
        }

        self.sink.set_gate(Gate::Open);
        self.media.pause();
        self.media.clear_source();
        self.media.reset();
        self.sink.clear_media_info();
        self.state = PlaybackState::Idle;
    }

    /// Toggle the subtitle bridge; returns whether anything changed.
    ///
    /// Enabling is refused while the toggle is unavailable.
    pub fn set_subtitles_enabled(&mut self, enabled: bool) -> bool {
        if !enabled {
            self.controls.subtitles_checked = false;
            return self.subtitles.disable(&mut self.media, &mut self.sink);
        }
        if !self.controls.subtitles_available {
            warn!(state = %self.state, "Subtitle toggle is unavailable");
            return false;
        }
        self.controls.subtitles_checked = true;
        let notifier = self.sender.notifier(Origin::Element);
        self.subtitles.enable(&mut self.media, &mut self.sink, notifier)
    }

    /// Dispatch every queued envelope; returns how many were handled
    pub fn pump(&mut self, inbox: &mut Inbox) -> usize {
        let mut handled = 0;
        while let Some(envelope) = inbox.try_next() {
            self.dispatch(envelope);
            handled += 1;
        }
        handled
    }

    /// Wait for one envelope and dispatch it; `false` once the channel closed
    pub async fn dispatch_next(&mut self, inbox: &mut Inbox) -> bool {
        match inbox.recv().await {
            Some(envelope) => {
                self.dispatch(envelope);
                true
            }
            None => false,
        }
    }

    /// Route one inbound envelope
    pub fn dispatch(&mut self, envelope: Envelope) {
        if let Origin::Session(id) = envelope.origin {
            if self.session.id() != Some(id) {
                debug!(session = %id, "Dropped event from ended session");
                return;
            }
        }

        match envelope.signal {
            Signal::Adaptive { event, payload } => self.on_adaptive(event, payload),
            Signal::Legacy(signal) => self.on_legacy(signal),
            Signal::Media(event) => self.on_media(event),
            Signal::PlayRejected { reason } => self.on_play_rejected(reason),
            Signal::TrackAdded(track) => {
                let notifier = self.sender.notifier(Origin::Element);
                self.subtitles.track_added(&mut self.media, track, &notifier);
            }
            Signal::TrackRemoved(track) => self.subtitles.track_removed(&mut self.media, track),
            Signal::CueChange(track) => {
                if let Some(record) = self.subtitles.cue_change(&self.media, track) {
                    self.sink.render(&record, false, false);
                }
            }
        }
    }

    fn start_adaptive(&mut self, url: &str) -> Result<PlaybackState> {
        self.sink.set_gate(Gate::Adaptive);
        self.controls.subtitles_available = true;

        let mut engine = match self.adaptive.create(&self.config.adaptive) {
            Ok(engine) => engine,
            Err(err) => return Err(self.collaborator_failed(err)),
        };
        let id = SessionId::new();
        let notifier = self.sender.notifier(Origin::Session(id));

        engine.load_source(url);
        engine.attach_media(&mut self.media);
        for event in AdaptiveEvent::FORWARDED {
            engine.on(event, notifier.clone());
        }
        engine.on(AdaptiveEvent::Error, notifier.clone());
        self.sink
            .render(&EventRecord::info(ADAPTIVE_ENABLED, url), true, false);
        // Playback starts once the manifest is in
        engine.on(AdaptiveEvent::ManifestParsed, notifier);

        self.session = Session::Adaptive { id, engine };
        Ok(self.enter(Strategy::Adaptive, id, url))
    }

    fn start_legacy(&mut self, url: &str) -> Result<PlaybackState> {
        self.sink.set_gate(Gate::Legacy);
        self.sink.clear_log();
        self.controls.subtitles_checked = false;
        self.controls.subtitles_available = false;
        self.subtitles.disable(&mut self.media, &mut self.sink);

        let source = LegacySource {
            kind: self.config.legacy.container.clone(),
            url: url.to_string(),
            is_live: self.config.legacy.is_live,
        };
        let mut engine = match self.legacy.create(&source) {
            Ok(engine) => engine,
            Err(err) => return Err(self.collaborator_failed(err)),
        };
        let id = SessionId::new();
        let notifier = self.sender.notifier(Origin::Session(id));

        engine.attach_media_element(&mut self.media);
        engine.load();
        for event in LegacyEvent::ALL {
            engine.on(event, notifier.clone());
        }
        self.sink
            .append(&EventRecord::info(LEGACY_ENABLED, url).to_pretty());

        self.session = Session::Legacy { id, engine };
        let state = self.enter(Strategy::Legacy, id, url);
        self.try_autoplay();
        Ok(state)
    }

    fn start_native(&mut self, url: &str, manifest_handoff: bool) -> PlaybackState {
        self.controls.subtitles_available = true;
        self.media.set_source(url);

        let id = SessionId::new();
        self.session = Session::Native {
            id,
            announce_on_metadata: manifest_handoff,
        };
        let state = if manifest_handoff {
            self.enter(Strategy::NativeManifest, id, url)
        } else {
            self.sink
                .render(&EventRecord::info(NATIVE_ENABLED, url), false, false);
            self.enter(Strategy::Native, id, url)
        };
        self.try_autoplay();
        state
    }

    fn reject_unsupported(&mut self, url: &str) -> Result<PlaybackState> {
        self.controls.subtitles_available = true;
        warn!(url, "No playback strategy for stream");
        self.sink.render(
            &EventRecord::new("ERROR").with("error", ADAPTIVE_UNSUPPORTED),
            false,
            false,
        );
        Err(Error::UnsupportedFormat {
            url: url.to_string(),
        })
    }

    fn collaborator_failed(&mut self, err: Error) -> Error {
        warn!(error = %err, "Engine construction failed");
        self.sink.set_gate(Gate::Open);
        self.controls.subtitles_available = true;
        self.state = PlaybackState::Idle;
        self.sink.render(
            &EventRecord::new("ERROR")
                .with("code", err.error_code())
                .with("message", err.to_string()),
            true,
            true,
        );
        err
    }

    fn enter(&mut self, strategy: Strategy, id: SessionId, url: &str) -> PlaybackState {
        self.state = strategy.state();
        info!(session = %id, %strategy, url, "Session started");
        self.state
    }

    fn bind_media_events(&mut self) {
        if self.media_bound {
            return;
        }
        let notifier = self.sender.notifier(Origin::Element);
        self.media.bind_events(&MediaEvent::ALL, notifier);
        self.media_bound = true;
    }

    fn session_notifier(&self) -> Notifier {
        let origin = self.session.id().map_or(Origin::Element, Origin::Session);
        self.sender.notifier(origin)
    }

    fn try_autoplay(&mut self) {
        let notifier = self.session_notifier();
        self.media.request_play(notifier);
    }

    fn on_adaptive(&mut self, event: AdaptiveEvent, payload: Value) {
        match event {
            AdaptiveEvent::ManifestParsed => {
                debug!("Manifest parsed, requesting playback");
                self.try_autoplay();
            }
            AdaptiveEvent::Error => {
                warn!(%payload, "Adaptive engine error");
                self.sink
                    .render(&EventRecord::new("ERROR").merge(payload), true, false);
            }
            _ => {
                debug!(%event, "Adaptive event");
                self.sink
                    .render(&EventRecord::new(event.name()).merge(payload), true, false);
            }
        }
    }

    fn on_legacy(&mut self, signal: LegacySignal) {
        debug!(event = %signal.kind(), ?signal, "Legacy event");
        match signal {
            LegacySignal::MetadataArrived(metadata) => {
                let record = EventRecord::new("FLV_METADATA_ARRIVED").with("metadata", metadata);
                self.sink.append(&record.to_pretty());
            }
            LegacySignal::ScriptDataArrived(data) => {
                let data = data.filter(|value| !value.is_null());
                let compact = data
                    .as_ref()
                    .map(Value::to_string)
                    .unwrap_or_default();
                self.sink
                    .append(format!("[flv.js] scriptdata_arrived {compact}").trim());
                self.sink.append(&script_data_record(data).to_pretty());
            }
            LegacySignal::MediaInfo(info) => {
                self.sink
                    .render_media_info(&EventRecord::new("FLV_MEDIA_INFO").with("info", info));
            }
            LegacySignal::Error {
                error_type,
                error_detail,
                error_info,
            } => {
                warn!(%error_type, %error_detail, "Legacy player error");
                let record = EventRecord::new("FLV_ERROR")
                    .with("errorType", error_type)
                    .with("errorDetail", error_detail)
                    .with("errorInfo", error_info);
                self.sink.append(&record.to_pretty());
            }
            LegacySignal::LoadingComplete
            | LegacySignal::RecoveredEarlyEof
            | LegacySignal::StatisticsInfo(_) => {}
        }
    }

    fn on_media(&mut self, event: MediaEvent) {
        let status = serde_json::to_value(self.media.status()).unwrap_or(Value::Null);
        let mut record = EventRecord::new(event.name()).merge(status);
        if event == MediaEvent::Error {
            if let Some(error) = self.media.error() {
                record = record.with("mediaError", error);
            }
        }
        self.sink.render(&record, false, false);

        if event == MediaEvent::LoadedMetadata {
            if let Session::Native {
                announce_on_metadata,
                ..
            } = &mut self.session
            {
                if std::mem::take(announce_on_metadata) {
                    self.sink.render(
                        &EventRecord::new("loadedmetadata").with("message", NATIVE_MANIFEST_LOADED),
                        false,
                        false,
                    );
                }
            }
        }
    }

    fn on_play_rejected(&mut self, reason: String) {
        info!(%reason, "Autoplay rejected");
        self.sink.render(
            &EventRecord::new("autoplay-blocked")
                .with("message", AUTOPLAY_BLOCKED)
                .with("error", reason),
            false,
            false,
        );
    }
}

/// Classify a script-data tag by the first known handler it carries
fn script_data_record(data: Option<Value>) -> EventRecord {
    let Some(data) = data else {
        return EventRecord::new("FLV_SCRIPT_DATA_ARRIVED");
    };
    if let Some(cue_point) = present(&data, "onCuePoint") {
        return EventRecord::new("FLV_CUE_POINT").with("cuePoint", cue_point);
    }
    if let Some(listener_info) = present(&data, "onListenerInfo") {
        return EventRecord::new("FLV_LISTENER_INFO").with("listenerInfo", listener_info);
    }
    if let Some(metadata) = present(&data, "onMetaData") {
        return EventRecord::new("FLV_ON_METADATA").with("metadata", metadata);
    }
    EventRecord::new("FLV_SCRIPT_DATA_ARRIVED").with("data", data)
}

/// Field value unless missing or falsy
fn present<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    data.get(key).filter(|value| match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessAdaptive, HeadlessLegacy, HeadlessMedia};
    use crate::sink::MemorySurface;
    use serde_json::json;

    type TestManager = LifecycleManager<HeadlessMedia, HeadlessAdaptive, HeadlessLegacy, MemorySurface>;

    fn manager() -> (TestManager, Inbox) {
        LifecycleManager::new(
            StreamConfig::default(),
            HeadlessMedia::new(),
            HeadlessAdaptive::new(true),
            HeadlessLegacy::new(true),
            MemorySurface::default(),
        )
    }

    #[test]
    fn test_manager_creation() {
        let (manager, _inbox) = manager();
        assert_eq!(manager.state(), PlaybackState::Idle);
        assert_eq!(manager.gate(), Gate::Open);
        assert!(manager.session_id().is_none());
        assert!(manager.controls().subtitles_available);
    }

    #[test]
    fn test_script_data_classification() {
        let record = script_data_record(Some(json!({"onCuePoint": {"name": "ad"}})));
        assert_eq!(record.event(), Some("FLV_CUE_POINT"));

        let record = script_data_record(Some(json!({"onListenerInfo": {"count": 3}})));
        assert_eq!(record.event(), Some("FLV_LISTENER_INFO"));

        let record = script_data_record(Some(json!({"onMetaData": {"duration": 0}})));
        assert_eq!(record.event(), Some("FLV_ON_METADATA"));

        let record = script_data_record(Some(json!({"onCuePoint": null, "other": 1})));
        assert_eq!(record.event(), Some("FLV_SCRIPT_DATA_ARRIVED"));
        assert_eq!(record.get("data"), Some(&json!({"onCuePoint": null, "other": 1})));

        let record = script_data_record(None);
        assert!(record.get("data").is_none());
    }

    #[test]
    fn test_stale_session_events_dropped() {
        let (mut manager, mut inbox) = manager();
        manager.load_stream("https://x/live/master.m3u8").unwrap();
        let stale = manager.sender.notifier(Origin::Session(SessionId::new()));

        stale.send(Signal::Adaptive {
            event: AdaptiveEvent::FragLoaded,
            payload: json!({"frag": {"sn": 1}}),
        });
        manager.pump(&mut inbox);
        assert!(!manager.surface().log.contains("hlsFragLoaded"));
    }

    #[test]
    fn test_native_manifest_announces_once() {
        let (mut manager, mut inbox) = LifecycleManager::new(
            StreamConfig::default(),
            HeadlessMedia::new().with_native_manifest(true),
            HeadlessAdaptive::new(false),
            HeadlessLegacy::new(true),
            MemorySurface::default(),
        );
        let state = manager.load_stream("https://x/master.m3u8").unwrap();
        assert_eq!(state, PlaybackState::NativeActive);
        assert_eq!(manager.media().source(), Some("https://x/master.m3u8"));
        manager.pump(&mut inbox);

        manager.media().fire(MediaEvent::LoadedMetadata);
        manager.pump(&mut inbox);
        assert!(manager.surface().log.contains(NATIVE_MANIFEST_LOADED));

        manager.media().fire(MediaEvent::LoadedMetadata);
        manager.pump(&mut inbox);
        assert!(!manager.surface().log.contains(NATIVE_MANIFEST_LOADED));
    }

    #[test]
    fn test_collaborator_failure_leaves_idle() {
        let (mut manager, _inbox) = LifecycleManager::new(
            StreamConfig::default(),
            HeadlessMedia::new(),
            HeadlessAdaptive::new(true).failing(),
            HeadlessLegacy::new(true),
            MemorySurface::default(),
        );
        let err = manager.load_stream("https://x/master.m3u8").unwrap_err();
        assert_eq!(err.error_code(), "COLLABORATOR");
        assert_eq!(manager.state(), PlaybackState::Idle);
        assert_eq!(manager.gate(), Gate::Open);
        assert!(manager.surface().log.contains("\"event\": \"ERROR\""));
    }
}
