//! Integration tests for Streamscope Core

use serde_json::json;
use streamscope_core::{
    classify_url, select_strategy,
    headless::{AutoplayPolicy, HeadlessAdaptive, HeadlessLegacy, HeadlessMedia, MediaCall},
    AdaptiveEvent, Capabilities, Cue, Gate, Inbox, LegacyEvent, LegacySignal, LifecycleManager,
    MediaError, MediaEvent, MemorySurface, PlaybackState, Strategy, StreamConfig, TrackDescriptor,
    TrackMode,
};

type Manager = LifecycleManager<HeadlessMedia, HeadlessAdaptive, HeadlessLegacy, MemorySurface>;

fn manager_with(media: HeadlessMedia, adaptive: bool, legacy: bool) -> (Manager, Inbox) {
    LifecycleManager::new(
        StreamConfig::default(),
        media,
        HeadlessAdaptive::new(adaptive),
        HeadlessLegacy::new(legacy),
        MemorySurface::default(),
    )
}

fn desktop() -> (Manager, Inbox) {
    manager_with(HeadlessMedia::new(), true, true)
}

fn attached_engines(manager: &Manager) -> usize {
    manager.adaptive_backend().ledger().attached() + manager.legacy_backend().ledger().attached()
}

// =============================================================================
// Strategy Selection
// =============================================================================

#[test]
fn test_manifest_urls_select_adaptive() {
    for url in [
        "https://x/live/master.m3u8",
        "https://x/live/index.M3U8?token=abc",
        "https://x/vod/playlist.m3u8#start",
    ] {
        let class = classify_url(url);
        assert_eq!(
            select_strategy(&class, &mut Capabilities::desktop()),
            Some(Strategy::Adaptive),
            "{url}"
        );
    }
}

#[test]
fn test_container_and_extensionless_urls_select_legacy() {
    for url in [
        "https://x/live/relay.flv",
        "https://x/live/relay.FLV?auth=1",
        "https://x/stream",
        "https://x/live/stream/",
    ] {
        let class = classify_url(url);
        assert_eq!(
            select_strategy(&class, &mut Capabilities::desktop()),
            Some(Strategy::Legacy),
            "{url}"
        );
    }
}

#[test]
fn test_non_manifest_urls_never_fail_selection() {
    let all = [
        Capabilities::default(),
        Capabilities::desktop(),
        Capabilities {
            adaptive: false,
            legacy: false,
            native_manifest: true,
        },
    ];
    for caps in all {
        for url in ["https://x/a.mp3", "https://x/b.aac?dist=1", "garbage"] {
            let mut probe = caps;
            let strategy = select_strategy(&classify_url(url), &mut probe);
            assert_eq!(strategy, Some(Strategy::Native), "{url} with {caps:?}");
        }
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_adaptive_load_and_manifest_autoplay() {
    let (mut manager, mut inbox) = desktop();
    let state = manager.load_stream("https://x/live/master.m3u8").unwrap();

    assert_eq!(state, PlaybackState::AdaptiveActive);
    assert_eq!(manager.gate(), Gate::Adaptive);
    assert!(manager.surface().log.contains("HLS.js playback enabled."));
    {
        let ledger = manager.adaptive_backend().ledger();
        assert_eq!(ledger.sources(), ["https://x/live/master.m3u8".to_string()]);
        assert_eq!(ledger.attached(), 1);
        assert!(ledger.created()[0].enable_webvtt);
        assert!(ledger.created()[0].enable_cea708_captions);
        assert_eq!(ledger.subscriptions(AdaptiveEvent::ManifestParsed), 1);
        assert_eq!(ledger.subscriptions(AdaptiveEvent::FragLoaded), 1);
    }

    let plays = |m: &Manager| m.media().calls().iter().filter(|c| **c == MediaCall::Play).count();
    assert_eq!(plays(&manager), 0);

    assert!(manager
        .adaptive_backend()
        .emit(AdaptiveEvent::ManifestParsed, json!({"levels": []})));
    manager.pump(&mut inbox);
    assert_eq!(plays(&manager), 1);
    // Manifest parsing is not narrated
    assert!(!manager.surface().log.contains("hlsManifestParsed"));
}

#[test]
fn test_adaptive_events_bypass_gate() {
    let (mut manager, mut inbox) = desktop();
    manager.load_stream("https://x/live/master.m3u8").unwrap();
    manager.pump(&mut inbox);

    manager
        .adaptive_backend()
        .emit(AdaptiveEvent::FragParsingMetadata, json!({"samples": [{"pts": 10.0}]}));
    manager.pump(&mut inbox);
    assert!(manager.surface().log.contains("\"event\": \"hlsFragParsingMetadata\""));

    // Generic media status is suppressed while the engine narrates
    manager.media().fire(MediaEvent::TimeUpdate);
    manager.pump(&mut inbox);
    assert!(manager.surface().log.contains("hlsFragParsingMetadata"));

    manager.adaptive_backend().emit(
        AdaptiveEvent::Error,
        json!({"type": "networkError", "details": "manifestLoadError", "fatal": true}),
    );
    manager.pump(&mut inbox);
    let log = &manager.surface().log;
    assert!(log.starts_with("{\n  \"event\": \"ERROR\",\n  \"type\": \"networkError\""));
    assert_eq!(manager.state(), PlaybackState::AdaptiveActive);
}

#[test]
fn test_legacy_load_clears_log_then_appends() {
    let (mut manager, mut inbox) = desktop();
    manager.load_stream("https://x/a.mp3").unwrap();
    assert!(manager.surface().log.contains("native audio playback"));

    let state = manager.load_stream("https://x/stream").unwrap();
    assert_eq!(state, PlaybackState::LegacyActive);
    assert_eq!(manager.gate(), Gate::Legacy);
    assert!(manager.surface().log.starts_with("{\n  \"event\": \"INFO\""));
    assert!(!manager.surface().log.contains("native audio playback"));

    {
        let ledger = manager.legacy_backend().ledger();
        let source = &ledger.created()[0];
        assert_eq!(source.kind, "flv");
        assert!(source.is_live);
        assert!(ledger.loaded());
        for event in LegacyEvent::ALL {
            assert_eq!(ledger.subscriptions(event), 1);
        }
    }

    manager.pump(&mut inbox);
    manager
        .legacy_backend()
        .emit(LegacySignal::MetadataArrived(json!({"duration": 0, "audiocodecid": 10})));
    manager.legacy_backend().emit(LegacySignal::ScriptDataArrived(Some(
        json!({"onCuePoint": {"name": "StreamTitle", "parameters": {"title": "Song"}}}),
    )));
    manager.pump(&mut inbox);

    let log = manager.surface().log.clone();
    let info = log.find("FLV.js playback enabled.").unwrap();
    let metadata = log.find("FLV_METADATA_ARRIVED").unwrap();
    let raw = log.find("[flv.js] scriptdata_arrived {\"onCuePoint\"").unwrap();
    let cue = log.find("FLV_CUE_POINT").unwrap();
    assert!(info < metadata && metadata < raw && raw < cue);
}

#[test]
fn test_legacy_media_info_and_errors() {
    let (mut manager, mut inbox) = desktop();
    manager.load_stream("https://x/live/relay.flv").unwrap();

    manager
        .legacy_backend()
        .emit(LegacySignal::MediaInfo(json!({"hasAudio": true, "audioCodec": "mp4a.40.2"})));
    manager.legacy_backend().emit(LegacySignal::Error {
        error_type: "NetworkError".into(),
        error_detail: "HttpStatusCodeInvalid".into(),
        error_info: json!({"code": 404, "msg": "Not Found"}),
    });
    manager.legacy_backend().emit(LegacySignal::ScriptDataArrived(None));
    manager.pump(&mut inbox);

    let surface = manager.surface();
    assert!(surface.media_info.contains("\"event\": \"FLV_MEDIA_INFO\""));
    assert!(surface.media_info.contains("mp4a.40.2"));
    assert!(surface.log.contains("\"errorType\": \"NetworkError\""));
    assert!(surface.log.contains("\n[flv.js] scriptdata_arrived\n"));
    assert!(surface.log.ends_with("{\n  \"event\": \"FLV_SCRIPT_DATA_ARRIVED\"\n}"));

    // Teardown clears the media-info panel
    manager.load_stream("https://x/a.mp3").unwrap();
    assert!(manager.surface().media_info.is_empty());
}

#[test]
fn test_native_load_sets_source_directly() {
    let (mut manager, mut inbox) = desktop();
    let state = manager.load_stream("https://x/a.mp3").unwrap();

    assert_eq!(state, PlaybackState::NativeActive);
    assert_eq!(manager.gate(), Gate::Open);
    assert_eq!(manager.media().source(), Some("https://x/a.mp3"));
    assert_eq!(manager.adaptive_backend().ledger().created().len(), 0);
    assert_eq!(manager.legacy_backend().ledger().created().len(), 0);

    let log = manager.surface().log.clone();
    assert!(log.contains("\"event\": \"INFO\""));
    assert!(log.contains("\"url\": \"https://x/a.mp3\""));

    manager.pump(&mut inbox);
    assert!(manager.surface().log.contains("\"event\": \"play\""));
}

#[test]
fn test_teardown_precedes_every_attach() {
    let (mut manager, mut inbox) = desktop();
    let urls = [
        "https://x/live/master.m3u8",
        "https://x/stream",
        "https://x/live/other.m3u8",
        "https://x/relay.flv",
        "https://x/a.mp3",
        "https://x/live/master.m3u8",
    ];
    for url in urls {
        manager.load_stream(url).unwrap();
        manager.pump(&mut inbox);
        assert!(attached_engines(&manager) <= 1, "two engines attached after {url}");
    }

    assert_eq!(manager.adaptive_backend().ledger().live(), 1);
    assert_eq!(manager.adaptive_backend().ledger().destroyed(), 2);
    assert_eq!(manager.legacy_backend().ledger().live(), 0);
    assert_eq!(manager.legacy_backend().ledger().destroyed(), 2);
}

#[test]
fn test_teardown_detaches_media_before_new_source() {
    let (mut manager, _inbox) = desktop();
    manager.load_stream("https://x/a.mp3").unwrap();
    manager.media_mut().clear_calls();

    manager.load_stream("https://x/b.mp3").unwrap();
    let calls = manager.media().calls();
    assert_eq!(
        &calls[..4],
        &[
            MediaCall::Pause,
            MediaCall::ClearSource,
            MediaCall::Reset,
            MediaCall::SetSource("https://x/b.mp3".to_string()),
        ]
    );
    assert_eq!(manager.media().bind_count(), 1);
}

#[test]
fn test_empty_url_keeps_state() {
    let (mut manager, mut inbox) = desktop();
    assert!(manager.load_stream("   ").is_err());
    assert_eq!(manager.state(), PlaybackState::Idle);
    assert!(manager.surface().log.contains("Stream URL is empty."));

    manager.load_stream("https://x/live/master.m3u8").unwrap();
    manager.pump(&mut inbox);
    let session = manager.session_id();

    let err = manager.load_stream("").unwrap_err();
    assert_eq!(err.error_code(), "EMPTY_URL");
    assert_eq!(manager.state(), PlaybackState::AdaptiveActive);
    assert_eq!(manager.session_id(), session);
    assert_eq!(manager.adaptive_backend().ledger().destroyed(), 0);
    assert!(manager.surface().log.contains("Stream URL is empty."));
}

#[test]
fn test_unsupported_manifest_is_recoverable() {
    let (mut manager, _inbox) = manager_with(HeadlessMedia::new(), false, true);
    let err = manager.load_stream("https://x/live/master.m3u8").unwrap_err();

    assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    assert_eq!(manager.state(), PlaybackState::Idle);
    assert!(manager.media().source().is_none());
    assert!(manager.surface().log.contains("\"error\": \"Adaptive streaming is not supported"));

    assert_eq!(
        manager.load_stream("https://x/a.mp3").unwrap(),
        PlaybackState::NativeActive
    );
}

#[test]
fn test_events_from_destroyed_engine_are_ignored() {
    let (mut manager, mut inbox) = desktop();
    manager.load_stream("https://x/relay.flv").unwrap();
    manager
        .legacy_backend()
        .emit(LegacySignal::MetadataArrived(json!({"stale": true})));

    manager.load_stream("https://x/a.mp3").unwrap();
    manager.pump(&mut inbox);
    assert!(!manager.surface().log.contains("stale"));
}

// =============================================================================
// Autoplay and Media Events
// =============================================================================

#[test]
fn test_autoplay_rejection_is_informational() {
    let media = HeadlessMedia::new().with_autoplay(AutoplayPolicy::Block("NotAllowedError".into()));
    let (mut manager, mut inbox) = manager_with(media, true, true);
    manager.load_stream("https://x/a.mp3").unwrap();
    manager.pump(&mut inbox);

    let log = &manager.surface().log;
    assert!(log.contains("\"event\": \"autoplay-blocked\""));
    assert!(log.contains("\"error\": \"NotAllowedError\""));
    assert_eq!(manager.state(), PlaybackState::NativeActive);
}

#[test]
fn test_media_error_record() {
    let (mut manager, mut inbox) = desktop();
    manager.load_stream("https://x/a.mp3").unwrap();
    manager.pump(&mut inbox);

    manager.media_mut().set_error(Some(MediaError {
        code: 4,
        message: Some("MEDIA_ELEMENT_ERROR: Format error".into()),
    }));
    manager.media().fire(MediaEvent::Error);
    manager.pump(&mut inbox);

    let log = &manager.surface().log;
    assert!(log.starts_with("{\n  \"event\": \"error\",\n  \"currentTime\": 0.0,\n  \"duration\": null"));
    assert!(log.contains("\"mediaError\": {\n    \"code\": 4"));
}

// =============================================================================
// Subtitle Bridge
// =============================================================================

#[test]
fn test_subtitle_toggle_idempotent() {
    let (mut manager, mut inbox) = desktop();
    let track = manager
        .media_mut()
        .add_track(TrackDescriptor::new("metadata", "", ""));

    assert!(manager.set_subtitles_enabled(true));
    assert!(!manager.set_subtitles_enabled(true));
    assert_eq!(manager.media().cue_listener_count(track), 1);
    assert_eq!(manager.media().track_mode(track), Some(TrackMode::Hidden));

    assert!(manager.set_subtitles_enabled(false));
    assert!(!manager.set_subtitles_enabled(false));
    assert_eq!(manager.media().cue_listener_count(track), 0);
    manager.pump(&mut inbox);
}

#[test]
fn test_dynamic_tracks_and_cues() {
    let (mut manager, mut inbox) = desktop();
    manager.load_stream("https://x/a.mp3").unwrap();
    manager.set_subtitles_enabled(true);

    let track = manager.media_mut().add_track(
        TrackDescriptor::new("metadata", "", "").with_dispatch_type("com.apple.streaming"),
    );
    manager.pump(&mut inbox);
    assert!(manager.subtitles().is_bound(track));

    manager
        .media_mut()
        .set_active_cues(track, vec![Cue::data("", 12.0, 12.5, json!({"key": "TIT2", "data": "Song"}))]);
    manager.pump(&mut inbox);
    let log = manager.surface().log.clone();
    assert!(log.contains("\"event\": \"TextTrack.cuechange\""));
    assert!(log.contains("\"key\": \"TIT2\""));

    manager.media_mut().remove_track(track);
    manager.pump(&mut inbox);
    assert!(!manager.subtitles().is_bound(track));
}

#[test]
fn test_legacy_session_disables_subtitles() {
    let (mut manager, mut inbox) = desktop();
    manager.media_mut().add_track(TrackDescriptor::new("captions", "CC1", "en"));
    manager.set_subtitles_enabled(true);
    assert!(manager.controls().subtitles_checked);

    manager.load_stream("https://x/stream").unwrap();
    manager.pump(&mut inbox);
    assert!(!manager.subtitles().is_enabled());
    assert!(!manager.controls().subtitles_checked);
    assert!(!manager.controls().subtitles_available);
    assert!(!manager.set_subtitles_enabled(true));
    // Bridge messages are gated away from the legacy log
    assert!(!manager.surface().log.contains("TextTrack"));

    manager.load_stream("https://x/a.mp3").unwrap();
    assert!(manager.controls().subtitles_available);
    assert!(manager.set_subtitles_enabled(true));
}

#[test]
fn test_subtitles_on_start() {
    let config = StreamConfig {
        subtitles_on_start: true,
        ..StreamConfig::default()
    };
    let (manager, _inbox) = LifecycleManager::new(
        config,
        HeadlessMedia::new(),
        HeadlessAdaptive::new(true),
        HeadlessLegacy::new(true),
        MemorySurface::default(),
    );
    assert!(manager.subtitles().is_enabled());
    assert!(manager.surface().log.contains("\"trackCount\": 0"));
}

#[tokio::test]
async fn test_async_dispatch_loop() {
    let (mut manager, mut inbox) = desktop();
    manager.load_stream("https://x/live/master.m3u8").unwrap();
    manager
        .adaptive_backend()
        .emit(AdaptiveEvent::FragChanged, json!({"frag": {"sn": 7}}));

    assert!(manager.dispatch_next(&mut inbox).await);
    assert!(manager.surface().log.contains("\"sn\": 7"));
}
