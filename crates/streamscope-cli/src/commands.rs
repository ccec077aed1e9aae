//! CLI command implementations

use crate::output::{indent, to_json, OutputFormat};
use crate::RuntimeArgs;
use serde::Serialize;
use serde_json::json;
use streamscope_core::{
    classify_url,
    headless::{AutoplayPolicy, HeadlessAdaptive, HeadlessLegacy, HeadlessMedia},
    select_strategy, AdaptiveEvent, Capabilities, ControlState, Cue, Inbox, LegacySignal,
    LifecycleManager, MediaEvent, MediaStatus, MemorySurface, PlaybackState, Strategy,
    StreamConfig, TrackDescriptor, UrlClass,
};
use tracing::{debug, info};

type HeadlessManager =
    LifecycleManager<HeadlessMedia, HeadlessAdaptive, HeadlessLegacy, MemorySurface>;

const AUTOPLAY_REFUSAL: &str =
    "NotAllowedError: play() failed because the user didn't interact with the document first.";

impl RuntimeArgs {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            adaptive: !self.no_adaptive,
            legacy: !self.no_legacy,
            native_manifest: self.native_manifest,
        }
    }
}

#[derive(Serialize)]
struct Classification<'a> {
    url: &'a str,
    class: UrlClass,
    strategy: Option<Strategy>,
}

/// Classify URLs
pub fn classify(urls: &[String], runtime: RuntimeArgs, format: &str) -> anyhow::Result<()> {
    let reports: Vec<Classification> = urls
        .iter()
        .map(|url| {
            let class = classify_url(url);
            let strategy = select_strategy(&class, &mut runtime.capabilities());
            Classification {
                url,
                class,
                strategy,
            }
        })
        .collect();

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&reports)),
        OutputFormat::Text => {
            for report in &reports {
                println!("{}", report.url);
                println!("  Adaptive manifest: {}", report.class.adaptive_manifest);
                println!("  Legacy container:  {}", report.class.legacy_container);
                println!("  Extensionless:     {}", report.class.extensionless);
                match report.strategy {
                    Some(strategy) => println!("  Strategy:          {}", strategy),
                    None => println!("  Strategy:          unsupported"),
                }
            }
        }
    }

    Ok(())
}

/// Options of a simulated session
#[derive(Debug, Clone, Copy)]
pub struct SimulateOptions {
    pub runtime: RuntimeArgs,
    pub block_autoplay: bool,
    pub subtitles: bool,
}

#[derive(Serialize)]
struct SessionReport {
    url: String,
    state: PlaybackState,
    error: Option<String>,
    events: usize,
    log: String,
    media_info: String,
    controls: ControlState,
}

/// Load each URL in turn against headless collaborators
pub async fn simulate(
    config: StreamConfig,
    urls: &[String],
    options: SimulateOptions,
    format: &str,
) -> anyhow::Result<()> {
    let urls = if urls.is_empty() {
        vec![config.default_url.clone()]
    } else {
        urls.to_vec()
    };

    let caps = options.runtime.capabilities();
    let mut media = HeadlessMedia::new().with_native_manifest(caps.native_manifest);
    if options.block_autoplay {
        media = media.with_autoplay(AutoplayPolicy::Block(AUTOPLAY_REFUSAL.to_string()));
    }
    let (mut manager, mut inbox) = LifecycleManager::new(
        config,
        media,
        HeadlessAdaptive::new(caps.adaptive),
        HeadlessLegacy::new(caps.legacy),
        MemorySurface::default(),
    );
    if options.subtitles {
        manager.set_subtitles_enabled(true);
    }

    let mut reports = Vec::with_capacity(urls.len());
    for url in &urls {
        info!(url = %url, "Simulating load");
        let error = manager.load_stream(url).err().map(|err| {
            debug!(code = err.error_code(), "Load refused");
            err.to_string()
        });
        let mut events = manager.pump(&mut inbox);
        if error.is_none() {
            events += replay(&mut manager, &mut inbox, options.subtitles);
        }

        let surface = manager.surface();
        reports.push(SessionReport {
            url: url.clone(),
            state: manager.state(),
            error,
            events,
            log: surface.log.clone(),
            media_info: surface.media_info.clone(),
            controls: manager.controls(),
        });
    }

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&reports)),
        OutputFormat::Text => {
            for report in &reports {
                print_session(report);
            }
        }
    }

    Ok(())
}

/// Emit the event sequence a real session of the current state would see
fn replay(manager: &mut HeadlessManager, inbox: &mut Inbox, subtitles: bool) -> usize {
    match manager.state() {
        PlaybackState::AdaptiveActive => {
            let engine = manager.adaptive_backend();
            engine.emit(
                AdaptiveEvent::ManifestParsed,
                json!({"levels": [{"bitrate": 128000, "audioCodec": "mp4a.40.2"}]}),
            );
            engine.emit(
                AdaptiveEvent::FragLoaded,
                json!({"frag": {"sn": 1, "duration": 6.0, "url": "segment1.aac"}}),
            );
            engine.emit(
                AdaptiveEvent::FragParsingMetadata,
                json!({"samples": [{"pts": 6.0, "dts": 6.0, "type": "ID3"}]}),
            );
            engine.emit(AdaptiveEvent::FragChanged, json!({"frag": {"sn": 1}}));
        }
        PlaybackState::LegacyActive => {
            let player = manager.legacy_backend();
            player.emit(LegacySignal::MediaInfo(json!({
                "mimeType": "video/x-flv; codecs=\"mp4a.40.2\"",
                "hasAudio": true,
                "hasVideo": false,
                "audioCodec": "mp4a.40.2",
                "audioSampleRate": 44100
            })));
            player.emit(LegacySignal::MetadataArrived(json!({
                "duration": 0,
                "audiocodecid": 10,
                "audiosamplerate": 44100
            })));
            player.emit(LegacySignal::ScriptDataArrived(Some(json!({
                "onCuePoint": {"name": "StreamTitle", "parameters": {"title": "Now Playing"}}
            }))));
            player.emit(LegacySignal::StatisticsInfo(json!({"speed": 16.0})));
        }
        PlaybackState::NativeActive => {
            manager.media_mut().set_status(MediaStatus {
                current_time: 1.5,
                duration: f64::INFINITY,
                paused: false,
                ended: false,
                ready_state: 4,
                network_state: 2,
            });
            let media = manager.media();
            media.fire(MediaEvent::LoadedMetadata);
            media.fire(MediaEvent::CanPlay);
            media.fire(MediaEvent::TimeUpdate);
        }
        PlaybackState::Idle => {}
    }
    let mut events = manager.pump(inbox);

    if subtitles && manager.state().is_active() {
        let track = manager.media_mut().add_track(
            TrackDescriptor::new("metadata", "", "").with_dispatch_type("com.apple.streaming"),
        );
        events += manager.pump(inbox);
        manager.media_mut().set_active_cues(
            track,
            vec![Cue::data("", 1.5, 2.0, json!({"key": "TIT2", "data": "Now Playing"}))],
        );
        events += manager.pump(inbox);
    }
    events
}

fn print_session(report: &SessionReport) {
    println!("{}", report.url);
    println!("  State: {}", report.state);
    if let Some(error) = &report.error {
        println!("  Error: {}", error);
    }
    println!("  Events dispatched: {}", report.events);
    println!(
        "  Subtitles: {} ({})",
        if report.controls.subtitles_checked { "on" } else { "off" },
        if report.controls.subtitles_available {
            "available"
        } else {
            "unavailable"
        }
    );
    println!("  Metadata:");
    println!("{}", indent(&report.log, "    "));
    println!("  Media info:");
    println!("{}", indent(&report.media_info, "    "));
    println!();
}

/// Print the effective configuration
pub fn show_config(config: &StreamConfig, format: &str) {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", config.to_json()),
        OutputFormat::Text => {
            println!("Default stream:      {}", config.default_url);
            println!("Native manifest MIME: {}", config.native_manifest_mime);
            println!("Subtitles on start:  {}", config.subtitles_on_start);
            println!("Adaptive engine:");
            println!("  WebVTT:            {}", config.adaptive.enable_webvtt);
            println!("  CEA-708 captions:  {}", config.adaptive.enable_cea708_captions);
            println!("  Debug:             {}", config.adaptive.debug);
            println!("Legacy player:");
            println!("  Container:         {}", config.legacy.container);
            println!("  Live:              {}", config.legacy.is_live);
        }
    }
}

/// List example streams
pub fn examples(config: &StreamConfig, format: &str) {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&config.example_streams)),
        OutputFormat::Text => {
            for (i, example) in config.example_streams.iter().enumerate() {
                let strategy = select_strategy(&classify_url(&example.url), &mut Capabilities::desktop())
                    .map_or_else(|| "unsupported".to_string(), |s| s.to_string());
                println!("  {}. {} [{}]", i + 1, example.label, strategy);
                println!("     {}", example.url);
            }
        }
    }
}
