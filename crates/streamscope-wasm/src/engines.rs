//! hls.js and flv.js behind the engine traits

use crate::bindings::{self, error_message, json_value, FlvPlayer, Hls};
use crate::media::WebMedia;
use serde::Serialize;
use streamscope_core::{
    AdaptiveBackend, AdaptiveConfig, AdaptiveEngine, AdaptiveEvent, Error, LegacyBackend,
    LegacyEngine, LegacyEvent, LegacySignal, LegacySource, Notifier, Result, Signal,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// hls.js constructor options
#[derive(Serialize)]
struct HlsOptions {
    #[serde(rename = "enableWebVTT")]
    enable_webvtt: bool,
    #[serde(rename = "enableCEA708Captions")]
    enable_cea708_captions: bool,
    debug: bool,
}

impl From<&AdaptiveConfig> for HlsOptions {
    fn from(config: &AdaptiveConfig) -> Self {
        Self {
            enable_webvtt: config.enable_webvtt,
            enable_cea708_captions: config.enable_cea708_captions,
            debug: config.debug,
        }
    }
}

/// Factory for hls.js instances
#[derive(Debug, Clone, Copy, Default)]
pub struct HlsBackend;

/// A live hls.js instance and the handlers it calls into
pub struct HlsEngine {
    hls: Hls,
    handlers: Vec<Closure<dyn FnMut(JsValue, JsValue)>>,
}

impl AdaptiveBackend<WebMedia> for HlsBackend {
    type Engine = HlsEngine;

    fn is_supported(&self) -> bool {
        Hls::is_supported().unwrap_or(false)
    }

    fn create(&self, config: &AdaptiveConfig) -> Result<HlsEngine> {
        let options = serde_wasm_bindgen::to_value(&HlsOptions::from(config))
            .map_err(|err| Error::collaborator("hls.js", err.to_string()))?;
        let hls = Hls::new(&options)
            .map_err(|err| Error::collaborator("hls.js", error_message(&err)))?;
        Ok(HlsEngine {
            hls,
            handlers: Vec::new(),
        })
    }
}

impl AdaptiveEngine<WebMedia> for HlsEngine {
    fn load_source(&mut self, url: &str) {
        self.hls.load_source(url);
    }

    fn attach_media(&mut self, media: &mut WebMedia) {
        self.hls.attach_media(media.element());
    }

    fn on(&mut self, event: AdaptiveEvent, notifier: Notifier) {
        let handler = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |_name: JsValue, data: JsValue| {
            notifier.send(Signal::Adaptive {
                event,
                payload: json_value(&data),
            });
        });
        self.hls.on(event.name(), handler.as_ref().unchecked_ref());
        self.handlers.push(handler);
    }

    fn destroy(&mut self) {
        self.hls.destroy();
        self.handlers.clear();
    }
}

/// Factory for flv.js players
#[derive(Debug, Clone, Copy, Default)]
pub struct FlvBackend;

/// A live flv.js player and the handlers it calls into
pub struct FlvEngine {
    player: FlvPlayer,
    handlers: Vec<Closure<dyn FnMut(JsValue, JsValue, JsValue)>>,
}

impl LegacyBackend<WebMedia> for FlvBackend {
    type Engine = FlvEngine;

    fn is_supported(&self) -> bool {
        bindings::flv_is_supported().unwrap_or(false)
    }

    fn create(&self, source: &LegacySource) -> Result<FlvEngine> {
        let source = serde_wasm_bindgen::to_value(source)
            .map_err(|err| Error::collaborator("flv.js", err.to_string()))?;
        let player = bindings::create_player(&source)
            .map_err(|err| Error::collaborator("flv.js", error_message(&err)))?;
        Ok(FlvEngine {
            player,
            handlers: Vec::new(),
        })
    }
}

/// Decode flv.js listener arguments into a signal
fn legacy_signal(event: LegacyEvent, first: &JsValue, second: &JsValue, third: &JsValue) -> LegacySignal {
    match event {
        LegacyEvent::Error => LegacySignal::Error {
            error_type: first.as_string().unwrap_or_default(),
            error_detail: second.as_string().unwrap_or_default(),
            error_info: json_value(third),
        },
        LegacyEvent::LoadingComplete => LegacySignal::LoadingComplete,
        LegacyEvent::RecoveredEarlyEof => LegacySignal::RecoveredEarlyEof,
        LegacyEvent::MediaInfo => LegacySignal::MediaInfo(json_value(first)),
        LegacyEvent::MetadataArrived => LegacySignal::MetadataArrived(json_value(first)),
        LegacyEvent::ScriptDataArrived => {
            let data = (!first.is_undefined() && !first.is_null()).then(|| json_value(first));
            LegacySignal::ScriptDataArrived(data)
        }
        LegacyEvent::StatisticsInfo => LegacySignal::StatisticsInfo(json_value(first)),
    }
}

impl LegacyEngine<WebMedia> for FlvEngine {
    fn attach_media_element(&mut self, media: &mut WebMedia) {
        self.player.attach_media_element(media.element());
    }

    fn load(&mut self) {
        self.player.load();
    }

    fn on(&mut self, event: LegacyEvent, notifier: Notifier) {
        let handler = Closure::<dyn FnMut(JsValue, JsValue, JsValue)>::new(
            move |first: JsValue, second: JsValue, third: JsValue| {
                notifier.send(Signal::Legacy(legacy_signal(event, &first, &second, &third)));
            },
        );
        self.player.on(event.name(), handler.as_ref().unchecked_ref());
        self.handlers.push(handler);
    }

    fn destroy(&mut self) {
        self.player.destroy();
        self.handlers.clear();
    }
}
