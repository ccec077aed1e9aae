//! `<audio>` element adapter

use crate::bindings::{error_message, json_value};
use js_sys::Reflect;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use streamscope_core::media::non_empty;
use streamscope_core::{
    Cue, MediaElement, MediaError, MediaEvent, MediaStatus, Notifier, PlaybackSupport, Signal,
    TrackDescriptor, TrackId, TrackMode,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{console, Event, HtmlMediaElement, TextTrack, TextTrackList};

type Handler = Closure<dyn FnMut(Event)>;

/// Stable ids for the element's `TextTrack` objects
#[derive(Default)]
struct TrackRegistry {
    next: u32,
    entries: Vec<(TrackId, TextTrack)>,
}

impl TrackRegistry {
    fn id_of(&mut self, track: &TextTrack) -> TrackId {
        if let Some((id, _)) = self
            .entries
            .iter()
            .find(|(_, known)| js_sys::Object::is(known, track))
        {
            return *id;
        }
        self.next += 1;
        let id = TrackId(self.next);
        self.entries.push((id, track.clone()));
        id
    }

    fn get(&self, id: TrackId) -> Option<TextTrack> {
        self.entries
            .iter()
            .find(|(known, _)| *known == id)
            .map(|(_, track)| track.clone())
    }

    fn forget(&mut self, track: &TextTrack) -> Option<TrackId> {
        let index = self
            .entries
            .iter()
            .position(|(_, known)| js_sys::Object::is(known, track))?;
        Some(self.entries.remove(index).0)
    }

    /// Register every track in `list`, dropping tracks no longer present
    fn sync(&mut self, list: &TextTrackList) -> Vec<TrackId> {
        let present: Vec<TextTrack> = (0..list.length()).filter_map(|i| list.get(i)).collect();
        self.entries
            .retain(|(_, known)| present.iter().any(|track| js_sys::Object::is(known, track)));
        present.iter().map(|track| self.id_of(track)).collect()
    }
}

/// Media element backed by an `HtmlMediaElement`
pub struct WebMedia {
    element: HtmlMediaElement,
    tracks: Rc<RefCell<TrackRegistry>>,
    event_handlers: Vec<Handler>,
    cue_handlers: HashMap<TrackId, (TextTrack, Handler)>,
    track_list_handlers: Option<(Handler, Handler)>,
}

impl WebMedia {
    pub fn new(element: HtmlMediaElement) -> Self {
        Self {
            element,
            tracks: Rc::default(),
            event_handlers: Vec::new(),
            cue_handlers: HashMap::new(),
            track_list_handlers: None,
        }
    }

    pub fn element(&self) -> &HtmlMediaElement {
        &self.element
    }

    fn track(&self, id: TrackId) -> Option<TextTrack> {
        self.tracks.borrow().get(id)
    }
}

fn string_field(target: &JsValue, key: &str) -> Option<String> {
    Reflect::get(target, &key.into())
        .ok()
        .and_then(|value| value.as_string())
        .and_then(|value| non_empty(&value))
}

fn event_track(event: &Event) -> Option<TextTrack> {
    Reflect::get(event, &"track".into())
        .ok()?
        .dyn_into::<TextTrack>()
        .ok()
}

impl MediaElement for WebMedia {
    fn pause(&mut self) {
        if let Err(err) = self.element.pause() {
            console::warn_2(&"[streamscope] pause failed:".into(), &err);
        }
    }

    fn set_source(&mut self, url: &str) {
        self.element.set_src(url);
    }

    fn clear_source(&mut self) {
        if let Err(err) = self.element.remove_attribute("src") {
            console::warn_2(&"[streamscope] could not clear src:".into(), &err);
        }
    }

    fn reset(&mut self) {
        self.element.load();
    }

    fn request_play(&mut self, notifier: Notifier) {
        match self.element.play() {
            Ok(promise) => spawn_local(async move {
                if let Err(err) = JsFuture::from(promise).await {
                    notifier.send(Signal::PlayRejected {
                        reason: error_message(&err),
                    });
                }
            }),
            Err(err) => notifier.send(Signal::PlayRejected {
                reason: error_message(&err),
            }),
        }
    }

    fn status(&self) -> MediaStatus {
        MediaStatus {
            current_time: self.element.current_time(),
            duration: self.element.duration(),
            paused: self.element.paused(),
            ended: self.element.ended(),
            ready_state: self.element.ready_state(),
            network_state: self.element.network_state(),
        }
    }

    fn error(&self) -> Option<MediaError> {
        self.element.error().map(|error| MediaError {
            code: error.code(),
            message: non_empty(&error.message()),
        })
    }

    fn can_play_type(&self, mime: &str) -> PlaybackSupport {
        PlaybackSupport::from_dom(&self.element.can_play_type(mime))
    }

    fn bind_events(&mut self, events: &[MediaEvent], notifier: Notifier) {
        for &event in events {
            let notifier = notifier.clone();
            let handler = Handler::new(move |_: Event| notifier.send(Signal::Media(event)));
            if let Err(err) = self
                .element
                .add_event_listener_with_callback(event.name(), handler.as_ref().unchecked_ref())
            {
                console::warn_2(&format!("[streamscope] {event} not bound:").into(), &err);
                continue;
            }
            self.event_handlers.push(handler);
        }
    }

    fn text_tracks(&self) -> Vec<TrackId> {
        match self.element.text_tracks() {
            Some(list) => self.tracks.borrow_mut().sync(&list),
            None => Vec::new(),
        }
    }

    fn track_info(&self, id: TrackId) -> Option<TrackDescriptor> {
        let track = self.track(id)?;
        Some(TrackDescriptor {
            id: non_empty(&track.id()),
            kind: string_field(&track, "kind"),
            label: non_empty(&track.label()),
            language: non_empty(&track.language()),
            in_band_metadata_track_dispatch_type: non_empty(
                &track.in_band_metadata_track_dispatch_type(),
            ),
            mode: string_field(&track, "mode").and_then(|mode| TrackMode::from_name(&mode)),
        })
    }

    fn set_track_mode(&mut self, id: TrackId, mode: TrackMode) {
        if let Some(track) = self.track(id) {
            if let Err(err) = Reflect::set(&track, &"mode".into(), &mode.name().into()) {
                console::warn_2(&"[streamscope] track mode not set:".into(), &err);
            }
        }
    }

    fn active_cues(&self, id: TrackId) -> Vec<Cue> {
        let Some(cues) = self.track(id).and_then(|track| track.active_cues()) else {
            return Vec::new();
        };
        (0..cues.length())
            .filter_map(|i| cues.get(i))
            .map(|cue| {
                let value = Reflect::get(&cue, &"value".into())
                    .ok()
                    .filter(|value| !value.is_undefined());
                Cue {
                    id: non_empty(&cue.id()),
                    start_time: cue.start_time(),
                    end_time: cue.end_time(),
                    text: Reflect::get(&cue, &"text".into())
                        .ok()
                        .and_then(|text| text.as_string()),
                    value: value.map(|value| json_value(&value)),
                }
            })
            .collect()
    }

    fn listen_cue_change(&mut self, id: TrackId, notifier: Notifier) {
        let Some(track) = self.track(id) else {
            return;
        };
        let handler = Handler::new(move |_: Event| notifier.send(Signal::CueChange(id)));
        track.set_oncuechange(Some(handler.as_ref().unchecked_ref()));
        self.cue_handlers.insert(id, (track, handler));
    }

    fn unlisten_cue_change(&mut self, id: TrackId) {
        if let Some((track, _handler)) = self.cue_handlers.remove(&id) {
            track.set_oncuechange(None);
        }
    }

    fn observe_track_list(&mut self, notifier: Notifier) {
        let Some(list) = self.element.text_tracks() else {
            return;
        };

        let registry = Rc::clone(&self.tracks);
        let added = notifier.clone();
        let on_add = Handler::new(move |event: Event| {
            if let Some(track) = event_track(&event) {
                let id = registry.borrow_mut().id_of(&track);
                added.send(Signal::TrackAdded(id));
            }
        });

        let registry = Rc::clone(&self.tracks);
        let on_remove = Handler::new(move |event: Event| {
            if let Some(track) = event_track(&event) {
                if let Some(id) = registry.borrow_mut().forget(&track) {
                    notifier.send(Signal::TrackRemoved(id));
                }
            }
        });

        list.set_onaddtrack(Some(on_add.as_ref().unchecked_ref()));
        list.set_onremovetrack(Some(on_remove.as_ref().unchecked_ref()));
        self.track_list_handlers = Some((on_add, on_remove));
    }

    fn unobserve_track_list(&mut self) {
        if let Some(list) = self.element.text_tracks() {
            list.set_onaddtrack(None);
            list.set_onremovetrack(None);
        }
        self.track_list_handlers = None;
    }
}
