//! Page controller exported to JavaScript

use crate::engines::{FlvBackend, HlsBackend};
use crate::media::WebMedia;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use streamscope_core::{Inbox, LifecycleManager, MetadataSurface, StreamConfig};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    console, Document, Event, HtmlElement, HtmlInputElement, HtmlMediaElement, HtmlOptionElement,
    HtmlSelectElement, KeyboardEvent,
};

const AUDIO_ID: &str = "audio";
const METADATA_ID: &str = "metadata";
const MEDIA_INFO_ID: &str = "flv-media-info";
const URL_INPUT_ID: &str = "stream-url";
const LOAD_BUTTON_ID: &str = "load-stream";
const EXAMPLES_ID: &str = "example-streams";
const SUBTITLES_ID: &str = "use-texttrack";

/// The metadata log and media-info `<pre>` regions
pub struct PreSurface {
    log: HtmlElement,
    media_info: HtmlElement,
}

impl PreSurface {
    pub fn new(log: HtmlElement, media_info: HtmlElement) -> Self {
        Self { log, media_info }
    }
}

impl MetadataSurface for PreSurface {
    fn log(&self) -> String {
        self.log.text_content().unwrap_or_default()
    }

    fn set_log(&mut self, text: &str) {
        self.log.set_text_content(Some(text));
    }

    fn set_media_info(&mut self, text: &str) {
        self.media_info.set_text_content(Some(text));
    }
}

type PageManager = LifecycleManager<WebMedia, HlsBackend, FlvBackend, PreSurface>;

/// Shared handle used by the exported object and the DOM listeners
#[derive(Clone)]
struct PageHandle {
    manager: Rc<RefCell<PageManager>>,
    subtitles_toggle: Rc<RefCell<Option<HtmlInputElement>>>,
}

impl PageHandle {
    fn load(&self, url: &str) -> String {
        let state = {
            let mut manager = self.manager.borrow_mut();
            if let Err(err) = manager.load_stream(url) {
                console::warn_1(&format!("[streamscope] {} ({})", err, err.error_code()).into());
            }
            manager.state()
        };
        self.sync_toggle();
        state.to_string()
    }

    fn set_subtitles(&self, enabled: bool) -> bool {
        let changed = self.manager.borrow_mut().set_subtitles_enabled(enabled);
        self.sync_toggle();
        changed
    }

    /// Reflect the control state onto the checkbox
    fn sync_toggle(&self) {
        let controls = self.manager.borrow().controls();
        if let Some(toggle) = self.subtitles_toggle.borrow().as_ref() {
            toggle.set_checked(controls.subtitles_checked);
            toggle.set_disabled(!controls.subtitles_available);
        }
    }
}

/// Feed inbound events to the manager until the page is dropped
fn spawn_dispatch(manager: Weak<RefCell<PageManager>>, mut inbox: Inbox) {
    spawn_local(async move {
        while let Some(envelope) = inbox.recv().await {
            let Some(manager) = manager.upgrade() else {
                break;
            };
            manager.borrow_mut().dispatch(envelope);
        }
    });
}

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))
}

fn element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{id}")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("element #{id} has an unexpected type")))
}

fn optional_element<T: JsCast>(document: &Document, id: Option<String>) -> Option<T> {
    id.and_then(|id| document.get_element_by_id(&id))
        .and_then(|element| element.dyn_into::<T>().ok())
}

/// Stream page: one media element, two engines, two output regions
#[wasm_bindgen]
pub struct StreamPage {
    handle: PageHandle,
}

impl StreamPage {
    fn build(
        config: StreamConfig,
        audio_id: &str,
        metadata_id: &str,
        media_info_id: &str,
    ) -> Result<StreamPage, JsValue> {
        let document = document()?;
        let audio: HtmlMediaElement = element(&document, audio_id)?;
        let surface = PreSurface::new(
            element(&document, metadata_id)?,
            element(&document, media_info_id)?,
        );

        let (manager, inbox) = LifecycleManager::new(
            config,
            WebMedia::new(audio),
            HlsBackend,
            FlvBackend,
            surface,
        );
        let manager = Rc::new(RefCell::new(manager));
        spawn_dispatch(Rc::downgrade(&manager), inbox);

        Ok(StreamPage {
            handle: PageHandle {
                manager,
                subtitles_toggle: Rc::default(),
            },
        })
    }
}

#[wasm_bindgen]
impl StreamPage {
    #[wasm_bindgen(constructor)]
    pub fn new(audio_id: &str, metadata_id: &str, media_info_id: &str) -> Result<StreamPage, JsValue> {
        Self::build(StreamConfig::default(), audio_id, metadata_id, media_info_id)
    }

    /// Construct with a JSON configuration
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(
        config_json: &str,
        audio_id: &str,
        metadata_id: &str,
        media_info_id: &str,
    ) -> Result<StreamPage, JsValue> {
        let config = StreamConfig::from_json(config_json)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        Self::build(config, audio_id, metadata_id, media_info_id)
    }

    /// Load a stream URL; returns the resulting state name
    #[wasm_bindgen(js_name = loadStream)]
    pub fn load_stream(&self, url: &str) -> String {
        self.handle.load(url)
    }

    /// Load the configured default stream
    #[wasm_bindgen(js_name = loadDefault)]
    pub fn load_default(&self) -> String {
        let url = self.handle.manager.borrow().config().default_url.clone();
        self.handle.load(&url)
    }

    /// Toggle the text track bridge; returns whether anything changed
    #[wasm_bindgen(js_name = setSubtitles)]
    pub fn set_subtitles(&self, enabled: bool) -> bool {
        self.handle.set_subtitles(enabled)
    }

    /// Current state name (`idle`, `adaptive`, `legacy`, `native`)
    pub fn state(&self) -> String {
        self.handle.manager.borrow().state().to_string()
    }

    /// Wire the URL input, load button, example list and subtitle checkbox.
    /// Missing elements are skipped.
    #[wasm_bindgen(js_name = bindControls)]
    pub fn bind_controls(
        &self,
        url_input_id: Option<String>,
        load_button_id: Option<String>,
        examples_id: Option<String>,
        subtitles_id: Option<String>,
    ) -> Result<(), JsValue> {
        let document = document()?;
        let input: Option<HtmlInputElement> = optional_element(&document, url_input_id);
        let default_url = self.handle.manager.borrow().config().default_url.clone();

        if let Some(input) = &input {
            input.set_value(&default_url);
            let handle = self.handle.clone();
            let target = input.clone();
            let on_key = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
                if event.key() == "Enter" {
                    handle.load(&target.value());
                }
            });
            input.add_event_listener_with_callback("keydown", on_key.as_ref().unchecked_ref())?;
            on_key.forget();
        }

        if let Some(button) = optional_element::<HtmlElement>(&document, load_button_id) {
            let handle = self.handle.clone();
            let source = input.clone();
            let on_click = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
                let url = source
                    .as_ref()
                    .map_or_else(|| default_url.clone(), HtmlInputElement::value);
                handle.load(&url);
            });
            button.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
            on_click.forget();
        }

        if let Some(select) = optional_element::<HtmlSelectElement>(&document, examples_id) {
            if select.length() == 0 {
                let examples = self.handle.manager.borrow().config().example_streams.clone();
                for example in &examples {
                    let option = HtmlOptionElement::new_with_text_and_value(&example.label, &example.url)?;
                    select.add_with_html_option_element(&option)?;
                }
            }
            let handle = self.handle.clone();
            let target = select.clone();
            let on_change = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
                let selected = target.value();
                if selected.is_empty() {
                    return;
                }
                if let Some(input) = &input {
                    input.set_value(&selected);
                }
                handle.load(&selected);
            });
            select.add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())?;
            on_change.forget();
        }

        if let Some(toggle) = optional_element::<HtmlInputElement>(&document, subtitles_id) {
            let handle = self.handle.clone();
            let target = toggle.clone();
            let on_change = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
                handle.set_subtitles(target.checked());
            });
            toggle.add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())?;
            on_change.forget();
            *self.handle.subtitles_toggle.borrow_mut() = Some(toggle);
            self.handle.sync_toggle();
        }

        Ok(())
    }
}

/// Bind the page by its standard element ids and load the default stream
#[wasm_bindgen]
pub fn mount() -> Result<StreamPage, JsValue> {
    let page = StreamPage::new(AUDIO_ID, METADATA_ID, MEDIA_INFO_ID)?;
    page.bind_controls(
        Some(URL_INPUT_ID.to_string()),
        Some(LOAD_BUTTON_ID.to_string()),
        Some(EXAMPLES_ID.to_string()),
        Some(SUBTITLES_ID.to_string()),
    )?;
    page.load_default();
    Ok(page)
}
