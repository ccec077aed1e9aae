//! Script-tag globals: `Hls` (hls.js) and `flvjs` (flv.js)

use js_sys::Function;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlMediaElement;

#[wasm_bindgen]
extern "C" {
    /// hls.js instance
    pub type Hls;

    #[wasm_bindgen(static_method_of = Hls, js_name = isSupported, catch)]
    pub fn is_supported() -> Result<bool, JsValue>;

    #[wasm_bindgen(constructor, catch)]
    pub fn new(config: &JsValue) -> Result<Hls, JsValue>;

    #[wasm_bindgen(method, js_name = loadSource)]
    pub fn load_source(this: &Hls, url: &str);

    #[wasm_bindgen(method, js_name = attachMedia)]
    pub fn attach_media(this: &Hls, media: &HtmlMediaElement);

    #[wasm_bindgen(method)]
    pub fn on(this: &Hls, event: &str, handler: &Function);

    #[wasm_bindgen(method)]
    pub fn destroy(this: &Hls);
}

#[wasm_bindgen]
extern "C" {
    /// flv.js player
    pub type FlvPlayer;

    #[wasm_bindgen(js_namespace = flvjs, js_name = isSupported, catch)]
    pub fn flv_is_supported() -> Result<bool, JsValue>;

    #[wasm_bindgen(js_namespace = flvjs, js_name = createPlayer, catch)]
    pub fn create_player(source: &JsValue) -> Result<FlvPlayer, JsValue>;

    #[wasm_bindgen(method, js_name = attachMediaElement)]
    pub fn attach_media_element(this: &FlvPlayer, media: &HtmlMediaElement);

    #[wasm_bindgen(method)]
    pub fn load(this: &FlvPlayer);

    #[wasm_bindgen(method)]
    pub fn on(this: &FlvPlayer, event: &str, handler: &Function);

    #[wasm_bindgen(method)]
    pub fn destroy(this: &FlvPlayer);
}

/// JSON view of a JS value, as `JSON.stringify` sees it
pub fn json_value(value: &JsValue) -> Value {
    js_sys::JSON::stringify(value)
        .ok()
        .and_then(|text| text.as_string())
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or(Value::Null)
}

/// Human-readable message of a thrown value
pub fn error_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    // DOMException and friends carry a message without extending Error
    js_sys::Reflect::get(value, &"message".into())
        .ok()
        .and_then(|message| message.as_string())
        .filter(|message| !message.is_empty())
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}
