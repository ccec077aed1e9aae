//! Streamscope WASM - browser binding for the stream dispatcher
//!
//! Wires the page into the lifecycle manager:
//! - `<audio>` element as the media element
//! - hls.js as the adaptive engine, flv.js as the legacy-container player
//! - Two `<pre>` regions as the metadata surface
//!
//! ## Usage
//!
//! ```javascript
//! import init, { mount } from '@streamscope/wasm';
//!
//! await init();
//! const page = mount();
//! page.loadStream('https://example.com/live/master.m3u8');
//! ```

use wasm_bindgen::prelude::*;

mod bindings;
mod engines;
mod media;
mod page;

pub use engines::{FlvBackend, FlvEngine, HlsBackend, HlsEngine};
pub use media::WebMedia;
pub use page::{mount, PreSurface, StreamPage};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"[streamscope] initialized".into());
}

/// Library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
