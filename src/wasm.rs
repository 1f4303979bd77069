//! WASM bindings for in-browser bionic reading.
//!
//! A [`Reader`] holds one parsed page and its engine, so JavaScript can flip
//! the transformation on and off and read the resulting markup back.

use wasm_bindgen::prelude::*;

use crate::dom::{Document, parse_html, to_html};
use crate::{Config, Engine, MemoryBackend};

/// Initialize panic hook for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js(e: crate::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_config(toml: Option<String>) -> Result<Config, JsValue> {
    match toml {
        Some(source) => Config::from_toml_str(&source).map_err(to_js),
        None => Ok(Config::default()),
    }
}

/// A page with a toggleable bionic-reading transformation.
#[wasm_bindgen]
pub struct Reader {
    doc: Document,
    engine: Engine<MemoryBackend>,
}

#[wasm_bindgen]
impl Reader {
    /// Parse `html` and install the toggle control.
    ///
    /// `config` is an optional TOML document; `active` seeds the remembered
    /// state, which the host is expected to keep in its own storage.
    #[wasm_bindgen(constructor)]
    pub fn new(
        html: &str,
        config: Option<String>,
        active: Option<bool>,
    ) -> Result<Reader, JsValue> {
        let config = parse_config(config)?;
        let key = format!("{}:enabled", config.storage.namespace);
        let backend = match active {
            Some(active) => MemoryBackend::with(key, active),
            None => MemoryBackend::new(),
        };
        let mut engine = Engine::new(config, backend).map_err(to_js)?;
        let mut doc = parse_html(html);
        engine.initialize(&mut doc);
        Ok(Reader { doc, engine })
    }

    /// Flip the transformation and return the new state.
    pub fn toggle(&mut self) -> bool {
        self.engine.toggle(&mut self.doc).active
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.engine.is_active()
    }

    /// Serialize the page in its current state.
    pub fn html(&self) -> String {
        to_html(&self.doc)
    }
}

/// Transform a page once, without a control.
#[wasm_bindgen(js_name = bionicHtml)]
pub fn bionic_html(html: &str, config: Option<String>) -> Result<String, JsValue> {
    let config = parse_config(config)?;
    crate::transform_html(html, &config).map_err(to_js)
}
