//! # fovea
//!
//! A reversible bionic-reading transformation for HTML documents.
//!
//! ## Features
//!
//! - Emphasizes the leading part of every word in readable page text
//! - Skips code, form fields, scripts and anything matching configured selectors
//! - Restores the page exactly, text node for text node, on deactivation
//! - Applies a reading font and spacing to the page, falling back gracefully
//! - Remembers the on/off choice across page loads
//!
//! ## Quick Start
//!
//! ```
//! use fovea::{Config, Engine, MemoryBackend};
//! use fovea::dom::{parse_html, to_html};
//!
//! let mut doc = parse_html("<p>Reading is easier now</p><code>let x = 1;</code>");
//! let mut engine = Engine::new(Config::default(), MemoryBackend::new()).unwrap();
//! engine.initialize(&mut doc);
//!
//! let report = engine.toggle(&mut doc);
//! assert!(report.active);
//! assert_eq!(report.transformed, 1);
//! assert!(to_html(&doc).contains("<code>let x = 1;</code>"));
//! ```
//!
//! For one-off conversions there is [`transform_html`]:
//!
//! ```
//! let html = fovea::transform_html("<p>focus</p>", &fovea::Config::default()).unwrap();
//! assert!(html.contains("<b class=\"fovea-emph\">fo</b>cus"));
//! ```

pub mod config;
pub mod control;
pub mod dom;
pub mod emphasis;
pub mod engine;
pub mod error;
pub mod persist;
pub mod presentation;
pub mod store;
pub mod walk;
pub(crate) mod util;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::Config;
pub use emphasis::{Emphasis, Segment};
pub use engine::{Engine, Report, RestoreOutcome};
pub use error::{Error, Result};
pub use persist::{ActivationState, FileBackend, MemoryBackend, StateBackend};
pub use presentation::{DeferredFonts, FontLoader, FontStatus, LocalFonts};
pub use store::{ScopeRecord, StateStore, TextNodeRecord};
pub use walk::{EligibilityPolicy, TextWalker};

/// Parse `html`, activate the engine once and serialize the result.
///
/// No control is installed and nothing is persisted.
pub fn transform_html(html: &str, config: &Config) -> Result<String> {
    let mut config = config.clone();
    config.control.enabled = false;

    let mut doc = dom::parse_html(html);
    let mut engine = Engine::new(config, MemoryBackend::new())?;
    engine.set_active(&mut doc, true);
    Ok(dom::to_html(&doc))
}
