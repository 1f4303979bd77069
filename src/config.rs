//! Engine configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all) gives
//! the stock behaviour.
//!
//! ```
//! use fovea::Config;
//!
//! let config = Config::from_toml_str(r#"
//!     [emphasis]
//!     ratio = 0.5
//!
//!     [policy]
//!     excluded_selectors = ["[contenteditable]", ".no-bionic"]
//! "#).unwrap();
//! assert_eq!(config.emphasis.ratio, 0.5);
//! assert_eq!(config.emphasis.min_word_len, 3);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dom::parse_selector_list;
use crate::emphasis::Emphasis;
use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub emphasis: Emphasis,
    pub policy: PolicyConfig,
    pub presentation: PresentationConfig,
    pub control: ControlConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        self.emphasis.validate()?;
        for selector in &self.policy.excluded_selectors {
            parse_selector_list(selector)?;
        }
        if self.storage.namespace.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "storage.namespace must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which parts of a page are never transformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Tag names whose subtrees are skipped.
    pub excluded_tags: Vec<String>,
    /// CSS selectors whose matching subtrees are skipped.
    pub excluded_selectors: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            excluded_tags: [
                "code", "pre", "script", "style", "input", "textarea", "head", "title",
                "noscript", "template", "svg", "math", "select", "option", "kbd", "samp",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            excluded_selectors: vec!["[contenteditable]".to_string()],
        }
    }
}

/// Companion styling applied to the page while active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Preferred reading font.
    pub font_family: String,
    /// Where the preferred font is loaded from. `None` means it is expected
    /// to be installed locally.
    pub font_url: Option<String>,
    /// Used when the preferred font cannot be loaded.
    pub fallback_family: String,
    pub letter_spacing: String,
    pub word_spacing: String,
    pub line_height: String,
    pub text_color: Option<String>,
    pub background_color: Option<String>,
    /// Weight of the emphasized word prefixes.
    pub emphasis_weight: u16,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            font_family: "OpenDyslexic".to_string(),
            font_url: Some(
                "https://fonts.cdnfonts.com/s/29616/OpenDyslexic-Regular.woff".to_string(),
            ),
            fallback_family: "Verdana, Arial, sans-serif".to_string(),
            letter_spacing: "0.05em".to_string(),
            word_spacing: "0.12em".to_string(),
            line_height: "1.6".to_string(),
            text_color: Some("#1f2933".to_string()),
            background_color: None,
            emphasis_weight: 700,
        }
    }
}

/// The on-page toggle button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub enabled: bool,
    pub label_active: String,
    pub label_inactive: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            label_active: "Bionic reading: on".to_string(),
            label_inactive: "Bionic reading: off".to_string(),
        }
    }
}

/// Where the activation flag is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Prefix of the persisted key (`<namespace>:enabled`).
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: "fovea".to_string(),
        }
    }
}
