//! Companion presentation: reading font, spacing and colour overrides.
//!
//! While active, the root scope (`<body>`, else `<html>`) gets an extra class
//! and inline declarations, and a `<style>` element is injected for the
//! emphasis weight and the optional web font. Everything is recorded in a
//! [`ScopeRecord`] and put back verbatim on deactivation.

use std::path::PathBuf;

use crate::config::PresentationConfig;
use crate::dom::{Attribute, Document, NodeId};
use crate::store::ScopeRecord;
use crate::walk::MARKER_ATTR;

/// Class added to the root scope while active.
pub const ACTIVE_CLASS: &str = "fovea-active";

/// Class of the `<b>` elements wrapping emphasized word prefixes.
pub const EMPHASIS_CLASS: &str = "fovea-emph";

/// Load state of the custom font resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStatus {
    Loaded,
    /// Still in flight. The font is listed first and the browser swaps it in.
    Pending,
    Failed,
}

/// Reports the state of a font resource.
///
/// Implementations must answer immediately: fetching is the host's business
/// and never gates the text transformation.
pub trait FontLoader {
    fn status(&self, url: &str) -> FontStatus;
}

impl<F> FontLoader for F
where
    F: Fn(&str) -> FontStatus,
{
    fn status(&self, url: &str) -> FontStatus {
        self(url)
    }
}

/// Loader for hosts that fetch fonts themselves (browsers): always pending.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredFonts;

impl FontLoader for DeferredFonts {
    fn status(&self, _url: &str) -> FontStatus {
        FontStatus::Pending
    }
}

/// Loader that resolves relative font paths against a directory.
///
/// Remote URLs are reported as pending; local paths as loaded or failed
/// depending on whether the file exists.
#[derive(Debug, Clone)]
pub struct LocalFonts {
    base: PathBuf,
}

impl LocalFonts {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl FontLoader for LocalFonts {
    fn status(&self, url: &str) -> FontStatus {
        if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//") {
            return FontStatus::Pending;
        }
        let path = url.strip_prefix("file://").unwrap_or(url);
        if self.base.join(path).is_file() {
            FontStatus::Loaded
        } else {
            FontStatus::Failed
        }
    }
}

/// Font stack chosen for one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFont {
    /// Value of the CSS `font-family` property.
    pub family: String,
    /// URL for an `@font-face` rule, when the custom font is usable.
    pub url: Option<String>,
    /// The custom font was unavailable and only the fallback is used.
    pub degraded: bool,
}

/// Pick the font stack, degrading to the fallback family if the custom font
/// cannot be loaded.
pub fn resolve_font(config: &PresentationConfig, loader: &dyn FontLoader) -> ResolvedFont {
    let preferred = format!(
        "\"{}\", {}",
        config.font_family.replace('"', ""),
        config.fallback_family
    );
    match config.font_url.as_deref() {
        None => ResolvedFont {
            family: preferred,
            url: None,
            degraded: false,
        },
        Some(url) => match loader.status(url) {
            FontStatus::Loaded | FontStatus::Pending => ResolvedFont {
                family: preferred,
                url: Some(url.to_string()),
                degraded: false,
            },
            FontStatus::Failed => {
                log::warn!(
                    "font {url} unavailable, using fallback {}",
                    config.fallback_family
                );
                ResolvedFont {
                    family: config.fallback_family.clone(),
                    url: None,
                    degraded: true,
                }
            }
        },
    }
}

/// Inline declarations for the root scope.
pub fn scope_declarations(config: &PresentationConfig, font: &ResolvedFont) -> String {
    let mut css = format!(
        "font-family: {}; letter-spacing: {}; word-spacing: {}; line-height: {};",
        font.family, config.letter_spacing, config.word_spacing, config.line_height
    );
    if let Some(color) = &config.text_color {
        css.push_str(&format!(" color: {color};"));
    }
    if let Some(background) = &config.background_color {
        css.push_str(&format!(" background-color: {background};"));
    }
    css
}

/// Contents of the injected stylesheet.
pub fn stylesheet(config: &PresentationConfig, font: &ResolvedFont) -> String {
    let mut css = String::new();
    if let Some(url) = &font.url {
        css.push_str(&format!(
            "@font-face {{ font-family: \"{}\"; src: url(\"{}\"); font-display: swap; }}\n",
            config.font_family.replace('"', ""),
            url.replace('"', "%22")
        ));
    }
    css.push_str(&format!(
        "b.{EMPHASIS_CLASS} {{ font-weight: {}; }}\n",
        config.emphasis_weight
    ));
    css
}

/// The element companion attributes are applied to.
pub fn find_scope(doc: &Document) -> Option<NodeId> {
    doc.find_by_tag("body").or_else(|| doc.find_by_tag("html"))
}

/// Apply companion attributes and inject the stylesheet.
///
/// Returns `None` when the document has no element to scope to; the text
/// transformation proceeds regardless.
pub fn apply(
    doc: &mut Document,
    config: &PresentationConfig,
    font: &ResolvedFont,
) -> Option<ScopeRecord> {
    let Some(scope) = find_scope(doc) else {
        log::debug!("no <body> or <html>, skipping companion styles");
        return None;
    };

    let class = doc.get_attr(scope, "class").map(str::to_string);
    let style = doc.get_attr(scope, "style").map(str::to_string);

    let new_class = match class.as_deref().map(str::trim) {
        Some(existing) if !existing.is_empty() => format!("{existing} {ACTIVE_CLASS}"),
        _ => ACTIVE_CLASS.to_string(),
    };
    let ours = scope_declarations(config, font);
    let new_style = match style.as_deref().map(str::trim) {
        Some(existing) if !existing.is_empty() => {
            let sep = if existing.ends_with(';') { " " } else { "; " };
            format!("{existing}{sep}{ours}")
        }
        _ => ours,
    };
    doc.set_attr(scope, "class", new_class);
    doc.set_attr(scope, "style", new_style);

    let sheet = doc.create_html_element("style", vec![Attribute::new(MARKER_ATTR, "style")]);
    let css = doc.create_text(stylesheet(config, font));
    doc.append(sheet, css);
    let host = doc.find_by_tag("head").unwrap_or(scope);
    doc.append(host, sheet);

    Some(ScopeRecord {
        scope,
        class,
        style,
        stylesheet: Some(sheet),
    })
}

/// Undo [`apply`]. A scope the host page has since removed is skipped.
pub fn remove(doc: &mut Document, record: ScopeRecord) {
    if let Some(sheet) = record.stylesheet {
        doc.remove(sheet);
    }
    if !doc.contains(record.scope) {
        log::debug!("scope element is gone, nothing to restore");
        return;
    }
    match record.class {
        Some(class) => doc.set_attr(record.scope, "class", class),
        None => doc.remove_attr(record.scope, "class"),
    }
    match record.style {
        Some(style) => doc.set_attr(record.scope, "style", style),
        None => doc.remove_attr(record.scope, "style"),
    }
}
