//! The on-page toggle button.
//!
//! A single fixed-position `<button>` carrying the engine marker, so the
//! walker never transforms its label. Its two visual states mirror the
//! activation flag through the label, `aria-pressed` and a state class.

use crate::config::ControlConfig;
use crate::dom::{Attribute, Document, NodeData, NodeId};
use crate::walk::MARKER_ATTR;

pub const CONTROL_ID: &str = "fovea-toggle";

const CONTROL_STYLE: &str = "position: fixed; right: 16px; bottom: 16px; z-index: 2147483647; \
     padding: 8px 12px; border: 0; border-radius: 6px; font: 14px sans-serif; cursor: pointer;";

/// Insert the control into the page, or adopt one already present.
///
/// Returns `None` if the page has no `<body>` or `<html>` to host it.
pub fn install(doc: &mut Document, config: &ControlConfig, active: bool) -> Option<NodeId> {
    if let Some(existing) = find(doc) {
        sync(doc, existing, config, active);
        return Some(existing);
    }
    let host = doc
        .find_by_tag("body")
        .or_else(|| doc.find_by_tag("html"))?;

    let button = doc.create_html_element(
        "button",
        vec![
            Attribute::new("id", CONTROL_ID),
            Attribute::new(MARKER_ATTR, "control"),
            Attribute::new("type", "button"),
            Attribute::new("style", CONTROL_STYLE),
        ],
    );
    let label = doc.create_text(String::new());
    doc.append(button, label);
    doc.append(host, button);
    sync(doc, button, config, active);
    Some(button)
}

/// Find a previously installed control.
pub fn find(doc: &Document) -> Option<NodeId> {
    doc.find(|node| match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .iter()
            .any(|a| a.name.local.as_ref() == MARKER_ATTR && a.value == "control"),
        _ => false,
    })
}

/// Bring the control's visual state in line with `active`.
pub fn sync(doc: &mut Document, control: NodeId, config: &ControlConfig, active: bool) {
    let (label, pressed, class) = if active {
        (&config.label_active, "true", "fovea-toggle fovea-toggle--on")
    } else {
        (&config.label_inactive, "false", "fovea-toggle fovea-toggle--off")
    };
    doc.set_attr(control, "aria-pressed", pressed);
    doc.set_attr(control, "class", class);

    let text = doc.children(control).find(|&c| doc.is_text(c));
    match text {
        Some(text) => doc.set_text(text, label.as_str()),
        None => {
            let text = doc.create_text(label.as_str());
            doc.append(control, text);
        }
    }
}
