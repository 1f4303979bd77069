//! In-memory HTML document model.
//!
//! Pages are parsed with html5ever into an arena-backed [`Document`] and
//! written back out with [`to_html`].
//!
//! # Example
//!
//! ```
//! use fovea::dom::{parse_html, to_html};
//!
//! let doc = parse_html("<p>Hello</p>");
//! let p = doc.find_by_tag("p").unwrap();
//! assert_eq!(doc.text_of(p), "Hello");
//! assert!(to_html(&doc).contains("<p>Hello</p>"));
//! ```

mod arena;
mod element_ref;
mod serialize;
mod tree_sink;

pub use arena::{Ancestors, Attribute, Children, Document, Node, NodeData, NodeId};
pub use element_ref::{FoveaSelectors, matches_any, parse_selector_list};
pub use serialize::{inner_html, to_html};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use tree_sink::DocumentSink;

/// Parse an HTML page into a [`Document`].
pub fn parse_html(html: &str) -> Document {
    let sink = DocumentSink::new();
    parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_document()
}

/// Parse HTML bytes, detecting the encoding from a BOM or `<meta charset>`.
pub fn parse_html_bytes(html: &[u8]) -> Document {
    let hint = crate::util::sniff_meta_charset(html);
    let text = crate::util::decode_text(html, hint.as_deref());
    parse_html(&text)
}
