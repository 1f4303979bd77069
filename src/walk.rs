//! Traversal & filter: finding the text nodes that may be transformed.
//!
//! [`TextWalker`] is a cursor rather than a borrowing iterator so the engine
//! can mutate the document between steps. Every step re-resolves the pending
//! node ids, so nodes that were removed or detached since they were queued
//! are skipped instead of visited.

use std::collections::HashSet;
use std::fmt;

use selectors::parser::Selector;

use crate::config::PolicyConfig;
use crate::dom::{Document, FoveaSelectors, NodeData, NodeId, matches_any, parse_selector_list};
use crate::error::Result;

/// Attribute marking elements created by the engine (emphasis runs, the
/// control, the injected stylesheet). Marked subtrees are never traversed.
pub const MARKER_ATTR: &str = "data-fovea";

/// Decides which subtrees are off limits.
#[derive(Clone)]
pub struct EligibilityPolicy {
    excluded_tags: HashSet<String>,
    excluded_selectors: Vec<Selector<FoveaSelectors>>,
}

impl fmt::Debug for EligibilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EligibilityPolicy")
            .field("excluded_tags", &self.excluded_tags)
            .field("excluded_selectors", &self.excluded_selectors.len())
            .finish()
    }
}

impl EligibilityPolicy {
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        let mut excluded_selectors = Vec::new();
        for source in &config.excluded_selectors {
            excluded_selectors.extend(parse_selector_list(source)?);
        }
        Ok(Self {
            excluded_tags: config
                .excluded_tags
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            excluded_selectors,
        })
    }

    /// Whether an element and everything below it must be left alone.
    pub fn excludes_element(&self, doc: &Document, id: NodeId) -> bool {
        let Some(name) = doc.element_name(id) else {
            return false;
        };
        self.excluded_tags.contains(name.as_ref())
            || doc.get_attr(id, MARKER_ATTR).is_some()
            || matches_any(doc, id, &self.excluded_selectors)
    }

    /// Whether a single node may be transformed right now: an attached,
    /// non-blank text node with an element parent and no excluded ancestor.
    pub fn is_eligible(&self, doc: &Document, id: NodeId) -> bool {
        let Some(text) = doc.text_content(id) else {
            return false;
        };
        if text.trim().is_empty() || !doc.is_attached(id) {
            return false;
        }
        let parent = doc.get(id).map(|n| n.parent).unwrap_or(NodeId::NONE);
        if !doc.is_element(parent) {
            return false;
        }
        !doc
            .ancestors(id)
            .any(|ancestor| self.excludes_element(doc, ancestor))
    }
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        let config = PolicyConfig::default();
        let excluded_selectors = config
            .excluded_selectors
            .iter()
            .filter_map(|s| parse_selector_list(s).ok())
            .flatten()
            .collect();
        Self {
            excluded_tags: config.excluded_tags.into_iter().collect(),
            excluded_selectors,
        }
    }
}

/// Depth-first, document-order cursor over eligible text nodes.
///
/// Only nodes connected to the document root are reported.
#[derive(Debug, Clone)]
pub struct TextWalker {
    root: NodeId,
    stack: Vec<NodeId>,
}

impl TextWalker {
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            stack: vec![root],
        }
    }

    /// Start over from the root.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.stack.push(self.root);
    }

    /// Advance to the next eligible text node.
    pub fn next(&mut self, doc: &Document, policy: &EligibilityPolicy) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            let Some(node) = doc.get(id) else {
                log::trace!("walk: {id:?} vanished, skipping");
                continue;
            };
            if !doc.is_attached(id) {
                log::trace!("walk: {id:?} detached, skipping");
                continue;
            }
            match &node.data {
                NodeData::Text(text) => {
                    if !text.trim().is_empty() && doc.is_element(node.parent) {
                        return Some(id);
                    }
                }
                NodeData::Element { .. } if policy.excludes_element(doc, id) => {}
                NodeData::Element { .. } | NodeData::Document => {
                    let start = self.stack.len();
                    self.stack.extend(doc.children(id));
                    self.stack[start..].reverse();
                }
                NodeData::Comment(_) | NodeData::Doctype { .. } => {}
            }
        }
        None
    }
}

/// Iterator over eligible text nodes of an unchanging document.
pub struct TextNodes<'a> {
    doc: &'a Document,
    policy: &'a EligibilityPolicy,
    walker: TextWalker,
}

impl Iterator for TextNodes<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        self.walker.next(self.doc, self.policy)
    }
}

/// Lazily walk every eligible text node in document order.
pub fn text_nodes<'a>(doc: &'a Document, policy: &'a EligibilityPolicy) -> TextNodes<'a> {
    TextNodes {
        doc,
        policy,
        walker: TextWalker::new(doc.root()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn texts(html: &str) -> Vec<String> {
        let doc = parse_html(html);
        let policy = EligibilityPolicy::default();
        text_nodes(&doc, &policy)
            .map(|id| doc.text_content(id).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_document_order() {
        assert_eq!(
            texts("<body><h1>Title</h1><p>one <em>two</em> three</p><div>four</div></body>"),
            ["Title", "one ", "two", " three", "four"]
        );
    }

    #[test]
    fn test_excluded_containers() {
        let html = r#"<html><head><title>Page</title><style>p{}</style></head><body>
            <p>keep</p>
            <pre>skip <b>nested</b></pre>
            <code>const x = 1;</code>
            <script>var a;</script>
            <textarea>draft</textarea>
            <div contenteditable="true">editing</div>
            <button data-fovea="control">toggle</button>
        </body></html>"#;
        assert_eq!(texts(html), ["keep"]);
    }

    #[test]
    fn test_whitespace_only_nodes_skipped() {
        assert_eq!(texts("<body><p>   </p>\n\t<p>x</p></body>"), ["x"]);
    }

    #[test]
    fn test_custom_policy() {
        let doc =
            parse_html(r#"<body><nav>menu</nav><p class="no-bionic">raw</p><p>text</p></body>"#);
        let policy = EligibilityPolicy::from_config(&PolicyConfig {
            excluded_tags: vec!["NAV".to_string()],
            excluded_selectors: vec![".no-bionic".to_string()],
        })
        .unwrap();
        let found: Vec<_> = text_nodes(&doc, &policy)
            .map(|id| doc.text_content(id).unwrap())
            .collect();
        assert_eq!(found, ["text"]);
    }

    #[test]
    fn test_walk_is_restartable() {
        let doc = parse_html("<p>a</p><p>b</p>");
        let policy = EligibilityPolicy::default();
        let mut walker = TextWalker::new(doc.root());
        let first: Vec<_> = std::iter::from_fn(|| walker.next(&doc, &policy)).collect();
        walker.reset();
        let second: Vec<_> = std::iter::from_fn(|| walker.next(&doc, &policy)).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_walk_survives_nodes_removed_mid_walk() {
        let mut doc = parse_html("<body><p>first</p><p>second</p><p>third</p></body>");
        let policy = EligibilityPolicy::default();
        let mut walker = TextWalker::new(doc.root());

        let first = walker.next(&doc, &policy).unwrap();
        assert_eq!(doc.text_content(first), Some("first"));

        // The host page drops the second paragraph and detaches the third.
        let body = doc.find_by_tag("body").unwrap();
        let paragraphs: Vec<_> = doc.children(body).collect();
        doc.remove(paragraphs[1]);
        doc.detach(paragraphs[2]);

        assert_eq!(walker.next(&doc, &policy), None);
    }

    #[test]
    fn test_is_eligible() {
        let doc = parse_html("<body><p>yes</p><code>no</code></body>");
        let policy = EligibilityPolicy::default();
        let p = doc.find_by_tag("p").unwrap();
        let code = doc.find_by_tag("code").unwrap();
        let yes = doc.children(p).next().unwrap();
        let no = doc.children(code).next().unwrap();
        assert!(policy.is_eligible(&doc, yes));
        assert!(!policy.is_eligible(&doc, no));
        assert!(!policy.is_eligible(&doc, p));
    }
}
