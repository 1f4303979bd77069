//! Arena-based document tree.
//!
//! Nodes live in a slot vector and link to each other by [`NodeId`]. Ids are
//! generational: removing a node frees its slot and bumps the slot's
//! generation, so stale ids held elsewhere (the state store, a paused walk)
//! stop resolving instead of aliasing whatever reuses the slot. Holding an id
//! never keeps a node alive.

use html5ever::{LocalName, Namespace, QualName, ns};

/// Generational handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId {
        index: u32::MAX,
        generation: 0,
    };

    /// Check if this is a valid node ID.
    pub fn is_some(&self) -> bool {
        self.index != u32::MAX
    }

    /// Check if this is the sentinel value.
    pub fn is_none(&self) -> bool {
        self.index == u32::MAX
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with name and attributes.
    Element { name: QualName, attrs: Vec<Attribute> },
    /// Text content.
    Text(String),
    Comment(String),
    /// Document type declaration.
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

/// HTML attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    /// Attribute in the null namespace, as the HTML parser produces them.
    pub fn new(local: &str, value: impl Into<String>) -> Self {
        Self {
            name: QualName::new(None, ns!(), LocalName::from(local)),
            value: value.into(),
        }
    }
}

/// A node in the document.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-backed HTML document.
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    live: usize,
}

impl Document {
    /// Create an empty document containing only the root node.
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::NONE,
            live: 0,
        };
        doc.root = doc.alloc(Node::new(NodeData::Document));
        doc
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Get the document root ID.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by ID. Returns `None` for removed nodes.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    /// Get a mutable node by ID.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Whether `id` still refers to a node in the arena.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, including the root.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if the document only has its root.
    pub fn is_empty(&self) -> bool {
        self.live <= 1
    }

    /// Create a new element node.
    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        self.alloc(Node::new(NodeData::Element { name, attrs }))
    }

    /// Create an HTML element by local name.
    pub fn create_html_element(&mut self, local: &str, attrs: Vec<Attribute>) -> NodeId {
        let name = QualName::new(None, ns!(html), LocalName::from(local));
        self.create_element(name, attrs)
    }

    /// Create a new text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text.into())))
    }

    /// Create a new comment node.
    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text)))
    }

    /// Create a doctype node.
    pub fn create_doctype(&mut self, name: String, public_id: String, system_id: String) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype {
            name,
            public_id,
            system_id,
        }))
    }

    /// Append a child to a parent node, detaching it from any previous parent.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.detach(child);

        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
        }

        if let Some(last_node) = self.get_mut(last_child) {
            last_node.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert a node before a sibling.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let Some(parent) = self.get(sibling).map(|n| n.parent) else {
            return;
        };
        if parent.is_none() || !self.contains(new_node) || sibling == new_node {
            return;
        }
        self.detach(new_node);
        // Read after detaching: the new node may have been the sibling's neighbour.
        let prev = self
            .get(sibling)
            .map(|n| n.prev_sibling)
            .unwrap_or(NodeId::NONE);

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Append text to the parent's trailing text node, or create one.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(ref mut existing) = last.data
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.create_text(text);
        self.append(parent, text_node);
    }

    /// Unlink a node from its parent and siblings. The node and its subtree
    /// stay alive and can be re-inserted.
    pub fn detach(&mut self, id: NodeId) {
        let Some((parent, prev, next)) = self
            .get(id)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Detach a node and free it together with its whole subtree.
    ///
    /// Every id into the removed subtree becomes stale.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root || !self.contains(id) {
            return;
        }
        self.detach(id);

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(current));
            let slot = &mut self.slots[current.index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
            self.live -= 1;
        }
    }

    /// Replace `old` with `new` in the tree. `old` is detached, not freed.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if !self.is_attached_somewhere(old) {
            return;
        }
        self.insert_before(old, new);
        self.detach(old);
    }

    fn is_attached_somewhere(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.parent.is_some())
    }

    /// Whether the node is alive and connected to the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(node) = self.get(current) {
            if current == self.root {
                return true;
            }
            current = node.parent;
        }
        false
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        let first = self
            .get(parent)
            .map(|n| n.first_child)
            .unwrap_or(NodeId::NONE);
        Children {
            doc: self,
            current: first,
        }
    }

    /// Iterate over the ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        let first = self.get(id).map(|n| n.parent).unwrap_or(NodeId::NONE);
        Ancestors {
            doc: self,
            current: first,
        }
    }

    /// Find the first node matching a predicate in document order.
    pub fn find<F>(&self, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                if predicate(node) {
                    return Some(id);
                }
                let mut children: Vec<_> = self.children(id).collect();
                children.reverse();
                stack.extend(children);
            }
        }
        None
    }

    /// Find element by tag name (first match).
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find(|node| match &node.data {
            NodeData::Element { name, .. } => name.local.as_ref() == tag,
            _ => false,
        })
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.get(current).map(|n| &n.data) {
                Some(NodeData::Text(text)) => out.push_str(text),
                Some(_) => {
                    let mut children: Vec<_> = self.children(current).collect();
                    children.reverse();
                    stack.extend(children);
                }
                None => {}
            }
        }
        out
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    current: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.doc.get(self.current)?;
        let id = self.current;
        self.current = node.next_sibling;
        Some(id)
    }
}

/// Iterator over ancestors of a node.
pub struct Ancestors<'a> {
    doc: &'a Document,
    current: NodeId,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.doc.get(self.current)?;
        let id = self.current;
        self.current = node.parent;
        Some(id)
    }
}

/// Convenience methods for element and text nodes.
impl Document {
    /// Get element's local name (tag).
    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    /// Get element's namespace.
    pub fn element_namespace(&self, id: NodeId) -> Option<&Namespace> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.ns),
            _ => None,
        })
    }

    /// Get an attribute value.
    pub fn get_attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name.local.as_ref() == attr_name)
                .map(|a| a.value.as_str()),
            _ => None,
        })
    }

    /// Set an attribute, replacing any existing value in place.
    pub fn set_attr(&mut self, id: NodeId, attr_name: &str, value: impl Into<String>) {
        let Some(NodeData::Element { attrs, .. }) = self.get_mut(id).map(|n| &mut n.data) else {
            return;
        };
        let value = value.into();
        match attrs.iter_mut().find(|a| a.name.local.as_ref() == attr_name) {
            Some(existing) => existing.value = value,
            None => attrs.push(Attribute::new(attr_name, value)),
        }
    }

    /// Remove an attribute if present.
    pub fn remove_attr(&mut self, id: NodeId, attr_name: &str) {
        if let Some(NodeData::Element { attrs, .. }) = self.get_mut(id).map(|n| &mut n.data) {
            attrs.retain(|a| a.name.local.as_ref() != attr_name);
        }
    }

    /// Get element's id attribute.
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.get_attr(id, "id")
    }

    /// Iterate over the element's classes.
    pub fn element_classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.get_attr(id, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    /// Check if node is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    /// Check if node is a text node.
    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| matches!(n.data, NodeData::Text(_)))
    }

    /// Get text content of a text node.
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Overwrite the content of a text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(NodeData::Text(existing)) = self.get_mut(id).map(|n| &mut n.data) {
            *existing = text.into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_children() {
        let mut doc = Document::new();

        let parent = doc.create_html_element("div", vec![]);
        let child1 = doc.create_html_element("p", vec![]);
        let child2 = doc.create_html_element("p", vec![]);

        doc.append(doc.root(), parent);
        doc.append(parent, child1);
        doc.append(parent, child2);

        let children: Vec<_> = doc.children(parent).collect();
        assert_eq!(children, vec![child1, child2]);
        assert!(doc.is_attached(child2));
    }

    #[test]
    fn test_text_merging() {
        let mut doc = Document::new();

        let p = doc.create_html_element("p", vec![]);
        doc.append(doc.root(), p);

        doc.append_text(p, "Hello, ");
        doc.append_text(p, "World!");

        let children: Vec<_> = doc.children(p).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.text_content(children[0]), Some("Hello, World!"));
    }

    #[test]
    fn test_removed_ids_go_stale() {
        let mut doc = Document::new();
        let div = doc.create_html_element("div", vec![]);
        doc.append(doc.root(), div);
        let text = doc.create_text("gone");
        doc.append(div, text);

        doc.remove(div);
        assert!(!doc.contains(div));
        assert!(!doc.contains(text));

        // Slot reuse must not resurrect the old handle.
        let fresh = doc.create_text("new");
        assert!(doc.contains(fresh));
        assert!(doc.get(text).is_none());
        assert!(doc.get(div).is_none());
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_detach_keeps_node_alive() {
        let mut doc = Document::new();
        let div = doc.create_html_element("div", vec![]);
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        let c = doc.create_text("c");
        doc.append(doc.root(), div);
        doc.append(div, a);
        doc.append(div, b);
        doc.append(div, c);

        doc.detach(b);
        assert!(doc.contains(b));
        assert!(!doc.is_attached(b));
        assert_eq!(doc.text_of(div), "ac");
    }

    #[test]
    fn test_replace_and_insert_before() {
        let mut doc = Document::new();
        let p = doc.create_html_element("p", vec![]);
        doc.append(doc.root(), p);
        let first = doc.create_text("one ");
        let second = doc.create_text("two");
        doc.append(p, first);
        doc.append(p, second);

        let span = doc.create_html_element("span", vec![]);
        doc.replace(first, span);
        let children: Vec<_> = doc.children(p).collect();
        assert_eq!(children, vec![span, second]);
        assert!(!doc.is_attached(first));

        doc.insert_before(span, first);
        let children: Vec<_> = doc.children(p).collect();
        assert_eq!(children, vec![first, span, second]);
    }

    #[test]
    fn test_attribute_editing() {
        let mut doc = Document::new();
        let body = doc.create_html_element("body", vec![Attribute::new("class", "page dark")]);

        assert_eq!(doc.element_classes(body).collect::<Vec<_>>(), ["page", "dark"]);
        doc.set_attr(body, "class", "page");
        doc.set_attr(body, "style", "color: red");
        assert_eq!(doc.get_attr(body, "class"), Some("page"));
        assert_eq!(doc.get_attr(body, "style"), Some("color: red"));

        doc.remove_attr(body, "style");
        assert_eq!(doc.get_attr(body, "style"), None);
    }
}
