// The live node tree the sync engine patches. This is the "DOM" seam:
// the core algorithms run against this arena so they can be exercised
// without a browser, and a real document is one backend among several.
//
// Detached subtrees stay addressable so that deferred work scheduled
// against a node can detect staleness and become a no-op instead of
// mutating a node the user can no longer see.

use std::collections::HashMap;

use log::trace;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum DomError {
    #[error("Node is not attached to a parent")]
    NotAttached,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
enum NodeKind {
    Element(String),
    Text,
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    dataset: HashMap<String, String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    detached: bool,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            classes: Vec::new(),
            attrs: Vec::new(),
            dataset: HashMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
            detached: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(NodeData::new(NodeKind::Element(tag.to_string())));
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Text);
        data.text = text.to_string();
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element(tag) => Some(tag),
            NodeKind::Text => None,
        }
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].kind, NodeKind::Text)
    }

    pub fn text(&self, node: NodeId) -> &str {
        &self.nodes[node.0].text
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.nodes[node.0].text = text.to_string();
    }

    /// Replace an element's children with a single text node.
    pub fn set_inner_text(&mut self, node: NodeId, text: &str) {
        self.clear_children(node);
        let child = self.create_text(text);
        self.append_child(node, child);
    }

    /// Concatenated text of the node and all descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        out.push_str(&self.nodes[node.0].text);
        for &child in &self.nodes[node.0].children {
            self.collect_text(child, out);
        }
    }

    // tree surgery

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.remove_from_parent(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].detached = false;
    }

    /// Insert `new` as the previous sibling of `reference`.
    pub fn insert_before(&mut self, new: NodeId, reference: NodeId) -> Result<(), DomError> {
        let parent = self.nodes[reference.0].parent.ok_or(DomError::NotAttached)?;
        self.remove_from_parent(new);
        let children = &mut self.nodes[parent.0].children;
        let position = children
            .iter()
            .position(|&child| child == reference)
            .unwrap_or(children.len());
        children.insert(position, new);
        self.nodes[new.0].parent = Some(parent);
        self.nodes[new.0].detached = false;
        Ok(())
    }

    /// Remove the subtree rooted at `node` from the document. The nodes
    /// stay addressable but report as detached.
    pub fn detach(&mut self, node: NodeId) {
        trace!("detaching node {:?}", node);
        self.remove_from_parent(node);
        self.nodes[node.0].detached = true;
    }

    pub fn clear_children(&mut self, node: NodeId) {
        for child in self.nodes[node.0].children.clone() {
            self.detach(child);
        }
    }

    fn remove_from_parent(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&child| child != node);
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// True once `detach` has been called on the node or any ancestor.
    /// Freshly created, not-yet-attached nodes are not detached.
    pub fn is_detached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if self.nodes[current.0].detached {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    // classes and attributes

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        let classes = &mut self.nodes[node.0].classes;
        if !classes.iter().any(|existing| existing == class) {
            classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        self.nodes[node.0].classes.retain(|existing| existing != class);
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes[node.0].classes.iter().any(|existing| existing == class)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let attrs = &mut self.nodes[node.0].attrs;
        match attrs.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, existing_value)) => *existing_value = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0]
            .attrs
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_data(&mut self, node: NodeId, name: &str, value: &str) {
        self.nodes[node.0]
            .dataset
            .insert(name.to_string(), value.to_string());
    }

    pub fn data(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0].dataset.get(name).map(String::as_str)
    }

    // queries, depth-first over descendants

    pub fn find_by_class(&self, root: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&node| self.has_class(node, class))
    }

    pub fn find_all_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&node| self.has_class(node, class))
            .collect()
    }

    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&node| self.tag(node) == Some(tag))
    }

    pub fn find_all_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&node| self.tag(node) == Some(tag))
            .collect()
    }

    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[root.0].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    // serialization

    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let data = &self.nodes[node.0];
        match &data.kind {
            NodeKind::Text => out.push_str(&escape_text(&data.text)),
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                if !data.classes.is_empty() {
                    out.push_str(&format!(
                        " class=\"{}\"",
                        escape_attr(&data.classes.join(" "))
                    ));
                }
                for (name, value) in &data.attrs {
                    out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
                }
                let mut dataset: Vec<_> = data.dataset.iter().collect();
                dataset.sort();
                for (name, value) in dataset {
                    out.push_str(&format!(" data-{}=\"{}\"", name, escape_attr(value)));
                }
                if is_void(tag) {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in &data.children {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
        }
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "br" | "hr" | "img")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}
