//! Page layout tree: component instances, containers and display leaves.
//!
//! A [`Layout`] is assembled once and then read-mostly: the tree's
//! structure never changes, only attribute values do (held by the
//! callback bridge's attribute store).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::component::{ComponentInstance, Fields, SerializedComponent};

/// Attributes a callback may address on a container.
pub const CONTAINER_ATTRIBUTES: &[&str] = &["className", "style"];
/// Attributes a callback may address on a leaf.
pub const LEAF_ATTRIBUTES: &[&str] = &["text", "className", "style"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("identifier `{0}` is used by more than one node")]
    DuplicateIdentifier(String),
    #[error("empty identifier on a `{0}` node")]
    EmptyIdentifier(String),
}

// ── Container ─────────────────────────────────────────────────────────────

/// A plain element holding ordered children (`div`, `section`, …).
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    tag: String,
    id: Option<String>,
    class_name: Option<String>,
    style: Fields,
    children: Vec<LayoutNode>,
}

impl Container {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), id: None, class_name: None, style: Fields::new(), children: Vec::new() }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class_name(mut self, class: impl Into<String>) -> Self {
        self.class_name = Some(class.into());
        self
    }

    pub fn style(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.style.insert(key.into(), value.into());
        self
    }

    pub fn child(mut self, node: impl Into<LayoutNode>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = LayoutNode>) -> Self {
        self.children.extend(nodes);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn props(&self) -> Fields {
        let mut props = Fields::new();
        if let Some(class) = &self.class_name {
            props.insert("className".into(), Value::String(class.clone()));
        }
        if !self.style.is_empty() {
            props.insert("style".into(), Value::Object(self.style.clone()));
        }
        props
    }
}

// ── Leaf ──────────────────────────────────────────────────────────────────

/// A display element without children (`p`, `h1`, `span`, …).
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    tag: String,
    id: Option<String>,
    class_name: Option<String>,
    style: Fields,
    text: Option<String>,
}

impl Leaf {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), id: None, class_name: None, style: Fields::new(), text: None }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class_name(mut self, class: impl Into<String>) -> Self {
        self.class_name = Some(class.into());
        self
    }

    pub fn style(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.style.insert(key.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn props(&self) -> Fields {
        let mut props = Fields::new();
        if let Some(text) = &self.text {
            props.insert("text".into(), Value::String(text.clone()));
        }
        if let Some(class) = &self.class_name {
            props.insert("className".into(), Value::String(class.clone()));
        }
        if !self.style.is_empty() {
            props.insert("style".into(), Value::Object(self.style.clone()));
        }
        props
    }
}

// ── LayoutNode ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    Component(ComponentInstance),
    Container(Container),
    Leaf(Leaf),
}

impl LayoutNode {
    pub fn id(&self) -> Option<&str> {
        match self {
            LayoutNode::Component(c) => c.id(),
            LayoutNode::Container(c) => c.id.as_deref(),
            LayoutNode::Leaf(l) => l.id.as_deref(),
        }
    }

    pub fn children(&self) -> &[LayoutNode] {
        match self {
            LayoutNode::Container(c) => &c.children,
            _ => &[],
        }
    }

    /// Node kind as written in the serialized tree.
    pub fn kind(&self) -> &'static str {
        match self {
            LayoutNode::Component(_) => "component",
            LayoutNode::Container(_) => "container",
            LayoutNode::Leaf(_) => "leaf",
        }
    }

    /// Whether callbacks may address `attribute` on this node.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        match self {
            LayoutNode::Component(c) => c.definition().accepts(attribute),
            LayoutNode::Container(_) => CONTAINER_ATTRIBUTES.contains(&attribute),
            LayoutNode::Leaf(_) => LEAF_ATTRIBUTES.contains(&attribute),
        }
    }

    /// Attribute values the node starts with (explicitly set ones only).
    pub fn initial_attributes(&self) -> Fields {
        match self {
            LayoutNode::Component(c) => c.fields().clone(),
            LayoutNode::Container(c) => c.props(),
            LayoutNode::Leaf(l) => l.props(),
        }
    }

    pub fn serialize(&self) -> SerializedNode {
        match self {
            LayoutNode::Component(c) => SerializedNode::Component(c.serialize()),
            LayoutNode::Container(c) => SerializedNode::Container {
                tag: c.tag.clone(),
                id: c.id.clone(),
                props: c.props(),
                children: c.children.iter().map(LayoutNode::serialize).collect(),
            },
            LayoutNode::Leaf(l) => SerializedNode::Leaf {
                tag: l.tag.clone(),
                id: l.id.clone(),
                props: l.props(),
            },
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a LayoutNode>) {
        out.push(self);
        for child in self.children() {
            child.collect(out);
        }
    }
}

impl From<ComponentInstance> for LayoutNode {
    fn from(c: ComponentInstance) -> Self {
        LayoutNode::Component(c)
    }
}

impl From<Container> for LayoutNode {
    fn from(c: Container) -> Self {
        LayoutNode::Container(c)
    }
}

impl From<Leaf> for LayoutNode {
    fn from(l: Leaf) -> Self {
        LayoutNode::Leaf(l)
    }
}

/// Tree form sent to the client renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SerializedNode {
    Component(SerializedComponent),
    Container {
        tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        props: Fields,
        children: Vec<SerializedNode>,
    },
    Leaf {
        tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        props: Fields,
    },
}

// ── Layout ────────────────────────────────────────────────────────────────

/// An assembled layout tree with unique identifiers.
#[derive(Debug, Clone)]
pub struct Layout {
    root: LayoutNode,
    /// Identifier → child-index path from the root.
    index: HashMap<String, Vec<usize>>,
}

impl Layout {
    pub fn assemble(root: impl Into<LayoutNode>) -> Result<Self, LayoutError> {
        let root = root.into();
        let mut index = HashMap::new();
        let mut path = Vec::new();
        index_node(&root, &mut path, &mut index)?;
        log::debug!("layout assembled: {} addressable nodes", index.len());
        Ok(Self { root, index })
    }

    pub fn root(&self) -> &LayoutNode {
        &self.root
    }

    pub fn find(&self, id: &str) -> Option<&LayoutNode> {
        let path = self.index.get(id)?;
        let mut node = &self.root;
        for &i in path {
            node = node.children().get(i)?;
        }
        Some(node)
    }

    pub fn has_attribute(&self, id: &str, attribute: &str) -> bool {
        self.find(id).is_some_and(|n| n.has_attribute(attribute))
    }

    /// Initial attribute values of the node identified by `id`.
    pub fn attributes_of(&self, id: &str) -> Option<Fields> {
        self.find(id).map(LayoutNode::initial_attributes)
    }

    /// Identified nodes, in document order.
    pub fn ids(&self) -> Vec<&str> {
        self.walk().into_iter().filter_map(LayoutNode::id).collect()
    }

    /// All nodes in document order: pre-order, children in supplied order.
    pub fn walk(&self) -> Vec<&LayoutNode> {
        let mut out = Vec::new();
        self.root.collect(&mut out);
        out
    }

    pub fn serialize(&self) -> SerializedNode {
        self.root.serialize()
    }
}

fn index_node(
    node: &LayoutNode,
    path: &mut Vec<usize>,
    index: &mut HashMap<String, Vec<usize>>,
) -> Result<(), LayoutError> {
    if let Some(id) = node.id() {
        if id.is_empty() {
            return Err(LayoutError::EmptyIdentifier(node.kind().to_string()));
        }
        if index.insert(id.to_string(), path.clone()).is_some() {
            return Err(LayoutError::DuplicateIdentifier(id.to_string()));
        }
    }
    for (i, child) in node.children().iter().enumerate() {
        path.push(i);
        index_node(child, path, index)?;
        path.pop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::WidgetRegistry;
    use serde_json::json;

    fn swiper(id: &str) -> ComponentInstance {
        let def = WidgetRegistry::with_builtins().unwrap().resolve("DashSwiper").unwrap().clone();
        ComponentInstance::create(def, Fields::new(), Some(id.to_string())).unwrap()
    }

    fn page() -> Container {
        Container::new("div")
            .id("page")
            .style("height", "60vh")
            .child(swiper("hero"))
            .child(Container::new("section").child(Leaf::new("p").id("label").text("Slide 1")))
            .child(Leaf::new("span"))
    }

    #[test]
    fn finds_nodes_by_identifier() {
        let layout = Layout::assemble(page()).unwrap();
        assert_eq!(layout.find("hero").map(LayoutNode::kind), Some("component"));
        assert_eq!(layout.find("label").map(LayoutNode::kind), Some("leaf"));
        assert!(layout.find("missing").is_none());
        assert_eq!(layout.ids(), ["page", "hero", "label"]);
    }

    #[test]
    fn attributes_resolve_per_node_kind() {
        let layout = Layout::assemble(page()).unwrap();
        assert!(layout.has_attribute("hero", "activeIndex"));
        assert!(layout.has_attribute("hero", "data-slot"));
        assert!(!layout.has_attribute("hero", "text"));
        assert!(layout.has_attribute("label", "text"));
        assert!(layout.has_attribute("page", "style"));
        assert!(!layout.has_attribute("page", "text"));
        assert_eq!(layout.attributes_of("label").unwrap()["text"], "Slide 1");
        assert!(layout.attributes_of("nope").is_none());
    }

    #[test]
    fn duplicate_identifier_rejected() {
        let root = Container::new("div").child(swiper("x")).child(Leaf::new("p").id("x"));
        assert_eq!(Layout::assemble(root).unwrap_err(), LayoutError::DuplicateIdentifier("x".into()));
    }

    #[test]
    fn nested_duplicate_identifier_rejected() {
        let root = Container::new("div")
            .id("a")
            .child(Container::new("div").child(Container::new("div").id("a")));
        assert!(matches!(Layout::assemble(root), Err(LayoutError::DuplicateIdentifier(_))));
    }

    #[test]
    fn walk_is_document_order() {
        let layout = Layout::assemble(page()).unwrap();
        let kinds: Vec<_> = layout.walk().iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, ["container", "component", "container", "leaf", "leaf"]);
    }

    #[test]
    fn serializes_tagged_tree() {
        let layout = Layout::assemble(page()).unwrap();
        let out = serde_json::to_value(layout.serialize()).unwrap();
        assert_eq!(out["kind"], "container");
        assert_eq!(out["props"]["style"], json!({ "height": "60vh" }));
        assert_eq!(out["children"][0]["kind"], "component");
        assert_eq!(out["children"][0]["type"], "DashSwiper");
        assert_eq!(out["children"][0]["props"], json!({ "id": "hero" }));
        assert_eq!(out["children"][1]["children"][0]["props"]["text"], "Slide 1");
        assert!(out["children"][2].get("id").is_none());
    }

    #[test]
    fn serialization_is_stable() {
        let layout = Layout::assemble(page()).unwrap();
        let a = serde_json::to_string(&layout.serialize()).unwrap();
        let b = serde_json::to_string(&layout.serialize()).unwrap();
        assert_eq!(a, b);
    }
}
