//! Builds layout trees from `.glide` markup.
//!
//! Element names map to plain nodes (`Div`, `Section`, … become
//! containers; `H1`, `P`, `Label`, … become leaves). Any other name is a
//! registered component alias or a widget from the [`WidgetRegistry`].

use std::collections::HashMap;

use glide_markup::ast::{Document, Node, Value as MarkupValue};
use glide_markup::error::ParseError;
use glide_markup::parser::parse_str;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::assets::AssetResolver;
use crate::component::{ComponentInstance, Fields, ValidationError};
use crate::layout::{Container, LayoutNode, Leaf};
use crate::registry::{RegistryError, WidgetRegistry};

pub const CONTAINER_ELEMENTS: &[&str] = &["Div", "Section", "Main", "Header", "Footer", "Nav"];
pub const LEAF_ELEMENTS: &[&str] = &["H1", "H2", "H3", "P", "Span", "Label"];

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("line {line} ({path}): {source}")]
    Widget {
        path: String,
        line: usize,
        #[source]
        source: RegistryError,
    },
    #[error("line {line} ({path}): {source}")]
    Invalid {
        path: String,
        line: usize,
        #[source]
        source: ValidationError,
    },
    #[error("line {line} ({path}): {message}")]
    Element { path: String, line: usize, message: String },
    #[error("import `{path}` as `{alias}` is not registered")]
    UnresolvedImport { path: String, alias: String },
    #[error("component `{0}` includes itself")]
    RecursiveComponent(String),
}

impl BuildError {
    /// 1-based source line of the offending node, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            BuildError::Parse(e) => Some(e.line),
            BuildError::Widget { line, .. }
            | BuildError::Invalid { line, .. }
            | BuildError::Element { line, .. } => Some(*line),
            BuildError::UnresolvedImport { .. } | BuildError::RecursiveComponent(_) => None,
        }
    }
}

/// Parses markup and holds the component documents it may include.
#[derive(Debug, Clone, Default)]
pub struct MarkupLoader {
    components: HashMap<String, Document>,
    assets: AssetResolver,
}

impl MarkupLoader {
    pub fn new(assets: AssetResolver) -> Self {
        Self { components: HashMap::new(), assets }
    }

    pub fn parse(&self, src: &str) -> Result<Document, ParseError> {
        parse_str(src)
    }

    /// Make `doc` available as `alias` to documents that `import` it.
    pub fn register(&mut self, alias: impl Into<String>, doc: Document) {
        self.components.insert(alias.into(), doc);
    }

    pub fn parse_and_register(&mut self, alias: impl Into<String>, src: &str) -> Result<(), ParseError> {
        let doc = parse_str(src)?;
        self.components.insert(alias.into(), doc);
        Ok(())
    }

    pub fn is_registered(&self, alias: &str) -> bool {
        self.components.contains_key(alias)
    }

    /// Parse `src` and build its layout tree in one go.
    pub fn load(&self, src: &str, registry: &WidgetRegistry) -> Result<LayoutNode, BuildError> {
        let doc = parse_str(src)?;
        self.build(&doc, registry)
    }

    pub fn build(&self, doc: &Document, registry: &WidgetRegistry) -> Result<LayoutNode, BuildError> {
        for import in &doc.imports {
            if !self.components.contains_key(&import.alias) {
                return Err(BuildError::UnresolvedImport { path: import.path.clone(), alias: import.alias.clone() });
            }
        }
        let mut cx = BuildCx { registry, path: Vec::new(), expanding: Vec::new() };
        self.build_node(&doc.root, &mut cx)
    }

    // ── internal ──────────────────────────────────────────────────────────

    fn build_node(&self, node: &Node, cx: &mut BuildCx<'_>) -> Result<LayoutNode, BuildError> {
        cx.path.push(node.widget.clone());
        let built = self.build_node_inner(node, cx);
        cx.path.pop();
        built
    }

    fn build_node_inner(&self, node: &Node, cx: &mut BuildCx<'_>) -> Result<LayoutNode, BuildError> {
        check_unique_props(node, cx)?;
        let name = node.widget.as_str();

        if CONTAINER_ELEMENTS.contains(&name) {
            return self.build_container(node, cx);
        }
        if LEAF_ELEMENTS.contains(&name) {
            return self.build_leaf(node, cx);
        }
        if let Some(component) = self.components.get(name) {
            if cx.expanding.iter().any(|a| a == name) {
                return Err(BuildError::RecursiveComponent(name.to_string()));
            }
            cx.expanding.push(name.to_string());
            let built = self.build_node(&component.root, cx);
            cx.expanding.pop();
            return built;
        }
        self.build_component(node, cx)
    }

    fn build_container(&self, node: &Node, cx: &mut BuildCx<'_>) -> Result<LayoutNode, BuildError> {
        if node.content.is_some() {
            return Err(cx.element(node, "containers take children, not inline text"));
        }
        let mut c = Container::new(node.widget.to_ascii_lowercase());
        for prop in &node.props {
            c = match prop.key.as_str() {
                "id" => c.id(string_prop(node, &prop.value, cx)?),
                "className" => c.class_name(string_prop(node, &prop.value, cx)?),
                "style" => {
                    for (key, value) in style_prop(node, &prop.value, &self.assets, cx)? {
                        c = c.style(key, value);
                    }
                    c
                }
                other => return Err(cx.element(node, format!("`{}` has no attribute `{other}`", node.widget))),
            };
        }
        for child in &node.children {
            c = c.child(self.build_node(child, cx)?);
        }
        Ok(c.into())
    }

    fn build_leaf(&self, node: &Node, cx: &mut BuildCx<'_>) -> Result<LayoutNode, BuildError> {
        if !node.children.is_empty() {
            return Err(cx.element(node, format!("`{}` cannot have children", node.widget)));
        }
        let mut l = Leaf::new(node.widget.to_ascii_lowercase());
        if let Some(text) = &node.content {
            l = l.text(text.clone());
        }
        for prop in &node.props {
            l = match prop.key.as_str() {
                "id" => l.id(string_prop(node, &prop.value, cx)?),
                "className" => l.class_name(string_prop(node, &prop.value, cx)?),
                "text" if node.content.is_some() => {
                    return Err(cx.element(node, "text given both inline and as `text`"));
                }
                "text" => l.text(string_prop(node, &prop.value, cx)?),
                "style" => {
                    for (key, value) in style_prop(node, &prop.value, &self.assets, cx)? {
                        l = l.style(key, value);
                    }
                    l
                }
                other => return Err(cx.element(node, format!("`{}` has no attribute `{other}`", node.widget))),
            };
        }
        Ok(l.into())
    }

    fn build_component(&self, node: &Node, cx: &mut BuildCx<'_>) -> Result<LayoutNode, BuildError> {
        let definition = cx.registry.resolve(&node.widget).map_err(|source| BuildError::Widget {
            path: cx.path(),
            line: node.line,
            source,
        })?;
        if !node.children.is_empty() || node.content.is_some() {
            return Err(cx.element(node, format!("widget `{}` takes properties only", node.widget)));
        }

        let mut fields = Fields::new();
        for prop in &node.props {
            let value = to_json(&prop.value, &self.assets).map_err(|e| cx.element(node, format!("`{}`: {e}", prop.key)))?;
            fields.insert(prop.key.clone(), value);
        }
        let instance = ComponentInstance::create(definition.clone(), fields, None).map_err(|source| {
            BuildError::Invalid { path: cx.path(), line: node.line, source }
        })?;
        log::debug!("built {} at line {}", node.widget, node.line);
        Ok(instance.into())
    }
}

struct BuildCx<'a> {
    registry: &'a WidgetRegistry,
    /// Widget names from the root to the node being built.
    path: Vec<String>,
    /// Component aliases currently being expanded.
    expanding: Vec<String>,
}

impl BuildCx<'_> {
    fn path(&self) -> String {
        self.path.join(" > ")
    }

    fn element(&self, node: &Node, message: impl Into<String>) -> BuildError {
        BuildError::Element { path: self.path(), line: node.line, message: message.into() }
    }
}

fn check_unique_props(node: &Node, cx: &BuildCx<'_>) -> Result<(), BuildError> {
    for (i, prop) in node.props.iter().enumerate() {
        if node.props[..i].iter().any(|p| p.key == prop.key) {
            return Err(BuildError::Element {
                path: cx.path(),
                line: prop.line,
                message: format!("property `{}` given twice", prop.key),
            });
        }
    }
    Ok(())
}

fn string_prop(node: &Node, value: &MarkupValue, cx: &BuildCx<'_>) -> Result<String, BuildError> {
    match value {
        MarkupValue::Str(s) | MarkupValue::Ident(s) => Ok(s.clone()),
        other => Err(cx.element(node, format!("expected a string, got {}", other.type_name()))),
    }
}

fn style_prop(
    node: &Node,
    value: &MarkupValue,
    assets: &AssetResolver,
    cx: &BuildCx<'_>,
) -> Result<Fields, BuildError> {
    match to_json(value, assets).map_err(|e| cx.element(node, format!("`style`: {e}")))? {
        Value::Object(map) => Ok(map),
        _ => Err(cx.element(node, format!("`style` expects an object, got {}", value.type_name()))),
    }
}

/// A markup number with no JSON form (NaN or infinite).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("number {0} cannot be represented in JSON")]
pub struct NonFiniteNumber(pub f64);

/// Markup literal to JSON. Integral numbers become JSON integers, asset
/// references become URLs.
pub fn to_json(value: &MarkupValue, assets: &AssetResolver) -> Result<Value, NonFiniteNumber> {
    Ok(match value {
        MarkupValue::Str(s) | MarkupValue::Ident(s) => Value::String(s.clone()),
        MarkupValue::Number(n) => number(*n)?,
        MarkupValue::Bool(b) => Value::Bool(*b),
        MarkupValue::Null => Value::Null,
        MarkupValue::Asset(name) => Value::String(assets.url(name)),
        MarkupValue::List(items) => {
            Value::Array(items.iter().map(|v| to_json(v, assets)).collect::<Result<_, _>>()?)
        }
        MarkupValue::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_json(v, assets)?)))
                .collect::<Result<_, NonFiniteNumber>>()?,
        ),
    })
}

fn number(n: f64) -> Result<Value, NonFiniteNumber> {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return Ok(Value::Number(Number::from(n as i64)));
    }
    Number::from_f64(n).map(Value::Number).ok_or(NonFiniteNumber(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use serde_json::json;

    const PAGE: &str = r#"
        Div {
            id: "page"
            style: { width: "100%" height: "60vh" }
            DashSwiper {
                id: "my-swiper"
                loop: true
                speed: 800
                slides: [
                    { src: @"images/01.jpg" alt: "Image 1" title: "Spider-Man" }
                    { src: @"images/02.jpg" alt: "Image 2" }
                ]
            }
            P "Slide 1" { id: "active-label" }
        }
    "#;

    fn build(src: &str) -> Result<LayoutNode, BuildError> {
        let registry = WidgetRegistry::with_builtins().unwrap();
        MarkupLoader::default().load(src, &registry)
    }

    #[test]
    fn builds_page() {
        let layout = Layout::assemble(build(PAGE).unwrap()).unwrap();
        let LayoutNode::Component(swiper) = layout.find("my-swiper").unwrap() else {
            panic!("expected a component");
        };
        assert_eq!(swiper.get("speed"), Some(&json!(800)));
        assert_eq!(swiper.get("slides").unwrap()[0]["src"], "/assets/images/01.jpg");
        assert_eq!(layout.attributes_of("active-label").unwrap()["text"], "Slide 1");
        assert_eq!(layout.attributes_of("page").unwrap()["style"]["height"], "60vh");
    }

    #[test]
    fn unknown_widget_reports_line_and_path() {
        let err = build("Div {\n  Carousel3000 { }\n}").unwrap_err();
        assert!(matches!(err, BuildError::Widget { source: RegistryError::UnknownWidget(_), .. }));
        assert_eq!(err.line(), Some(2));
        assert!(err.to_string().contains("Div > Carousel3000"));
    }

    #[test]
    fn validation_errors_surface() {
        let err = build(r#"DashCarousel { id: "c" }"#).unwrap_err();
        match err {
            BuildError::Invalid { source: ValidationError::MissingRequiredField { field, .. }, .. } => {
                assert_eq!(field, "slides")
            }
            other => panic!("unexpected {other:?}"),
        }
        let err = build(r#"DashSwiper { slides: [ { alt: "x" } ] }"#).unwrap_err();
        let BuildError::Invalid { source, .. } = err else { panic!("expected validation error") };
        assert_eq!(source.path(), "slides[0].src");
    }

    #[test]
    fn element_attribute_rules() {
        assert!(matches!(build(r#"Div { text: "x" }"#), Err(BuildError::Element { .. })));
        assert!(matches!(build(r#"P { Span { } }"#), Err(BuildError::Element { .. })));
        assert!(matches!(build(r#"P "a" { text: "b" }"#), Err(BuildError::Element { .. })));
        assert!(matches!(build(r#"Div { id: "a" id: "b" }"#), Err(BuildError::Element { .. })));
    }

    #[test]
    fn components_expand_in_place() {
        let registry = WidgetRegistry::with_builtins().unwrap();
        let mut loader = MarkupLoader::default();
        loader.parse_and_register("Caption", r#"Label { id: "caption" text: "hi" }"#).unwrap();
        let root = loader
            .load(r#"import "caption.glide" as Caption  Div { Caption { } }"#, &registry)
            .unwrap();
        assert_eq!(root.children()[0].id(), Some("caption"));

        let missing = loader.load(r#"import "x.glide" as X  Div { }"#, &registry);
        assert!(matches!(missing, Err(BuildError::UnresolvedImport { .. })));
    }

    #[test]
    fn recursive_components_rejected() {
        let registry = WidgetRegistry::with_builtins().unwrap();
        let mut loader = MarkupLoader::default();
        loader.parse_and_register("Loop", "Div { Loop { } }").unwrap();
        assert!(matches!(loader.load("Loop { }", &registry), Err(BuildError::RecursiveComponent(_))));
    }

    #[test]
    fn numbers_keep_integer_form() {
        let assets = AssetResolver::default();
        assert_eq!(to_json(&MarkupValue::Number(1000.0), &assets), Ok(json!(1000)));
        assert_eq!(to_json(&MarkupValue::Number(0.33), &assets), Ok(json!(0.33)));
        assert_eq!(to_json(&MarkupValue::Number(-4.0), &assets), Ok(json!(-4)));
    }

    #[test]
    fn non_finite_numbers_are_build_errors() {
        let assets = AssetResolver::default();
        let nested = MarkupValue::List(vec![MarkupValue::Number(1.0), MarkupValue::Number(f64::NAN)]);
        assert!(to_json(&nested, &assets).is_err());

        let mut doc = parse_str("DashSwiper { speed: 1 }").unwrap();
        doc.root.props[0].value = MarkupValue::Number(f64::INFINITY);
        let registry = WidgetRegistry::with_builtins().unwrap();
        let err = MarkupLoader::default().build(&doc, &registry).unwrap_err();
        assert!(matches!(err, BuildError::Element { ref message, .. } if message.contains("speed")));
    }
}
