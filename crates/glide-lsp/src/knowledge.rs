//! What the server knows about widgets and plain elements.
//!
//! Widget knowledge comes straight from the glide-core registry, so hover
//! and completion always match what the builder validates against. Plain
//! elements are described here.

use std::sync::Arc;

use glide_core::layout::{CONTAINER_ATTRIBUTES, LEAF_ATTRIBUTES};
use glide_core::markup::{CONTAINER_ELEMENTS, LEAF_ELEMENTS};
use glide_core::registry::WidgetRegistry;
use glide_core::schema::{PropertySpec, WidgetDefinition};

// ── Elements ──────────────────────────────────────────────────────────────

pub struct ElementInfo {
    pub name: &'static str,
    pub doc: &'static str,
    pub attributes: &'static [&'static str],
}

pub fn element_by_name(name: &str) -> Option<ElementInfo> {
    if let Some(name) = CONTAINER_ELEMENTS.iter().copied().find(|e| *e == name) {
        return Some(ElementInfo {
            name,
            doc: "Container element. Holds child elements and widgets in order.",
            attributes: CONTAINER_ATTRIBUTES,
        });
    }
    let name = LEAF_ELEMENTS.iter().copied().find(|e| *e == name)?;
    Some(ElementInfo {
        name,
        doc: "Text element. Inline content is the displayed text: `P \"Hello\"`.",
        attributes: LEAF_ATTRIBUTES,
    })
}

pub fn elements() -> impl Iterator<Item = ElementInfo> {
    CONTAINER_ELEMENTS.iter().chain(LEAF_ELEMENTS).filter_map(|name| element_by_name(name))
}

pub fn attribute_doc(attribute: &str) -> &'static str {
    match attribute {
        "id" => "Identifier used to address this element from callbacks.",
        "className" => "CSS class of the element.",
        "style" => "Inline styles, as an object: `style: { height: \"60vh\" }`.",
        "text" => "Displayed text. Alternative to inline content.",
        _ => "",
    }
}

// ── Widgets ───────────────────────────────────────────────────────────────

pub struct Knowledge {
    registry: WidgetRegistry,
}

impl Knowledge {
    pub fn new() -> Self {
        // The built-in tables are checked by glide-core's own tests.
        Self { registry: WidgetRegistry::with_builtins().unwrap_or_default() }
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn widget(&self, name: &str) -> Option<&Arc<WidgetDefinition>> {
        self.registry.resolve(name).ok()
    }

    pub fn widgets(&self) -> impl Iterator<Item = &Arc<WidgetDefinition>> {
        self.registry.iter()
    }

    /// Fields available at `path` inside `widget`: its own props for an
    /// empty path, the nested schema of a shape or list field otherwise.
    pub fn fields_at(&self, widget: &str, path: &[String]) -> Option<&[PropertySpec]> {
        let mut fields = self.widget(widget)?.props();
        for key in path {
            fields = fields.iter().find(|p| &p.name == key)?.kind.nested()?;
        }
        Some(fields)
    }

    pub fn field(&self, widget: &str, path: &[String], name: &str) -> Option<&PropertySpec> {
        self.fields_at(widget, path)?.iter().find(|p| p.name == name)
    }
}

impl Default for Knowledge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_fields_resolve() {
        let k = Knowledge::new();
        let path = vec!["slides".to_string()];
        assert!(k.field("DashSwiper", &path, "src").is_some_and(|p| p.required));
        assert!(k.field("DashSwiper", &["autoplay".to_string()], "delay").is_some());
        assert!(k.fields_at("DashSwiper", &["speed".to_string()]).is_none());
    }

    #[test]
    fn elements_are_described() {
        assert_eq!(element_by_name("Div").map(|e| e.attributes), Some(CONTAINER_ATTRIBUTES));
        assert_eq!(element_by_name("Label").map(|e| e.attributes), Some(LEAF_ATTRIBUTES));
        assert!(element_by_name("DashSwiper").is_none());
        assert_eq!(elements().count(), 12);
    }
}
