//! Widget property schema: what each widget accepts, with kinds and defaults.
//!
//! Definitions are plain data. Built-in widgets are declared as static
//! tables ([`WidgetDecl`] / [`PropDecl`], see [`crate::builtin`]); third-party
//! widgets can be loaded from JSON metadata with
//! [`WidgetDefinition::from_metadata_json`]. Either way the result goes
//! through [`WidgetDefinitionBuilder::build`], which is the only place a
//! [`WidgetDefinition`] is created and where every [`SchemaError`] is raised.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::component::{ValidationError, validate_value};

// ── Property kinds ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropKind {
    String,
    Number,
    Bool,
    /// Structured object validated against a nested schema.
    Shape { fields: Vec<PropertySpec> },
    /// List whose every element is validated against a nested schema.
    ListOf { fields: Vec<PropertySpec> },
    /// Free-form object forwarded to the renderer as-is.
    Dict,
    /// Uninterpreted pass-through of any JSON value.
    Any,
}

impl PropKind {
    pub fn label(&self) -> &'static str {
        match self {
            PropKind::String => "string",
            PropKind::Number => "number",
            PropKind::Bool => "boolean",
            PropKind::Shape { .. } => "dict",
            PropKind::ListOf { .. } => "list of dicts",
            PropKind::Dict => "dict",
            PropKind::Any => "any",
        }
    }

    /// Shallow type check: nested schemas are checked by the component layer.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            PropKind::String => value.is_string(),
            PropKind::Number => value.is_number(),
            PropKind::Bool => value.is_boolean(),
            PropKind::Shape { .. } | PropKind::Dict => value.is_object(),
            PropKind::ListOf { .. } => value.is_array(),
            PropKind::Any => true,
        }
    }

    pub fn nested(&self) -> Option<&[PropertySpec]> {
        match self {
            PropKind::Shape { fields } | PropKind::ListOf { fields } => Some(fields),
            _ => None,
        }
    }
}

// ── Property spec ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: PropKind,
    #[serde(default)]
    pub required: bool,
    /// Documented default. Applied by the renderer, never by the server.
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub doc: String,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, kind: PropKind) -> Self {
        Self { name: name.into(), kind, required: false, default: None, doc: String::new() }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }
}

// ── Static declarations ───────────────────────────────────────────────────

/// Compile-time kind declaration used by static widget tables.
#[derive(Debug, Clone, Copy)]
pub enum KindDecl {
    String,
    Number,
    Bool,
    Shape(&'static [PropDecl]),
    ListOf(&'static [PropDecl]),
    Dict,
    Any,
}

/// Compile-time property declaration. `default` is a JSON literal.
#[derive(Debug, Clone, Copy)]
pub struct PropDecl {
    pub name:     &'static str,
    pub kind:     KindDecl,
    pub required: bool,
    pub default:  Option<&'static str>,
    pub doc:      &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct WidgetDecl {
    pub namespace: &'static str,
    pub name:      &'static str,
    pub version:   &'static str,
    pub doc:       &'static str,
    pub props:     &'static [PropDecl],
    pub wildcard_prefixes: &'static [&'static str],
}

// ── Errors ────────────────────────────────────────────────────────────────

/// A malformed widget definition. Raised at startup; never recovered.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("widget `{widget}` declares field `{field}` more than once")]
    DuplicateField { widget: String, field: String },
    #[error("widget `{widget}`: nested schema `{path}` declares field `{field}` more than once")]
    DuplicateNestedField { widget: String, path: String, field: String },
    #[error("widget `{widget}`: empty field name in `{path}`")]
    EmptyFieldName { widget: String, path: String },
    #[error("widget `{widget}`: default of `{field}` is not a valid {expected}")]
    InvalidDefault { widget: String, field: String, expected: &'static str },
    #[error("widget `{widget}`: default of `{field}` does not fit its schema: {source}")]
    DefaultOutsideSchema {
        widget: String,
        field: String,
        #[source]
        source: ValidationError,
    },
    #[error("widget `{widget}`: default of `{field}` is not valid JSON: {source}")]
    UnparsableDefault {
        widget: String,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("widget definition needs a namespace and a type name")]
    MissingIdentity,
    #[error("invalid widget metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

// ── Widget definition ─────────────────────────────────────────────────────

/// One renderable widget type, identified by `(namespace, type_name)`.
///
/// Immutable once built. Field order is the declaration order and is the
/// order fields are serialized in.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDefinition {
    namespace: String,
    type_name: String,
    version: String,
    doc: String,
    props: Vec<PropertySpec>,
    wildcard_prefixes: Vec<String>,
}

impl WidgetDefinition {
    pub fn builder(namespace: impl Into<String>, type_name: impl Into<String>) -> WidgetDefinitionBuilder {
        WidgetDefinitionBuilder {
            namespace: namespace.into(),
            type_name: type_name.into(),
            version: "0.0.0".to_string(),
            doc: String::new(),
            props: Vec::new(),
            wildcard_prefixes: Vec::new(),
        }
    }

    /// Build a definition from a static declaration table.
    pub fn from_decl(decl: &WidgetDecl) -> Result<Self, SchemaError> {
        let mut builder = Self::builder(decl.namespace, decl.name)
            .version(decl.version)
            .doc(decl.doc);
        for prefix in decl.wildcard_prefixes {
            builder = builder.wildcard(*prefix);
        }
        for prop in decl.props {
            builder = builder.prop(spec_from_decl(decl.name, prop)?);
        }
        builder.build()
    }

    /// Load a definition from JSON component metadata:
    ///
    /// ```json
    /// { "namespace": "acme", "type": "Gallery", "version": "1.0.0",
    ///   "props": [ { "name": "images", "kind": "list_of",
    ///                "fields": [ { "name": "src", "kind": "string", "required": true } ] } ] }
    /// ```
    pub fn from_metadata_json(src: &str) -> Result<Self, SchemaError> {
        let meta: WidgetMetadata = serde_json::from_str(src)?;
        let mut builder = Self::builder(meta.namespace, meta.type_name)
            .version(meta.version)
            .doc(meta.doc);
        for prefix in meta.wildcard_prefixes {
            builder = builder.wildcard(prefix);
        }
        for prop in meta.props {
            builder = builder.prop(prop);
        }
        builder.build()
    }

    pub fn namespace(&self) -> &str { &self.namespace }
    pub fn type_name(&self) -> &str { &self.type_name }
    pub fn version(&self) -> &str { &self.version }
    pub fn doc(&self) -> &str { &self.doc }
    pub fn props(&self) -> &[PropertySpec] { &self.props }
    pub fn wildcard_prefixes(&self) -> &[String] { &self.wildcard_prefixes }

    pub fn prop(&self, name: &str) -> Option<&PropertySpec> {
        self.props.iter().find(|p| p.name == name)
    }

    pub fn has_prop(&self, name: &str) -> bool {
        self.prop(name).is_some()
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.prop(name).is_some_and(|p| p.required)
    }

    pub fn kind_of(&self, name: &str) -> Option<&PropKind> {
        self.prop(name).map(|p| &p.kind)
    }

    pub fn default_of(&self, name: &str) -> Option<&Value> {
        self.prop(name)?.default.as_ref()
    }

    /// Whether `name` is admitted by a wildcard prefix (`data-*`, `aria-*`).
    pub fn accepts_wildcard(&self, name: &str) -> bool {
        self.wildcard_prefixes
            .iter()
            .any(|prefix| name.len() > prefix.len() && name.starts_with(prefix.as_str()))
    }

    /// Whether `name` is addressable on instances of this widget.
    pub fn accepts(&self, name: &str) -> bool {
        self.has_prop(name) || self.accepts_wildcard(name)
    }
}

#[derive(Debug, Deserialize)]
struct WidgetMetadata {
    namespace: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    doc: String,
    #[serde(default)]
    props: Vec<PropertySpec>,
    #[serde(default)]
    wildcard_prefixes: Vec<String>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

// ── Builder ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct WidgetDefinitionBuilder {
    namespace: String,
    type_name: String,
    version: String,
    doc: String,
    props: Vec<PropertySpec>,
    wildcard_prefixes: Vec<String>,
}

impl WidgetDefinitionBuilder {
    pub fn version(mut self, v: impl Into<String>) -> Self {
        self.version = v.into();
        self
    }

    pub fn doc(mut self, d: impl Into<String>) -> Self {
        self.doc = d.into();
        self
    }

    pub fn prop(mut self, spec: PropertySpec) -> Self {
        self.props.push(spec);
        self
    }

    pub fn wildcard(mut self, prefix: impl Into<String>) -> Self {
        self.wildcard_prefixes.push(prefix.into());
        self
    }

    pub fn build(self) -> Result<WidgetDefinition, SchemaError> {
        if self.namespace.trim().is_empty() || self.type_name.trim().is_empty() {
            return Err(SchemaError::MissingIdentity);
        }
        check_fields(&self.type_name, None, &self.props)?;
        Ok(WidgetDefinition {
            namespace: self.namespace,
            type_name: self.type_name,
            version: self.version,
            doc: self.doc,
            props: self.props,
            wildcard_prefixes: self.wildcard_prefixes,
        })
    }
}

fn check_fields(widget: &str, path: Option<&str>, fields: &[PropertySpec]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(SchemaError::EmptyFieldName {
                widget: widget.to_string(),
                path: path.unwrap_or("<root>").to_string(),
            });
        }
        if !seen.insert(field.name.as_str()) {
            return Err(match path {
                None => SchemaError::DuplicateField {
                    widget: widget.to_string(),
                    field: field.name.clone(),
                },
                Some(path) => SchemaError::DuplicateNestedField {
                    widget: widget.to_string(),
                    path: path.to_string(),
                    field: field.name.clone(),
                },
            });
        }

        let full = match path {
            Some(p) => format!("{p}.{}", field.name),
            None => field.name.clone(),
        };

        if let Some(default) = &field.default {
            check_default(widget, &full, field, default)?;
        }
        if let Some(nested) = field.kind.nested() {
            check_fields(widget, Some(&full), nested)?;
        }
    }
    Ok(())
}

/// A default must have the declared type, and nested shape and list
/// defaults follow the nested schema the same way supplied values do.
fn check_default(widget: &str, field: &str, spec: &PropertySpec, default: &Value) -> Result<(), SchemaError> {
    if default.is_null() {
        return Ok(());
    }
    if !spec.kind.accepts(default) {
        return Err(SchemaError::InvalidDefault {
            widget: widget.to_string(),
            field: field.to_string(),
            expected: spec.kind.label(),
        });
    }
    validate_value(widget, spec, default).map_err(|source| SchemaError::DefaultOutsideSchema {
        widget: widget.to_string(),
        field: field.to_string(),
        source,
    })
}

fn spec_from_decl(widget: &str, decl: &PropDecl) -> Result<PropertySpec, SchemaError> {
    let kind = match decl.kind {
        KindDecl::String => PropKind::String,
        KindDecl::Number => PropKind::Number,
        KindDecl::Bool => PropKind::Bool,
        KindDecl::Dict => PropKind::Dict,
        KindDecl::Any => PropKind::Any,
        KindDecl::Shape(fields) => PropKind::Shape { fields: specs_from_decls(widget, fields)? },
        KindDecl::ListOf(fields) => PropKind::ListOf { fields: specs_from_decls(widget, fields)? },
    };
    let default = decl
        .default
        .map(|literal| {
            serde_json::from_str::<Value>(literal).map_err(|source| SchemaError::UnparsableDefault {
                widget: widget.to_string(),
                field: decl.name.to_string(),
                source,
            })
        })
        .transpose()?;
    Ok(PropertySpec {
        name: decl.name.to_string(),
        kind,
        required: decl.required,
        default,
        doc: decl.doc.to_string(),
    })
}

fn specs_from_decls(widget: &str, decls: &[PropDecl]) -> Result<Vec<PropertySpec>, SchemaError> {
    decls.iter().map(|d| spec_from_decl(widget, d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slide_fields() -> Vec<PropertySpec> {
        vec![
            PropertySpec::new("src", PropKind::String).required(),
            PropertySpec::new("alt", PropKind::String),
        ]
    }

    #[test]
    fn builds_and_answers_queries() {
        let def = WidgetDefinition::builder("test", "Slider")
            .prop(PropertySpec::new("loop", PropKind::Bool).default_value(json!(false)))
            .prop(PropertySpec::new("slides", PropKind::ListOf { fields: slide_fields() }).required())
            .wildcard("data-")
            .build()
            .unwrap();

        assert!(def.has_prop("loop"));
        assert!(!def.has_prop("speed"));
        assert!(def.is_required("slides"));
        assert!(!def.is_required("loop"));
        assert_eq!(def.kind_of("loop"), Some(&PropKind::Bool));
        assert_eq!(def.default_of("loop"), Some(&json!(false)));
        assert!(def.accepts_wildcard("data-role"));
        assert!(!def.accepts_wildcard("data-"));
        assert!(!def.accepts("aria-label"));
        let names: Vec<_> = def.props().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["loop", "slides"]);
    }

    #[test]
    fn duplicate_field_rejected() {
        let err = WidgetDefinition::builder("test", "W")
            .prop(PropertySpec::new("a", PropKind::String))
            .prop(PropertySpec::new("a", PropKind::Number))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { ref field, .. } if field == "a"));
    }

    #[test]
    fn duplicate_nested_field_rejected() {
        let nested = vec![
            PropertySpec::new("src", PropKind::String),
            PropertySpec::new("src", PropKind::String),
        ];
        let err = WidgetDefinition::builder("test", "W")
            .prop(PropertySpec::new("slides", PropKind::ListOf { fields: nested }))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateNestedField { ref path, .. } if path == "slides"));
    }

    #[test]
    fn malformed_nested_entry_rejected() {
        let nested = vec![PropertySpec::new("", PropKind::String)];
        let err = WidgetDefinition::builder("test", "W")
            .prop(PropertySpec::new("autoplay", PropKind::Shape { fields: nested }))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::EmptyFieldName { ref path, .. } if path == "autoplay"));
    }

    #[test]
    fn default_must_match_kind() {
        let err = WidgetDefinition::builder("test", "W")
            .prop(PropertySpec::new("speed", PropKind::Number).default_value(json!("fast")))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefault { expected: "number", .. }));

        let err = WidgetDefinition::builder("test", "W")
            .prop(
                PropertySpec::new("autoplay", PropKind::Shape { fields: vec![PropertySpec::new("delay", PropKind::Number)] })
                    .default_value(json!({ "delay": 1, "bogus": true })),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DefaultOutsideSchema { .. }));
    }

    #[test]
    fn nested_defaults_follow_nested_schema() {
        let slide = vec![PropertySpec::new("src", PropKind::String).required()];
        let err = WidgetDefinition::builder("test", "W")
            .prop(PropertySpec::new("slides", PropKind::ListOf { fields: slide }).default_value(json!([{ "bogus": 1 }])))
            .build()
            .unwrap_err();
        match err {
            SchemaError::DefaultOutsideSchema { field, source, .. } => {
                assert_eq!(field, "slides");
                assert_eq!(source.path(), "slides[0].bogus");
            }
            other => panic!("expected a schema violation, got {other:?}"),
        }

        let timing = vec![PropertySpec::new("delay", PropKind::Number)];
        let err = WidgetDefinition::builder("test", "W")
            .prop(PropertySpec::new("autoplay", PropKind::Shape { fields: timing }).default_value(json!({ "delay": "soon" })))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DefaultOutsideSchema { ref field, .. } if field == "autoplay"));
    }

    #[test]
    fn loads_from_metadata_json() {
        let def = WidgetDefinition::from_metadata_json(
            r#"{
                "namespace": "acme", "type": "Gallery", "version": "1.2.0",
                "wildcard_prefixes": ["data-"],
                "props": [
                    { "name": "images", "kind": "list_of", "required": true,
                      "fields": [ { "name": "src", "kind": "string", "required": true } ] },
                    { "name": "speed", "kind": "number", "default": 300 }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(def.namespace(), "acme");
        assert_eq!(def.type_name(), "Gallery");
        assert!(def.is_required("images"));
        assert_eq!(def.kind_of("images").and_then(|k| k.nested()).map(|f| f.len()), Some(1));
        assert_eq!(def.default_of("speed"), Some(&json!(300)));
    }

    #[test]
    fn metadata_duplicates_still_rejected() {
        let err = WidgetDefinition::from_metadata_json(
            r#"{ "namespace": "acme", "type": "G",
                 "props": [ { "name": "a", "kind": "any" }, { "name": "a", "kind": "dict" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn static_decl_with_bad_default_literal() {
        static PROPS: &[PropDecl] = &[PropDecl {
            name: "speed", kind: KindDecl::Number, required: false, default: Some("{oops"), doc: "",
        }];
        let decl = WidgetDecl {
            namespace: "t", name: "W", version: "1", doc: "", props: PROPS, wildcard_prefixes: &[],
        };
        assert!(matches!(
            WidgetDefinition::from_decl(&decl),
            Err(SchemaError::UnparsableDefault { .. })
        ));
    }
}
