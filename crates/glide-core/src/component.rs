//! Component instances: one configured occurrence of a widget.
//!
//! An instance keeps only the fields the caller supplied. Anything left out
//! is "unset" and is omitted from the serialized form, so the renderer
//! applies its documented default. A field supplied with the same value as
//! its default is kept: `loop: false` and "no `loop`" are different things.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{PropKind, PropertySpec, WidgetDefinition};

/// Caller-supplied field values, in the order they were written.
pub type Fields = Map<String, Value>;

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("`{widget}` has no field `{field}`")]
    UnknownField { widget: String, field: String },
    #[error("`{widget}` requires field `{field}`")]
    MissingRequiredField { widget: String, field: String },
    #[error("`{widget}`: `{field}` expects {expected}, got {found}")]
    TypeMismatch { widget: String, field: String, expected: &'static str, found: &'static str },
    #[error("in `{field}`: {source}")]
    InShape {
        field: String,
        #[source]
        source: Box<ValidationError>,
    },
    #[error("in `{field}[{index}]`: {source}")]
    InElement {
        field: String,
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
    #[error("identifier given twice: `{argument}` and field `id` = `{field}`")]
    ConflictingIdentifier { argument: String, field: String },
}

impl ValidationError {
    /// Dotted path to the offending field: `slides[2].src`.
    pub fn path(&self) -> String {
        match self {
            ValidationError::UnknownField { field, .. }
            | ValidationError::MissingRequiredField { field, .. }
            | ValidationError::TypeMismatch { field, .. } => field.clone(),
            ValidationError::InShape { field, source } => format!("{field}.{}", source.path()),
            ValidationError::InElement { field, index, source } => {
                format!("{field}[{index}].{}", source.path())
            }
            ValidationError::ConflictingIdentifier { .. } => "id".to_string(),
        }
    }

    /// The innermost error, with nesting stripped.
    pub fn leaf(&self) -> &ValidationError {
        match self {
            ValidationError::InShape { source, .. } | ValidationError::InElement { source, .. } => source.leaf(),
            other => other,
        }
    }
}

// ── Serialized form ───────────────────────────────────────────────────────

/// What the client renderer receives for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedComponent {
    pub namespace: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub props: Fields,
}

// ── ComponentInstance ─────────────────────────────────────────────────────

/// A validated, immutable widget configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInstance {
    definition: Arc<WidgetDefinition>,
    /// Supplied fields in schema order, wildcard attributes last.
    fields: Fields,
    id: Option<String>,
}

impl ComponentInstance {
    /// Validate `supplied` against `definition` and build an instance.
    ///
    /// The identifier may be passed as `id` or as an `id` field; if both are
    /// given they must agree.
    pub fn create(
        definition: Arc<WidgetDefinition>,
        mut supplied: Fields,
        id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let widget = definition.type_name().to_string();

        let field_id = match supplied.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        let id = match (id, field_id) {
            (Some(arg), Some(field)) if arg != field => {
                return Err(ValidationError::ConflictingIdentifier { argument: arg, field });
            }
            (Some(arg), _) => {
                // An explicit `null` field would leave two identifiers in the output.
                if definition.has_prop("id") && supplied.get("id").is_none_or(Value::is_null) {
                    supplied.insert("id".to_string(), Value::String(arg.clone()));
                }
                Some(arg)
            }
            (None, field) => field,
        };

        validate_fields(&widget, definition.props(), definition.wildcard_prefixes(), &supplied)?;

        let mut fields = Fields::new();
        for spec in definition.props() {
            if let Some(value) = supplied.shift_remove(&spec.name) {
                fields.insert(spec.name.clone(), value);
            }
        }
        // Whatever is left passed the wildcard check.
        fields.extend(supplied);

        Ok(Self { definition, fields, id })
    }

    pub fn definition(&self) -> &Arc<WidgetDefinition> {
        &self.definition
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// The explicitly supplied value, or `None` if the field is unset.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Supplied value, falling back to the documented default. For tooling;
    /// the serialized form never contains defaults.
    pub fn effective(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).or_else(|| self.definition.default_of(name))
    }

    /// Check a runtime value for one of this component's attributes, with
    /// the same rules construction applies.
    pub fn validate_update(&self, name: &str, value: &Value) -> Result<(), ValidationError> {
        let widget = self.definition.type_name();
        match self.definition.prop(name) {
            Some(spec) => validate_value(widget, spec, value),
            None if self.definition.accepts_wildcard(name) => Ok(()),
            None => Err(ValidationError::UnknownField { widget: widget.to_string(), field: name.to_string() }),
        }
    }

    pub fn serialize(&self) -> SerializedComponent {
        SerializedComponent {
            namespace: self.definition.namespace().to_string(),
            type_name: self.definition.type_name().to_string(),
            id: self.id.clone(),
            props: self.fields.clone(),
        }
    }
}

// ── Validation ────────────────────────────────────────────────────────────

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Unknown fields first (in supplied order), then types, then required
/// fields (in schema order).
fn validate_fields(
    widget: &str,
    specs: &[PropertySpec],
    wildcard_prefixes: &[String],
    supplied: &Fields,
) -> Result<(), ValidationError> {
    for key in supplied.keys() {
        let known = specs.iter().any(|s| &s.name == key);
        let wildcard = wildcard_prefixes
            .iter()
            .any(|p| key.len() > p.len() && key.starts_with(p.as_str()));
        if !known && !wildcard {
            return Err(ValidationError::UnknownField { widget: widget.to_string(), field: key.clone() });
        }
    }

    for (key, value) in supplied {
        let Some(spec) = specs.iter().find(|s| &s.name == key) else {
            continue; // wildcard attribute
        };
        validate_value(widget, spec, value)?;
    }

    for spec in specs.iter().filter(|s| s.required) {
        if !supplied.contains_key(&spec.name) {
            return Err(ValidationError::MissingRequiredField {
                widget: widget.to_string(),
                field: spec.name.clone(),
            });
        }
    }

    Ok(())
}

pub(crate) fn validate_value(widget: &str, spec: &PropertySpec, value: &Value) -> Result<(), ValidationError> {
    if value.is_null() {
        return if spec.required {
            Err(ValidationError::MissingRequiredField { widget: widget.to_string(), field: spec.name.clone() })
        } else {
            Ok(())
        };
    }
    if !spec.kind.accepts(value) {
        return Err(ValidationError::TypeMismatch {
            widget: widget.to_string(),
            field: spec.name.clone(),
            expected: spec.kind.label(),
            found: json_type(value),
        });
    }

    match (&spec.kind, value) {
        (PropKind::Shape { fields }, Value::Object(map)) => {
            validate_fields(widget, fields, &[], map).map_err(|e| ValidationError::InShape {
                field: spec.name.clone(),
                source: Box::new(e),
            })
        }
        (PropKind::ListOf { fields }, Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                let Value::Object(map) = item else {
                    return Err(ValidationError::TypeMismatch {
                        widget: widget.to_string(),
                        field: format!("{}[{index}]", spec.name),
                        expected: "dict",
                        found: json_type(item),
                    });
                };
                validate_fields(widget, fields, &[], map).map_err(|e| ValidationError::InElement {
                    field: spec.name.clone(),
                    index,
                    source: Box::new(e),
                })?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
