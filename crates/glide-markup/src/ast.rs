// ── Value ─────────────────────────────────────────────────────────────────

/// A literal value in a property.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Quoted string: `"hello"`
    Str(String),
    /// Numeric literal: `1000`, `0.33`, `-4`
    Number(f64),
    /// `true` / `false`
    Bool(bool),
    /// `null`: an explicit empty value, distinct from leaving the key out.
    Null,
    /// Asset reference `@"images/01.jpg"`, kept as the logical name.
    Asset(String),
    /// Unquoted identifier, treated as a string by the builder.
    Ident(String),
    /// `[ value, value ]` (commas optional)
    List(Vec<Value>),
    /// `{ key: value ... }` in value position. Key order is preserved.
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Short name of the value's shape, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) | Value::Ident(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Asset(_) => "asset",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }
}

// ── Prop ──────────────────────────────────────────────────────────────────

/// A single `key: value` property inside a widget block.
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub key: String,
    pub value: Value,
    /// 1-based line of the key.
    pub line: usize,
}

// ── Node ──────────────────────────────────────────────────────────────────

/// A widget or element instantiation in the layout tree.
///
/// ```glide
/// DashSwiper {
///     id: "hero"
///     loop: true
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Widget type, element tag or component alias: `"DashSwiper"`, `"Div"`, `"Hero"`.
    pub widget: String,
    /// Optional inline string content (the text of a `P "..."` leaf).
    pub content: Option<String>,
    pub props: Vec<Prop>,
    pub children: Vec<Node>,
    /// 1-based position of the widget name.
    pub line: usize,
    pub col: usize,
}

impl Node {
    /// Look up a property value by key.
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.iter().find(|p| p.key == key).map(|p| &p.value)
    }

    /// Get a property as `&str` if it is a `Str` or `Ident`.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        match self.prop(key)? {
            Value::Str(s) | Value::Ident(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Pre-order walk over this node and all of its descendants.
    pub fn walk(&self) -> Vec<&Node> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

// ── Import ────────────────────────────────────────────────────────────────

/// `import "path/to/file.glide" as Alias`
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: String,
    pub alias: String,
}

// ── Document ──────────────────────────────────────────────────────────────

/// The top-level parse result for a `.glide` source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub imports: Vec<Import>,
    pub root: Node,
}
