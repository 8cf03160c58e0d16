//! LSP backend: document store, diagnostics, hover, and completion.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glide_core::assets::AssetResolver;
use glide_core::builtin::{SHADERS, is_known_shader};
use glide_core::component::{ComponentInstance, Fields};
use glide_core::markup::to_json;
use glide_core::schema::{PropKind, PropertySpec};
use glide_markup::ast::{Document, Node, Value as MarkupValue};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::analysis::{Context, completion_context, is_key, scope_at, word_at};
use crate::knowledge::{Knowledge, attribute_doc, element_by_name, elements};

const SOURCE: &str = "glide-lsp";

// ── Backend ───────────────────────────────────────────────────────────────

pub struct Backend {
    client: Client,
    knowledge: Arc<Knowledge>,
    docs: Arc<RwLock<HashMap<Url, String>>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            knowledge: Arc::new(Knowledge::new()),
            docs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn update(&self, uri: Url, text: String) {
        let diagnostics = diagnostics(&text, &self.knowledge);
        self.client.publish_diagnostics(uri.clone(), diagnostics, None).await;
        self.docs.write().await.insert(uri, text);
    }
}

// ── LanguageServer impl ───────────────────────────────────────────────────

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _params: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![" ".to_string(), ":".to_string(), "\n".to_string(), "{".to_string()]),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: SOURCE.to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        let widgets = self.knowledge.widgets().count();
        self.client
            .log_message(MessageType::INFO, format!("{SOURCE} ready ({widgets} widgets)"))
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    // ── Document lifecycle ────────────────────────────────────────────────

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.update(params.text_document.uri, params.text_document.text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // FULL sync: the last change holds the whole text.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.update(params.text_document.uri, change.text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.docs.write().await.remove(&params.text_document.uri);
    }

    // ── Hover ─────────────────────────────────────────────────────────────

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let pos = &params.text_document_position_params.position;

        let docs = self.docs.read().await;
        let Some(text) = docs.get(uri) else { return Ok(None) };
        Ok(hover_at(text, pos, &self.knowledge).map(markdown_hover))
    }

    // ── Completion ────────────────────────────────────────────────────────

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let pos = &params.text_document_position.position;

        let docs = self.docs.read().await;
        let Some(text) = docs.get(uri) else { return Ok(None) };

        let k = &self.knowledge;
        let items = match completion_context(text, pos) {
            Context::Widget => widget_items(k),
            Context::Property { widget, path } => property_items(k, &widget, &path),
            Context::Value { widget, path, prop } => value_items(k, &widget, &path, &prop),
            Context::Unknown => vec![],
        };
        Ok(Some(CompletionResponse::Array(items)))
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────

fn diagnostics(text: &str, k: &Knowledge) -> Vec<Diagnostic> {
    let doc = match glide_markup::parser::parse_str(text) {
        Ok(doc) => doc,
        Err(e) => {
            // ParseError line/col are 1-based; LSP Position is 0-based.
            let line = e.line.saturating_sub(1) as u32;
            let col = e.col.saturating_sub(1) as u32;
            return vec![Diagnostic {
                range: Range { start: Position::new(line, col), end: Position::new(line, col + 1) },
                severity: Some(DiagnosticSeverity::ERROR),
                source: Some(SOURCE.to_string()),
                message: e.message,
                ..Default::default()
            }];
        }
    };
    schema_diagnostics(text, &doc, k)
}

/// Every schema problem in the tree, not just the first.
fn schema_diagnostics(text: &str, doc: &Document, k: &Knowledge) -> Vec<Diagnostic> {
    let aliases: HashSet<&str> = doc.imports.iter().map(|i| i.alias.as_str()).collect();
    let assets = AssetResolver::default();
    let mut ids: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();

    for node in doc.root.walk() {
        if let Some(id) = node.prop_str("id")
            && !ids.insert(id)
        {
            out.push(error(text, prop_line(node, "id"), format!("identifier `{id}` is already used")));
        }

        if let Some(element) = element_by_name(&node.widget) {
            for prop in &node.props {
                if prop.key != "id" && !element.attributes.contains(&prop.key.as_str()) {
                    out.push(error(text, prop.line, format!("`{}` has no attribute `{}`", node.widget, prop.key)));
                }
            }
            let leaf = element.attributes.contains(&"text");
            if leaf && !node.children.is_empty() {
                out.push(error(text, node.line, format!("`{}` cannot have children", node.widget)));
            }
            if !leaf && node.content.is_some() {
                out.push(error(text, node.line, format!("`{}` takes children, not inline text", node.widget)));
            }
            continue;
        }
        if aliases.contains(node.widget.as_str()) {
            continue;
        }

        let definition = match k.registry().resolve(&node.widget) {
            Ok(def) => def,
            Err(e) => {
                out.push(error(text, node.line, e.to_string()));
                continue;
            }
        };
        if !node.children.is_empty() || node.content.is_some() {
            out.push(error(text, node.line, format!("widget `{}` takes properties only", node.widget)));
        }
        let mut fields = Fields::new();
        let mut convertible = true;
        for prop in &node.props {
            match to_json(&prop.value, &assets) {
                Ok(value) => {
                    fields.insert(prop.key.clone(), value);
                }
                Err(e) => {
                    out.push(error(text, prop.line, format!("`{}`: {e}", prop.key)));
                    convertible = false;
                }
            }
        }
        if convertible
            && let Err(e) = ComponentInstance::create(definition.clone(), fields, None)
        {
            let path = e.path();
            let field = path.split(['.', '[']).next().unwrap_or_default();
            out.push(error(text, prop_line(node, field), e.to_string()));
        }
        if let Some(value) = node.prop("shader") {
            out.extend(shader_warnings(text, prop_line(node, "shader"), value));
        }
    }
    out
}

fn shader_warnings(text: &str, line: usize, value: &MarkupValue) -> Vec<Diagnostic> {
    let names: Vec<&str> = match value {
        MarkupValue::Str(s) | MarkupValue::Ident(s) => vec![s.as_str()],
        MarkupValue::List(items) => items
            .iter()
            .filter_map(|v| match v {
                MarkupValue::Str(s) | MarkupValue::Ident(s) => Some(s.as_str()),
                _ => None,
            })
            .collect(),
        _ => vec![],
    };
    names
        .into_iter()
        .filter(|n| !is_known_shader(n))
        .map(|n| Diagnostic {
            severity: Some(DiagnosticSeverity::WARNING),
            ..error(text, line, format!("`{n}` is not a shader the bundled renderer ships"))
        })
        .collect()
}

fn prop_line(node: &Node, key: &str) -> usize {
    node.props.iter().find(|p| p.key == key).map(|p| p.line).unwrap_or(node.line)
}

/// Error spanning the whole of 1-based `line`.
fn error(text: &str, line: usize, message: String) -> Diagnostic {
    let idx = line.saturating_sub(1);
    let len = text.lines().nth(idx).map(|l| l.len()).unwrap_or(0);
    Diagnostic {
        range: Range { start: Position::new(idx as u32, 0), end: Position::new(idx as u32, len as u32) },
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some(SOURCE.to_string()),
        message,
        ..Default::default()
    }
}

// ── Hover ─────────────────────────────────────────────────────────────────

fn hover_at(text: &str, pos: &Position, k: &Knowledge) -> Option<String> {
    let (word, start) = word_at(text, pos)?;

    if let Some(def) = k.widget(word) {
        return Some(format!("**{}** · `{}` v{}\n\n{}", def.type_name(), def.namespace(), def.version(), def.doc()));
    }
    if let Some(element) = element_by_name(word) {
        return Some(format!("**{}**\n\n{}\n\nAttributes: `id`, {}", element.name, element.doc, code_list(element.attributes)));
    }

    if is_key(text, pos.line, start as usize + word.len()) {
        let (widget, path) = scope_at(text, &Position::new(pos.line, start))?;
        if element_by_name(&widget).is_some() {
            let doc = attribute_doc(word);
            return (!doc.is_empty()).then(|| format!("**{word}**\n\n{doc}"));
        }
        return k.field(&widget, &path, word).map(prop_doc);
    }

    is_known_shader(word).then(|| format!("**{word}** · transition shader"))
}

fn prop_doc(p: &PropertySpec) -> String {
    let mut md = format!("**{}** · {}", p.name, p.kind.label());
    if p.required {
        md.push_str(" · required");
    }
    if let Some(default) = &p.default {
        md.push_str(&format!("\n\nDefault: `{default}`"));
    }
    md.push_str("\n\n");
    md.push_str(&p.doc);
    if let Some(fields) = p.kind.nested() {
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        md.push_str(&format!("\n\nFields: {}", code_list(&names)));
    }
    if p.name == "shader" {
        md.push_str(&format!("\n\nShaders: {}", code_list(SHADERS)));
    }
    md
}

fn code_list(names: &[&str]) -> String {
    names.iter().map(|n| format!("`{n}`")).collect::<Vec<_>>().join(", ")
}

// ── Completion item builders ──────────────────────────────────────────────

fn widget_items(k: &Knowledge) -> Vec<CompletionItem> {
    let widgets = k.widgets().map(|w| {
        let detail = w.doc().lines().next().unwrap_or("").to_string();
        snippet(w.type_name(), detail, CompletionItemKind::CLASS, format!("{} {{\n\t$0\n}}", w.type_name()))
    });
    let elements = elements().map(|e| {
        let body = if e.attributes.contains(&"text") {
            format!("{} \"$1\"", e.name)
        } else {
            format!("{} {{\n\t$0\n}}", e.name)
        };
        snippet(e.name, e.doc.to_string(), CompletionItemKind::STRUCT, body)
    });
    widgets.chain(elements).collect()
}

fn property_items(k: &Knowledge, widget: &str, path: &[String]) -> Vec<CompletionItem> {
    if let Some(element) = element_by_name(widget) {
        return std::iter::once("id")
            .chain(element.attributes.iter().copied())
            .map(|a| snippet(a, attribute_doc(a).to_string(), CompletionItemKind::PROPERTY, format!("{a}: $0")))
            .collect();
    }
    let Some(fields) = k.fields_at(widget, path) else { return vec![] };
    fields
        .iter()
        .map(|p| {
            let mut detail = p.kind.label().to_string();
            if p.required {
                detail.push_str(", required");
            }
            let mut item = snippet(&p.name, detail, CompletionItemKind::PROPERTY, format!("{}: $0", quote_key(&p.name)));
            item.documentation = Some(Documentation::String(p.doc.clone()));
            item
        })
        .collect()
}

fn value_items(k: &Knowledge, widget: &str, path: &[String], prop: &str) -> Vec<CompletionItem> {
    let Some(spec) = k.field(widget, path, prop) else { return vec![] };

    if spec.name == "shader" {
        return SHADERS
            .iter()
            .map(|s| {
                let mut item = CompletionItem::new_simple(s.to_string(), "transition shader".to_string());
                item.kind = Some(CompletionItemKind::ENUM_MEMBER);
                item.insert_text = Some(format!("\"{s}\""));
                item
            })
            .collect();
    }

    let mut items = match &spec.kind {
        PropKind::Bool => vec![value_item("true"), value_item("false")],
        PropKind::Shape { .. } => {
            vec![snippet("{ }", "object".into(), CompletionItemKind::STRUCT, "{\n\t$0\n}".into())]
        }
        PropKind::ListOf { .. } => {
            vec![snippet("[ { } ]", "list of objects".into(), CompletionItemKind::STRUCT, "[\n\t{ $0 }\n]".into())]
        }
        _ => vec![],
    };
    if let Some(default) = &spec.default
        && !matches!(spec.kind, PropKind::Bool)
    {
        let mut item = value_item(&default.to_string());
        item.detail = Some("default".to_string());
        items.push(item);
    }
    items
}

fn snippet(label: &str, detail: String, kind: CompletionItemKind, body: String) -> CompletionItem {
    let mut item = CompletionItem::new_simple(label.to_string(), detail);
    item.kind = Some(kind);
    item.insert_text = Some(body);
    item.insert_text_format = Some(InsertTextFormat::SNIPPET);
    item
}

fn value_item(label: &str) -> CompletionItem {
    let mut item = CompletionItem::new_simple(label.to_string(), String::new());
    item.kind = Some(CompletionItemKind::VALUE);
    item
}

/// Keys that are not plain identifiers (none today, but wildcard-style
/// names may contain characters the lexer rejects) are quoted.
fn quote_key(name: &str) -> String {
    if name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}

fn markdown_hover(md: String) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent { kind: MarkupKind::Markdown, value: md }),
        range: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diags(src: &str) -> Vec<Diagnostic> {
        diagnostics(src, &Knowledge::new())
    }

    #[test]
    fn parse_error_is_positioned() {
        let d = diags("Div {\n  P \"x\" {\n");
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].severity, Some(DiagnosticSeverity::ERROR));
    }

    #[test]
    fn schema_errors_point_at_the_field() {
        let src = "Div {\n  DashSwiper {\n    id: \"s\"\n    slides: [ { alt: \"x\" } ]\n  }\n}";
        let d = diags(src);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].range.start.line, 3);
        assert!(d[0].message.contains("src"));
    }

    #[test]
    fn every_problem_is_reported() {
        let src = "Div {\n  Nope { }\n  P { id: \"a\" colour: \"red\" }\n  Span { id: \"a\" }\n}";
        let messages: Vec<String> = diags(src).into_iter().map(|d| d.message).collect();
        assert_eq!(messages.len(), 3, "{messages:?}");
    }

    #[test]
    fn unknown_shader_is_only_a_warning() {
        let d = diags("DashSwiper { shader: [\"ripple\" \"sparkles\"] }");
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].severity, Some(DiagnosticSeverity::WARNING));
    }

    #[test]
    fn imported_aliases_are_not_checked() {
        assert!(diags("import \"hero.glide\" as Hero\nDiv { Hero { anything: 1 } }").is_empty());
    }

    #[test]
    fn hover_on_nested_field() {
        let k = Knowledge::new();
        let src = "DashSwiper {\n  autoplay: {\n    delay: 100\n  }\n}";
        let md = hover_at(src, &Position::new(2, 6), &k).unwrap();
        assert!(md.starts_with("**delay** · number"));

        let md = hover_at(src, &Position::new(1, 4), &k).unwrap();
        assert!(md.contains("Default:"));
        assert!(hover_at(src, &Position::new(0, 3), &k).unwrap().contains("dash_swiper"));
    }

    #[test]
    fn completions() {
        let k = Knowledge::new();
        let shaders = value_items(&k, "DashSwiper", &[], "shader");
        assert_eq!(shaders.len(), SHADERS.len());
        let bools: Vec<String> = value_items(&k, "DashSwiper", &[], "loop").into_iter().map(|i| i.label).collect();
        assert_eq!(bools, ["true", "false"]);
        let nested: Vec<String> = property_items(&k, "DashSwiper", &["slides".to_string()])
            .into_iter()
            .map(|i| i.label)
            .collect();
        assert_eq!(nested, ["alt", "link", "src", "title"]);
        assert!(widget_items(&k).iter().any(|i| i.label == "DashCarousel"));
    }
}
