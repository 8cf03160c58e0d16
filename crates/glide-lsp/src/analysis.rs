//! Cursor analysis for completion and hover.
//!
//! Files are usually incomplete at the cursor, so instead of the parser we
//! run a forgiving forward scan over the text before the cursor, tracking
//! which widget block and which nested property objects are still open.

use tower_lsp::lsp_types::Position;

// ── Context kind ──────────────────────────────────────────────────────────

/// What the cursor is positioned inside, used to drive completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// A widget or element name is expected.
    Widget,
    /// A property key is expected. `path` names the enclosing shape or list
    /// fields, outermost first (empty for the widget's own properties).
    Property { widget: String, path: Vec<String> },
    /// A value for `prop` is expected.
    Value { widget: String, path: Vec<String>, prop: String },
    /// Inside a comment or inline content.
    Unknown,
}

// ── Scanner ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Frame {
    /// `Name { ... }` block.
    Widget(String),
    /// Object or list opened as the value of `key`.
    Field { key: String, list: bool },
    /// Object or list nested without a key (a list element).
    Element { list: bool },
}

#[derive(Debug, Default)]
struct Scan {
    stack: Vec<Frame>,
    /// Key whose value has not been seen yet.
    pending_key: Option<String>,
    /// Last complete identifier or string, a key candidate.
    last_token: Option<String>,
    /// Last identifier, a widget-name candidate.
    last_ident: Option<String>,
    /// Identifier being typed at the end of the text.
    partial: String,
    in_string: bool,
    in_comment: bool,
}

impl Scan {
    fn run(text: &str) -> Self {
        let mut s = Scan::default();
        let mut chars = text.chars().peekable();
        let mut string = String::new();

        while let Some(c) = chars.next() {
            if s.in_comment {
                if c == '\n' {
                    s.in_comment = false;
                }
                continue;
            }
            if s.in_string {
                match c {
                    '\\' => {
                        chars.next();
                    }
                    '"' => {
                        s.in_string = false;
                        s.finish_token(std::mem::take(&mut string), false);
                    }
                    _ => string.push(c),
                }
                continue;
            }
            if is_ident_char(c) && (!s.partial.is_empty() || (!c.is_ascii_digit() && c != '-')) {
                s.partial.push(c);
                continue;
            }
            s.end_word();
            match c {
                '/' if chars.peek() == Some(&'/') => s.in_comment = true,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    let mut prev = ' ';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        prev = c;
                    }
                }
                '"' => s.in_string = true,
                ':' => s.pending_key = s.last_token.take(),
                '{' => s.open(false),
                '[' => s.open(true),
                '}' | ']' => {
                    s.stack.pop();
                    s.pending_key = None;
                }
                c if c.is_ascii_digit() || c == '-' => {
                    s.pending_key = None;
                    while chars.next_if(|n| n.is_ascii_alphanumeric() || *n == '.').is_some() {}
                }
                _ => {}
            }
        }
        s
    }

    fn end_word(&mut self) {
        if !self.partial.is_empty() {
            let word = std::mem::take(&mut self.partial);
            self.finish_token(word, true);
        }
    }

    fn finish_token(&mut self, token: String, ident: bool) {
        if self.pending_key.take().is_some() {
            return; // a scalar value
        }
        if ident {
            self.last_ident = Some(token.clone());
        }
        self.last_token = Some(token);
    }

    fn open(&mut self, list: bool) {
        let frame = match (self.pending_key.take(), self.stack.last()) {
            (Some(key), _) => Frame::Field { key, list },
            (None, Some(Frame::Field { list: true, .. } | Frame::Element { list: true })) => Frame::Element { list },
            (None, _) if !list => Frame::Widget(self.last_ident.take().unwrap_or_default()),
            (None, _) => Frame::Element { list },
        };
        self.last_token = None;
        self.stack.push(frame);
    }

    /// Innermost widget and the field keys opened inside it.
    fn scope(&self) -> Option<(String, Vec<String>)> {
        let at = self.stack.iter().rposition(|f| matches!(f, Frame::Widget(_)))?;
        let Frame::Widget(name) = &self.stack[at] else { return None };
        let path = self.stack[at + 1..]
            .iter()
            .filter_map(|f| match f {
                Frame::Field { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect();
        Some((name.clone(), path))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

// ── Public helpers ────────────────────────────────────────────────────────

/// Classify the cursor position for completion.
pub fn completion_context(text: &str, pos: &Position) -> Context {
    let scan = Scan::run(&text_before(text, pos));
    if scan.in_comment {
        return Context::Unknown;
    }
    let scope = scan.scope();

    if let Some(prop) = &scan.pending_key {
        let (widget, path) = scope.unwrap_or_default();
        return Context::Value { widget, path, prop: prop.clone() };
    }
    if scan.in_string {
        return Context::Unknown;
    }

    match scan.stack.last() {
        None => Context::Widget,
        Some(Frame::Widget(_)) => {
            if scan.partial.chars().next().is_some_and(char::is_uppercase) {
                Context::Widget
            } else {
                let (widget, path) = scope.unwrap_or_default();
                Context::Property { widget, path }
            }
        }
        Some(Frame::Field { list: true, .. } | Frame::Element { list: true }) => {
            let (widget, mut path) = scope.unwrap_or_default();
            match path.pop() {
                Some(prop) => Context::Value { widget, path, prop },
                None => Context::Unknown,
            }
        }
        Some(Frame::Field { list: false, .. } | Frame::Element { list: false }) => {
            let (widget, path) = scope.unwrap_or_default();
            Context::Property { widget, path }
        }
    }
}

/// Widget and field path enclosing the cursor, if inside a widget block.
pub fn scope_at(text: &str, pos: &Position) -> Option<(String, Vec<String>)> {
    Scan::run(&text_before(text, pos)).scope()
}

/// The identifier (letters, digits, `_`, `-`) containing the cursor.
pub fn word_at<'t>(text: &'t str, pos: &Position) -> Option<(&'t str, u32)> {
    let line = text.lines().nth(pos.line as usize)?;
    let col = (pos.character as usize).min(line.len());
    if !line.is_char_boundary(col) {
        return None;
    }

    let start = line[..col]
        .char_indices()
        .rev()
        .find(|&(_, c)| !is_ident_char(c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let end = col + line[col..].find(|c: char| !is_ident_char(c)).unwrap_or(line.len() - col);

    (start < end).then(|| (&line[start..end], start as u32))
}

/// Whether the word ending at `end` on its line is followed by `:`.
pub fn is_key(text: &str, line: u32, end: usize) -> bool {
    text.lines()
        .nth(line as usize)
        .and_then(|l| l.get(end..))
        .is_some_and(|rest| rest.trim_start().starts_with(':'))
}

/// Source text from the start of the file up to `pos`.
pub fn text_before(text: &str, pos: &Position) -> String {
    let line_idx = pos.line as usize;
    let col = pos.character as usize;
    let mut out = String::new();
    for (i, line) in text.lines().enumerate() {
        if i < line_idx {
            out.push_str(line);
            out.push('\n');
        } else {
            let mut end = col.min(line.len());
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            out.push_str(&line[..end]);
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Context at the `|` marker.
    fn ctx(src: &str) -> Context {
        let idx = src.find('|').unwrap();
        let before = &src[..idx];
        let line = before.matches('\n').count() as u32;
        let col = before.len() - before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        completion_context(&src.replace('|', ""), &Position::new(line, col as u32))
    }

    fn path(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn top_level_and_children() {
        assert_eq!(ctx("|"), Context::Widget);
        assert_eq!(ctx("Div {\n  Da|"), Context::Widget);
        assert_eq!(
            ctx("Div {\n  DashSwiper {\n    lo|"),
            Context::Property { widget: "DashSwiper".into(), path: vec![] }
        );
    }

    #[test]
    fn values() {
        assert_eq!(
            ctx("DashSwiper {\n  loop: |"),
            Context::Value { widget: "DashSwiper".into(), path: vec![], prop: "loop".into() }
        );
        assert_eq!(
            ctx("DashSwiper {\n  loop: true\n  |"),
            Context::Property { widget: "DashSwiper".into(), path: vec![] }
        );
        assert_eq!(
            ctx("DashSwiper {\n  shader: [\"wind\" |"),
            Context::Value { widget: "DashSwiper".into(), path: vec![], prop: "shader".into() }
        );
    }

    #[test]
    fn nested_objects_are_not_widgets() {
        assert_eq!(
            ctx("DashSwiper {\n  autoplay: {\n    de|"),
            Context::Property { widget: "DashSwiper".into(), path: path(&["autoplay"]) }
        );
        assert_eq!(
            ctx("DashSwiper {\n  slides: [\n    { src: @\"images/01.jpg\" |"),
            Context::Property { widget: "DashSwiper".into(), path: path(&["slides"]) }
        );
        assert_eq!(
            ctx("DashSwiper {\n  autoplay: { delay: 10 }\n  |"),
            Context::Property { widget: "DashSwiper".into(), path: vec![] }
        );
    }

    #[test]
    fn inline_content_does_not_hide_widget_name() {
        assert_eq!(ctx("P \"Slide 1\" {\n  |"), Context::Property { widget: "P".into(), path: vec![] });
    }

    #[test]
    fn comments() {
        assert_eq!(ctx("Div { // Dash|"), Context::Unknown);
        assert_eq!(
            ctx("Div { /* { */\n  |"),
            Context::Property { widget: "Div".into(), path: vec![] }
        );
    }

    #[test]
    fn word_with_dashes() {
        let text = "shader: \"page-curl\"";
        assert_eq!(word_at(text, &Position::new(0, 12)), Some(("page-curl", 9)));
        assert!(is_key("loop: true", 0, 4));
        assert!(!is_key("loop true", 0, 4));
    }
}
