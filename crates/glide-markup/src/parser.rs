use crate::ast::{Document, Import, Node, Prop, Value};
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenWithPos};

// ── Parser ────────────────────────────────────────────────────────────────

pub struct Parser {
    tokens: Vec<TokenWithPos>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<TokenWithPos>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current_pos(&self) -> (usize, usize) {
        self.tokens
            .get(self.pos)
            .map(|t| (t.line, t.col))
            .or_else(|| self.tokens.last().map(|t| (t.line, t.col)))
            .unwrap_or((1, 1))
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    fn peek_ahead(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos)
            .map(|t| t.token.clone())
            .unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        let (line, col) = self.current_pos();
        ParseError::new(msg, line, col)
    }

    /// Error positioned at the token that was just consumed.
    fn err_prev(&self, msg: impl Into<String>) -> ParseError {
        let (line, col) = self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| (t.line, t.col))
            .unwrap_or((1, 1));
        ParseError::new(msg, line, col)
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Token::Ident(s) => Ok(s),
            tok => Err(self.err_prev(format!("expected identifier, got {:?}", tok))),
        }
    }

    fn expect_str(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Token::Str(s) => Ok(s),
            tok => Err(self.err_prev(format!("expected string, got {:?}", tok))),
        }
    }

    fn expect_token(&mut self, expected: &Token) -> Result<(), ParseError> {
        let got = self.advance();
        if &got == expected {
            Ok(())
        } else {
            Err(self.err_prev(format!("expected {:?}, got {:?}", expected, got)))
        }
    }

    // ── Document ──────────────────────────────────────────────────────────

    pub fn parse_document(&mut self) -> Result<Document, ParseError> {
        let mut imports = Vec::new();
        while self.peek() == &Token::Import {
            imports.push(self.parse_import()?);
        }

        let root = self.parse_node()?;

        if self.peek() != &Token::Eof {
            return Err(self.err("a document has exactly one root node"));
        }

        Ok(Document { imports, root })
    }

    fn parse_import(&mut self) -> Result<Import, ParseError> {
        self.advance(); // `import`
        let path = self.expect_str()?;
        self.expect_token(&Token::As)?;
        let alias = self.expect_ident()?;
        Ok(Import { path, alias })
    }

    // ── Node ──────────────────────────────────────────────────────────────

    fn parse_node(&mut self) -> Result<Node, ParseError> {
        let (line, col) = self.current_pos();
        let widget = self.expect_ident()?;

        // Optional inline string content: `P "Hello"`
        let content = match self.peek() {
            Token::Str(_) => match self.advance() {
                Token::Str(s) => Some(s),
                _ => None,
            },
            _ => None,
        };

        let (props, children) = if self.peek() == &Token::LBrace {
            self.parse_block()?
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Node { widget, content, props, children, line, col })
    }

    /// Parse `{ item* }` where each item is a `key: value` property or a
    /// child node. A key is an identifier or string followed by `:`;
    /// anything else starting with an identifier is a child node.
    fn parse_block(&mut self) -> Result<(Vec<Prop>, Vec<Node>), ParseError> {
        self.advance(); // `{`
        let mut props = Vec::new();
        let mut children = Vec::new();

        loop {
            match self.peek() {
                Token::RBrace => { self.advance(); break; }
                Token::Eof    => return Err(self.err("unclosed '{' block")),
                Token::Ident(_) | Token::Str(_) if self.peek_ahead(1) == &Token::Colon => {
                    props.push(self.parse_prop()?);
                }
                Token::Ident(_) => children.push(self.parse_node()?),
                tok => {
                    return Err(self.err(format!(
                        "unexpected {:?} inside block: expected a property (key: value) or a widget name",
                        tok
                    )));
                }
            }
        }

        Ok((props, children))
    }

    // ── Prop ──────────────────────────────────────────────────────────────

    fn parse_key(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Token::Ident(s) | Token::Str(s) => Ok(s),
            tok => Err(self.err_prev(format!("expected a key, got {:?}", tok))),
        }
    }

    fn parse_prop(&mut self) -> Result<Prop, ParseError> {
        let (line, _) = self.current_pos();
        let key = self.parse_key()?;
        self.expect_token(&Token::Colon)?;
        let value = self.parse_value()?;
        Ok(Prop { key, value, line })
    }

    // ── Value ─────────────────────────────────────────────────────────────

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.advance() {
            Token::Str(s)    => Ok(Value::Str(s)),
            Token::Number(n) => Ok(Value::Number(n)),
            Token::True      => Ok(Value::Bool(true)),
            Token::False     => Ok(Value::Bool(false)),
            Token::Null      => Ok(Value::Null),
            Token::Asset(p)  => Ok(Value::Asset(p)),
            Token::Ident(s)  => Ok(Value::Ident(s)),
            Token::LBracket  => self.parse_list(),
            Token::LBrace    => self.parse_object(),
            tok => Err(self.err_prev(format!("expected a value, got {:?}", tok))),
        }
    }

    fn parse_list(&mut self) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Token::RBracket => { self.advance(); break; }
                Token::Comma    => { self.advance(); }
                Token::Eof      => return Err(self.err("unclosed '[' list")),
                _ => items.push(self.parse_value()?),
            }
        }
        Ok(Value::List(items))
    }

    fn parse_object(&mut self) -> Result<Value, ParseError> {
        let mut entries: Vec<(String, Value)> = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => { self.advance(); break; }
                Token::Comma  => { self.advance(); }
                Token::Eof    => return Err(self.err("unclosed '{' object")),
                _ => {
                    let key = self.parse_key()?;
                    if entries.iter().any(|(k, _)| *k == key) {
                        return Err(self.err_prev(format!("duplicate key {:?} in object", key)));
                    }
                    self.expect_token(&Token::Colon)?;
                    let value = self.parse_value()?;
                    entries.push((key, value));
                }
            }
        }
        Ok(Value::Object(entries))
    }
}

// ── Public parse entry point ──────────────────────────────────────────────

/// Parse a `.glide` source string into a [`Document`].
pub fn parse_str(src: &str) -> Result<Document, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    Parser::new(tokens).parse_document()
}
