//! Lexer, parser, and AST for the **glide layout markup** (`.glide`).
//!
//! This crate is dependency-free so it can be consumed by the language
//! server and other tooling without pulling in the HTTP service or the
//! widget schema.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`ast`] | `Document`, `Node`, `Prop`, `Value`, `Import` |
//! | [`error`] | `ParseError` |
//! | [`lexer`] | `Lexer`, `Token` |
//! | [`parser`] | `parse_str` entry point |
//!
//! # Quick start
//!
//! ```rust
//! use glide_markup::parse_str;
//!
//! let src = r#"
//!     Div {
//!         style: { height: "60vh" }
//!         DashSwiper {
//!             id: "hero"
//!             slides: [ { src: @"images/01.jpg" alt: "One" } ]
//!         }
//!     }
//! "#;
//!
//! let doc = parse_str(src).unwrap();
//! assert_eq!(doc.root.widget, "Div");
//! assert_eq!(doc.root.children[0].widget, "DashSwiper");
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::Document;
pub use error::ParseError;
pub use parser::parse_str;
