//! # proto-forge-dsl
//!
//! Front end for the schema interface definition language.
//!
//! This crate provides:
//! - A tokenizer that attributes comments to the declarations around them
//! - A recursive descent parser that builds a [`FileSchema`] descriptor tree
//!   and fills a [`SourceLocationTable`], recovering after errors
//! - Error sinks ([`ErrorCollector`], [`MultiFileErrorCollector`]) and an
//!   in-memory [`Diagnostics`] list
//! - A printer that renders a descriptor tree back to IDL text
//!
//! # Example
//!
//! ```
//! use proto_forge_core::SourceLocationTable;
//! use proto_forge_dsl::{parse, print, Diagnostics};
//!
//! let source = r#"
//! syntax = "proto3";
//! package shop;
//!
//! // A customer order.
//! message Order {
//!   int64 id = 1;
//!   repeated string items = 2;
//! }
//! "#;
//!
//! let mut diagnostics = Diagnostics::new();
//! let mut locations = SourceLocationTable::new();
//! let file = parse(source, &mut diagnostics, &mut locations).expect("parse failed");
//! assert!(diagnostics.is_empty());
//! assert_eq!(file.package.as_deref(), Some("shop"));
//! assert!(file.find_message("Order").is_some());
//!
//! let text = print(&file);
//! assert!(text.contains("repeated string items = 2;"));
//! ```
//!
//! [`FileSchema`]: proto_forge_core::types::FileSchema
//! [`SourceLocationTable`]: proto_forge_core::SourceLocationTable

pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod token;

pub use error::{
    Diagnostic, Diagnostics, DslError, ErrorCollector, FileErrorCollector,
    MultiFileErrorCollector, Severity,
};
pub use lexer::{tokenize, EscapeDecoding, LexerOptions, Tokenizer};
pub use parser::{parse, parse_with_options, ParseFailed, Parser, ParserOptions};
pub use printer::{print, print_annotated, print_with_options};
pub use token::{Token, TokenKind};
