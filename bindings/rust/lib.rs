//! Rust bindings for the `tree-sitter-rad` grammar.
//!
//! The parser is generated from `src/grammar.json` at build time and paired
//! with an indentation scanner written in Rust, so consumers link a single
//! crate and obtain a `tree_sitter::Language` handle for Rad scripts.
//!
//! ```
//! let mut parser = tree_sitter::Parser::new();
//! parser
//!     .set_language(&tree_sitter_rad::LANGUAGE.into())
//!     .expect("Error loading Rad grammar");
//!
//! let tree = parser.parse("name = \"rad\"\n", None).unwrap();
//! assert_eq!(tree.root_node().kind(), "source_file");
//! ```

use tree_sitter::Language;
use tree_sitter_language::LanguageFn;

mod scanner;

extern "C" {
    fn tree_sitter_rad() -> *const ();
}

/// The Rad grammar as a [`LanguageFn`].
pub const LANGUAGE: LanguageFn = unsafe { LanguageFn::from_raw(tree_sitter_rad) };

/// The Rad grammar as a [`Language`].
pub fn language() -> Language {
    LANGUAGE.into()
}

/// The syntax highlighting query for Rad.
pub const HIGHLIGHTS_QUERY: &str = include_str!("../../queries/highlights.scm");
