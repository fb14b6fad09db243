//! Parsing and data-model suite for event-sheet scripting: expressions,
//! instructions, events, traversal and serialization.
#![forbid(unsafe_code)]

extern crate ahash;
extern crate indexmap;
#[macro_use]
extern crate bitflags;
extern crate phf;
extern crate serde;
extern crate serde_derive;
extern crate termcolor;

// roughly in order of stage
pub mod error;
pub mod metadata;
pub mod syntax;
pub mod expression;
pub mod ast;
pub mod parser;
pub mod instruction;
pub mod event;
pub mod visitor;
pub mod serialization;

pub use error::{Context, Diagnostic, ErrorKind, Severity, Span};
pub use parser::{Grammar, IdentifierPolicy, ParseEnv};

use parser::{ExpressionParser, Validator};

/// Validate a number-valued expression against an environment, reporting
/// only the first problem found.
pub fn validate_math(text: &str, env: &ParseEnv) -> Result<(), Diagnostic> {
    ExpressionParser::new(text).parse_math(env, &mut Validator)
}

/// Validate a string-valued expression against an environment.
pub fn validate_text(text: &str, env: &ParseEnv) -> Result<(), Diagnostic> {
    ExpressionParser::new(text).parse_text(env, &mut Validator)
}
