//! One textual expression occupying one instruction parameter slot.

use std::cell::{Ref, RefCell};
use std::fmt;

use crate::parser::{self, Grammar, IdentifierPolicy, ParseEnv, ParsedExpression};

type CacheKey = (u64, u64, IdentifierPolicy, Grammar);

#[derive(Debug)]
struct CachedAst {
    key: CacheKey,
    parsed: ParsedExpression,
}

/// Raw source text plus a lazily computed parse tree.
///
/// The cached tree is only valid while associated with the same metadata
/// catalog and objects container that produced it; asking for the tree
/// against a different pair forces a re-parse rather than returning stale
/// results. Copying an expression discards the cache.
#[derive(Debug, Default)]
pub struct Expression {
    text: String,
    cache: RefCell<Option<CachedAst>>,
}

impl Expression {
    pub fn new<S: Into<String>>(text: S) -> Expression {
        Expression {
            text: text.into(),
            cache: RefCell::new(None),
        }
    }

    /// The raw source text.
    pub fn plain_string(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the source text, discarding any cached parse.
    pub fn set_plain_string<S: Into<String>>(&mut self, text: S) {
        self.text = text.into();
        self.invalidate_cache();
    }

    pub fn invalidate_cache(&self) {
        *self.cache.borrow_mut() = None;
    }

    /// Whether a parse tree is currently cached (for any identity).
    pub fn has_cached_ast(&self) -> bool {
        self.cache.borrow().is_some()
    }

    /// The parse tree of this expression under the given grammar and
    /// environment, computing and caching it on first use.
    pub fn ast(&self, grammar: Grammar, env: &ParseEnv) -> Ref<ParsedExpression> {
        let key = (
            env.catalog.identity(),
            env.container.identity(),
            env.policy,
            grammar,
        );
        {
            let cache = self.cache.borrow();
            if matches!(&*cache, Some(cached) if cached.key == key) {
                return Ref::map(cache, |cached| match cached {
                    Some(cached) => &cached.parsed,
                    None => unreachable!(),
                });
            }
        }
        let parsed = parser::parse_to_ast(env, grammar, &self.text);
        *self.cache.borrow_mut() = Some(CachedAst { key, parsed });
        Ref::map(self.cache.borrow(), |cached| match cached {
            Some(cached) => &cached.parsed,
            None => unreachable!(),
        })
    }
}

impl Clone for Expression {
    /// Copying keeps the text and discards the cache.
    fn clone(&self) -> Expression {
        Expression::new(self.text.clone())
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Expression) -> bool {
        self.text == other.text
    }
}

impl Eq for Expression {}

impl From<&str> for Expression {
    fn from(text: &str) -> Expression {
        Expression::new(text)
    }
}

impl From<String> for Expression {
    fn from(text: String) -> Expression {
        Expression::new(text)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text)
    }
}
