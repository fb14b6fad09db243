//! The expression parser.
//!
//! Two mutually-referential micro-languages share one scanning algorithm:
//! numeric ("math") expressions and text expressions. The parser walks the
//! raw text looking for `.` and `(` delimiters (plus `"` in the text
//! grammar), resolves the identifier in front of each against the metadata
//! catalog, and reports everything it finds through [`ParserCallbacks`] —
//! the contract the code generators consume. [`parse_to_ast`] folds the
//! same event stream into an owned [`ExpressionNode`] tree.

use crate::ast::ExpressionNode;
use crate::error::{Diagnostic, ErrorKind, Span};
use crate::expression::Expression;
use crate::metadata::{ExpressionMetadata, MetadataCatalog, ObjectsContainer, ParameterMetadata};
use crate::syntax;

/// The characters that end an identifier. An object name containing a
/// space is written with `~` in its place.
const SEPARATORS: &str = " ,+-*/%.<>=&|;()#^![]{}";

/// Which grammar an expression parses under.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Grammar {
    /// A number-valued expression.
    Math,
    /// A string-valued expression.
    Text,
}

/// What to do with an identifier that resolves to no known callable.
///
/// The legacy math grammar passes it through as a plain math token; the
/// newer grammar raises an "unknown function" diagnostic. Both behaviors
/// are preserved; callers pick one explicitly.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum IdentifierPolicy {
    /// Pass unrecognized identifiers through to the arithmetic validator.
    Lenient,
    /// Raise `ErrorKind::UnknownFunction` for unrecognized identifiers.
    Strict,
}

impl Default for IdentifierPolicy {
    fn default() -> IdentifierPolicy {
        IdentifierPolicy::Lenient
    }
}

/// Everything a parse needs besides the expression text itself.
#[derive(Copy, Clone)]
pub struct ParseEnv<'a> {
    pub catalog: &'a MetadataCatalog,
    pub container: &'a ObjectsContainer,
    pub policy: IdentifierPolicy,
}

impl<'a> ParseEnv<'a> {
    pub fn new(catalog: &'a MetadataCatalog, container: &'a ObjectsContainer) -> ParseEnv<'a> {
        ParseEnv {
            catalog,
            container,
            policy: IdentifierPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: IdentifierPolicy) -> ParseEnv<'a> {
        self.policy = policy;
        self
    }
}

/// The semantic event stream produced by a parse.
///
/// `parameters` on the call events are the *completed* parameter lists:
/// the object name (and behavior name) occupy the leading slots by
/// convention, blank placeholders stand at code-only positions, and
/// optional parameters left empty carry their default values.
pub trait ParserCallbacks {
    fn on_constant_token(&mut self, token: &str, span: Span);
    fn on_static_function(
        &mut self,
        name: &str,
        parameters: &[Expression],
        metadata: &ExpressionMetadata,
        span: Span,
    );
    fn on_object_function(
        &mut self,
        object_name: &str,
        name: &str,
        parameters: &[Expression],
        metadata: &ExpressionMetadata,
        span: Span,
    );
    fn on_object_behavior_function(
        &mut self,
        object_name: &str,
        behavior_name: &str,
        name: &str,
        parameters: &[Expression],
        metadata: &ExpressionMetadata,
        span: Span,
    );
    /// A parameter declared as a numeric sub-expression. Implementations
    /// recurse into the math grammar; the parser re-bases any returned
    /// diagnostic into the enclosing expression's offsets.
    fn on_sub_math_expression(
        &mut self,
        env: &ParseEnv,
        expression: &Expression,
    ) -> Result<(), Diagnostic>;
    /// A parameter declared as a text sub-expression.
    fn on_sub_text_expression(
        &mut self,
        env: &ParseEnv,
        expression: &Expression,
    ) -> Result<(), Diagnostic>;
}

/// A callback sink that validates sub-expressions and discards the rest.
#[derive(Debug, Default)]
pub struct Validator;

impl ParserCallbacks for Validator {
    fn on_constant_token(&mut self, _token: &str, _span: Span) {}
    fn on_static_function(&mut self, _: &str, _: &[Expression], _: &ExpressionMetadata, _: Span) {}
    fn on_object_function(
        &mut self,
        _: &str,
        _: &str,
        _: &[Expression],
        _: &ExpressionMetadata,
        _: Span,
    ) {
    }
    fn on_object_behavior_function(
        &mut self,
        _: &str,
        _: &str,
        _: &str,
        _: &[Expression],
        _: &ExpressionMetadata,
        _: Span,
    ) {
    }

    fn on_sub_math_expression(
        &mut self,
        env: &ParseEnv,
        expression: &Expression,
    ) -> Result<(), Diagnostic> {
        ExpressionParser::new(expression.plain_string()).parse_math(env, self)
    }

    fn on_sub_text_expression(
        &mut self,
        env: &ParseEnv,
        expression: &Expression,
    ) -> Result<(), Diagnostic> {
        ExpressionParser::new(expression.plain_string()).parse_text(env, self)
    }
}

// ----------------------------------------------------------------------------
// The parser

#[derive(Debug)]
enum Resolved {
    Free,
    Object,
    Behavior(String),
}

/// A parse over one expression's raw text.
pub struct ExpressionParser<'text> {
    expression: &'text str,
}

impl<'text> ExpressionParser<'text> {
    pub fn new(expression: &'text str) -> ExpressionParser<'text> {
        ExpressionParser { expression }
    }

    pub fn parse(
        &self,
        grammar: Grammar,
        env: &ParseEnv,
        callbacks: &mut dyn ParserCallbacks,
    ) -> Result<(), Diagnostic> {
        match grammar {
            Grammar::Math => self.parse_math(env, callbacks),
            Grammar::Text => self.parse_text(env, callbacks),
        }
    }

    /// Parse a number-valued expression.
    ///
    /// Recognized function calls are reported through the callbacks and
    /// replaced by `0` in a residual copy of the text; everything else
    /// passes through to the residue, which must satisfy the arithmetic
    /// validator for the parse to succeed.
    ///
    /// An arity violation is reported only after the call callback has
    /// fired, so the offending call still appears in the event stream; a
    /// call event alone is not proof the parse succeeded.
    pub fn parse_math(
        &self,
        env: &ParseEnv,
        callbacks: &mut dyn ParserCallbacks,
    ) -> Result<(), Diagnostic> {
        let expr = self.expression;
        let mut parse_position = 0usize;
        let mut first_point = expr.find('.');
        let mut first_paren = expr.find('(');
        let mut residual = String::new();
        let mut pending = String::new();
        let mut pending_start: Option<usize> = None;

        while first_point.is_some() || first_paren.is_some() {
            let point = first_point.unwrap_or(usize::MAX);
            let paren = first_paren.unwrap_or(usize::MAX);
            let name_end = point.min(paren);
            let name_start = expr[..name_end]
                .rfind(|c| SEPARATORS.contains(c))
                .map(|i| i + 1)
                .unwrap_or(0);
            let name_before = &expr[name_start..name_end];
            let object_name = name_before.replace('~', " ");
            let name_is_function = paren < point;

            let (mut function_name, function_name_end) =
                member_name(expr, name_before, name_end, name_is_function);

            // A member name containing a separator is never a call.
            let head_end = function_name
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
            let plausible = !function_name[..head_end].contains(|c| SEPARATORS.contains(c));

            let mut resolved: Option<(Resolved, ExpressionMetadata)> = None;
            if plausible {
                if name_is_function {
                    if let Some(metadata) = env.catalog.get_expression(&function_name) {
                        resolved = Some((Resolved::Free, metadata.clone()));
                    }
                } else if let Some(metadata) = env.catalog.get_object_expression(
                    env.container.get_type_of_object(&object_name),
                    &function_name,
                ) {
                    resolved = Some((Resolved::Object, metadata.clone()));
                } else if let Some(sep) = function_name.find("::") {
                    let behavior_name = function_name[..sep].to_owned();
                    let member = if sep + 2 < function_name.len() {
                        function_name[sep + 2..].to_owned()
                    } else {
                        String::new()
                    };
                    let behavior_type = env.container.get_type_of_behavior(&behavior_name);
                    if let Some(metadata) = env.catalog.get_behavior_expression(behavior_type, &member) {
                        if attached(env, &object_name, &behavior_name) {
                            function_name = member;
                            resolved = Some((Resolved::Behavior(behavior_name), metadata.clone()));
                        } else if env.policy == IdentifierPolicy::Strict {
                            return Err(Diagnostic::new(
                                ErrorKind::BehaviorNotAttached,
                                Span::new(name_start, function_name_end),
                                format!(
                                    "object {:?} has no behavior {:?}",
                                    object_name, behavior_name
                                ),
                            ));
                        }
                    }
                }
            }

            if let Some((kind, metadata)) = resolved {
                let mut parameters: Vec<Expression> = Vec::new();
                if !name_is_function {
                    parameters.push(Expression::new(object_name.clone()));
                }
                if let Resolved::Behavior(ref behavior) = kind {
                    parameters.push(Expression::new(behavior.clone()));
                }

                let open = match find_from(expr, '(', function_name_end) {
                    Some(open) => open,
                    None => {
                        return Err(Diagnostic::new(
                            ErrorKind::MissingParenthesis,
                            Span::at(function_name_end),
                            "parameter list parenthesis missing",
                        ));
                    }
                };
                let (raw, close) = scan_parameters(expr, open)?;
                parameters.extend(raw.into_iter().map(Expression::new));

                let arity_error = check_arity(&metadata, parameters.len(), function_name_end);
                if arity_error.is_none() {
                    complete_parameters(&metadata.parameters, &mut parameters);
                    prepare_parameters(
                        env,
                        callbacks,
                        &metadata.parameters,
                        &mut parameters,
                        function_name_end,
                    )?;
                }

                let token = format!("{}{}", pending, &expr[parse_position..name_start]);
                callbacks.on_constant_token(
                    &token,
                    Span::new(pending_start.unwrap_or(parse_position), name_start),
                );
                residual.push_str(&expr[parse_position..name_start]);
                pending.clear();
                pending_start = None;

                let call_span = Span::new(name_start, close + 1);
                match kind {
                    Resolved::Free => {
                        callbacks.on_static_function(&function_name, &parameters, &metadata, call_span)
                    }
                    Resolved::Object => callbacks.on_object_function(
                        &object_name,
                        &function_name,
                        &parameters,
                        &metadata,
                        call_span,
                    ),
                    Resolved::Behavior(ref behavior) => callbacks.on_object_behavior_function(
                        &object_name,
                        behavior,
                        &function_name,
                        &parameters,
                        &metadata,
                        call_span,
                    ),
                }
                if let Some(diagnostic) = arity_error {
                    return Err(diagnostic);
                }

                residual.push('0');
                parse_position = close + 1;
                first_point = find_from(expr, '.', parse_position);
                first_paren = find_from(expr, '(', parse_position);
            } else {
                // Math function, constant, or no call at all: pass it through.
                let token_end = if plausible {
                    function_name_end + 1
                } else {
                    name_end + 1
                };
                if env.policy == IdentifierPolicy::Strict
                    && plausible
                    && !function_name.is_empty()
                    && looks_like_identifier(name_before)
                {
                    return Err(Diagnostic::new(
                        ErrorKind::UnknownFunction,
                        Span::new(name_start, token_end),
                        format!("unknown function or expression {:?}", function_name),
                    ));
                }
                if pending_start.is_none() {
                    pending_start = Some(parse_position);
                }
                pending.push_str(&expr[parse_position..token_end]);
                residual.push_str(&expr[parse_position..token_end]);
                parse_position = token_end;
                first_point = find_from(expr, '.', parse_position);
                first_paren = find_from(expr, '(', parse_position);
            }
        }

        if parse_position < expr.len() || !pending.is_empty() {
            let token = format!("{}{}", pending, &expr[parse_position..]);
            callbacks.on_constant_token(
                &token,
                Span::new(pending_start.unwrap_or(parse_position), expr.len()),
            );
        }
        residual.push_str(&expr[parse_position..]);

        syntax::validate(&residual)?;
        Ok(())
    }

    /// Parse a string-valued expression.
    ///
    /// Quoted literals are first-class tokens here, and adjacent tokens
    /// must be joined by an explicit `+`.
    pub fn parse_text(
        &self,
        env: &ParseEnv,
        callbacks: &mut dyn ParserCallbacks,
    ) -> Result<(), Diagnostic> {
        let expr = self.expression;
        let mut parse_position = 0usize;
        let mut first_point = expr.find('.');
        let mut first_paren = expr.find('(');
        let mut first_quote = expr.find('"');

        if first_point.is_none() && first_paren.is_none() && first_quote.is_none() {
            return Err(Diagnostic::new(
                ErrorKind::EmptyExpression,
                Span::at(0),
                "the expression is invalid or empty; enter a text (surrounded by quotes) or a function",
            ));
        }

        while first_point.is_some() || first_paren.is_some() || first_quote.is_some() {
            let point = first_point.unwrap_or(usize::MAX);
            let paren = first_paren.unwrap_or(usize::MAX);
            let quote = first_quote.unwrap_or(usize::MAX);

            if quote < point && quote < paren {
                // A literal text segment.
                callbacks.on_constant_token(
                    &expr[parse_position..quote],
                    Span::new(parse_position, quote),
                );
                let close = match closing_quote(expr, quote) {
                    Some(close) => close,
                    None => {
                        return Err(Diagnostic::new(
                            ErrorKind::UnterminatedString,
                            Span::at(quote),
                            "quotes not closed",
                        ));
                    }
                };
                let final_text = expr[quote + 1..close].replace("\\\"", "\"");
                let parameters = [Expression::new(final_text)];
                // A literal surfaces as a static call with an empty name.
                callbacks.on_static_function(
                    "",
                    &parameters,
                    &ExpressionMetadata::default(),
                    Span::new(quote, close + 1),
                );
                parse_position = close + 1;
            } else {
                let name_end = point.min(paren);
                let name_start = expr[..name_end]
                    .rfind(|c| SEPARATORS.contains(c))
                    .map(|i| i + 1)
                    .unwrap_or(0);
                callbacks.on_constant_token(
                    &expr[parse_position..name_start],
                    Span::new(parse_position, name_start),
                );
                let name_before = &expr[name_start..name_end];
                let object_name = name_before.replace('~', " ");
                let name_is_function = paren < point;
                let (mut function_name, function_name_end) =
                    member_name(expr, name_before, name_end, name_is_function);

                let open = match find_from(expr, '(', function_name_end) {
                    Some(open) => open,
                    None => {
                        return Err(Diagnostic::new(
                            ErrorKind::MissingParenthesis,
                            Span::at(function_name_end),
                            "parameter list parenthesis missing",
                        ));
                    }
                };
                let (raw, close) = scan_parameters(expr, open)?;

                let mut parameters: Vec<Expression> = Vec::new();
                if !name_is_function {
                    parameters.push(Expression::new(object_name.clone()));
                }
                let mut behavior: Option<String> = None;
                let mut resolved: Option<ExpressionMetadata> = None;
                if name_is_function {
                    if let Some(metadata) = env.catalog.get_str_expression(&function_name) {
                        resolved = Some(metadata.clone());
                    }
                } else if let Some(metadata) = env.catalog.get_object_str_expression(
                    env.container.get_type_of_object(&object_name),
                    &function_name,
                ) {
                    resolved = Some(metadata.clone());
                } else if let Some(sep) = function_name.find("::") {
                    let behavior_name = function_name[..sep].to_owned();
                    let member = if sep + 2 < function_name.len() {
                        function_name[sep + 2..].to_owned()
                    } else {
                        String::new()
                    };
                    let behavior_type = env.container.get_type_of_behavior(&behavior_name);
                    if let Some(metadata) =
                        env.catalog.get_behavior_str_expression(behavior_type, &member)
                    {
                        if attached(env, &object_name, &behavior_name) {
                            function_name = member;
                            parameters.push(Expression::new(behavior_name.clone()));
                            behavior = Some(behavior_name);
                            resolved = Some(metadata.clone());
                        } else {
                            return Err(Diagnostic::new(
                                ErrorKind::BehaviorNotAttached,
                                Span::new(name_start, function_name_end),
                                format!(
                                    "object {:?} has no behavior {:?}",
                                    object_name, behavior_name
                                ),
                            ));
                        }
                    }
                }
                let metadata = match resolved {
                    Some(metadata) => metadata,
                    None => {
                        return Err(Diagnostic::new(
                            ErrorKind::UnknownFunction,
                            Span::new(name_start, function_name_end),
                            "function not recognized",
                        ));
                    }
                };

                parameters.extend(raw.into_iter().map(Expression::new));
                if let Some(diagnostic) = check_arity(&metadata, parameters.len(), function_name_end) {
                    return Err(diagnostic);
                }
                complete_parameters(&metadata.parameters, &mut parameters);
                prepare_parameters(
                    env,
                    callbacks,
                    &metadata.parameters,
                    &mut parameters,
                    function_name_end,
                )?;

                let call_span = Span::new(name_start, close + 1);
                match behavior {
                    Some(ref behavior) => callbacks.on_object_behavior_function(
                        &object_name,
                        behavior,
                        &function_name,
                        &parameters,
                        &metadata,
                        call_span,
                    ),
                    None if name_is_function => callbacks.on_static_function(
                        &function_name,
                        &parameters,
                        &metadata,
                        call_span,
                    ),
                    None => callbacks.on_object_function(
                        &object_name,
                        &function_name,
                        &parameters,
                        &metadata,
                        call_span,
                    ),
                }
                parse_position = close + 1;
            }

            // Two adjacent tokens require an explicit `+` between them.
            let first_plus = find_from(expr, '+', parse_position);
            first_point = find_from(expr, '.', parse_position);
            first_paren = find_from(expr, '(', parse_position);
            first_quote = find_from(expr, '"', parse_position);

            let next_token = [first_point, first_paren, first_quote]
                .iter()
                .flatten()
                .copied()
                .min();
            if let Some(next_token) = next_token {
                if next_token < first_plus.unwrap_or(usize::MAX) {
                    return Err(Diagnostic::new(
                        ErrorKind::MissingOperator,
                        Span::at(next_token),
                        "operator missing between two string tokens",
                    ));
                }
                if let Some(plus) = first_plus {
                    if let Some(second_plus) = find_from(expr, '+', plus + 1) {
                        if second_plus < next_token {
                            return Err(Diagnostic::new(
                                ErrorKind::MissingNumber,
                                Span::at(plus),
                                "nothing between two + operators",
                            ));
                        }
                    }
                }
            }
        }

        if expr[parse_position..].find(|c: char| c != ' ' && c != '\n').is_some() {
            return Err(Diagnostic::new(
                ErrorKind::DanglingToken,
                Span::at(parse_position),
                "bad symbol at the end of the expression",
            ));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Scanning helpers

fn find_from(expr: &str, needle: char, from: usize) -> Option<usize> {
    if from >= expr.len() {
        return None;
    }
    expr[from..].find(needle).map(|i| i + from)
}

fn attached(env: &ParseEnv, object_name: &str, behavior_name: &str) -> bool {
    env.container
        .get_behaviors_of_object(object_name)
        .iter()
        .any(|behavior| behavior == behavior_name)
}

fn looks_like_identifier(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_')
}

/// Extract the member name of a dotted access. For a bare call the name in
/// front of the parenthesis is the function name itself.
fn member_name(
    expr: &str,
    name_before: &str,
    name_end: usize,
    name_is_function: bool,
) -> (String, usize) {
    if name_is_function {
        return (name_before.to_owned(), name_end);
    }
    let found = expr[name_end..]
        .find(|c: char| c == ' ' || c == '(')
        .map(|i| i + name_end);
    let function_name = expr[name_end + 1..found.unwrap_or_else(|| expr.len())].to_owned();
    match found {
        Some(end) => (function_name, end),
        None => (String::new(), expr.len() - 1),
    }
}

/// Split the parenthesized argument list opening at `open`.
///
/// Tracks parenthesis depth and an in-quotes flag (`\"` does not toggle)
/// so commas and parentheses inside string literals or nested calls never
/// split an argument. Returns the raw argument texts and the position of
/// the closing parenthesis. A whitespace-only segment after the last comma
/// is dropped.
fn scan_parameters(expr: &str, open: usize) -> Result<(Vec<String>, usize), Diagnostic> {
    let mut parameters = Vec::new();
    let mut current = String::new();
    let mut level = 0usize;
    let mut in_quotes = false;
    let mut prev = '(';
    let mut close = None;

    for (offset, c) in expr[open + 1..].char_indices() {
        let index = open + 1 + offset;
        if c == '"' && prev != '\\' {
            in_quotes = !in_quotes;
        }
        if !in_quotes {
            if c == ')' && level == 0 {
                close = Some(index);
                break;
            }
            if c == '(' {
                level += 1;
            } else if c == ')' {
                level -= 1;
            } else if c == ',' && level == 0 {
                parameters.push(std::mem::take(&mut current));
                prev = c;
                continue;
            }
        }
        current.push(c);
        prev = c;
    }

    let close = match close {
        Some(close) => close,
        None => {
            return Err(Diagnostic::new(
                ErrorKind::UnterminatedParenthesis,
                Span::at(expr.len().saturating_sub(1)),
                "parenthesis not closed",
            ));
        }
    };
    if current.contains(|c: char| c != ' ') {
        parameters.push(current);
    }
    Ok((parameters, close))
}

/// Find the quote closing the literal opened at `open`, honoring `\"`.
fn closing_quote(expr: &str, open: usize) -> Option<usize> {
    let mut search = open + 1;
    loop {
        let candidate = find_from(expr, '"', search)?;
        if expr.as_bytes()[candidate - 1] == b'\\' {
            search = candidate + 1;
        } else {
            return Some(candidate);
        }
    }
}

fn check_arity(
    metadata: &ExpressionMetadata,
    supplied: usize,
    at: usize,
) -> Option<Diagnostic> {
    let min = metadata.minimum_parameter_count();
    let max = metadata.maximum_parameter_count();
    if supplied < min {
        Some(Diagnostic::new(
            ErrorKind::TooFewArguments,
            Span::at(at),
            format!(
                "incorrect number of parameters: expected at least {}, got {}",
                min, supplied
            ),
        ))
    } else if supplied > max {
        Some(Diagnostic::new(
            ErrorKind::TooManyArguments,
            Span::at(at),
            format!(
                "incorrect number of parameters: expected at most {}, got {}",
                max, supplied
            ),
        ))
    } else {
        None
    }
}

/// Insert blank placeholders at code-only positions and at the tail for
/// declared parameters beyond what the author supplied.
fn complete_parameters(infos: &[ParameterMetadata], parameters: &mut Vec<Expression>) {
    for (i, info) in infos.iter().enumerate() {
        if info.code_only {
            if i >= parameters.len() {
                parameters.push(Expression::default());
            } else {
                parameters.insert(i, Expression::default());
            }
        } else if i >= parameters.len() {
            parameters.push(Expression::default());
        }
    }
}

/// Substitute defaults into empty optional parameters and recurse into
/// each parameter's declared sub-grammar.
fn prepare_parameters(
    env: &ParseEnv,
    callbacks: &mut dyn ParserCallbacks,
    infos: &[ParameterMetadata],
    parameters: &mut [Expression],
    position_in_expression: usize,
) -> Result<(), Diagnostic> {
    for (i, info) in infos.iter().enumerate() {
        if info.code_only {
            continue;
        }
        let parameter = match parameters.get_mut(i) {
            Some(parameter) => parameter,
            None => break,
        };
        if info.kind.recurses_math() {
            if info.optional && parameter.is_empty() {
                *parameter = if info.default_value.is_empty() {
                    Expression::new("0")
                } else {
                    Expression::new(info.default_value.clone())
                };
            }
            callbacks
                .on_sub_math_expression(env, parameter)
                .map_err(|d| d.rebase(position_in_expression))?;
        } else if info.kind.recurses_text() {
            if info.optional && parameter.is_empty() {
                *parameter = if info.default_value.is_empty() {
                    Expression::new("\"\"")
                } else {
                    Expression::new(info.default_value.clone())
                };
            }
            callbacks
                .on_sub_text_expression(env, parameter)
                .map_err(|d| d.rebase(position_in_expression))?;
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// The owned-AST form

/// The result of folding a parse into an owned tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpression {
    pub nodes: Vec<ExpressionNode>,
    /// The diagnostic that ended the parse, if any. When it concerns a
    /// call that was already emitted, it is also attached to that node.
    pub error: Option<Diagnostic>,
}

impl ParsedExpression {
    pub fn is_valid(&self) -> bool {
        self.error.is_none() && self.nodes.iter().all(|node| node.diagnostic().is_none())
    }
}

#[derive(Default)]
struct AstBuilder {
    nodes: Vec<ExpressionNode>,
}

impl AstBuilder {
    /// Split a pass-through region into number, operator and bare-token
    /// nodes. Spans are only exact when the region is contiguous in the
    /// source, which holds for everything the math grammar emits.
    fn push_constant(&mut self, token: &str, base: usize) {
        let mut chars = token.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c.is_whitespace() {
                continue;
            }
            if c.is_ascii_digit() || c == '.' {
                let start = i;
                let mut end = i + c.len_utf8();
                let mut after_marker = false;
                while let Some(&(j, d)) = chars.peek() {
                    let part_of_number = d.is_ascii_digit()
                        || d == '.'
                        || d == 'e'
                        || (after_marker && (d == '+' || d == '-'));
                    if !part_of_number {
                        break;
                    }
                    after_marker = d == 'e';
                    end = j + d.len_utf8();
                    chars.next();
                }
                self.nodes.push(ExpressionNode::Number {
                    text: token[start..end].to_owned(),
                    span: Span::new(base + start, base + end),
                });
            } else if matches!(c, '+' | '-' | '*' | '/' | '%' | '(' | ')') {
                self.nodes.push(ExpressionNode::Operator {
                    symbol: c,
                    span: Span::at(base + i),
                });
            } else {
                let start = i;
                let mut end = i + c.len_utf8();
                while let Some(&(j, d)) = chars.peek() {
                    if d.is_whitespace() || matches!(d, '+' | '-' | '*' | '/' | '%' | '(' | ')' | ',') {
                        break;
                    }
                    end = j + d.len_utf8();
                    chars.next();
                }
                self.nodes.push(ExpressionNode::Text {
                    text: token[start..end].to_owned(),
                    span: Span::new(base + start, base + end),
                });
            }
        }
    }
}

impl ParserCallbacks for AstBuilder {
    fn on_constant_token(&mut self, token: &str, span: Span) {
        self.push_constant(token, span.start);
    }

    fn on_static_function(
        &mut self,
        name: &str,
        parameters: &[Expression],
        metadata: &ExpressionMetadata,
        span: Span,
    ) {
        if name.is_empty() {
            // A literal text segment from the text grammar.
            let text = parameters
                .first()
                .map(|p| p.plain_string().to_owned())
                .unwrap_or_default();
            self.nodes.push(ExpressionNode::Text { text, span });
        } else {
            self.nodes.push(ExpressionNode::FreeFunctionCall {
                name: name.to_owned(),
                arguments: parameters.to_vec(),
                metadata: metadata.clone(),
                span,
                diagnostic: None,
            });
        }
    }

    fn on_object_function(
        &mut self,
        object_name: &str,
        name: &str,
        parameters: &[Expression],
        metadata: &ExpressionMetadata,
        span: Span,
    ) {
        self.nodes.push(ExpressionNode::ObjectFunctionCall {
            object_name: object_name.to_owned(),
            name: name.to_owned(),
            arguments: parameters.to_vec(),
            metadata: metadata.clone(),
            span,
            diagnostic: None,
        });
    }

    fn on_object_behavior_function(
        &mut self,
        object_name: &str,
        behavior_name: &str,
        name: &str,
        parameters: &[Expression],
        metadata: &ExpressionMetadata,
        span: Span,
    ) {
        self.nodes.push(ExpressionNode::BehaviorFunctionCall {
            object_name: object_name.to_owned(),
            behavior_name: behavior_name.to_owned(),
            name: name.to_owned(),
            arguments: parameters.to_vec(),
            metadata: metadata.clone(),
            span,
            diagnostic: None,
        });
    }

    fn on_sub_math_expression(
        &mut self,
        env: &ParseEnv,
        expression: &Expression,
    ) -> Result<(), Diagnostic> {
        ExpressionParser::new(expression.plain_string()).parse_math(env, &mut Validator)
    }

    fn on_sub_text_expression(
        &mut self,
        env: &ParseEnv,
        expression: &Expression,
    ) -> Result<(), Diagnostic> {
        ExpressionParser::new(expression.plain_string()).parse_text(env, &mut Validator)
    }
}

/// Parse an expression into an owned tree with inline diagnostics.
pub fn parse_to_ast(env: &ParseEnv, grammar: Grammar, text: &str) -> ParsedExpression {
    let mut builder = AstBuilder::default();
    let result = ExpressionParser::new(text).parse(grammar, env, &mut builder);
    let mut parsed = ParsedExpression {
        nodes: builder.nodes,
        error: None,
    };
    if let Err(diagnostic) = result {
        if let Some(node) = parsed.nodes.iter_mut().rev().find(|node| node.is_call()) {
            let span = node.span();
            if span.start <= diagnostic.position() && diagnostic.position() <= span.end {
                node.set_diagnostic(diagnostic.clone());
            }
        }
        parsed.error = Some(diagnostic);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_scanning() {
        let (parameters, close) = scan_parameters("f(1, 2, 3)", 1).unwrap();
        assert_eq!(parameters, vec!["1", " 2", " 3"]);
        assert_eq!(close, 9);

        // commas inside quotes or nested calls never split
        let (parameters, _) = scan_parameters(r#"f("a,b", g(1, 2))"#, 1).unwrap();
        assert_eq!(parameters, vec![r#""a,b""#, " g(1, 2)"]);

        // a whitespace-only trailing segment is dropped
        let (parameters, _) = scan_parameters("f(1, )", 1).unwrap();
        assert_eq!(parameters, vec!["1"]);

        assert_eq!(
            scan_parameters("f(1, 2", 1).unwrap_err().kind(),
            crate::error::ErrorKind::UnterminatedParenthesis
        );
    }

    #[test]
    fn escaped_quote_does_not_close() {
        assert_eq!(closing_quote(r#""a\"b""#, 0), Some(5));
        assert_eq!(closing_quote(r#""abc"#, 0), None);
    }
}
