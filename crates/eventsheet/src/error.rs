//! Error, warning, and other diagnostics handling.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::io;

use termcolor::{Color, ColorSpec, WriteColor};

/// A half-open byte range into the source text of an expression.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Default, Hash)]
pub struct Span {
    /// Byte offset of the first character covered.
    pub start: usize,
    /// Byte offset one past the last character covered.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }

    /// A span covering the single position `at`.
    pub fn at(at: usize) -> Span {
        Span { start: at, end: at + 1 }
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    /// Shift this span by `offset`, used to translate a diagnostic produced
    /// inside a sub-expression into the enclosing expression's offsets.
    pub fn rebase(self, offset: usize) -> Span {
        Span {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.len() <= 1 {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

/// The possible diagnostic severities available.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Info = 3,
}

impl Severity {
    fn style(self) -> ColorSpec {
        let mut spec = ColorSpec::new();
        match self {
            Severity::Error => { spec.set_fg(Some(Color::Red)); }
            Severity::Warning => { spec.set_fg(Some(Color::Yellow)); }
            Severity::Info => { spec.set_fg(Some(Color::White)).set_intense(true); }
        }
        spec
    }
}

impl Default for Severity {
    fn default() -> Severity {
        Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
            Severity::Info => f.write_str("info"),
        }
    }
}

/// The category of a diagnostic.
///
/// Lexical and syntactic kinds come out of the expression scanner and the
/// arithmetic validator, binding kinds out of catalog resolution, and the
/// remaining kinds out of tree construction and format migration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// A quoted string literal with no closing quote.
    UnterminatedString,
    /// An opening parenthesis that is never closed, or a closing one that
    /// was never opened.
    UnterminatedParenthesis,
    /// `()` with nothing inside.
    EmptyParentheses,
    /// Two operands with no operator between them.
    MissingOperator,
    /// An operator with no operand where one is required.
    MissingNumber,
    /// A recognized function call with no parameter list at all.
    MissingParenthesis,
    /// A number with a duplicate decimal point or scientific marker.
    MalformedNumber,
    /// A character with no meaning in the arithmetic grammar.
    InvalidCharacter,
    /// Fewer arguments than the callee's minimum.
    TooFewArguments,
    /// More arguments than the callee's maximum.
    TooManyArguments,
    /// An identifier that resolved to no known callable.
    UnknownFunction,
    /// A behavior member call naming a behavior the object does not have.
    BehaviorNotAttached,
    /// Leftover text after the last meaningful token.
    DanglingToken,
    /// An expression with no token at all where one is required.
    EmptyExpression,
    /// An event type identifier unknown to the event factory.
    UnknownEventType,
    /// An ambiguous construct encountered while migrating a legacy format.
    LegacyFormat,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        use self::ErrorKind::*;
        match self {
            UnterminatedString => "unterminated string",
            UnterminatedParenthesis => "unterminated parenthesis",
            EmptyParentheses => "empty parentheses",
            MissingOperator => "missing operator",
            MissingNumber => "missing number",
            MissingParenthesis => "missing parenthesis",
            MalformedNumber => "malformed number",
            InvalidCharacter => "invalid character",
            TooFewArguments => "too few arguments",
            TooManyArguments => "too many arguments",
            UnknownFunction => "unknown function",
            BehaviorNotAttached => "behavior not attached",
            DanglingToken => "dangling token",
            EmptyExpression => "empty expression",
            UnknownEventType => "unknown event type",
            LegacyFormat => "legacy format",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A diagnostic produced while parsing an expression or loading a tree,
/// with position information relative to the source expression.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Diagnostic {
    span: Span,
    kind: ErrorKind,
    severity: Severity,
    message: String,
}

impl Diagnostic {
    pub fn new<S: Into<String>>(kind: ErrorKind, span: Span, message: S) -> Diagnostic {
        Diagnostic {
            span,
            kind,
            severity: Default::default(),
            message: message.into(),
        }
    }

    pub fn set_severity(mut self, severity: Severity) -> Diagnostic {
        self.severity = severity;
        self
    }

    pub fn with_span(mut self, span: Span) -> Diagnostic {
        self.span = span;
        self
    }

    /// Translate this diagnostic's span into the enclosing expression's
    /// offsets, given the position the sub-expression started at.
    pub fn rebase(mut self, offset: usize) -> Diagnostic {
        self.span = self.span.rebase(offset);
        self
    }

    #[inline]
    pub fn register(self, context: &Context) {
        context.register_error(self)
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Byte offset at which this diagnostic was observed.
    pub fn position(&self) -> usize {
        self.span.start
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}: {}", self.span, self.severity, self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// A diagnostics context, collecting everything observed during parsing
/// and tree loading so a front-end can report all problems in one pass.
#[derive(Debug, Default)]
pub struct Context {
    /// A list of errors, warnings, and other diagnostics generated.
    errors: RefCell<Vec<Diagnostic>>,
    print_severity: Option<Severity>,
}

impl Context {
    /// Set a severity at and above which errors will be printed immediately.
    pub fn set_print_severity(&mut self, print_severity: Option<Severity>) {
        self.print_severity = print_severity;
    }

    /// Push an error or other diagnostic to the context.
    pub fn register_error(&self, error: Diagnostic) {
        if let Some(print_severity) = self.print_severity {
            if error.severity() <= print_severity {
                let stderr = termcolor::StandardStream::stderr(termcolor::ColorChoice::Auto);
                self.pretty_print_error(&mut stderr.lock(), &error)
                    .expect("error writing to stderr");
            }
        }
        self.errors.borrow_mut().push(error);
    }

    /// Access the list of diagnostics generated so far.
    pub fn errors(&self) -> Ref<[Diagnostic]> {
        Ref::map(self.errors.borrow(), |x| &**x)
    }

    /// Mutably access the diagnostics list. Dangerous.
    #[doc(hidden)]
    pub fn errors_mut(&self) -> RefMut<Vec<Diagnostic>> {
        self.errors.borrow_mut()
    }

    pub fn clear_errors(&self) {
        self.errors.borrow_mut().clear();
    }

    /// Pretty-print a `Diagnostic` to the given output.
    pub fn pretty_print_error<W: WriteColor>(&self, w: &mut W, error: &Diagnostic) -> io::Result<()> {
        write!(w, "offset {}: ", error.span())?;
        w.set_color(&error.severity().style())?;
        write!(w, "{}", error.severity())?;
        w.reset()?;
        writeln!(w, ": {} ({})", error.message(), error.kind())
    }

    pub fn pretty_print_error_nocolor<W: io::Write>(&self, w: &mut W, error: &Diagnostic) -> io::Result<()> {
        self.pretty_print_error(&mut termcolor::NoColor::new(w), error)
    }

    /// Pretty-print all registered diagnostics to standard error.
    ///
    /// Returns `true` if any errors were printed, `false` if none were.
    pub fn print_all_errors(&self, min_severity: Severity) -> bool {
        let stderr = termcolor::StandardStream::stderr(termcolor::ColorChoice::Auto);
        let stderr = &mut stderr.lock();
        let errors = self.errors();
        let mut printed = false;
        for err in errors.iter() {
            if err.severity() <= min_severity {
                self.pretty_print_error(stderr, err).expect("error writing to stderr");
                printed = true;
            }
        }
        printed
    }

    /// Print messages and panic if there were any errors.
    #[doc(hidden)]
    pub fn assert_success(&self) {
        if self.print_all_errors(Severity::Info) {
            panic!("there were parse errors");
        }
    }
}
