//! The owned form of a parsed expression.
//!
//! The scanning parser reports its findings through callbacks; this module
//! is the tree those callbacks can be folded into. Call-kind nodes carry
//! the resolved signature and, when something went wrong binding or
//! validating the call, an inline diagnostic.

use std::fmt;

use crate::error::{Diagnostic, Span};
use crate::expression::Expression;
use crate::metadata::ExpressionMetadata;

/// One node of a parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    /// A numeric literal, kept as written (`"1.5e3"`).
    Number { text: String, span: Span },
    /// A literal text segment (unescaped), or a pass-through math token
    /// such as `pi` or `sin`.
    Text { text: String, span: Span },
    /// One arithmetic operator or parenthesis.
    Operator { symbol: char, span: Span },
    /// A call to a free function: `Random(10)`.
    FreeFunctionCall {
        name: String,
        arguments: Vec<Expression>,
        metadata: ExpressionMetadata,
        span: Span,
        diagnostic: Option<Diagnostic>,
    },
    /// A call to an object member function: `Hero.X()`.
    ObjectFunctionCall {
        object_name: String,
        name: String,
        arguments: Vec<Expression>,
        metadata: ExpressionMetadata,
        span: Span,
        diagnostic: Option<Diagnostic>,
    },
    /// A call to a behavior member function: `Hero.Physics::Mass()`.
    BehaviorFunctionCall {
        object_name: String,
        behavior_name: String,
        name: String,
        arguments: Vec<Expression>,
        metadata: ExpressionMetadata,
        span: Span,
        diagnostic: Option<Diagnostic>,
    },
}

impl ExpressionNode {
    pub fn span(&self) -> Span {
        match *self {
            ExpressionNode::Number { span, .. }
            | ExpressionNode::Text { span, .. }
            | ExpressionNode::Operator { span, .. }
            | ExpressionNode::FreeFunctionCall { span, .. }
            | ExpressionNode::ObjectFunctionCall { span, .. }
            | ExpressionNode::BehaviorFunctionCall { span, .. } => span,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(
            self,
            ExpressionNode::FreeFunctionCall { .. }
                | ExpressionNode::ObjectFunctionCall { .. }
                | ExpressionNode::BehaviorFunctionCall { .. }
        )
    }

    /// The completed argument list, for call-kind nodes.
    pub fn arguments(&self) -> Option<&[Expression]> {
        match self {
            ExpressionNode::FreeFunctionCall { arguments, .. }
            | ExpressionNode::ObjectFunctionCall { arguments, .. }
            | ExpressionNode::BehaviorFunctionCall { arguments, .. } => Some(arguments),
            _ => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ExpressionNode::FreeFunctionCall { diagnostic, .. }
            | ExpressionNode::ObjectFunctionCall { diagnostic, .. }
            | ExpressionNode::BehaviorFunctionCall { diagnostic, .. } => diagnostic.as_ref(),
            _ => None,
        }
    }

    /// Attach a diagnostic to a call-kind node. No-op on other kinds.
    pub fn set_diagnostic(&mut self, new: Diagnostic) {
        match self {
            ExpressionNode::FreeFunctionCall { diagnostic, .. }
            | ExpressionNode::ObjectFunctionCall { diagnostic, .. }
            | ExpressionNode::BehaviorFunctionCall { diagnostic, .. } => *diagnostic = Some(new),
            _ => {}
        }
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn write_args(f: &mut fmt::Formatter, skip: usize, arguments: &[Expression]) -> fmt::Result {
            write!(f, "(")?;
            let mut first = true;
            for argument in arguments.iter().skip(skip) {
                if !first {
                    write!(f, ", ")?;
                }
                first = false;
                write!(f, "{}", argument.plain_string())?;
            }
            write!(f, ")")
        }

        match self {
            ExpressionNode::Number { text, .. } => f.write_str(text),
            ExpressionNode::Text { text, .. } => f.write_str(text),
            ExpressionNode::Operator { symbol, .. } => write!(f, "{}", symbol),
            ExpressionNode::FreeFunctionCall { name, arguments, .. } => {
                write!(f, "{}", name)?;
                write_args(f, 0, arguments)
            }
            ExpressionNode::ObjectFunctionCall { object_name, name, arguments, .. } => {
                write!(f, "{}.{}", object_name, name)?;
                // the object name occupies the first slot by convention
                write_args(f, 1, arguments)
            }
            ExpressionNode::BehaviorFunctionCall {
                object_name,
                behavior_name,
                name,
                arguments,
                ..
            } => {
                write!(f, "{}.{}::{}", object_name, behavior_name, name)?;
                // object and behavior names occupy the first two slots
                write_args(f, 2, arguments)
            }
        }
    }
}
