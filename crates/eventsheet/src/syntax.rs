//! Character-level validation of arithmetic syntax.
//!
//! The math grammar strips every recognized function call out of the
//! expression (replacing each with the literal digit `0`) and runs the
//! residual text through this state machine. It accepts numbers (decimal
//! and scientific notation), the operators `+ - * / %`, and balanced
//! parentheses; anything else is an error.

use crate::error::{Diagnostic, ErrorKind, Span};

#[derive(Default)]
struct State {
    parenthesis_level: usize,
    parsing_number: bool,
    parsing_decimal: bool,
    parsing_scientific: bool,
    /// The next significant character must begin a number: set right after
    /// an `e` marker or a unary sign following an operator.
    request_number: bool,
    number_just_ended: bool,
}

impl State {
    fn end_number(&mut self) {
        if self.parsing_number {
            self.parsing_number = false;
            self.parsing_decimal = false;
            self.parsing_scientific = false;
            self.number_just_ended = true;
        }
    }
}

fn err(kind: ErrorKind, at: usize, message: &str) -> Result<(), Diagnostic> {
    Err(Diagnostic::new(kind, Span::at(at), message))
}

/// Check the residual text of a math expression for arithmetic validity.
///
/// Positions in the returned diagnostic are offsets into `text`, which is
/// the function-call-stripped residue, not the original expression.
pub fn validate(text: &str) -> Result<(), Diagnostic> {
    let mut state = State::default();
    let bytes = text.as_bytes();

    for (position, &byte) in bytes.iter().enumerate() {
        match byte {
            b' ' | b'\n' => {
                if state.request_number {
                    return err(ErrorKind::MissingNumber, position, "number expected");
                }
                state.end_number();
            }
            b'0'..=b'9' | b'.' | b'e' => {
                state.request_number = false;

                if byte == b'.' {
                    if !state.parsing_number {
                        return err(
                            ErrorKind::MalformedNumber,
                            position,
                            "a decimal point must follow a digit",
                        );
                    }
                    if state.parsing_decimal {
                        return err(
                            ErrorKind::MalformedNumber,
                            position,
                            "a number may have only one decimal point",
                        );
                    }
                    state.parsing_decimal = true;
                }

                if byte == b'e' {
                    if state.parsing_scientific {
                        return err(
                            ErrorKind::MalformedNumber,
                            position,
                            "a number may have only one scientific-notation marker",
                        );
                    }
                    state.parsing_scientific = true;
                    state.request_number = true;
                }

                if state.number_just_ended {
                    return err(
                        ErrorKind::MissingOperator,
                        position,
                        "operator missing before a number",
                    );
                }

                state.parsing_number = true;
            }
            b')' => {
                if state.request_number {
                    return err(ErrorKind::MissingNumber, position, "number expected");
                }
                // checked before the operand check, which would otherwise
                // always fire first on `()`
                if position > 0 && bytes[position - 1] == b'(' {
                    return err(ErrorKind::EmptyParentheses, position, "empty parentheses");
                }
                state.end_number();
                if !state.number_just_ended {
                    return err(
                        ErrorKind::MissingNumber,
                        position,
                        "superfluous operator before a parenthesis",
                    );
                }
                if state.parenthesis_level == 0 {
                    return err(
                        ErrorKind::UnterminatedParenthesis,
                        position,
                        "closing parenthesis was never opened",
                    );
                }
                state.parenthesis_level -= 1;
            }
            b'(' => {
                if state.request_number {
                    return err(ErrorKind::MissingNumber, position, "number expected");
                }
                state.end_number();
                if state.number_just_ended {
                    return err(
                        ErrorKind::MissingOperator,
                        position,
                        "operator missing before a parenthesis",
                    );
                }
                state.parenthesis_level += 1;
                state.number_just_ended = false;
            }
            b'+' | b'-' | b'*' | b'/' | b'%' => {
                if byte == b'-' && state.parsing_number && state.parsing_scientific {
                    // the sign of a scientific-notation exponent
                    state.request_number = true;
                } else {
                    if state.request_number {
                        return err(ErrorKind::MissingNumber, position, "number expected");
                    }
                    state.end_number();
                    if byte != b'-' && byte != b'+' && !state.number_just_ended {
                        return err(
                            ErrorKind::MissingNumber,
                            position,
                            "operators without any number between them",
                        );
                    }
                    state.number_just_ended = false;
                }
            }
            _ => {
                return err(
                    ErrorKind::InvalidCharacter,
                    position,
                    "character with no meaning in an arithmetic expression",
                );
            }
        }
    }

    if state.request_number {
        return err(ErrorKind::MissingNumber, text.len(), "number expected");
    }
    state.end_number();

    if state.parenthesis_level != 0 {
        return err(
            ErrorKind::UnterminatedParenthesis,
            text.len(),
            "parenthesis mismatch",
        );
    }

    if !state.number_just_ended {
        return err(
            ErrorKind::DanglingToken,
            text.len(),
            "dangling operator at the end of the expression",
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(text: &str) -> ErrorKind {
        validate(text).expect_err("expected invalid").kind()
    }

    #[test]
    fn accepts_plain_arithmetic() {
        assert!(validate("1+2*3").is_ok());
        assert!(validate("0").is_ok());
        assert!(validate("(1+2)*3 - 4 % 5").is_ok());
        assert!(validate("-1 + +2").is_ok());
    }

    #[test]
    fn scientific_notation() {
        assert!(validate("1e5").is_ok());
        assert!(validate("1e-5").is_ok());
        assert!(validate("1.5e3 + 2").is_ok());
        assert_eq!(kind_of("1ee5"), ErrorKind::MalformedNumber);
        assert_eq!(kind_of("1e"), ErrorKind::MissingNumber);
    }

    #[test]
    fn rejects_operator_misuse() {
        assert_eq!(kind_of("1+"), ErrorKind::DanglingToken);
        assert_eq!(kind_of("1 2"), ErrorKind::MissingOperator);
        assert_eq!(kind_of("1**2"), ErrorKind::MissingNumber);
    }

    #[test]
    fn rejects_bad_parentheses() {
        assert_eq!(kind_of("(1+2"), ErrorKind::UnterminatedParenthesis);
        assert_eq!(kind_of("1+2)"), ErrorKind::UnterminatedParenthesis);
        assert_eq!(kind_of("()"), ErrorKind::EmptyParentheses);
    }

    #[test]
    fn rejects_foreign_characters() {
        assert_eq!(kind_of("1+a"), ErrorKind::InvalidCharacter);
    }

    #[test]
    fn error_positions() {
        assert_eq!(validate("1 2").unwrap_err().position(), 2);
        assert_eq!(validate("(1+2").unwrap_err().position(), 4);
        assert_eq!(validate("()").unwrap_err().position(), 1);
        assert_eq!(validate("1+()").unwrap_err().position(), 3);
    }
}
