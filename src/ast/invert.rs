//! Compile-time `invert`: reverses a literal and yields a new literal node.

use std::fmt;

use super::{literal, Expr};
use crate::span::Spanned;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvertError {
    /// The operand is not an integer or string literal.
    NotALiteral(&'static str),
    /// The reversed digits do not fit in a 64-bit signed integer.
    Overflow(String),
}

impl fmt::Display for InvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvertError::NotALiteral(kind) => {
                write!(f, "invert expects an Int or String literal, found {}", kind)
            }
            InvertError::Overflow(digits) => {
                write!(f, "inverted literal {} does not fit in Int", digits)
            }
        }
    }
}

/// Fold `invert(operand)` into a literal. Nested inverts fold inside-out,
/// so `invert(invert(12))` is `12`.
pub fn invert_literal(operand: &Spanned<Expr>) -> Result<Spanned<Expr>, InvertError> {
    let node = match &operand.node {
        Expr::Int(n) => Expr::Int(reverse_digits(*n)?),
        Expr::Str(raw) => {
            let reversed: String = literal::unquote(raw).chars().rev().collect();
            Expr::Str(literal::quote(&reversed))
        }
        Expr::Invert(inner) => return invert_literal(&invert_literal(inner)?),
        other => return Err(InvertError::NotALiteral(other.describe())),
    };
    Ok(Spanned::new(node, operand.span))
}

/// `123` → `321`, `-120` → `-21`.
fn reverse_digits(n: i64) -> Result<i64, InvertError> {
    let digits: String = n.unsigned_abs().to_string().chars().rev().collect();
    let text = if n < 0 {
        format!("-{}", digits)
    } else {
        digits
    };
    text.parse::<i64>().map_err(|_| InvertError::Overflow(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert_integer_literal() {
        let folded = invert_literal(&Expr::int(123)).unwrap();
        assert_eq!(folded.node, Expr::Int(321));
    }

    #[test]
    fn test_invert_string_literal() {
        let folded = invert_literal(&Expr::string("abc")).unwrap();
        assert_eq!(folded.node, Expr::Str("\"cba\"".to_string()));
    }

    #[test]
    fn test_invert_drops_leading_zeros_and_keeps_sign() {
        assert_eq!(invert_literal(&Expr::int(120)).unwrap().node, Expr::Int(21));
        assert_eq!(invert_literal(&Expr::int(-45)).unwrap().node, Expr::Int(-54));
        assert_eq!(invert_literal(&Expr::int(0)).unwrap().node, Expr::Int(0));
    }

    #[test]
    fn test_invert_string_reverses_unescaped_contents() {
        let folded = invert_literal(&Expr::string("a\n")).unwrap();
        assert_eq!(folded.node, Expr::Str("\"\\na\"".to_string()));
    }

    #[test]
    fn test_invert_nested_folds_inside_out() {
        let nested = Expr::invert(Expr::int(1234));
        assert_eq!(invert_literal(&nested).unwrap().node, Expr::Int(1234));
    }

    #[test]
    fn test_invert_rejects_variable() {
        let err = invert_literal(&Expr::ident("x")).unwrap_err();
        assert_eq!(err, InvertError::NotALiteral("variable"));
    }

    #[test]
    fn test_invert_rejects_double() {
        assert!(invert_literal(&Expr::double(1.5)).is_err());
    }

    #[test]
    fn test_invert_overflow_is_an_error() {
        let err = invert_literal(&Expr::int(1_999_999_999_999_999_999)).unwrap_err();
        assert!(matches!(err, InvertError::Overflow(_)));
    }

    #[test]
    fn test_invert_preserves_span() {
        let operand = Spanned::new(Expr::Int(12), crate::span::Span::new(4, 6));
        assert_eq!(invert_literal(&operand).unwrap().span, crate::span::Span::new(4, 6));
    }
}
