use std::fmt;

/// Expression evaluation outcome: either the numeric value or a classified error
pub type CalcResult = Result<f64, CalcError>;
pub(crate) type CalcErrorResult = Result<(), CalcError>;

/// Everything that can go wrong between the raw input string and the
/// formatted result. Every variant is recoverable: the top-level boundary
/// renders it as an "Error: <reason>" string instead of propagating a fault.
#[derive(Clone, PartialEq)]
pub enum CalcError {
    /// Input is blank or whitespace-only
    EmptyExpression,
    /// A '%' token could not be classified as adjustment, fraction, or
    /// modulo. Carries the character position of the token
    AmbiguousPercent(usize),
    /// Counts of '(' and ')' differ after substitution
    UnbalancedParentheses,
    /// Math-domain violation resolved at preprocessing time,
    /// e.g. factorial of a negative or non-integral number
    DomainError(String),
    /// The canonical expression is not valid under the closed arithmetic
    /// grammar. Carries the offending position
    SyntaxError(usize),

    Unreachable,
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            CalcError::EmptyExpression => write!(f, "Empty expression"),
            CalcError::AmbiguousPercent(pos) => {
                write!(f, "Cannot classify '%' at position {}", pos)
            }
            CalcError::UnbalancedParentheses => write!(f, "Mismatched parentheses"),
            CalcError::DomainError(s) => write!(f, "Domain error: {}", s),
            CalcError::SyntaxError(pos) => write!(f, "Invalid expression at position {}", pos),
            CalcError::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl fmt::Debug for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            CalcError::EmptyExpression => write!(f, "EmptyExpression"),
            CalcError::AmbiguousPercent(pos) => write!(f, "AmbiguousPercent({})", pos),
            CalcError::UnbalancedParentheses => write!(f, "UnbalancedParentheses"),
            CalcError::DomainError(s) => write!(f, "DomainError({})", s),
            CalcError::SyntaxError(pos) => write!(f, "SyntaxError({})", pos),
            CalcError::Unreachable => write!(f, "Unreachable"),
        }
    }
}
