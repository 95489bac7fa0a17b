use thiserror::Error;

/// Errors raised by the fixed-point math.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("argument outside the domain of {0}")]
    Domain(&'static str),
}

pub type MathResult<T> = std::result::Result<T, MathError>;
