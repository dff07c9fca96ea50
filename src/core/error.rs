use thiserror::Error;

use super::types::LoanType;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoanError {
    #[error("Invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Loan parameters out of allowed range")]
    OutOfRange,

    #[error("Loan-to-Value ratio {ltv:.2}% exceeds maximum allowed {max:.2}%")]
    LtvExceeded { ltv: f64, max: f64 },

    #[error("Debt-to-Income ratio {dti:.2}% exceeds maximum allowed {max:.2}%")]
    DtiExceeded { dti: f64, max: f64 },

    #[error("Loan type {requested} does not match product type {expected}")]
    LoanTypeMismatch {
        expected: LoanType,
        requested: LoanType,
    },

    #[error("Loan product not found: {0}")]
    ProductNotFound(u32),

    #[error("Invalid loan product {id}: {reason}")]
    InvalidProduct { id: u32, reason: String },
}

impl LoanError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        LoanError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
