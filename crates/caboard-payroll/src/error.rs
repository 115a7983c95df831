use thiserror::Error;

use caboard_core::{MandateId, ValidationError};

/// Errors raised by payroll reconciliation.
#[derive(Error, Debug)]
pub enum PayrollError {
    #[error("mandate {0} not found")]
    MandateNotFound(MandateId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backing store failed to answer.
    #[error("payroll source unavailable: {0}")]
    Source(String),
}
