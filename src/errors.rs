use std::io;

use thiserror::Error;

use crate::primitives::Amount;

/// Every way a call against the insurance core can fail.
///
/// A failed call never leaves partial state behind; the error is the only
/// observable effect.
#[derive(Debug, Error)]
pub enum SuretyError {
    #[error("Contract is currently not operational")]
    NotOperational,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("Unknown flight: {0}")]
    UnknownFlight(String),

    #[error("Insurance amount {amount} exceeds cap of {cap}")]
    InsuranceCapExceeded { amount: Amount, cap: Amount },

    #[error("Duplicate vote: {0}")]
    DuplicateVote(String),

    #[error("Passenger already holds a policy for flight {0}")]
    DuplicatePolicy(String),

    #[error("Flight {0} has already been settled")]
    FlightSettled(String),

    #[error("Invalid flight status code: {0}")]
    InvalidStatusCode(u8),

    #[error("Flight or timestamp do not match an open oracle request")]
    UnknownRequest,

    #[error("Payout transfer failed: {0}")]
    TransferFailed(String),

    #[error("Arithmetic overflow on amount")]
    Overflow,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SuretyResult<T> = Result<T, SuretyError>;
