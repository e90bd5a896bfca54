use thiserror::Error;

mod domain_types;
mod ids;
mod request_key;

pub use domain_types::*;
pub use ids::*;
pub use request_key::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Value out of bounds for {field}: {value}, expected {min}..={max}")]
    OutOfBounds {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("Invalid API credentials: {reason}")]
    InvalidCredentials { reason: String },

    #[error("Unknown category: {name} (known: {known})")]
    UnknownCategory { name: String, known: String },
}
