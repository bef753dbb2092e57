use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Entry #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("Duplicate entry '{0}'")]
    Duplicate(String),

    #[error("'{name}': {field} must be a fraction between 0 and 1 (got {value})")]
    FractionOutOfBounds {
        name: String,
        field: &'static str,
        value: f64,
    },

    #[error("'{name}': {field} must be a finite, non-negative number (got {value})")]
    InvalidQuantity {
        name: String,
        field: &'static str,
        value: f64,
    },

    #[error("'{name}': {field} range has min {min} greater than max {max}")]
    InvertedRange {
        name: String,
        field: String,
        min: f64,
        max: f64,
    },

    #[error(
        "'{name}' has neither a chemical formula nor a CAS number; products are matched by chemical identity"
    )]
    MissingIdentity { name: String },

    #[error("Document contains no {0}")]
    EmptyDocument(&'static str),
}
