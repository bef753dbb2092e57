use crate::core::models::error::ModelError;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Serialization formats accepted for input documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    /// Picks the format from a file extension (`.json` or `.toml`, case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => Ok(DocumentFormat::Json),
            Some("toml") => Ok(DocumentFormat::Toml),
            _ => Err(DocumentError::UnsupportedFormat {
                path: path.to_string_lossy().to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("File I/O error for '{path}': {source}")]
    Io { path: String, source: io::Error },

    #[error("JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },

    #[error("Unsupported document format for '{path}' (expected .json or .toml)")]
    UnsupportedFormat { path: String },

    #[error("Invalid document '{path}': {source}")]
    Invalid { path: String, source: ModelError },
}

/// Defines the interface for reading validated input documents.
///
/// Implementors only declare how to validate themselves; parsing and format detection are
/// shared.
pub trait InputDocument: DeserializeOwned {
    /// Checks the parsed document for semantic errors.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] describing the first problem found.
    fn validate(&self) -> Result<(), ModelError>;

    /// Reads and validates a document from a reader in the given format.
    ///
    /// `origin` names the source in error messages.
    fn read_from(
        reader: &mut impl Read,
        format: DocumentFormat,
        origin: &str,
    ) -> Result<Self, DocumentError> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| DocumentError::Io {
                path: origin.to_string(),
                source: e,
            })?;
        let document: Self = parse_str(&content, format, origin)?;
        document.validate().map_err(|e| DocumentError::Invalid {
            path: origin.to_string(),
            source: e,
        })?;
        Ok(document)
    }

    /// Reads and validates a document from a file, choosing the format by extension.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let origin = path.to_string_lossy().to_string();
        let file = File::open(path).map_err(|e| DocumentError::Io {
            path: origin.clone(),
            source: e,
        })?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, format, &origin)
    }
}

fn parse_str<T: DeserializeOwned>(
    content: &str,
    format: DocumentFormat,
    origin: &str,
) -> Result<T, DocumentError> {
    match format {
        DocumentFormat::Json => serde_json::from_str(content).map_err(|e| DocumentError::Json {
            path: origin.to_string(),
            source: e,
        }),
        DocumentFormat::Toml => toml::from_str(content).map_err(|e| DocumentError::Toml {
            path: origin.to_string(),
            source: e,
        }),
    }
}

/// Reads any JSON value (a saved design or simulation result) from a file without validation.
pub fn read_json_from_path<T: DeserializeOwned, P: AsRef<Path>>(
    path: P,
) -> Result<T, DocumentError> {
    let path = path.as_ref();
    let origin = path.to_string_lossy().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Io {
        path: origin.clone(),
        source: e,
    })?;
    parse_str(&content, DocumentFormat::Json, &origin)
}
