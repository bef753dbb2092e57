//! Loading of the structured input documents.
//!
//! Raw materials and product specifications arrive as JSON or TOML documents. The
//! [`traits::InputDocument`] trait gives every document type the same reading API, with format
//! detection by file extension and validation on load.

pub mod documents;
pub mod traits;
