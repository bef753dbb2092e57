//! Layered run configuration: command-line flags, `-S` overrides, the TOML config file, the
//! environment, then built-in defaults.

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;
