//! # Core Module
//!
//! Fundamental data structures and document I/O for the process design loop.
//!
//! ## Architecture
//!
//! - **Input and design models** ([`models`]) - Raw materials, product specifications, chemical
//!   identities, proposed process designs, their validated graph form, and simulation results
//! - **Document I/O** ([`io`]) - Loading JSON/TOML input documents and writing the history
//!   artifact of a run

pub mod io;
pub mod models;
