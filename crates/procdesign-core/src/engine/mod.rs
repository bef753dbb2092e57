//! # Engine Module
//!
//! The evaluation machinery of the design loop: everything between "a design was proposed" and
//! "the loop knows what to do next".
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Loop limits, tolerances and timeouts behind a validating builder
//! - **Collaborators** ([`proposer`], [`simulator`]) - Capability traits for the language model and
//!   the simulation application, plus their error taxonomies
//! - **Analysis** ([`analyzer`], [`verdict`]) - The pure comparison of simulation output against
//!   product specifications
//! - **History** ([`history`], [`feedback`]) - The append-only audit trail and the corrective
//!   feedback derived from it
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Engine-level errors

pub mod analyzer;
pub mod config;
pub mod error;
pub mod feedback;
pub mod history;
pub mod progress;
pub mod proposer;
pub mod simulator;
pub mod verdict;
