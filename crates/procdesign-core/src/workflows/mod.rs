//! # Workflows Module
//!
//! Top-level entry points that orchestrate complete runs.
//!
//! - **Design Loop** ([`design_loop`]) - Proposes, validates, simulates and analyzes designs until
//!   the specifications are met, the iteration budget runs out, or a collaborator fails.
//! - **Artifacts** ([`artifacts`]) - Persists a finished run's history to an output directory.

pub mod artifacts;
pub mod design_loop;
