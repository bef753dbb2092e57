//! # Core Models Module
//!
//! Data structures shared by every layer of the design loop.
//!
//! ## Key Components
//!
//! - [`chemical`] - Chemical identity (formula and registry number) used to match components
//! - [`material`] - Raw material inputs and their physical state
//! - [`specification`] - Product specifications, value ranges and custom property targets
//! - [`design`] - Process designs as returned by a proposer
//! - [`graph`] - Structural validation of a design into a connected unit/stream graph
//! - [`simulation`] - Simulation results: streams, blocks, convergence status
//! - [`error`] - Validation errors for the input model

pub mod chemical;
pub mod design;
pub mod error;
pub mod graph;
pub mod material;
pub mod simulation;
pub mod specification;
