//! # procdesign Core Library
//!
//! A feedback-loop controller for language-model driven chemical process design. A proposer
//! suggests a flowsheet, an external simulator evaluates it, and the results are checked against
//! product specifications until they are met or the iteration budget runs out.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`RawMaterial`, `ProductSpecification`,
//!   `ProcessDesign`, `SimulationResult`), the structural `ProcessGraph`, and input document
//!   loading.
//!
//! - **[`engine`]: The Logic Core.** Loop configuration, the collaborator boundaries
//!   (`DesignProposer`, `SimulationBackend`), the pure `analyzer`, the verdict and history types,
//!   feedback rendering, and progress reporting.
//!
//! - **[`workflows`]: The Public API.** The design loop that ties proposer, simulator and analyzer
//!   together into a bounded iterate-until-satisfied run, and the writer for its history artifact.

pub mod core;
pub mod engine;
pub mod workflows;
