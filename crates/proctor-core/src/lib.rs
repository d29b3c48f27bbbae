//! proctor-core — Rubric evaluation and the proctored session machine.
//!
//! This crate defines the data model, the tolerant markup parser, rubric
//! tables and their evaluator, and the session controller that the rest of
//! proctor builds on.

pub mod checks;
pub mod error;
pub mod evaluator;
pub mod markup;
pub mod model;
pub mod parser;
pub mod report;
pub mod rubric;
pub mod session;
pub mod traits;
