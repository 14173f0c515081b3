//! Core domain models
//!
//! This module defines the data that flows through a pipeline, the stage
//! contract, and the construction-time checks on pipeline shape.

pub mod config;
pub mod context;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod stage;
pub mod structure;
pub mod validation;

pub use context::*;
pub use error::*;
pub use merge::{merge, merge_all, Data};
pub use pipeline::*;
pub use stage::*;
pub use validation::{rules, FieldSpec, FieldSpecs, Rule, ValidationSpec};
