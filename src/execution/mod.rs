//! Pipeline execution engine

pub mod boundary;
pub mod compose;
pub mod runner;

pub use boundary::{JsonResponder, Middleware, Responder};
pub use compose::{branch, debug, pick, pipe, promisify, tap, Promised};
pub use runner::{run, run_node, run_stage};
