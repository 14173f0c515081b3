//! Scenario-based tests for stagewise

mod helpers;

mod composition;
mod failure_handling;
