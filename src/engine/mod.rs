//! Execution engine for cfgsync
//!
//! The engine orchestrates:
//! 1. Planning - Compare manifest snapshots with the state file
//! 2. Diffing - Show what each change will do
//! 3. Executing - Run lifecycle calls in parallel and persist the outcomes

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, ExecuteSummary, confirm_proceed, execute};
pub use planner::Target;
