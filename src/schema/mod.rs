//! Schema module - Configuration, problem and report types for coverage search.

mod config;
mod problem;
mod report;

pub use config::*;
pub use problem::*;
pub use report::*;
