//! Compute module - Archives, scheduling and search drivers for goal coverage.

mod clock;
mod fitness;
mod monitor;
mod scheduler;

pub mod archive;
pub mod search;
pub mod synthetic;

pub use archive::*;
pub use clock::*;
pub use fitness::*;
pub use monitor::*;
pub use scheduler::*;
pub use search::*;
