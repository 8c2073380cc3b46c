//! Processes
//!
//! Endpoints name processes, the arena owns them.

mod endpoint;
mod process;
mod table;

pub use endpoint::{Endpoint, SourceFilter, ANY_RAW};
pub use process::Process;
pub use table::ProcessTable;
