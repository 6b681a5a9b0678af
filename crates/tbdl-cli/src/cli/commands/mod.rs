//! CLI command handlers, one per file.

mod checksum;
mod resolve;
mod run;

pub use checksum::run_checksum;
pub use resolve::run_resolve;
pub use run::{run_share_command, RunArgs};
