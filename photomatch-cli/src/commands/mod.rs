//! Subcommand implementations.

pub mod auto;
pub mod commit;
pub mod next;
pub mod skip;
