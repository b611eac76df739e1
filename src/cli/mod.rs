//! CLI command handlers
//!
//! Each subcommand is implemented in its own module and exposes `handle`.

pub mod counter;
pub mod helpers;
pub mod import;
pub mod init;
pub mod pairing;
pub mod results;
pub mod stats;
