//! Command-line front end for pktbench
//!
//! Decodes and diffs hex frames offline, lists interfaces and prints the
//! layers of live traffic.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, Link};
pub use commands::run;
