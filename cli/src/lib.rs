//! Library half of the `chatsync` binary: argument types and command
//! execution, kept here so they can be driven from tests.

mod args;
mod commands;

pub use args::{Cli, Command, KindArg};
pub use commands::{parse_key, resolve_config, run};
