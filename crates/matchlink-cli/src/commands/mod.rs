//! CLI subcommand implementations.

pub mod check;
pub mod play;
pub mod whoami;
