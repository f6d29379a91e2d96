//! CLI subcommands

pub mod baseline;
pub mod clean;
pub mod list;
pub mod run;
