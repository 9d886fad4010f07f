//! Subcommand implementations

pub mod init;
pub mod mappings;
pub mod run;
