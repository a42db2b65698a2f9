//! Subcommand implementations

pub mod compose;
pub mod init;
pub mod list;
pub mod plugin;
pub mod status;
