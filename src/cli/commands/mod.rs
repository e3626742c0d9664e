//! Command implementations

pub mod completions;
pub mod init;
pub mod run;
pub mod sweep;
pub mod validate;
