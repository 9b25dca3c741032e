//! Command implementations

pub mod completions;
pub mod export;
pub mod import;
pub mod init;
pub mod part;
pub mod schema;
pub mod search;
