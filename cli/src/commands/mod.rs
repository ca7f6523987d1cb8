//! CLI subcommand implementations.

pub mod cancel;
pub mod config;
pub mod serve;
pub mod status;
pub mod submit;
pub mod worker;
pub mod workers;
