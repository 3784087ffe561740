//! Hosts that drive a chat session.

pub mod cli;

pub use cli::CliChannel;
