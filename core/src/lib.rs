//! Root of the `sedbot-core` library.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output must go through the Chat Gateway or the tracing stack.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod config;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod highlight;
pub mod processor;
pub mod protocol;
pub mod statement;
mod template;
pub mod tracker;
pub mod trigger;

pub use config::Config;
pub use config::ConfigOverrides;
pub use error::SedErr;
pub use gateway::ChatGateway;
pub use processor::CommandProcessor;
pub use tracker::ConversationTracker;
