use std::path::PathBuf;

use clap::Parser;
use sedbot_core::config::ConfigOverrides;

/// sed-style corrections for chat rooms.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Read configuration from this file instead of `$SEDBOT_HOME/config.toml`.
    #[arg(long = "config", short = 'c', value_name = "PATH", global = true)]
    pub config_file: Option<PathBuf>,

    /// Wall-clock budget for one substitution, in milliseconds.
    #[arg(long = "timeout-ms", value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Messages remembered per room.
    #[arg(long = "history-capacity", value_name = "N", global = true)]
    pub history_capacity: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, clap::Subcommand)]
pub enum Command {
    /// Apply one statement to a piece of text and print the result.
    ///
    /// Exits with status 2 when the statement leaves the text unchanged.
    Apply(ApplyArgs),

    /// Feed JSON-lines inbound events through the processor and print every
    /// outbound gateway request as a JSON line.
    Replay(ReplayArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct ApplyArgs {
    /// Statement such as `s/teh/the/g`.
    pub expression: String,

    pub text: String,

    /// Parse with the rules of the `sed s...` trigger instead of the bare one.
    #[arg(long, default_value_t = false)]
    pub explicit: bool,

    /// Print the highlighted HTML rendition.
    #[arg(long, default_value_t = false)]
    pub html: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ReplayArgs {
    /// Events file; stdin when omitted.
    pub file: Option<PathBuf>,
}

impl Cli {
    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            history_capacity: self.history_capacity,
            exec_timeout_ms: self.timeout_ms,
            own_user_id: None,
            config_file: self.config_file.clone(),
        }
    }
}
