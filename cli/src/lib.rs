mod cli;
mod replay;

use std::io::Write;

pub use cli::ApplyArgs;
pub use cli::Cli;
pub use cli::Command;
pub use cli::ReplayArgs;
use sedbot_core::config::Config;
use sedbot_core::executor::BoundedExecutor;
use sedbot_core::highlight::highlight;
use sedbot_core::statement::parse_with_rules;
use sedbot_core::trigger::TriggerSurface;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit status of `apply` when the statement matched nothing.
pub const NO_CHANGE_EXIT_CODE: i32 = 2;

/// Run the parsed command line and return the process exit status.
pub async fn run_main(cli: Cli) -> anyhow::Result<i32> {
    let default_level = "error";
    let _ = tracing_subscriber::fmt()
        // Fallback to the `default_level` log filter if the environment
        // variable is not set _or_ contains an invalid value
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::load_with_overrides(cli.config_overrides())?;
    debug!("loaded config: {config:?}");

    match cli.command {
        Command::Apply(args) => run_apply(&config, &args).await,
        Command::Replay(args) => {
            replay::run_replay(config, args.file.as_deref()).await?;
            Ok(0)
        }
    }
}

async fn run_apply(config: &Config, args: &ApplyArgs) -> anyhow::Result<i32> {
    let surface = if args.explicit {
        TriggerSurface::Explicit
    } else {
        TriggerSurface::Bare
    };
    let statement = parse_with_rules(&args.expression, config.triggers.rules_for(surface))?;
    let executor = BoundedExecutor::new(config.exec_timeout);
    let replaced = executor.execute(&statement, &args.text).await?;
    if replaced == args.text {
        return Ok(NO_CHANGE_EXIT_CODE);
    }

    let output = if args.html {
        highlight(&replaced, &args.text, statement.highlight_edits)
    } else {
        replaced
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(0)
}
