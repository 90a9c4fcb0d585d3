//! Entry-point for the `sedbot` binary.
use clap::Parser;
use sedbot_cli::Cli;
use sedbot_cli::run_main;

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let code = runtime.block_on(async {
        let cli = Cli::parse();
        run_main(cli).await
    })?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
