//! livepreview: run a live preview session from the command line.

use clap::Parser;

mod cli;
mod cmd_classify;
mod cmd_run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("LIVEPREVIEW_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        cli::Command::Run(opts) => cmd_run::cmd_run(opts).await?,
        cli::Command::Classify(opts) => cmd_classify::cmd_classify(&opts)?,
    }
    Ok(())
}
