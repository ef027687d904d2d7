use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    scrollbook::logging::init().context("init logging")?;

    let cli = scrollbook::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        scrollbook::cli::Command::Crawl(args) => {
            scrollbook::crawl::run(args).await.context("crawl")?;
        }
        scrollbook::cli::Command::Replay(args) => {
            scrollbook::crawl::replay(args).await.context("replay")?;
        }
        scrollbook::cli::Command::Transform(args) => {
            scrollbook::transform::run(args).context("transform")?;
        }
    }

    Ok(())
}
