//! feedmill CLI: fetch RSS/Atom feeds into Markdown, then translate,
//! summarize, and republish them in one idempotent batch pass.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
