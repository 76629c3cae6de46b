use anyhow::Result;
use clap::Parser;

use same_cli::cli::{Cli, Commands};
use same_cli::commands;
use same_config::VaultConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = format!("same_cli={log_level},same_index={log_level},same_search={log_level}");
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .init();

    let mut config = VaultConfig::load(cli.config, cli.embedding_url, cli.embedding_model)?;
    if let Some(vault_path) = cli.vault_path {
        config.vault_path = vault_path;
    }

    match cli.command {
        Commands::Index { force, lite } => commands::index::execute(config, force, lite).await?,

        Commands::Search {
            query,
            top_k,
            domain,
            workstream,
            agent,
            tags,
        } => commands::search::execute(config, query, top_k, domain, workstream, agent, tags).await?,

        Commands::Similar { note_path, top_k } => {
            commands::search::execute_similar(config, note_path, top_k).await?
        }

        Commands::Stats => commands::stats::execute(config).await?,

        Commands::Graph { command } => commands::graph::execute(config, command).await?,
    }

    Ok(())
}
