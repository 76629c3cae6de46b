use same_config::VaultConfig;
use same_search::{SearchOptions, Searcher};

use crate::app;

pub async fn execute(
    config: VaultConfig,
    query: String,
    top_k: usize,
    domain: Option<String>,
    workstream: Option<String>,
    agent: Option<String>,
    tags: Vec<String>,
) -> anyhow::Result<()> {
    let store = app::open_store(&config)?;
    let embedder = app::build_embedder(&config).ok();
    let searcher = Searcher::new(store, embedder);

    let opts = SearchOptions {
        top_k,
        domain,
        workstream,
        agent,
        tags,
    };
    let hits = searcher.search(&query, &opts).await?;

    if hits.is_empty() {
        println!("no matches");
        return Ok(());
    }
    for hit in hits {
        let title = hit.title.as_deref().unwrap_or("(untitled)");
        println!("{:.3}  {}  [{}]", hit.score, title, hit.path);
        println!("    {}", hit.snippet);
    }
    Ok(())
}

pub async fn execute_similar(config: VaultConfig, note_path: String, top_k: usize) -> anyhow::Result<()> {
    let store = app::open_store(&config)?;
    let searcher = Searcher::new(store, None);
    let hits = searcher.find_similar(&note_path, top_k).await?;

    if hits.is_empty() {
        println!("no similar notes found");
        return Ok(());
    }
    for hit in hits {
        let title = hit.title.as_deref().unwrap_or("(untitled)");
        println!("{:.3}  {}  [{}]", hit.score, title, hit.path);
    }
    Ok(())
}
