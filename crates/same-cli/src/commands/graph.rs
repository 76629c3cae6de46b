use same_config::VaultConfig;
use same_core::model::GraphNodeType;
use same_graph::GraphQuery;
use same_store::graph::find_node;

use crate::app;
use crate::cli::GraphCommands;

pub async fn execute(config: VaultConfig, command: GraphCommands) -> anyhow::Result<()> {
    let store = app::open_store(&config)?;
    let query = GraphQuery::new(&store);

    match command {
        GraphCommands::Stats => {
            let stats = query.get_stats()?;
            println!("nodes: {} (avg degree {:.2})", stats.total_nodes, stats.avg_degree);
            println!("edges: {}", stats.total_edges);
        }
        GraphCommands::Subgraph { note_path, depth } => {
            let Some(node) = find_node(&store, GraphNodeType::Note, &note_path)? else {
                println!("no graph node for {note_path}");
                return Ok(());
            };
            let subgraph = query.get_subgraph(node.id, depth)?;
            for n in &subgraph.nodes {
                println!("node  {} ({:?})", n.name, n.node_type);
            }
            for e in &subgraph.edges {
                println!("edge  {} -> {} [{:?}]", e.source_id, e.target_id, e.relationship);
            }
        }
    }
    Ok(())
}
