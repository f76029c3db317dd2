use rmcp::{ServiceExt, transport::stdio};
use symdex::{SearchConfig, server::SymbolServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    symdex::tracing::init();

    let config = SearchConfig::discover()?;
    tracing::info!(
        "Starting symdex MCP server (limit {}, cache {:?})",
        config.limit,
        config.cache_dir()
    );

    let server = SymbolServer::new(config);

    // Optional documentation directory to load before serving
    if let Some(dir) = std::env::args_os().nth(1) {
        match server.load(dir.into()).await {
            Ok(summary) => tracing::info!("{}", summary.trim_end()),
            Err(e) => tracing::warn!("Failed to preload documentation: {:#}", e),
        }
    }

    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Error serving MCP server: {:?}", e);
    })?;

    service.waiting().await?;

    Ok(())
}
