//! MCP server exposing symbol search over loaded documentation.

use crate::cache::IndexCache;
use crate::config::{SearchConfig, expand_tilde};
use crate::doxygen;
use crate::format::render_hits;
use crate::record::SymbolKind;
use crate::search::{Index, QueryEngine, SnapshotVersion};
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars::{self, JsonSchema, generate::SchemaSettings},
    tool, tool_handler, tool_router,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Suggestions offered when a search finds nothing.
const SUGGESTION_COUNT: usize = 5;

/// Parameters for the load_docs tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct LoadDocsRequest {
    /// Directory containing the generated `search/*.js` tables
    pub path: String,
}

/// Parameters for the search_symbols tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SearchSymbolsRequest {
    /// Symbol name, prefix or substring. Several words narrow by scope
    /// ("basic_string append").
    pub query: String,
    /// Maximum number of results to return
    #[serde(default)]
    pub limit: Option<usize>,
    /// Restrict results to one kind: type, function, variable, macro,
    /// namespace, file or page
    #[serde(default)]
    pub kind: Option<String>,
}

/// MCP server answering symbol searches against the current snapshot.
#[derive(Clone)]
pub struct SymbolServer {
    config: Arc<SearchConfig>,
    cache: Option<IndexCache>,
    /// Snapshot being served. Replaced wholesale on reload.
    index: Arc<RwLock<Option<Arc<Index>>>>,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for SymbolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolServer")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[tool_router]
impl SymbolServer {
    pub fn new(config: SearchConfig) -> Self {
        let cache = config.cache_dir().map(IndexCache::new);
        Self {
            config: Arc::new(config),
            cache,
            index: Arc::new(RwLock::new(None)),
            tool_router: Self::tool_router(),
        }
    }

    /// Currently served index, if documentation has been loaded.
    pub async fn index(&self) -> Option<Arc<Index>> {
        self.index.read().await.clone()
    }

    /// Loads a documentation directory and makes it the served snapshot.
    pub async fn load(&self, dir: PathBuf) -> crate::error::Result<String> {
        let load_dir = dir.clone();
        let records = tokio::task::spawn_blocking(move || doxygen::load_dir(&load_dir)).await??;

        let version = SnapshotVersion::of(&records);
        let cached = match &self.cache {
            Some(cache) => cache.load(version).await,
            None => None,
        };

        let (index, rejected) = match cached {
            Some(index) => (Arc::new(index), Vec::new()),
            None => {
                let build = tokio::task::spawn_blocking(move || Index::build(records)).await?;
                let index = Arc::new(build.index);
                if let Some(cache) = &self.cache
                    && let Err(e) = cache.store(Arc::clone(&index)).await
                {
                    tracing::warn!("Failed to cache index: {}", e);
                }
                (index, build.rejected)
            }
        };

        let stats = index.stats();
        let mut response = format!(
            "Loaded {} symbols in {} buckets from {} (snapshot {})\n",
            stats.records,
            stats.buckets,
            dir.display(),
            index.snapshot_version()
        );
        if !rejected.is_empty() {
            let _ = writeln!(response, "\nRejected {} records:", rejected.len());
            for error in &rejected {
                let _ = writeln!(response, "• {}", error);
            }
        }

        *self.index.write().await = Some(index);
        Ok(response)
    }

    /// Runs a search against the served snapshot and renders it as text.
    pub async fn search(&self, request: SearchSymbolsRequest) -> Result<String, String> {
        let Some(index) = self.index().await else {
            return Err("No documentation loaded. Use load_docs first.".to_string());
        };

        let kind = match request.kind.as_deref() {
            Some(name) => Some(
                SymbolKind::parse(name).ok_or_else(|| format!("Unknown symbol kind '{}'", name))?,
            ),
            None => None,
        };

        let engine = QueryEngine::new(index);
        let limit = self.config.effective_limit(request.limit);
        let hits = engine.search_hits(&request.query, limit, kind);
        let suggestions = if hits.is_empty() {
            engine.suggest(&request.query, SUGGESTION_COUNT)
        } else {
            Vec::new()
        };
        Ok(render_hits(&request.query, &hits, &suggestions))
    }

    #[tool(
        description = "Load generated documentation search tables (the `search` directory of an HTML documentation build) and index their symbols. Replaces any previously loaded documentation."
    )]
    async fn load_docs(
        &self,
        Parameters(LoadDocsRequest { path }): Parameters<LoadDocsRequest>,
    ) -> std::result::Result<String, String> {
        let dir = expand_tilde(Path::new(&path));
        self.load(dir)
            .await
            .map_err(|e| format!("Failed to load documentation: {:#}", e))
    }

    #[tool(
        description = "Search loaded documentation for symbols by name. Exact names rank first, then name prefixes, scope segments and substrings. Case-insensitive.",
        input_schema = inline_schema_for_type::<SearchSymbolsRequest>()
    )]
    async fn search_symbols(
        &self,
        Parameters(request): Parameters<SearchSymbolsRequest>,
    ) -> std::result::Result<String, String> {
        self.search(request).await
    }
}

#[tool_handler]
impl ServerHandler for SymbolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::from_build_env())
            .with_instructions(
                "symdex: fast symbol lookup over generated API documentation. \
                 Use load_docs with a documentation search directory, then search_symbols."
                    .to_string(),
            )
    }
}

/// Generate an inline JSON schema for MCP tools
///
/// Unlike rmcp's default `schema_for_type()`, this sets `inline_subschemas = true`
/// so nested definitions are inlined instead of referenced through `$ref`.
pub fn inline_schema_for_type<T: JsonSchema>() -> Arc<JsonObject> {
    let mut settings = SchemaSettings::draft07();
    settings.transforms = vec![Box::new(schemars::transform::AddNullable::default())];
    settings.inline_subschemas = true;

    let generator = settings.into_generator();
    let schema = generator.into_root_schema_for::<T>();
    match serde_json::to_value(schema) {
        Ok(serde_json::Value::Object(object)) => Arc::new(object),
        _ => Arc::new(JsonObject::new()),
    }
}
