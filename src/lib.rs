pub mod cache;
pub mod config;
pub mod doxygen;
pub mod error;
pub mod format;
pub mod record;
pub mod search;
pub mod server;
pub mod session;
pub mod store;
pub mod tracing;

pub use config::SearchConfig;
pub use record::{Record, RecordId, SymbolKind};
pub use search::{Index, IndexBuilder, QueryEngine};
pub use session::QuerySession;
pub use store::RecordStore;
