// Adapters layer: concrete implementations for external systems.

pub mod http;
pub mod sheet_store;

pub use http::{AgentClient, AgentMetadata, HttpFetcher};
pub use sheet_store::CsvSheetStore;
