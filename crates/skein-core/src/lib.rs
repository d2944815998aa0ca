pub mod config;
pub mod constants;
pub mod models;
pub mod platforms;
pub mod query;
pub mod runtime;
pub mod store;
pub mod streaming;

// Re-export the engine surface at crate root for convenience
pub use runtime::{BatchOutcome, Engine, FetchBatch, PageInfo};
