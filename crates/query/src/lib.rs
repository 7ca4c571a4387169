pub mod client;
pub mod detail;
pub mod engine;
pub mod flatten;
pub mod kind;
pub mod otlp;
pub mod postfilter;
pub mod translate;

pub use client::{ApiClient, QueryExecutor};
pub use engine::QueryEngine;
