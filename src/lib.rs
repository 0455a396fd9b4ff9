//! tagtrend library
//!
//! Query reduction, a persistent TTL cache and bounded parallel lookups for
//! checking which hashtags are trending. The binary wires these together; the
//! modules are exposed for integration tests and reuse.

pub mod cache;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod trending;

pub use cache::{CacheStore, FileCache, MemoryCache};
pub use config::{ConfigError, TrendConfig};
pub use fetch::{ApiToken, ApifyClient, FetchError, ParallelFetcher, TrendSource};
pub use pipeline::{Origin, PipelineOutput, Resolution, TrendPipeline};
pub use report::TrendReport;
