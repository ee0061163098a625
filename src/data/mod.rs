//! Data module - file loading, caching and cleaning

mod cache;
mod loader;
mod processor;

pub use cache::{CacheKey, EvictionPolicy, LoadCache, DEFAULT_CACHE_CAPACITY};
pub use loader::{extension_of, is_missing_token, DataLoader, FileRecord, SourceFormat, MISSING_TOKENS};
pub use processor::{is_numeric_dtype, DataProcessor, FilledColumn, Imputation};
