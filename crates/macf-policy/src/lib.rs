//! Policy manifest merge and hybrid search (C7): a layered TOML manifest
//! merged base-then-overlay, indexed into SQLite, and queried through four
//! retrievers fused by reciprocal rank fusion.

pub mod active;
pub mod db;
pub mod lexical;
pub mod merge;
pub mod search;

pub use active::{filter_active_policies, find_policy_file};
pub use db::Database;
pub use merge::{deep_merge, load_merged_manifest};
pub use search::{hybrid_search, Confidence, SearchResult, MAX_RESULTS, MIN_QUERY_LEN, RRF_K};
