//! Migration tooling: structural pre-filtering of external note
//! collections, link-signature domain partitioning, catalog-driven batch
//! import, and cross-domain link-map merging.
//!
//! Everything here is resumable through externally persisted state (scored
//! JSONL, catalogs with progress counters) rather than in-memory
//! continuation; a rerun after interruption picks up where the last saved
//! progress left off.

pub mod catalog;
pub mod error;
pub mod execute;
pub mod linkmap;
pub mod partition;
pub mod prefilter;

pub use catalog::{Catalog, CatalogEntry, Progress};
pub use error::{MigrateError, MigrateResult};
pub use execute::{run_batch, BatchOptions, BatchOutcome, AUTO_PROMOTE_THRESHOLD};
pub use linkmap::{merge_linkmaps, MergeReport};
pub use partition::{partition_domains, PartitionConfig, PartitionReport};
pub use prefilter::{prefilter_vault, PrefilterReport, ScoredNote, Tier};
