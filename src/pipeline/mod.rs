// src/pipeline/mod.rs
//! Scrape, normalize, dedup, enrich and verify, one stage after the other.
pub mod dedup;
pub mod enrichment;
pub(crate) mod fields;
pub mod normalizer;
pub mod orchestrator;
pub mod verification;

pub use dedup::{dedupe_by_company, DedupOutcome};
pub use enrichment::{enrich_jobs, EmailIndex};
pub use normalizer::{FieldAliases, JobNormalizer};
pub use orchestrator::{PipelineOrchestrator, PipelineProviders};
pub use verification::verify_jobs;
