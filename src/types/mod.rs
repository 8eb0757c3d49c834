pub mod job;
pub mod request;

pub use job::{CanonicalJob, FilteredJob, VerificationStatus, NOT_AVAILABLE};
pub use request::{
    EnrichedResults, FilteredResults, RawResults, RequestStatus, RequestUpdate, ScrapeRequest,
};
