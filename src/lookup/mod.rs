//! # Lookup Execution
//!
//! Turns authenticated lookup requests into response envelopes: compiles
//! each requested group, runs it against the engine with the drift retry,
//! paginates, and normalizes rows for the API boundary.

pub mod errors;
mod executor;
mod normalize;
mod response;

pub use errors::{LookupError, LookupResult};
pub use executor::{LookupExecutor, LookupRequest, DEFAULT_PAGE_SIZE};
pub use normalize::{normalize_row, normalize_value, rows_to_json};
pub use response::{GroupData, ResponseEnvelope};
