// Application layer - orchestration against the remote ledger.
// Scope resolution, paginated fetching and joining feed the aggregator,
// which hands finished record sets to the io layer.

mod aggregator;
pub mod error;
mod fetcher;
mod joiner;
pub mod reporting;
pub mod scope;

pub use aggregator::*;
pub use error::*;
pub use fetcher::*;
pub use joiner::*;
pub use reporting::*;
