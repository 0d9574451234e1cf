pub mod store;
mod team_cache;
pub mod writer;

pub use team_cache::{LearnOutcome, NotLearned, StoreCommand, TeamIdCache};
