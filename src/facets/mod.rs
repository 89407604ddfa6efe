pub mod query;
pub mod voteable;
pub mod voter;

pub use query::{SubjectQuery, VotePredicate, VotersQuery, VotesQuery};
pub use voteable::{CachedCounts, LoadedRelations, Voteable};
pub use voter::Voter;
