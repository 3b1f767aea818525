//! Repository structs providing database access for the engagement
//! store. All queries go through `EngagementRepo`.

pub mod engagement_repo;

pub use engagement_repo::EngagementRepo;
