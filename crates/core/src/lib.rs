//! Domain types and pure logic for the caravel engagement tracker.
//!
//! Everything in this crate is datastore- and transport-agnostic:
//! the engagement value types and their mutation helpers, the field-name
//! normalizer, the include/exclude/paging option resolver, the git hook
//! payload model, and the shared error taxonomy.

pub mod engagement;
pub mod error;
pub mod fields;
pub mod filter;
pub mod hook;
pub mod types;

pub use error::CoreError;
