//! HTTP API for the caravel engagement tracker.
//!
//! Exposes the engagement document store over REST, publishes a sync
//! event for every committed mutation, and forwards those events to the
//! external git synchronization worker via [`caravel_events`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod query;
pub mod router;
pub mod routes;
pub mod state;
