//! Domain model structs and DTOs.
//!
//! The engagement entity mirrors the `engagements` table: scalar columns
//! as typed fields, nested collections as raw JSONB values. Inbound
//! payloads deserialize into a separate DTO with typed collections.

pub mod engagement;
