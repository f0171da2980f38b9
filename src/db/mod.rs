//! Store B: the provider catalog (the authority on which provider is current).
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for bootstrapping an empty catalog (SQLite)
//! - `actor.rs`: the actor owning the connection pool

pub mod actor;
pub mod models;
pub mod schema;

pub use models::Provider;
pub use schema::SQLITE_INIT;

pub use actor::{DbActorArgs, DbActorHandle, spawn};
