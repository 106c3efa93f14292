//! Data types and storage.
//!
//! - `api` holds request and response bodies.
//! - `db` holds stored records.
//! - `common` holds the pure logic shared between them.

pub mod api;
pub mod auth;
pub mod common;
pub mod db;
pub mod memory;
pub mod mongodb;
pub mod store;
