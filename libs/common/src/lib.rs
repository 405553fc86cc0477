//! Shared infrastructure for the boutique microservices
//!
//! This crate provides the pieces every service needs: SQLite connection
//! pooling, the optional Redis cache client, shared error types, and the
//! JSON response envelope returned by every HTTP endpoint.

pub mod cache;
pub mod database;
pub mod error;
pub mod response;
