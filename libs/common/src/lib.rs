//! Common library for the dive-spot community backend
//!
//! This crate provides the infrastructure shared by the services:
//! PostgreSQL connection pooling, schema migrations, and the common
//! database error types.

pub mod database;
pub mod error;
