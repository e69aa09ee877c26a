//! Command implementations for beddb CLI

pub mod aggregate;
pub mod info;
pub mod query;
