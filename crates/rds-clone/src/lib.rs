//! rds-clone - query a throwaway copy of a production RDS instance
//!
//! Restores a clone from the newest snapshot of a source instance, waits
//! for it, runs a batch of SQL statements, exports each result to CSV and
//! deletes the clone again. Every resource the tool creates carries two
//! ownership tags so abandoned clones can be found and removed later.

pub mod aws;
pub mod config;
pub mod orchestrator;
pub mod query;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;
