mod database;

pub use database::{CacheStats, Database, ParticipantLookup};

// Bump to drop and rebuild existing caches
pub const SCHEMA_VERSION: &str = "3";
