/// Persisted session entities and their state conversions.
pub mod models;
/// Session storage and retrieval operations.
pub mod session_store;
/// Storage abstraction layer shared by store backends.
pub mod storage;
