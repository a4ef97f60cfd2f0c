//! Storage, cache, and audit adapters for the Tessera authorization
//! service.
//!
//! The in-memory adapters back tests and local development; the Postgres
//! and Redis adapters are the production implementations of the same
//! ports.

#![forbid(unsafe_code)]

mod in_memory_audit_log;
mod in_memory_authorization_store;
mod in_memory_permission_cache;
mod postgres_audit_log;
mod postgres_authorization_store;
mod redis_permission_cache;

pub use in_memory_audit_log::InMemoryAuditLog;
pub use in_memory_authorization_store::InMemoryAuthorizationStore;
pub use in_memory_permission_cache::InMemoryPermissionCache;
pub use postgres_audit_log::PostgresAuditLog;
pub use postgres_authorization_store::PostgresAuthorizationStore;
pub use redis_permission_cache::RedisPermissionCache;
