//! Per-instance field permission cache.
//!
//! Answers which [`FieldPermission`] records a role or a user holds within an
//! instance (tenant). Answers come from a per-instance snapshot that stays
//! valid while the instance's `adjuncts_timestamp` is unchanged. Use
//! [`Engine`] for queries and for writes that must be seen immediately.
//!
//! # Examples
//!
//! Querying through a process-local cache (enable `memory-store` and `memory-cache`):
//! ```no_run
//! use treemap_perms::{EngineBuilder, InstanceId, ModelName, RoleId};
//! # #[cfg(all(feature = "memory-store", feature = "memory-cache"))]
//! # {
//! use treemap_perms::{MemoryCache, MemoryStore};
//! let store = MemoryStore::new();
//! let instance = InstanceId::try_from("philadelphia").unwrap();
//! store.add_instance(instance.clone(), RoleId::try_from("public").unwrap());
//! let engine = EngineBuilder::new(store).cache(MemoryCache::new(64)).build();
//! let plot = ModelName::try_from("Plot").unwrap();
//! let _ = engine.permissions(None, &instance, Some(&plot));
//! # }
//! ```
#![forbid(unsafe_code)]

mod adjuncts;
mod cache;
mod config;
mod engine;
mod error;
mod permission;
mod store;
mod types;
#[cfg(feature = "memory-cache")]
mod memory_cache;

#[cfg(feature = "memory-store")]
mod memory_store;

#[cfg(feature = "axum")]
pub mod axum;

pub use crate::adjuncts::InstanceAdjuncts;
pub use crate::cache::{Cache, NoCache};
pub use crate::config::CacheSettings;
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::error::{Error, Result, StoreError};
pub use crate::permission::{FieldPermission, FieldPermissionKey, PermissionLevel};
pub use crate::store::{FieldPermissionStore, InstanceRecord, InstanceStore, Store, UserRoleStore};
pub use crate::types::{FieldName, InstanceId, ModelName, RoleId, UserId};

#[cfg(feature = "memory-store")]
pub use crate::memory_store::MemoryStore;

#[cfg(feature = "memory-cache")]
pub use crate::memory_cache::MemoryCache;
