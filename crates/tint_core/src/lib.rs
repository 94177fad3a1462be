//! Tint Core Runtime
//!
//! This crate provides the runtime primitives for the Tint styling engine:
//!
//! - **Cache Keys**: deterministic encoding of ordered key parts
//! - **Compute Cache**: reference-counted, create-on-miss value cache
//! - **Sweep Scheduling**: deferred, batched eviction with cancellation
//! - **Instance Identity**: per-consumer ids that make acquire idempotent
//!
//! # Example
//!
//! ```rust
//! use tint_core::{CacheKey, ComputeCache, InstanceId};
//!
//! let cache: ComputeCache<String> = ComputeCache::new();
//! let key = CacheKey::new().with("token").with("light");
//! let consumer = InstanceId::next();
//!
//! let value = cache
//!     .acquire(&key, consumer, || Ok::<_, ()>("computed".to_string()), |_| {})
//!     .unwrap();
//! assert_eq!(value, "computed");
//! assert_eq!(cache.ref_count(&key), Some(1));
//!
//! cache.release(&key, consumer);
//! cache.sweep();
//! assert!(cache.is_empty());
//! ```

pub mod cache;
pub mod instance;
pub mod key;
pub mod sweep;

pub use cache::ComputeCache;
pub use instance::InstanceId;
pub use key::{CacheKey, KeyError, KeyPart, KEY_SEPARATOR};
pub use sweep::SweepScheduler;
