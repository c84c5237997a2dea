//! # productcrawl-reliability
//!
//! Rate-limited batched source actor, the per-source/per-second
//! counter-store-backed token check it dispatches through, and generic
//! retry/backoff for the fetch loop.

pub mod actor;
pub mod counter_store;
pub mod rate_limiter;
pub mod retry;

pub use actor::{ActorHandle, BatchExecutor, spawn_batched_actor};
pub use counter_store::{CounterStore, InMemoryCounterStore};
pub use rate_limiter::{check_rate_limit_per_second, millis_until_next_second};
pub use retry::{retry_with_backoff, RetryPolicy};
