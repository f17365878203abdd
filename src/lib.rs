//! Bounded-contention concurrency primitives.
//!
//! # Overview
//! `contention` provides three small, independent building blocks for state
//! shared between threads:
//!
//! - [`GuardedCounter`]: a counter whose increments are never lost or doubled.
//! - [`FairResource`]: a withdrawable balance behind a fair, reentrant
//!   [`FairLock`], with a zero-wait `try_withdraw` plus blocking, timed and
//!   retrying variants.
//! - [`ConcurrentScoreMap`]: a sharded key/score map with atomic
//!   update-if-present.
//!
//! Blocking calls take a [`CancellationToken`] instead of relying on thread
//! interruption, and [`WorkerGroup`] runs units of work on named threads and
//! joins them.
//!
//! # Features
//! - Futex-based locking, no poisoning: a lock is released normally on panic
//! - FIFO handoff in `FairLock`; `try_lock` never barges past waiters
//! - Per-shard locking in `ConcurrentScoreMap`
//!
//! # Examples
//! ```
//! use contention::{ConcurrentScoreMap, FairResource, FairResourceConfig, WithdrawResult};
//!
//! let scores = ConcurrentScoreMap::new();
//! scores.put("User1".to_string(), 10);
//! scores.update_if_present("User1", 5);
//! assert_eq!(scores.get("User1"), Some(15));
//!
//! let account = FairResource::with_config(100, FairResourceConfig::instant());
//! assert_eq!(
//!     account.try_withdraw(50).unwrap(),
//!     WithdrawResult::Applied { remaining: 50 }
//! );
//! ```
mod cancel;
mod config;
mod counter;
mod error;
mod fair_lock;
mod futex;
mod resource;
#[doc = include_str!("../README.md")]
mod score_map;
mod shards_map;
mod waiter;
mod worker;

pub use cancel::*;
pub use config::*;
pub use counter::*;
pub use error::*;
pub use fair_lock::*;
use futex::*;
pub use resource::*;
pub use score_map::*;
use shards_map::*;
use waiter::*;
pub use worker::*;
