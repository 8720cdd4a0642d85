#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! # simons - simple monitors
//!
//! In-process counters and stopwatches, organized in a named hierarchy, with near-zero
//! overhead when switched off.
//!
//! # The hierarchy
//!
//! Every monitor (a "Simon") lives in a [`Registry`] under a dot-delimited name such as
//! `app.db.query`. Asking for a name creates the Simon on first use, together with
//! placeholders for every missing ancestor. The root is the placeholder with the empty name.
//!
//! ```
//! use simons::{Registry, SimonKind};
//!
//! let registry = Registry::new();
//!
//! let queries = registry.stopwatch("app.db.query").unwrap();
//!
//! assert_eq!(registry.get("app.db").unwrap().kind(), SimonKind::Unknown);
//!
//! // A placeholder becomes a real Simon when it is requested as one.
//! let requests = registry.counter("app").unwrap();
//! assert_eq!(registry.get("app").unwrap().kind(), SimonKind::Counter);
//! # drop((queries, requests));
//! ```
//!
//! # Counters and stopwatches
//!
//! A [`Counter`] tracks a value with its extremes and the sums of all increments and
//! decrements. A [`Stopwatch`] measures [`Split`]s and keeps their total, count, extremes,
//! concurrency peak and, optionally, mean and variance.
//!
//! ```
//! use simons::Registry;
//!
//! let registry = Registry::new();
//! let stopwatch = registry.stopwatch("app.work").unwrap();
//!
//! let split = stopwatch.start();
//! // ... the work being measured ...
//! split.stop();
//!
//! let sample = stopwatch.sample();
//! assert_eq!(sample.counter(), 1);
//! assert_eq!(sample.active(), 0);
//! ```
//!
//! # Enabling and disabling
//!
//! Each Simon is explicitly [enabled][SimonState::Enabled], explicitly
//! [disabled][SimonState::Disabled] or [inherits][SimonState::Inherit] from its parent. A
//! disabled Simon ignores all recording calls after checking a single atomic flag.
//!
//! ```
//! use simons::{Registry, SimonState};
//!
//! let registry = Registry::new();
//! let hits = registry.counter("cache.hits").unwrap();
//!
//! registry
//!     .set_state(&registry.get("cache").unwrap(), SimonState::Disabled, false)
//!     .unwrap();
//!
//! hits.increase();
//! assert_eq!(hits.value(), 0);
//! ```
//!
//! # Sampling
//!
//! [`Counter::sample()`] and [`Stopwatch::sample()`] return consistent snapshots.
//! `sample_increment(key)` returns what changed since the previous call with the same key,
//! so several independent consumers can each follow their own deltas. A [`Purger`] forgets
//! keys that are no longer sampled.
//!
//! # Callbacks
//!
//! A [`Callback`] observes structural events (Simons created and destroyed, the registry
//! cleared) and recording events (splits started and stopped, counters changed). Callbacks
//! run on the thread that caused the event, after every internal lock has been released.

mod callback;
mod clock;
mod configuration;
mod counter;
mod error;
mod incremental;
mod kind;
mod name;
mod online_stats;
mod pattern;
mod present;
mod purger;
mod registry;
mod sample;
mod simon;
mod split;
mod stopwatch;
mod tree;

pub use callback::*;
pub use clock::*;
pub use configuration::*;
pub use counter::*;
pub use error::*;
pub use kind::*;
pub use name::*;
pub use online_stats::*;
pub use pattern::*;
pub use present::*;
pub use purger::*;
pub use registry::*;
pub use sample::*;
pub use simon::*;
pub use split::*;
pub use stopwatch::*;
