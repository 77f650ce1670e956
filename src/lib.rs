//! # rxcore: a reactive-streams execution core
//!
//! Push-based streams with structured cancellation, pluggable scheduling and
//! composable operators.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let seen = MutArc::own(vec![]);
//! let c_seen = seen.clone();
//! observable::from_iter::<_, ()>(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(move |v| c_seen.rc_deref_mut().push(v));
//! assert_eq!(*seen.rc_deref_mut(), vec![0, 4, 8, 12, 16]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Subscription`] / [`CompositeSubscription`] | Cancellation handles; composites cancel everything attached to them |
//! | [`Scheduler`] / [`Worker`] | When and where work runs; a worker dies with its lifetime |
//! | [`Observer`] / [`Subscriber`] | The consumer, and the handle enforcing "nothing after a terminal signal" |
//! | [`Observable`] | A composable source; operators are applied with `lift` |
//! | [`Coordination`] | How several sources are routed through one execution context |
//! | [`Subject`] | A hot multicast hub |
//!
//! ## Feature Flags
//!
//! - **`tokio-scheduler`**: `TokioScheduler`, running workers as tokio tasks
//!
//! [`Subscription`]: subscription::Subscription
//! [`CompositeSubscription`]: subscription::CompositeSubscription
//! [`Scheduler`]: scheduler::Scheduler
//! [`Worker`]: scheduler::Worker
//! [`Observer`]: observer::Observer
//! [`Subscriber`]: subscriber::Subscriber
//! [`Observable`]: observable::Observable
//! [`Coordination`]: coordination::Coordination
//! [`Subject`]: subject::Subject

pub mod coordination;
pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;

// Re-export the prelude module
pub use prelude::*;

// Run the README's examples as doctests.
#[cfg(doctest)]
mod readme {
  #![doc = include_str!("../README.md")]
}
