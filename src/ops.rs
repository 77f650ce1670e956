//! Operators.
//!
//! Each module adds methods to [`Observable`](crate::observable::Observable).
//! Single-source operators are an `XxxOp` implementing
//! [`Operator`](crate::observable::Operator) plus the `XxxObserver` it
//! subscribes upstream; [`Observable::lift`] composes them.
//!
//! Subscribers built by an operator share the downstream lifetime when the
//! operator finishes in step with its source. Operators that keep working
//! after the source is done (timers, flushes, inner sources) subscribe
//! upstream on a [child](crate::subscription::CompositeSubscription::child)
//! lifetime instead, so the source finishing does not cancel them.
//!
//! [`Observable::lift`]: crate::observable::Observable::lift

pub mod buffer;
pub mod combine_latest;
pub mod concat;
pub mod debounce;
pub mod default_if_empty;
pub mod delay;
pub mod distinct_until_changed;
pub mod filter;
pub mod finalize;
pub mod first;
pub mod into_stream;
pub mod last;
pub mod map;
pub mod merge;
pub mod merge_all;
pub mod observe_on;
pub mod on_error;
mod outbox;
pub mod reduce;
pub mod retry;
pub mod scan;
pub mod skip;
pub mod skip_while;
pub mod start_with;
pub mod subscribe_on;
pub mod switch_on_next;
pub mod take;
pub mod take_last;
pub mod take_until;
pub mod take_while;
pub mod tap;
pub mod throttle;
pub mod timeout;
pub mod window;
pub mod with_latest_from;
pub mod zip;
