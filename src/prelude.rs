//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Coordination policies
pub use crate::coordination::{
  identity_current_thread, identity_one_worker, observe_on_event_loop, observe_on_new_thread,
  observe_on_one_worker, serialize_event_loop, serialize_new_thread, serialize_one_worker,
  Coordination, Coordinator,
};
// Errors raised by operators
pub use crate::error::{SequenceError, TimeoutError};
// Observable, sources and operator plumbing
pub use crate::observable::{
  self, ConnectableObservable, Observable, OnSubscribe, Operator, SubjectLike,
};
// Observer side
pub use crate::observer::{make_observer, Notification, Observer};
pub use crate::ops::into_stream::IntoStream;
pub use crate::rc::MutArc;
// Schedulers
pub use crate::scheduler::{
  once, CurrentThread, Duration, EventLoop, Instant, NewThread, Recurse, Schedulable, Scheduler,
  TestScheduler, Worker,
};
// Subjects
pub use crate::subject::{BehaviorSubject, Subject};
pub use crate::subscriber::{make_subscriber, Resumption, Subscriber};
// Subscription
pub use crate::subscription::{
  CompositeSubscription, Subscription, SubscriptionGuard, SubscriptionKey, SubscriptionLike,
  UnsubscribeWhenDropped,
};
