use std::{
  any::Any,
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, Weak,
  },
};

use smallvec::SmallVec;

use super::{Subscription, SubscriptionLike};
use crate::rc::lock;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Handle to a child stored in a [`CompositeSubscription`].
///
/// Keys are unique across the process, so removing with a key that belongs to
/// another composite (or to a child that was never stored) is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionKey(u64);

impl SubscriptionKey {
  /// Returned by [`CompositeSubscription::add`] when nothing was stored.
  pub const NONE: SubscriptionKey = SubscriptionKey(0);

  fn next() -> Self { SubscriptionKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed)) }

  pub fn is_none(&self) -> bool { *self == Self::NONE }
}

type Child = Arc<dyn SubscriptionLike>;
type Children = SmallVec<[(SubscriptionKey, Child); 2]>;

struct CompositeState {
  active: AtomicBool,
  children: Mutex<Children>,
}

/// A thread-safe set of child subscriptions that is itself a subscription.
///
/// - `add` on a closed composite unsubscribes the child immediately and stores
///   nothing.
/// - `remove` detaches a child without unsubscribing it.
/// - `unsubscribe` flips the composite closed exactly once, snapshots and
///   clears the children under the lock, then unsubscribes the snapshot with
///   the lock released.
#[derive(Clone)]
pub struct CompositeSubscription(Arc<CompositeState>);

impl CompositeSubscription {
  pub fn new() -> Self {
    CompositeSubscription(Arc::new(CompositeState {
      active: AtomicBool::new(true),
      children: Mutex::new(SmallVec::new()),
    }))
  }

  /// A composite that is already unsubscribed.
  pub fn closed() -> Self {
    let cs = Self::new();
    cs.unsubscribe();
    cs
  }

  /// Attaches `subscription` to this composite.
  ///
  /// # Panics
  ///
  /// Panics when a composite is added to itself.
  pub fn add<S: SubscriptionLike + 'static>(&self, subscription: S) -> SubscriptionKey {
    assert!(
      !self.is_same(&subscription),
      "a CompositeSubscription cannot be added to itself"
    );
    if subscription.is_closed() {
      return SubscriptionKey::NONE;
    }

    let child: Child = Arc::new(subscription);
    let mut children = lock(&self.0.children);
    if !self.0.active.load(Ordering::Acquire) {
      drop(children);
      child.unsubscribe();
      return SubscriptionKey::NONE;
    }
    let key = SubscriptionKey::next();
    let stale = prune_closed(&mut children);
    children.push((key, child));
    drop(children);
    drop(stale);
    key
  }

  /// Detaches the child stored under `key` without unsubscribing it.
  pub fn remove(&self, key: SubscriptionKey) {
    if key.is_none() {
      return;
    }
    let removed = {
      let mut children = lock(&self.0.children);
      children
        .iter()
        .position(|(k, _)| *k == key)
        .map(|idx| children.remove(idx))
    };
    drop(removed);
  }

  /// Unsubscribes every current child but keeps the composite itself open.
  pub fn clear(&self) {
    let snapshot = std::mem::take(&mut *lock(&self.0.children));
    for (_, child) in snapshot {
      child.unsubscribe();
    }
  }

  /// Number of children currently attached.
  pub fn len(&self) -> usize { lock(&self.0.children).len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }

  /// A back-reference that does not keep the composite alive.
  pub fn downgrade(&self) -> WeakCompositeSubscription {
    WeakCompositeSubscription(Arc::downgrade(&self.0))
  }

  /// A new composite attached to this one.
  ///
  /// Unsubscribing `self` cancels the child. The child detaches itself once
  /// it is unsubscribed on its own, holding only a weak reference back.
  pub fn child(&self) -> CompositeSubscription {
    let child = CompositeSubscription::new();
    let key = self.add(child.clone());
    if !key.is_none() {
      let parent = self.downgrade();
      child.add(Subscription::new(move || parent.remove(key)));
    }
    child
  }

  fn is_same(&self, other: &dyn Any) -> bool {
    other
      .downcast_ref::<Self>()
      .is_some_and(|other| self.ptr_eq(other))
  }
}

fn prune_closed(children: &mut Children) -> Children {
  let mut stale = Children::new();
  let mut idx = 0;
  while idx < children.len() {
    if children[idx].1.is_closed() {
      stale.push(children.remove(idx));
    } else {
      idx += 1;
    }
  }
  stale
}

impl Default for CompositeSubscription {
  fn default() -> Self { Self::new() }
}

impl SubscriptionLike for CompositeSubscription {
  fn unsubscribe(&self) {
    if self
      .0
      .active
      .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
    {
      let snapshot = std::mem::take(&mut *lock(&self.0.children));
      for (_, child) in snapshot {
        child.unsubscribe();
      }
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { !self.0.active.load(Ordering::Acquire) }
}

impl PartialEq for CompositeSubscription {
  fn eq(&self, other: &Self) -> bool { self.ptr_eq(other) }
}

impl Debug for CompositeSubscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CompositeSubscription")
      .field("is_closed", &self.is_closed())
      .field("children", &self.len())
      .finish()
  }
}

/// Weak handle to a [`CompositeSubscription`].
#[derive(Clone)]
pub struct WeakCompositeSubscription(Weak<CompositeState>);

impl WeakCompositeSubscription {
  pub fn upgrade(&self) -> Option<CompositeSubscription> {
    self.0.upgrade().map(CompositeSubscription)
  }

  /// Detaches `key` if the composite is still alive.
  pub fn remove(&self, key: SubscriptionKey) {
    if let Some(cs) = self.upgrade() {
      cs.remove(key);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;

  use super::*;
  use crate::subscription::Subscription;

  fn counted() -> (Subscription, Arc<AtomicUsize>) {
    let runs = Arc::new(AtomicUsize::new(0));
    let c_runs = runs.clone();
    let s = Subscription::new(move || {
      c_runs.fetch_add(1, Ordering::SeqCst);
    });
    (s, runs)
  }

  #[rxcore_macro::test]
  fn add_and_unsubscribe_all() {
    let cs = CompositeSubscription::new();
    let children: Vec<_> = (0..3).map(|_| counted()).collect();
    for (s, _) in &children {
      cs.add(s.clone());
    }
    assert_eq!(cs.len(), 3);

    cs.unsubscribe();
    cs.unsubscribe();
    assert!(cs.is_empty());
    for (s, runs) in &children {
      assert!(s.is_closed());
      assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
  }

  #[rxcore_macro::test]
  fn add_after_unsubscribe_closes_child_immediately() {
    let cs = CompositeSubscription::new();
    cs.unsubscribe();
    let (s, runs) = counted();
    let key = cs.add(s.clone());
    assert!(key.is_none());
    assert!(s.is_closed());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(cs.is_empty());
  }

  #[rxcore_macro::test]
  fn closed_child_is_not_stored() {
    let cs = CompositeSubscription::new();
    let key = cs.add(Subscription::closed());
    assert!(key.is_none());
    assert!(cs.is_empty());
  }

  #[rxcore_macro::test]
  fn remove_detaches_without_cancel() {
    let cs = CompositeSubscription::new();
    let (s, runs) = counted();
    let key = cs.add(s.clone());
    cs.remove(key);
    assert!(cs.is_empty());
    cs.unsubscribe();
    assert!(s.is_subscribed());
    assert_eq!(runs.load(Ordering::SeqCst), 0);
  }

  #[rxcore_macro::test]
  fn remove_with_foreign_key_is_noop() {
    let a = CompositeSubscription::new();
    let b = CompositeSubscription::new();
    let key = a.add(Subscription::empty());
    b.add(Subscription::empty());
    b.remove(key);
    assert_eq!(b.len(), 1);
    assert_eq!(a.len(), 1);
  }

  #[rxcore_macro::test]
  fn clear_keeps_composite_open() {
    let cs = CompositeSubscription::new();
    let (s, _) = counted();
    cs.add(s.clone());
    cs.clear();
    assert!(s.is_closed());
    assert!(cs.is_subscribed());

    let (late, _) = counted();
    cs.add(late.clone());
    assert!(late.is_subscribed());
    assert_eq!(cs.len(), 1);
  }

  #[rxcore_macro::test]
  fn nested_composites_cancel_transitively() {
    let root = CompositeSubscription::new();
    let mid = CompositeSubscription::new();
    let (leaf, runs) = counted();
    mid.add(leaf.clone());
    root.add(mid.clone());

    root.unsubscribe();
    assert!(mid.is_closed());
    assert!(leaf.is_closed());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }

  #[rxcore_macro::test]
  fn closed_children_are_pruned_on_add() {
    let cs = CompositeSubscription::new();
    let (s, _) = counted();
    cs.add(s.clone());
    s.unsubscribe();
    cs.add(Subscription::empty());
    assert_eq!(cs.len(), 1);
  }

  #[rxcore_macro::test]
  fn teardown_may_add_to_the_closing_composite() {
    let cs = CompositeSubscription::new();
    let c_cs = cs.clone();
    let (late, runs) = counted();
    let c_late = late.clone();
    cs.add(Subscription::new(move || {
      c_cs.add(c_late);
    }));
    cs.unsubscribe();
    assert!(late.is_closed());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }

  #[rxcore_macro::test]
  #[should_panic(expected = "cannot be added to itself")]
  fn adding_itself_panics() {
    let cs = CompositeSubscription::new();
    cs.add(cs.clone());
  }

  #[rxcore_macro::test]
  fn weak_handle() {
    let cs = CompositeSubscription::new();
    let weak = cs.downgrade();
    let key = cs.add(Subscription::empty());
    weak.remove(key);
    assert!(cs.is_empty());
    drop(cs);
    assert!(weak.upgrade().is_none());
  }

  #[rxcore_macro::test]
  fn concurrent_add_and_unsubscribe_never_leak() {
    for _ in 0..50 {
      let cs = CompositeSubscription::new();
      let subs: Vec<_> = (0..16).map(|_| Subscription::empty()).collect();
      let adder = {
        let cs = cs.clone();
        let subs = subs.clone();
        std::thread::spawn(move || {
          for s in subs {
            cs.add(s);
          }
        })
      };
      cs.unsubscribe();
      adder.join().unwrap();
      assert!(subs.iter().all(|s| s.is_closed()));
    }
  }
}
