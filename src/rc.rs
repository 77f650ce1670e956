//! Shared, mutable state handles.
//!
//! Operator state is shared between the subscribe call, the upstream
//! observer and any scheduled closures; the state lives as long as its longest
//! holder. `MutArc` is the one handle used for that throughout the crate.

use std::{
  fmt::{Debug, Formatter},
  sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

/// A reference-counted `Mutex`, cloned by every closure touching the state.
#[derive(Default)]
pub struct MutArc<T>(Arc<Mutex<T>>);

/// Non-owning counterpart of [`MutArc`].
pub struct WeakMutArc<T>(Weak<Mutex<T>>);

impl<T> MutArc<T> {
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }

  /// Locks the state. A panic on another thread while it held the lock does
  /// not make the state unusable: the guard is recovered from the poison.
  #[inline]
  pub fn rc_deref_mut(&self) -> MutexGuard<'_, T> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }

  pub fn downgrade(&self) -> WeakMutArc<T> { WeakMutArc(Arc::downgrade(&self.0)) }
}

impl<T> WeakMutArc<T> {
  pub fn upgrade(&self) -> Option<MutArc<T>> { self.0.upgrade().map(MutArc) }
}

impl<T> Clone for MutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> Clone for WeakMutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> From<T> for MutArc<T> {
  fn from(t: T) -> Self { Self::own(t) }
}

impl<T: Debug> Debug for MutArc<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("MutArc").field(&*self.rc_deref_mut()).finish()
  }
}

/// Locks a plain `Mutex`, recovering from poison the same way
/// [`MutArc::rc_deref_mut`] does.
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn shared_state_is_visible_through_clones() {
    let a = MutArc::own(vec![1]);
    let b = a.clone();
    b.rc_deref_mut().push(2);
    assert_eq!(*a.rc_deref_mut(), vec![1, 2]);
    assert!(a.ptr_eq(&b));
  }

  #[rxcore_macro::test]
  fn weak_does_not_keep_state_alive() {
    let a = MutArc::own(1);
    let weak = a.downgrade();
    assert!(weak.upgrade().is_some());
    drop(a);
    assert!(weak.upgrade().is_none());
  }

  #[rxcore_macro::test]
  fn poisoned_lock_is_recovered() {
    let a = MutArc::own(0);
    let b = a.clone();
    let _ = std::thread::spawn(move || {
      let _guard = b.rc_deref_mut();
      panic!("poison");
    })
    .join();
    *a.rc_deref_mut() += 1;
    assert_eq!(*a.rc_deref_mut(), 1);
  }
}
