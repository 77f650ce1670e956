//! In-order delivery for operators that join several sources.
//!
//! Sources may run on different threads. Each one computes its signal under
//! the join's shared lock and queues it here before releasing that lock; the
//! first thread to find no drain in progress then delivers everything queued,
//! with the lock released. Downstream therefore sees signals in the order the
//! lock was taken, and a signal queued while a drain is running (from another
//! thread or re-entrantly) is picked up by that drain.

use std::collections::VecDeque;

use crate::{observer::Notification, rc::MutArc};

pub(crate) struct Outbox<T, Err> {
  queue: VecDeque<Notification<T, Err>>,
  draining: bool,
}

impl<T, Err> Default for Outbox<T, Err> {
  fn default() -> Self { Outbox { queue: VecDeque::new(), draining: false } }
}

impl<T, Err> Outbox<T, Err> {
  pub(crate) fn push(&mut self, signal: Notification<T, Err>) { self.queue.push_back(signal) }

  /// Claims the drain when something is queued and nobody is draining.
  fn claim(&mut self) -> bool {
    if self.draining || self.queue.is_empty() {
      return false;
    }
    self.draining = true;
    true
  }

  fn pop(&mut self) -> Option<Notification<T, Err>> {
    let signal = self.queue.pop_front();
    if signal.is_none() {
      self.draining = false;
    }
    signal
  }
}

/// Join state keeping an [`Outbox`] under its lock.
pub(crate) trait HasOutbox {
  type Item;
  type Err;

  fn outbox(&mut self) -> &mut Outbox<Self::Item, Self::Err>;
}

/// Runs `update` on the locked state; whatever it pushes onto the outbox is
/// queued in the same critical section. Then delivers, unless a drain is
/// already running. The lock is not held while `deliver` runs.
pub(crate) fn post<S: HasOutbox>(
  state: &MutArc<S>, update: impl FnOnce(&mut S), deliver: impl FnMut(Notification<S::Item, S::Err>),
) {
  let must_drain = {
    let mut guard = state.rc_deref_mut();
    update(&mut *guard);
    guard.outbox().claim()
  };
  if must_drain {
    drain(state, deliver);
  }
}

/// Delivers queued signals until the outbox is empty.
pub(crate) fn drain<S: HasOutbox>(state: &MutArc<S>, mut deliver: impl FnMut(Notification<S::Item, S::Err>)) {
  loop {
    let signal = state.rc_deref_mut().outbox().pop();
    match signal {
      Some(signal) => deliver(signal),
      None => return,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct Joined {
    outbox: Outbox<i32, ()>,
  }

  impl HasOutbox for Joined {
    type Item = i32;
    type Err = ();

    fn outbox(&mut self) -> &mut Outbox<i32, ()> { &mut self.outbox }
  }

  fn push(value: i32) -> impl FnOnce(&mut Joined) {
    move |j: &mut Joined| j.outbox.push(Notification::Next(value))
  }

  #[rxcore_macro::test]
  fn reentrant_posts_are_delivered_by_the_running_drain() {
    let state = MutArc::own(Joined::default());
    let log = MutArc::own(vec![]);
    let (c_state, c_log) = (state.clone(), log.clone());
    post(&state, push(1), move |signal: Notification<i32, ()>| {
      if let Notification::Next(v) = signal {
        c_log.rc_deref_mut().push(v);
        if v < 3 {
          // Queued only; this drain picks it up after returning.
          post(&c_state, push(v + 1), |_: Notification<i32, ()>| panic!("nested drain"));
          c_log.rc_deref_mut().push(-v);
        }
      }
    });
    assert_eq!(*log.rc_deref_mut(), vec![1, -1, 2, -2, 3]);
    assert!(!state.rc_deref_mut().outbox.draining);
  }

  #[rxcore_macro::test]
  fn one_update_may_queue_several_signals() {
    let state = MutArc::own(Joined::default());
    let mut seen = vec![];
    post(
      &state,
      |j: &mut Joined| {
        j.outbox.push(Notification::Next(1));
        j.outbox.push(Notification::Completed);
      },
      |signal: Notification<i32, ()>| seen.push(signal),
    );
    assert_eq!(seen, vec![Notification::Next(1), Notification::Completed]);
  }

  #[rxcore_macro::test]
  fn update_without_signals_delivers_nothing() {
    let state = MutArc::own(Joined::default());
    post(&state, |_: &mut Joined| {}, |_: Notification<i32, ()>| panic!("nothing queued"));
    assert!(!state.rc_deref_mut().outbox.draining);
  }
}
