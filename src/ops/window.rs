use std::collections::VecDeque;

use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subject::Subject,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct WindowOp {
  count: usize,
  skip: usize,
}

impl<Item, Err> Operator<Item, Observable<Item, Err>, Err> for WindowOp
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn apply(&self, out: Subscriber<Observable<Item, Err>, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(
      lifetime,
      WindowObserver { out, count: self.count, skip: self.skip, index: 0, windows: VecDeque::new() },
    )
  }
}

pub struct WindowObserver<Item, Err> {
  out: Subscriber<Observable<Item, Err>, Err>,
  count: usize,
  skip: usize,
  index: usize,
  /// Open windows with how many values each has received.
  windows: VecDeque<(Subject<Item, Err>, usize)>,
}

impl<Item, Err> Observer<Item, Err> for WindowObserver<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.index % self.skip == 0 {
      let window = Subject::new();
      self.windows.push_back((window.clone(), 0));
      self.out.on_next(window.observable());
    }
    self.index += 1;
    for (window, len) in self.windows.iter_mut() {
      window.next(value.clone());
      *len += 1;
    }
    while self.windows.front().is_some_and(|(_, len)| *len == self.count) {
      if let Some((window, _)) = self.windows.pop_front() {
        window.complete();
      }
    }
  }

  fn error(self, err: Err) {
    for (window, _) in self.windows {
      window.error(err.clone());
    }
    self.out.on_error(err);
  }

  fn complete(self) {
    for (window, _) in self.windows {
      window.complete();
    }
    self.out.on_completed();
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Like [`Observable::buffer`], emitting each chunk as an observable window
  /// that forwards values as they arrive instead of a `Vec` at the end.
  ///
  /// A window only delivers values that arrive after it is subscribed, so
  /// subscribe to each window as soon as it is emitted.
  ///
  /// # Panics
  ///
  /// Panics if `count` or `skip` is zero.
  pub fn window(&self, count: usize, skip: usize) -> Observable<Observable<Item, Err>, Err>
  where
    Item: Clone,
    Err: Clone,
  {
    assert!(count > 0, "window count must be positive");
    assert!(skip > 0, "window skip must be positive");
    self.lift(WindowOp { count, skip })
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[rxcore_macro::test]
  fn windows_see_their_values() {
    let windows = MutArc::own(vec![]);
    let c_windows = windows.clone();
    observable::from_iter::<_, ()>(0..5).window(2, 2).subscribe(move |w| {
      let slot = MutArc::own(vec![]);
      c_windows.rc_deref_mut().push(slot.clone());
      w.subscribe(move |v| slot.rc_deref_mut().push(v));
    });
    let got: Vec<Vec<i32>> = windows.rc_deref_mut().iter().map(|w| w.rc_deref_mut().clone()).collect();
    assert_eq!(got, vec![vec![0, 1], vec![2, 3], vec![4]]);
  }

  #[rxcore_macro::test]
  fn overlapping_windows_complete_in_order() {
    let log = MutArc::own(vec![]);
    let c_log = log.clone();
    let mut next_id = 0;
    observable::from_iter::<_, ()>(0..3).window(2, 1).subscribe(move |w| {
      let id = next_id;
      next_id += 1;
      let (l1, l2) = (c_log.clone(), c_log.clone());
      w.subscribe_all(
        move |v| l1.rc_deref_mut().push(format!("w{id} {v}")),
        |_| {},
        move || l2.rc_deref_mut().push(format!("w{id} done")),
      );
    });
    assert_eq!(
      *log.rc_deref_mut(),
      vec!["w0 0", "w0 1", "w1 1", "w0 done", "w1 2", "w2 2", "w1 done", "w2 done"]
    );
  }
}
