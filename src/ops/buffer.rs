use std::collections::VecDeque;

use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct BufferOp {
  count: usize,
  skip: usize,
}

impl<Item, Err> Operator<Item, Vec<Item>, Err> for BufferOp
where
  Item: Clone + Send + 'static,
  Err: Send + 'static,
{
  fn apply(&self, out: Subscriber<Vec<Item>, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(
      lifetime,
      BufferObserver { out, count: self.count, skip: self.skip, index: 0, chunks: VecDeque::new() },
    )
  }
}

/// Keeps every chunk still being filled, oldest first. With `skip < count`
/// one value lands in several chunks.
pub struct BufferObserver<Item, Err> {
  out: Subscriber<Vec<Item>, Err>,
  count: usize,
  skip: usize,
  index: usize,
  chunks: VecDeque<Vec<Item>>,
}

impl<Item, Err> Observer<Item, Err> for BufferObserver<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.index % self.skip == 0 {
      self.chunks.push_back(Vec::with_capacity(self.count));
    }
    self.index += 1;
    for chunk in self.chunks.iter_mut() {
      chunk.push(value.clone());
    }
    while self.chunks.front().is_some_and(|c| c.len() == self.count) {
      if let Some(chunk) = self.chunks.pop_front() {
        self.out.on_next(chunk);
      }
    }
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) {
    for chunk in self.chunks {
      if !chunk.is_empty() {
        self.out.on_next(chunk);
      }
    }
    self.out.on_completed();
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Collects values into chunks of `count`, starting a new chunk every
  /// `skip` values. Chunks overlap when `skip < count` and values are dropped
  /// between chunks when `skip > count`. Partially filled chunks are emitted
  /// in order when the source completes.
  ///
  /// # Panics
  ///
  /// Panics if `count` or `skip` is zero.
  pub fn buffer(&self, count: usize, skip: usize) -> Observable<Vec<Item>, Err>
  where
    Item: Clone,
  {
    assert!(count > 0, "buffer count must be positive");
    assert!(skip > 0, "buffer skip must be positive");
    self.lift(BufferOp { count, skip })
  }

  /// Non-overlapping chunks of `count` values: `buffer(count, count)`.
  pub fn buffer_count(&self, count: usize) -> Observable<Vec<Item>, Err>
  where
    Item: Clone,
  {
    self.buffer(count, count)
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  fn chunks(source: Observable<Vec<i32>, ()>) -> Vec<Vec<i32>> {
    let seen = MutArc::own(vec![]);
    let c_seen = seen.clone();
    source.subscribe(move |v| c_seen.rc_deref_mut().push(v));
    let seen = seen.rc_deref_mut().clone();
    seen
  }

  #[rxcore_macro::test]
  fn non_overlapping() {
    assert_eq!(
      chunks(observable::from_iter(0..7).buffer_count(3)),
      vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]
    );
  }

  #[rxcore_macro::test]
  fn overlapping() {
    assert_eq!(
      chunks(observable::from_iter(0..5).buffer(3, 1)),
      vec![vec![0, 1, 2], vec![1, 2, 3], vec![2, 3, 4], vec![3, 4], vec![4]]
    );
  }

  #[rxcore_macro::test]
  fn gaps() {
    assert_eq!(
      chunks(observable::from_iter(0..7).buffer(2, 3)),
      vec![vec![0, 1], vec![3, 4], vec![6]]
    );
  }

  #[rxcore_macro::test]
  fn error_drops_partial_chunks() {
    let log = MutArc::own(vec![]);
    let (l1, l2) = (log.clone(), log.clone());
    observable::from_iter(0..5)
      .try_map(|v| if v == 4 { Err("four") } else { Ok(v) })
      .buffer_count(3)
      .subscribe_err(
        move |v| l1.rc_deref_mut().push(format!("{v:?}")),
        move |e| l2.rc_deref_mut().push(e.to_owned()),
      );
    assert_eq!(*log.rc_deref_mut(), vec!["[0, 1, 2]", "four"]);
  }

  #[rxcore_macro::test]
  #[should_panic(expected = "buffer count must be positive")]
  fn zero_count_is_misuse() { observable::from_iter::<_, ()>(0..5).buffer_count(0); }
}
