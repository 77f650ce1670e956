use std::{cmp::Ordering, collections::BinaryHeap};

use super::{Instant, Schedulable};

pub(crate) struct QueueItem {
  pub(crate) when: Instant,
  seq: u64,
  pub(crate) what: Schedulable,
}

impl PartialEq for QueueItem {
  fn eq(&self, other: &Self) -> bool { self.when == other.when && self.seq == other.seq }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for QueueItem {
  // BinaryHeap is a max-heap: reverse so the earliest due time pops first and
  // equal due times pop in insertion order.
  fn cmp(&self, other: &Self) -> Ordering {
    other
      .when
      .cmp(&self.when)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

/// Time-ordered queue of schedulables shared by the queueing schedulers.
#[derive(Default)]
pub(crate) struct RunQueue {
  heap: BinaryHeap<QueueItem>,
  seq: u64,
}

impl RunQueue {
  pub(crate) fn new() -> Self { Self::default() }

  pub(crate) fn push(&mut self, when: Instant, what: Schedulable) {
    self.seq += 1;
    self.heap.push(QueueItem { when, seq: self.seq, what });
  }

  pub(crate) fn pop(&mut self) -> Option<QueueItem> { self.heap.pop() }

  pub(crate) fn peek_when(&self) -> Option<Instant> { self.heap.peek().map(|item| item.when) }

  pub(crate) fn is_empty(&self) -> bool { self.heap.is_empty() }

  pub(crate) fn len(&self) -> usize { self.heap.len() }

  /// Empties the queue, handing the items back so they can be dropped
  /// outside of any lock.
  pub(crate) fn drain(&mut self) -> Vec<QueueItem> { std::mem::take(&mut self.heap).into_vec() }
}
