use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  rc::MutArc,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct MergeAllOp;

impl<Item, Err> Operator<Observable<Item, Err>, Item, Err> for MergeAllOp
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Observable<Item, Err>, Err> {
    let outer = out.lifetime().child();
    // The outer source counts as one pending stream.
    Subscriber::new(outer, MergeAllObserver { out, pending: MutArc::own(1) })
  }
}

pub struct MergeAllObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  pending: MutArc<usize>,
}

fn settle<Item: Send + 'static, Err: Send + 'static>(out: &Subscriber<Item, Err>, pending: &MutArc<usize>) {
  let left = {
    let mut pending = pending.rc_deref_mut();
    *pending -= 1;
    *pending
  };
  if left == 0 {
    out.on_completed();
  }
}

impl<Item, Err> Observer<Observable<Item, Err>, Err> for MergeAllObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, inner: Observable<Item, Err>) {
    *self.pending.rc_deref_mut() += 1;
    let lifetime = self.out.lifetime().child();
    inner.subscribe_with(Subscriber::new(
      lifetime,
      InnerObserver { out: self.out.clone(), pending: self.pending.clone() },
    ));
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) { settle(&self.out, &self.pending) }
}

struct InnerObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  pending: MutArc<usize>,
}

impl<Item, Err> Observer<Item, Err> for InnerObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.out.on_next(value) }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) { settle(&self.out, &self.pending) }
}

impl<Item, Err> Observable<Observable<Item, Err>, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Subscribes to every inner observable as it arrives and forwards all of
  /// their values. Completes once the outer source and every inner one have
  /// completed; the first error ends everything.
  pub fn merge_all(&self) -> Observable<Item, Err> { self.lift(MergeAllOp) }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Maps each value to an observable and merges them all.
  pub fn flat_map<Out, F>(&self, f: F) -> Observable<Out, Err>
  where
    Out: Send + 'static,
    F: FnMut(Item) -> Observable<Out, Err> + Clone + Send + Sync + 'static,
  {
    self.map(f).merge_all()
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, scheduler::test_scheduler::*};

  #[rxcore_macro::test]
  fn interleaves_inner_streams() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_cold_observable(vec![
      on_next(10, "a1"),
      on_next(30, "a2"),
      on_completed::<&str, ()>(40),
    ]);
    let b = scheduler.create_cold_observable(vec![on_next(15, "b1"), on_completed(20)]);
    let (a, b) = (a.observable(), b.observable());
    let observer =
      scheduler.start_observable(move || observable::from_iter(vec![a, b]).merge_all());
    assert_eq!(
      observer.messages(),
      vec![on_next(210, "a1"), on_next(215, "b1"), on_next(230, "a2"), on_completed(240)]
    );
  }

  #[rxcore_macro::test]
  fn flat_map_fans_out() {
    let seen = MutArc::own(vec![]);
    let c_seen = seen.clone();
    observable::from_iter::<_, ()>(1..=3usize)
      .flat_map(|v| observable::from_iter(vec![v; v]))
      .subscribe(move |v| c_seen.rc_deref_mut().push(v));
    assert_eq!(*seen.rc_deref_mut(), vec![1, 2, 2, 3, 3, 3]);
  }

  #[rxcore_macro::test]
  fn inner_error_unsubscribes_the_others() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_cold_observable(vec![on_next(50, 1), on_completed::<i32, &str>(60)]);
    let b = scheduler.create_cold_observable(vec![on_error::<i32, &str>(20, "boom")]);
    let (a_src, b_src) = (a.observable(), b.observable());
    let observer =
      scheduler.start_observable(move || observable::from_iter(vec![a_src, b_src]).merge_all());
    assert_eq!(observer.messages(), vec![on_error(220, "boom")]);
    assert_eq!(a.subscriptions(), vec![Subscribed::new(200, 220)]);
  }

  #[rxcore_macro::test]
  fn waits_for_the_outer_source() {
    let outer = Subject::<Observable<i32, ()>, ()>::new();
    let completed = MutArc::own(false);
    let c_completed = completed.clone();
    outer
      .observable()
      .merge_all()
      .subscribe_all(|_| {}, |_| {}, move || *c_completed.rc_deref_mut() = true);
    outer.next(observable::of(1));
    assert!(!*completed.rc_deref_mut());
    outer.complete();
    assert!(*completed.rc_deref_mut());
  }
}
