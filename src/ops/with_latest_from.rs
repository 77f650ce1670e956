use std::sync::Arc;

use crate::{
  observable::{Observable, OnSubscribe},
  observer::Observer,
  rc::MutArc,
  subscriber::Subscriber,
};

pub struct WithLatestFrom<Item, B, Err, F> {
  primary: Observable<Item, Err>,
  other: Observable<B, Err>,
  selector: Arc<F>,
}

impl<Item, B, Out, Err, F> OnSubscribe<Out, Err> for WithLatestFrom<Item, B, Err, F>
where
  Item: Send + 'static,
  B: Clone + Send + 'static,
  Out: Send + 'static,
  Err: Send + 'static,
  F: Fn(Item, B) -> Result<Out, Err> + Send + Sync + 'static,
{
  fn on_subscribe(&self, out: Subscriber<Out, Err>) -> Result<(), Err> {
    let latest = MutArc::own(None);
    // The other side goes first so a synchronous value is there for the
    // primary's first emission.
    let other = LatestObserver { out: out.clone(), latest: latest.clone() };
    self.other.subscribe_with(Subscriber::new(out.lifetime().child(), other));
    let primary = PrimaryObserver { out: out.clone(), latest, selector: self.selector.clone() };
    self.primary.subscribe_with(Subscriber::new(out.lifetime().child(), primary));
    Ok(())
  }
}

struct LatestObserver<B, Out, Err> {
  out: Subscriber<Out, Err>,
  latest: MutArc<Option<B>>,
}

impl<B, Out, Err> Observer<B, Err> for LatestObserver<B, Out, Err>
where
  B: Send + 'static,
  Out: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: B) { *self.latest.rc_deref_mut() = Some(value) }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) {}
}

struct PrimaryObserver<B, Out, Err, F> {
  out: Subscriber<Out, Err>,
  latest: MutArc<Option<B>>,
  selector: Arc<F>,
}

impl<Item, B, Out, Err, F> Observer<Item, Err> for PrimaryObserver<B, Out, Err, F>
where
  B: Clone + Send + 'static,
  Out: Send + 'static,
  Err: Send + 'static,
  F: Fn(Item, B) -> Result<Out, Err>,
{
  fn next(&mut self, value: Item) {
    let latest = self.latest.rc_deref_mut().clone();
    if let Some(b) = latest {
      match (self.selector)(value, b) {
        Ok(v) => self.out.on_next(v),
        Err(e) => self.out.on_error(e),
      }
    }
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) { self.out.on_completed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Pairs each value with the latest value of `other`. Values arriving
  /// before `other` has emitted are dropped; only this observable's
  /// completion ends the stream.
  pub fn with_latest_from<B>(&self, other: Observable<B, Err>) -> Observable<(Item, B), Err>
  where
    B: Clone + Send + 'static,
  {
    self.with_latest_from_map(other, |a, b| (a, b))
  }

  /// Like [`Observable::with_latest_from`], combining each value with the
  /// sampled one through `f`.
  pub fn with_latest_from_map<B, Out, F>(&self, other: Observable<B, Err>, f: F) -> Observable<Out, Err>
  where
    B: Clone + Send + 'static,
    Out: Send + 'static,
    F: Fn(Item, B) -> Out + Send + Sync + 'static,
  {
    self.try_with_latest_from_map(other, move |a, b| Ok(f(a, b)))
  }

  /// Like [`Observable::with_latest_from_map`] with a selector that can
  /// fail. An `Err` ends the stream and unsubscribes both sources.
  pub fn try_with_latest_from_map<B, Out, F>(&self, other: Observable<B, Err>, f: F) -> Observable<Out, Err>
  where
    B: Clone + Send + 'static,
    Out: Send + 'static,
    F: Fn(Item, B) -> Result<Out, Err> + Send + Sync + 'static,
  {
    Observable::new(WithLatestFrom { primary: self.clone(), other, selector: Arc::new(f) })
  }
}
