use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct MapOp<F> {
  func: F,
}

impl<In, Out, Err, F> Operator<In, Out, Err> for MapOp<F>
where
  In: Send + 'static,
  Out: Send + 'static,
  Err: Send + 'static,
  F: FnMut(In) -> Result<Out, Err> + Clone + Send + Sync + 'static,
{
  fn apply(&self, out: Subscriber<Out, Err>) -> Subscriber<In, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(lifetime, MapObserver { out, func: self.func.clone() })
  }
}

pub struct MapObserver<Out, Err, F> {
  out: Subscriber<Out, Err>,
  func: F,
}

impl<In, Out, Err, F> Observer<In, Err> for MapObserver<Out, Err, F>
where
  Out: Send + 'static,
  Err: Send + 'static,
  F: FnMut(In) -> Result<Out, Err>,
{
  fn next(&mut self, value: In) {
    // A failed selector ends the stream; the value is not forwarded.
    match (self.func)(value) {
      Ok(v) => self.out.on_next(v),
      Err(e) => self.out.on_error(e),
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
  /// Creates a new stream which calls a closure on each element and uses
  /// its return as the value.
  pub fn map<Out, F>(&self, mut f: F) -> Observable<Out, Err>
  where
    Out: Send + 'static,
    F: FnMut(Item) -> Out + Clone + Send + Sync + 'static,
  {
    self.try_map(move |v| Ok(f(v)))
  }

  /// Like [`Observable::map`] with a selector that can fail. An `Err` from
  /// the selector is delivered as `on_error` in place of the value.
  pub fn try_map<Out, F>(&self, f: F) -> Observable<Out, Err>
  where
    Out: Send + 'static,
    F: FnMut(Item) -> Result<Out, Err> + Clone + Send + Sync + 'static,
  {
    self.lift(MapOp { func: f })
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[rxcore_macro::test]
  fn primitive_type() {
    let seen = MutArc::own(vec![]);
    let c_seen = seen.clone();
    observable::from_iter::<_, ()>(100..101)
      .map(|v| v * 2)
      .subscribe(move |v| c_seen.rc_deref_mut().push(v));
    assert_eq!(*seen.rc_deref_mut(), vec![200]);
  }

  #[rxcore_macro::test]
  fn reference_lifetime_should_work() {
    let seen = MutArc::own(0);
    let c_seen = seen.clone();
    observable::of::<_, ()>(vec![1, 2, 3])
      .map(|v| v.len())
      .subscribe(move |v| *c_seen.rc_deref_mut() = v);
    assert_eq!(*seen.rc_deref_mut(), 3);
  }

  #[rxcore_macro::test]
  fn selector_failure_is_an_error_not_a_value() {
    let log = MutArc::own(vec![]);
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    observable::from_iter(vec![1, 2, 3])
      .try_map(|v| if v == 2 { Err("two") } else { Ok(v) })
      .subscribe_all(
        move |v| l1.rc_deref_mut().push(format!("next {v}")),
        move |e| l2.rc_deref_mut().push(format!("error {e}")),
        move || l3.rc_deref_mut().push("completed".to_owned()),
      );
    assert_eq!(*log.rc_deref_mut(), vec!["next 1", "error two"]);
  }

  #[rxcore_macro::test]
  fn each_subscription_gets_its_own_selector_state() {
    let source = observable::from_iter::<_, ()>(vec![1, 1, 1]).map({
      let mut count = 0;
      move |v: i32| {
        count += v;
        count
      }
    });
    for _ in 0..2 {
      let seen = MutArc::own(vec![]);
      let c_seen = seen.clone();
      source.subscribe(move |v| c_seen.rc_deref_mut().push(v));
      assert_eq!(*seen.rc_deref_mut(), vec![1, 2, 3]);
    }
  }
}
