use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct OnErrorResumeNextOp<F> {
  fallback: F,
}

impl<Item, Err, F> Operator<Item, Item, Err> for OnErrorResumeNextOp<F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnMut(Err) -> Observable<Item, Err> + Clone + Send + Sync + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let upstream = out.lifetime().child();
    Subscriber::new(upstream, OnErrorResumeNextObserver { out, fallback: self.fallback.clone() })
  }
}

pub struct OnErrorResumeNextObserver<Item, Err, F> {
  out: Subscriber<Item, Err>,
  fallback: F,
}

impl<Item, Err, F> Observer<Item, Err> for OnErrorResumeNextObserver<Item, Err, F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnMut(Err) -> Observable<Item, Err>,
{
  fn next(&mut self, value: Item) { self.out.on_next(value) }

  fn error(mut self, err: Err) {
    let replacement = (self.fallback)(err);
    replacement.subscribe_with(self.out);
  }

  fn complete(self) { self.out.on_completed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// On error, continues with the observable `f` builds from the error
  /// instead of failing.
  pub fn on_error_resume_next<F>(&self, f: F) -> Observable<Item, Err>
  where
    F: FnMut(Err) -> Observable<Item, Err> + Clone + Send + Sync + 'static,
  {
    self.lift(OnErrorResumeNextOp { fallback: f })
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[rxcore_macro::test]
  fn continues_with_the_fallback() {
    let log = MutArc::own(vec![]);
    let (l1, l2) = (log.clone(), log.clone());
    observable::from_iter(1..4)
      .try_map(|v| if v == 3 { Err(v) } else { Ok(v) })
      .on_error_resume_next(|e| observable::of(e * 100))
      .subscribe_all(
        move |v| l1.rc_deref_mut().push(v.to_string()),
        |_| {},
        move || l2.rc_deref_mut().push("completed".to_owned()),
      );
    assert_eq!(*log.rc_deref_mut(), vec!["1", "2", "300", "completed"]);
  }

  #[rxcore_macro::test]
  fn fallback_may_fail_too() {
    let err = MutArc::own(None);
    let c_err = err.clone();
    observable::throw::<i32, _>("first")
      .on_error_resume_next(|_| observable::throw("second"))
      .subscribe_err(|_| {}, move |e| *c_err.rc_deref_mut() = Some(e));
    assert_eq!(*err.rc_deref_mut(), Some("second"));
  }
}
