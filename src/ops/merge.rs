use crate::observable::{from_iter, Observable};

/// Merges the emissions of every source into one stream.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let numbers = Subject::<i32, ()>::new();
/// let even = numbers.observable().filter(|v| v % 2 == 0);
/// let odd = numbers.observable().filter(|v| v % 2 != 0);
///
/// let seen = MutArc::own(vec![]);
/// let c_seen = seen.clone();
/// observable::merge(vec![even, odd]).subscribe(move |v| c_seen.rc_deref_mut().push(v));
/// (1..=4).for_each(|v| numbers.next(v));
/// assert_eq!(*seen.rc_deref_mut(), vec![1, 2, 3, 4]);
/// ```
pub fn merge<Item, Err>(sources: Vec<Observable<Item, Err>>) -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  from_iter(sources).merge_all()
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Merges this observable with `other`.
  pub fn merge(&self, other: Observable<Item, Err>) -> Observable<Item, Err> {
    merge(vec![self.clone(), other])
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[rxcore_macro::test]
  fn odd_even_merge() {
    let numbers = Subject::<i32, ()>::new();
    let even = numbers.observable().filter(|v| v % 2 == 0);
    let odd = numbers.observable().filter(|v| v % 2 != 0);

    let seen = MutArc::own(vec![]);
    let completed = MutArc::own(false);
    let (c_seen, c_completed) = (seen.clone(), completed.clone());
    even.merge(odd).subscribe_all(
      move |v| c_seen.rc_deref_mut().push(v),
      |_| {},
      move || *c_completed.rc_deref_mut() = true,
    );
    (0..6).for_each(|v| numbers.next(v));
    assert_eq!(*seen.rc_deref_mut(), vec![0, 1, 2, 3, 4, 5]);
    numbers.complete();
    assert!(*completed.rc_deref_mut());
  }

  #[rxcore_macro::test]
  fn completes_after_the_last_source() {
    let a = Subject::<i32, ()>::new();
    let b = Subject::<i32, ()>::new();
    let completed = MutArc::own(false);
    let c_completed = completed.clone();
    a.observable()
      .merge(b.observable())
      .subscribe_all(|_| {}, |_| {}, move || *c_completed.rc_deref_mut() = true);
    a.complete();
    assert!(!*completed.rc_deref_mut());
    b.complete();
    assert!(*completed.rc_deref_mut());
  }

  #[rxcore_macro::test]
  fn error_unsubscribes_every_source() {
    let a = Subject::<i32, &str>::new();
    let b = Subject::<i32, &str>::new();
    let err = MutArc::own(None);
    let c_err = err.clone();
    a.observable().merge(b.observable()).subscribe_err(|_| {}, move |e| *c_err.rc_deref_mut() = Some(e));
    b.error("boom");
    assert_eq!(*err.rc_deref_mut(), Some("boom"));
    assert!(!a.has_observers());
  }

  #[rxcore_macro::test]
  fn unsubscribe_detaches_both_sources() {
    let a = Subject::<i32, ()>::new();
    let b = Subject::<i32, ()>::new();
    let lifetime = a.observable().merge(b.observable()).subscribe(|_| {});
    assert!(a.has_observers() && b.has_observers());
    lifetime.unsubscribe();
    assert!(!a.has_observers() && !b.has_observers());
  }

  #[rxcore_macro::test]
  fn empty_list_completes() {
    let completed = MutArc::own(false);
    let c_completed = completed.clone();
    observable::merge::<i32, ()>(vec![])
      .subscribe_all(|_| {}, |_| {}, move || *c_completed.rc_deref_mut() = true);
    assert!(*completed.rc_deref_mut());
  }
}
