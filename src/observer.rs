//! The consumer contract.
//!
//! An [`Observer`] receives any number of values followed by at most one
//! terminal signal. The terminal methods take `self` by value, so once an
//! observer has seen `error` or `complete` it is gone and can receive nothing
//! else. Enforcing that on shared handles is the job of
//! [`Subscriber`](crate::subscriber::Subscriber).

/// A consumer of a sequence of `Item`s that may fail with `Err`.
pub trait Observer<Item, Err> {
  fn next(&mut self, value: Item);

  fn error(self, err: Err);

  fn complete(self);
}

/// Object-safe mirror of [`Observer`], implemented for every `Send` observer.
pub trait DynObserver<Item, Err>: Send {
  fn box_next(&mut self, value: Item);

  fn box_error(self: Box<Self>, err: Err);

  fn box_complete(self: Box<Self>);
}

impl<Item, Err, O> DynObserver<Item, Err> for O
where
  O: Observer<Item, Err> + Send,
{
  #[inline]
  fn box_next(&mut self, value: Item) { self.next(value) }

  #[inline]
  fn box_error(self: Box<Self>, err: Err) { (*self).error(err) }

  #[inline]
  fn box_complete(self: Box<Self>) { (*self).complete() }
}

pub type BoxedObserver<Item, Err> = Box<dyn DynObserver<Item, Err>>;

impl<Item, Err> Observer<Item, Err> for BoxedObserver<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { (**self).box_next(value) }

  #[inline]
  fn error(self, err: Err) { self.box_error(err) }

  #[inline]
  fn complete(self) { self.box_complete() }
}

/// A single signal of a sequence, as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<Item, Err> {
  Next(Item),
  Error(Err),
  Completed,
}

impl<Item, Err> Notification<Item, Err> {
  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Notification::Next(_)) }

  /// Delivers this signal to `observer`. Returns the observer back unless the
  /// signal was terminal.
  pub fn accept<O: Observer<Item, Err>>(self, mut observer: O) -> Option<O> {
    match self {
      Notification::Next(value) => {
        observer.next(value);
        Some(observer)
      }
      Notification::Error(err) => {
        observer.error(err);
        None
      }
      Notification::Completed => {
        observer.complete();
        None
      }
    }
  }
}

/// Placeholder for a handler that was not supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ignore;

/// Error handler slot of a [`FnObserver`].
pub trait OnError<Err> {
  fn on_error(self, err: Err);
}

impl<Err, F: FnOnce(Err)> OnError<Err> for F {
  #[inline]
  fn on_error(self, err: Err) { self(err) }
}

impl<Err> OnError<Err> for Ignore {
  #[inline]
  fn on_error(self, _: Err) {}
}

/// Completion handler slot of a [`FnObserver`].
pub trait OnCompleted {
  fn on_completed(self);
}

impl<F: FnOnce()> OnCompleted for F {
  #[inline]
  fn on_completed(self) { self() }
}

impl OnCompleted for Ignore {
  #[inline]
  fn on_completed(self) {}
}

/// An observer assembled from closures.
#[derive(Clone)]
pub struct FnObserver<N, E = Ignore, C = Ignore> {
  next: N,
  error: E,
  complete: C,
}

impl<N, E, C> FnObserver<N, E, C> {
  pub fn new(next: N, error: E, complete: C) -> Self { FnObserver { next, error, complete } }

  /// Replaces the error handler.
  pub fn on_error<E2>(self, error: E2) -> FnObserver<N, E2, C> {
    FnObserver { next: self.next, error, complete: self.complete }
  }

  /// Replaces the completion handler.
  pub fn on_completed<C2>(self, complete: C2) -> FnObserver<N, E, C2> {
    FnObserver { next: self.next, error: self.error, complete }
  }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for FnObserver<N, E, C>
where
  N: FnMut(Item),
  E: OnError<Err>,
  C: OnCompleted,
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  #[inline]
  fn error(self, err: Err) { OnError::on_error(self.error, err) }

  #[inline]
  fn complete(self) { OnCompleted::on_completed(self.complete) }
}

/// Builds an observer from a value handler. The terminal handlers are
/// ignored until set with [`FnObserver::on_error`] and
/// [`FnObserver::on_completed`].
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let mut seen = vec![];
/// let mut done = false;
/// {
///   let mut observer = make_observer(|v: i32| seen.push(v)).on_completed(|| done = true);
///   Observer::<i32, ()>::next(&mut observer, 1);
///   Observer::<i32, ()>::complete(observer);
/// }
/// assert_eq!(seen, vec![1]);
/// assert!(done);
/// ```
pub fn make_observer<N>(next: N) -> FnObserver<N> { FnObserver { next, error: Ignore, complete: Ignore } }

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct Recorder {
    log: Vec<String>,
  }

  impl Observer<i32, String> for &mut Recorder {
    fn next(&mut self, value: i32) { self.log.push(format!("next {value}")) }

    fn error(self, err: String) { self.log.push(format!("error {err}")) }

    fn complete(self) { self.log.push("complete".to_owned()) }
  }

  #[rxcore_macro::test]
  fn notification_accept() {
    let mut rec = Recorder::default();
    let observer = Notification::Next(1).accept(&mut rec);
    let observer = observer.and_then(|o| Notification::Error("boom".to_owned()).accept(o));
    assert!(observer.is_none());
    assert_eq!(rec.log, vec!["next 1", "error boom"]);
  }

  #[rxcore_macro::test]
  fn boxed_observer_forwards() {
    let log = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    let mut boxed: BoxedObserver<i32, ()> = Box::new(
      make_observer(move |v: i32| l1.lock().unwrap().push(v))
        .on_completed(move || l2.lock().unwrap().push(-1)),
    );
    boxed.next(1);
    boxed.next(2);
    boxed.complete();
    assert_eq!(*log.lock().unwrap(), vec![1, 2, -1]);
  }

  #[rxcore_macro::test]
  fn subscriber_delivers_through_its_boxed_observer() {
    let log = crate::rc::MutArc::own(vec![]);
    let c_log = log.clone();
    let subscriber = crate::subscriber::make_subscriber::<i32, (), _>(make_observer(move |v| {
      c_log.rc_deref_mut().push(v)
    }));
    subscriber.on_next(1);
    subscriber.on_next(2);
    subscriber.on_completed();
    assert_eq!(*log.rc_deref_mut(), vec![1, 2]);
  }

  #[rxcore_macro::test]
  fn terminal_flags() {
    assert!(!Notification::<i32, ()>::Next(1).is_terminal());
    assert!(Notification::<i32, ()>::Completed.is_terminal());
    assert!(Notification::<i32, ()>::Error(()).is_terminal());
  }
}
