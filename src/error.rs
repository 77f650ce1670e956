//! Errors raised by the operators themselves.
//!
//! The stream error type is always the caller's `Err`. An operator that needs
//! to fail on its own, like [`Observable::timeout`], requires
//! `Err: From<...>` for the error it produces.
//!
//! [`Observable::timeout`]: crate::observable::Observable::timeout

use std::{
  error::Error,
  fmt::{Display, Formatter},
};

/// No value arrived within the allotted time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeoutError;

impl Display for TimeoutError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str("timed out waiting for a value") }
}

impl Error for TimeoutError {}

/// The source completed without the value an operator required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceError {
  /// `first` or `last` saw an empty source.
  Empty,
}

impl Display for SequenceError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      SequenceError::Empty => f.write_str("sequence contains no elements"),
    }
  }
}

impl Error for SequenceError {}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn messages() {
    assert_eq!(TimeoutError.to_string(), "timed out waiting for a value");
    assert_eq!(SequenceError::Empty.to_string(), "sequence contains no elements");
  }
}
