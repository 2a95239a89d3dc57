//! Result of dispatching one line.
//!
//! [`Outcome::Terminate`] is the only value that stops the REPL. It is a
//! variant of its own rather than an error so that no failure, and no
//! end-of-stream condition from the input source, can be mistaken for it.

/// What the loop should do after a line has been handled.
#[derive(Debug)]
#[must_use]
pub enum Outcome<E> {
    /// Keep reading lines.
    Continue,
    /// Stop the loop cleanly.
    Terminate,
    /// The line failed; report it and keep reading.
    Failed(E),
}

impl<E> Outcome<E> {
    /// Whether this is the termination sentinel.
    pub const fn is_terminate(&self) -> bool {
        matches!(self, Self::Terminate)
    }

    /// Map the failure payload, leaving the control variants untouched.
    pub fn map_err<F, O: FnOnce(E) -> F>(self, op: O) -> Outcome<F> {
        match self {
            Self::Continue => Outcome::Continue,
            Self::Terminate => Outcome::Terminate,
            Self::Failed(e) => Outcome::Failed(op(e)),
        }
    }
}

impl<E> From<Result<(), E>> for Outcome<E> {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Continue,
            Err(e) => Self::Failed(e),
        }
    }
}
