//! Post-pass side effects.

use std::fmt;

/// A zero-argument deferred call, run once for every passing event or
/// non-empty collection before the owning filter updates its counters.
pub struct FilterHook {
    target: Box<dyn FnMut() + Send>,
}

impl FilterHook {
    /// Wrap a closure.
    pub fn new<F>(target: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self {
            target: Box::new(target),
        }
    }

    /// Bind `target` to a fixed argument; each call passes `args` by reference.
    pub fn bind<A, F>(mut target: F, args: A) -> Self
    where
        A: Send + 'static,
        F: FnMut(&A) + Send + 'static,
    {
        Self::new(move || target(&args))
    }

    pub fn call(&mut self) {
        (self.target)()
    }
}

impl fmt::Debug for FilterHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FilterHook")
    }
}
