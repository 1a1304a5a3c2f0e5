#![forbid(unsafe_code)]

//! Memoized selectors over a reactive snapshot.
//!
//! Everything here is a pure projection of an [`Observable`] source: nothing
//! writes to the source. A [`Source`] pairs the observable with a
//! [`Liveness`] token owned by whoever owns the observable; once the owner is
//! torn down, reading any selector built from the source is a programming
//! error.
//!
//! - [`Source::state`] builds a [`Selector`], a memo recomputed only after
//!   the source changed and only replaced when the projection differs.
//! - [`Source::watcher`] builds a [`Watcher`], which reads the projection
//!   right away instead of handing back a memo.
//! - [`Source::reducer`] builds a [`Reducer`], which narrows the source to a
//!   sub-value and builds further selectors from there.
//!
//! Accessors and equalities are caller code. Their panics propagate to the
//! reader untouched.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::{InterpreterError, Result};
use crate::reactive::{Computed, Equality, Observable};

/// Shared flag telling selectors whether their source is still alive.
#[derive(Debug, Clone)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.get()
    }

    /// Mark the source dead for every holder of this token.
    pub fn kill(&self) {
        self.0.set(false);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// A reactive source that selectors can be built from.
pub struct Source<S> {
    observable: Observable<S>,
    liveness: Liveness,
}

impl<S> Clone for Source<S> {
    fn clone(&self) -> Self {
        Self {
            observable: self.observable.clone(),
            liveness: self.liveness.clone(),
        }
    }
}

impl<S: Clone + PartialEq + 'static> Source<S> {
    #[must_use]
    pub fn new(observable: Observable<S>, liveness: Liveness) -> Self {
        Self {
            observable,
            liveness,
        }
    }

    /// Memoized projection, compared with `PartialEq`.
    #[must_use]
    pub fn state<T: Clone + PartialEq + 'static>(
        &self,
        accessor: impl Fn(&S) -> T + 'static,
    ) -> Selector<T> {
        let equals: Equality<T> = Rc::new(|a: &T, b: &T| a == b);
        self.build(accessor, equals)
    }

    /// Memoized projection with a caller equality, called as
    /// `equals(previous, next)`.
    #[must_use]
    pub fn state_by<T: Clone + 'static>(
        &self,
        accessor: impl Fn(&S) -> T + 'static,
        equals: impl Fn(&T, &T) -> bool + 'static,
    ) -> Selector<T> {
        self.build(accessor, Rc::new(equals))
    }

    /// Memoized identity projection.
    #[must_use]
    pub fn snapshot(&self) -> Selector<S> {
        self.state(S::clone)
    }

    #[must_use]
    pub fn watcher<T: Clone + 'static>(&self, accessor: impl Fn(&S) -> T + 'static) -> Watcher<S, T> {
        Watcher {
            source: self.clone(),
            accessor: Rc::new(accessor),
        }
    }

    #[must_use]
    pub fn reducer<T: Clone + 'static>(&self, accessor: impl Fn(&S) -> T + 'static) -> Reducer<S, T> {
        Reducer {
            source: self.clone(),
            accessor: Rc::new(accessor),
        }
    }

    /// Whether the owner of the source is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    pub(crate) fn observable(&self) -> &Observable<S> {
        &self.observable
    }

    fn build<T: Clone + 'static>(
        &self,
        accessor: impl Fn(&S) -> T + 'static,
        equals: Equality<T>,
    ) -> Selector<T> {
        Selector {
            computed: Computed::with_equality(&self.observable, accessor, Some(equals)),
            liveness: self.liveness.clone(),
        }
    }
}

/// A memoized read over a [`Source`].
pub struct Selector<T> {
    computed: Computed<T>,
    liveness: Liveness,
}

impl<T> Clone for Selector<T> {
    fn clone(&self) -> Self {
        Self {
            computed: self.computed.clone(),
            liveness: self.liveness.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("computed", &self.computed)
            .field("alive", &self.liveness.is_alive())
            .finish()
    }
}

impl<T: Clone + 'static> Selector<T> {
    /// Current projected value.
    ///
    /// # Panics
    ///
    /// Panics if the owner of the source has been disposed; use
    /// [`try_get`](Self::try_get) to observe that as an error instead.
    #[must_use]
    pub fn get(&self) -> T {
        assert!(
            self.liveness.is_alive(),
            "selector read after its interpreter was disposed"
        );
        self.computed.get()
    }

    /// Current projected value, or [`InterpreterError::Disposed`].
    pub fn try_get(&self) -> Result<T> {
        if !self.liveness.is_alive() {
            return Err(InterpreterError::disposed("read"));
        }
        Ok(self.computed.get())
    }

    /// Access the projected value by reference.
    ///
    /// # Panics
    ///
    /// Panics if the owner of the source has been disposed.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        assert!(
            self.liveness.is_alive(),
            "selector read after its interpreter was disposed"
        );
        self.computed.with(f)
    }

    /// Bumped each time the observed value changes.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.computed.version()
    }

    /// Whether the source changed since the last read.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.computed.is_dirty()
    }
}

/// Reads a projection immediately, optionally with a custom equality.
pub struct Watcher<S, T> {
    source: Source<S>,
    accessor: Rc<dyn Fn(&S) -> T>,
}

impl<S, T> Clone for Watcher<S, T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            accessor: Rc::clone(&self.accessor),
        }
    }
}

impl<S: Clone + PartialEq + 'static, T: Clone + 'static> Watcher<S, T> {
    /// Current value of the projection.
    ///
    /// # Panics
    ///
    /// Panics if the owner of the source has been disposed.
    #[must_use]
    pub fn read(&self) -> T
    where
        T: PartialEq,
    {
        let accessor = Rc::clone(&self.accessor);
        self.source.state(move |s| accessor(s)).get()
    }

    /// Current value of the projection, memoized under `equals`.
    ///
    /// # Panics
    ///
    /// Panics if the owner of the source has been disposed.
    #[must_use]
    pub fn read_by(&self, equals: impl Fn(&T, &T) -> bool + 'static) -> T {
        let accessor = Rc::clone(&self.accessor);
        self.source.state_by(move |s| accessor(s), equals).get()
    }
}

/// A composer scoped to the sub-value selected by its accessor.
pub struct Reducer<S, T> {
    source: Source<S>,
    accessor: Rc<dyn Fn(&S) -> T>,
}

impl<S, T> Clone for Reducer<S, T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            accessor: Rc::clone(&self.accessor),
        }
    }
}

impl<S: Clone + PartialEq + 'static, T: Clone + 'static> Reducer<S, T> {
    /// Memoized projection of the narrowed value.
    #[must_use]
    pub fn select<R: Clone + PartialEq + 'static>(
        &self,
        accessor: impl Fn(&T) -> R + 'static,
    ) -> Selector<R> {
        let outer = Rc::clone(&self.accessor);
        self.source.state(move |s| accessor(&outer(s)))
    }

    /// Memoized projection of the narrowed value under `equals`.
    #[must_use]
    pub fn select_by<R: Clone + 'static>(
        &self,
        accessor: impl Fn(&T) -> R + 'static,
        equals: impl Fn(&R, &R) -> bool + 'static,
    ) -> Selector<R> {
        let outer = Rc::clone(&self.accessor);
        self.source.state_by(move |s| accessor(&outer(s)), equals)
    }

    /// Memoized narrowed value itself.
    #[must_use]
    pub fn get(&self) -> Selector<T>
    where
        T: PartialEq,
    {
        self.select(T::clone)
    }

    /// A reducer over a further sub-value.
    #[must_use]
    pub fn narrow<R: Clone + 'static>(&self, accessor: impl Fn(&T) -> R + 'static) -> Reducer<S, R> {
        let outer = Rc::clone(&self.accessor);
        self.source.reducer(move |s| accessor(&outer(s)))
    }
}
