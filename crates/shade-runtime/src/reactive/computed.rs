#![forbid(unsafe_code)]

//! Lazy computed values that auto-update from an [`Observable`] source.
//!
//! # Design
//!
//! [`Computed<T>`] wraps a compute function and its cached result in shared,
//! reference-counted storage. When the source changes, the cached value is
//! invalidated (marked dirty). The next call to [`get()`](Computed::get)
//! recomputes, then asks the [`Equality`] whether the fresh value differs
//! from the cached one. Only a differing value replaces the cache.
//!
//! # Invariants
//!
//! 1. `get()` always returns a value consistent with the current state of the
//!    source, up to the configured equality.
//! 2. The compute function is called at most once per source change cycle
//!    (memoization).
//! 3. If the source has not changed, `get()` returns the cached value in O(1).
//! 4. Version increments by exactly 1 per recomputation whose result the
//!    equality judged different. Consumers that cache on `version()` skip
//!    work for equivalent values.
//!
//! # Failure Modes
//!
//! - **Compute or equality function panics**: The panic propagates to the
//!   reader. The cached value remains from the last successful computation
//!   and the dirty flag stays set so the next `get()` will retry.
//! - **Source dropped**: The subscription becomes inert. The computed value
//!   still recomputes from its own handle to the source when invalidated.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::observable::{Observable, Subscription};

/// Caller-supplied equality, called as `equals(previous, next)`.
pub type Equality<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Shared interior for [`Computed<T>`].
struct ComputedInner<T> {
    /// The computation function.
    compute: Box<dyn Fn() -> T>,
    /// `None` means every recomputation counts as a change.
    equals: Option<Equality<T>>,
    /// Cached result (None only before first computation).
    cached: Option<T>,
    /// Whether the cached value is stale.
    dirty: Rc<Cell<bool>>,
    /// Bumped on each recomputation that changed the cached value.
    version: u64,
    /// Subscription guards keeping dependency callbacks alive.
    /// These are never read after construction, but must be kept alive.
    _subscriptions: Vec<Subscription>,
}

impl<T> ComputedInner<T> {
    fn refresh(&mut self) {
        if !self.dirty.get() && self.cached.is_some() {
            return;
        }
        let next = (self.compute)();
        let unchanged = match (&self.cached, &self.equals) {
            (Some(previous), Some(equals)) => equals(previous, &next),
            _ => false,
        };
        if !unchanged {
            self.cached = Some(next);
            self.version += 1;
        }
        self.dirty.set(false);
    }
}

/// A lazily-evaluated, memoized value derived from an [`Observable`].
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
pub struct Computed<T> {
    inner: Rc<RefCell<ComputedInner<T>>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Computed")
            .field("cached", &inner.cached)
            .field("dirty", &inner.dirty.get())
            .field("version", &inner.version)
            .field("custom_equality", &inner.equals.is_some())
            .finish()
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed value derived from a single observable, using value
    /// equality to suppress unchanged results.
    pub fn from_observable<S: Clone + PartialEq + 'static>(
        source: &Observable<S>,
        map: impl Fn(&S) -> T + 'static,
    ) -> Self
    where
        T: PartialEq,
    {
        let equals: Equality<T> = Rc::new(|a: &T, b: &T| a == b);
        Self::with_equality(source, map, Some(equals))
    }

    /// Create a computed value with an explicit equality.
    ///
    /// `None` treats every recomputation as a change.
    pub fn with_equality<S: Clone + PartialEq + 'static>(
        source: &Observable<S>,
        map: impl Fn(&S) -> T + 'static,
        equals: Option<Equality<T>>,
    ) -> Self {
        let source_clone = source.clone();
        let compute = Box::new(move || source_clone.with(|v| map(v)));

        // Dirty until the first get().
        let dirty = Rc::new(Cell::new(true));
        let dirty_for_sub = Rc::clone(&dirty);
        let sub = source.subscribe(move |_| dirty_for_sub.set(true));

        Self {
            inner: Rc::new(RefCell::new(ComputedInner {
                compute,
                equals,
                cached: None,
                dirty,
                version: 0,
                _subscriptions: vec![sub],
            })),
        }
    }

    /// Get the current value, recomputing if the source has changed.
    ///
    /// Returns a clone of the cached value.
    #[must_use]
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Access the current value by reference without cloning.
    ///
    /// Forces recomputation if dirty.
    ///
    /// # Panics
    ///
    /// Panics if the closure attempts to call `get()` on the same
    /// `Computed` (re-entrant borrow).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.borrow_mut().refresh();
        let inner = self.inner.borrow();
        f(inner
            .cached
            .as_ref()
            .expect("cached is always Some after refresh"))
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().dirty.get()
    }

    /// Current version number. Increments by 1 on each effective change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn single_dep_computed() {
        let source = Observable::new(10);
        let computed = Computed::from_observable(&source, |v| v * 2);

        assert_eq!(computed.get(), 20);
        assert_eq!(computed.version(), 1);

        source.set(5);
        assert!(computed.is_dirty());
        assert_eq!(computed.get(), 10);
        assert_eq!(computed.version(), 2);
    }

    #[test]
    fn memoization() {
        let compute_count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&compute_count);

        let source = Observable::new(10);
        let computed = Computed::from_observable(&source, move |v| {
            count_clone.set(count_clone.get() + 1);
            v * 2
        });

        // Not computed yet.
        assert_eq!(compute_count.get(), 0);

        assert_eq!(computed.get(), 20);
        assert_eq!(compute_count.get(), 1);

        // Cached.
        assert_eq!(computed.get(), 20);
        assert_eq!(compute_count.get(), 1);

        // Source changed: recompute on next get.
        source.set(20);
        assert_eq!(computed.get(), 40);
        assert_eq!(compute_count.get(), 2);
    }

    #[test]
    fn equal_projection_keeps_version() {
        let source = Observable::new((1, "a"));
        let first = Computed::from_observable(&source, |v| v.0);

        assert_eq!(first.get(), 1);
        source.set((1, "b"));
        assert!(first.is_dirty());
        assert_eq!(first.get(), 1);
        assert_eq!(first.version(), 1);
    }

    #[test]
    fn custom_equality_suppresses_change() {
        let source = Observable::new(1);
        let always_equal: Equality<i32> = Rc::new(|_, _| true);
        let computed = Computed::with_equality(&source, |v| *v, Some(always_equal));

        assert_eq!(computed.get(), 1);
        source.set(2);
        source.set(3);
        assert_eq!(computed.get(), 1);
        assert_eq!(computed.version(), 1);
    }

    #[test]
    fn equality_receives_previous_then_next() {
        let source = Observable::new(1);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let calls_clone = Rc::clone(&calls);
        let equals: Equality<i32> = Rc::new(move |prev, next| {
            calls_clone.borrow_mut().push((*prev, *next));
            false
        });
        let computed = Computed::with_equality(&source, |v| *v, Some(equals));

        let _ = computed.get();
        source.set(2);
        let _ = computed.get();
        assert_eq!(*calls.borrow(), vec![(1, 2)]);
    }

    #[test]
    fn no_equality_always_changes() {
        let source = Observable::new(vec![1]);
        let computed = Computed::with_equality(&source, |v| v.len(), None);

        assert_eq!(computed.get(), 1);
        source.set(vec![2]);
        assert_eq!(computed.get(), 1);
        assert_eq!(computed.version(), 2);
    }

    #[test]
    fn with_access() {
        let source = Observable::new(vec![1, 2, 3]);
        let computed = Computed::from_observable(&source, |v| v.iter().sum::<i32>());

        let result = computed.with(|sum| *sum);
        assert_eq!(result, 6);
    }

    #[test]
    fn clone_shares_state() {
        let source = Observable::new(10);
        let c1 = Computed::from_observable(&source, |v| v + 1);
        let c2 = c1.clone();

        assert_eq!(c1.get(), 11);
        source.set(20);
        assert_eq!(c1.get(), 21);
        assert_eq!(c2.get(), 21);
        assert_eq!(c2.version(), 2);
    }

    #[test]
    fn no_change_same_value() {
        let source = Observable::new(42);
        let compute_count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&compute_count);

        let computed = Computed::from_observable(&source, move |v| {
            count_clone.set(count_clone.get() + 1);
            *v
        });

        let _ = computed.get();
        // Equal set does not notify.
        source.set(42);
        assert!(!computed.is_dirty());
        let _ = computed.get();
        assert_eq!(compute_count.get(), 1);
    }

    #[test]
    fn panicking_compute_keeps_dirty() {
        let source = Observable::new(1);
        let computed = Computed::from_observable(&source, |v| {
            assert!(*v < 10, "projection rejects {v}");
            *v
        });
        assert_eq!(computed.get(), 1);

        source.set(10);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| computed.get()));
        assert!(result.is_err());

        source.set(3);
        assert_eq!(computed.get(), 3);
    }

    #[test]
    fn debug_format() {
        let source = Observable::new(42);
        let computed = Computed::from_observable(&source, |v| *v);
        let _ = computed.get();
        let dbg = format!("{:?}", computed);
        assert!(dbg.contains("Computed"));
        assert!(dbg.contains("42"));
    }

    #[test]
    fn many_updates_version_monotonic() {
        let source = Observable::new(0);
        let computed = Computed::from_observable(&source, |v| *v);

        for i in 1..=50 {
            source.set(i);
            let _ = computed.get();
        }
        assert_eq!(computed.version(), 50);
    }
}
