//! Lock-free memoization cell.
//!
//! ```text
//! LazyCell<T>
//! └── ArcSwapOption<Slot<T>>
//!     ├── None               → empty, next reader computes
//!     ├── Some(Slot::Null)   → computed, result was "nothing"
//!     └── Some(Slot::Value)  → computed value
//! ```
//!
//! Racing initializers may each run `init`, but only the first publish is
//! kept and every caller returns that published slot. This is only sound
//! when `init` is a pure function of inputs that do not change while the
//! cell is populated. State that must follow content edits is cleared
//! explicitly with [`LazyCell::clear`].

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

enum Slot<T> {
    Null,
    Value(Arc<T>),
}

impl<T> Slot<T> {
    fn value(&self) -> Option<Arc<T>> {
        match self {
            Slot::Null => None,
            Slot::Value(value) => Some(Arc::clone(value)),
        }
    }
}

/// A single-assignment, clearable slot shared across threads.
pub struct LazyCell<T> {
    slot: ArcSwapOption<Slot<T>>,
}

impl<T> Default for LazyCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyCell<T> {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
        }
    }

    /// Create a cell that already holds `value`.
    pub fn with_value(value: T) -> Self {
        let cell = Self::new();
        cell.slot.store(Some(Arc::new(Slot::Value(Arc::new(value)))));
        cell
    }

    /// Whether a value (or the null sentinel) has been published.
    pub fn is_initialized(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Peek at the cell without computing.
    ///
    /// `None` means empty; `Some(None)` means the computation produced nothing.
    pub fn peek(&self) -> Option<Option<Arc<T>>> {
        self.slot.load_full().map(|slot| slot.value())
    }

    /// Return the published value, computing and publishing it if empty.
    pub fn get_or_init(&self, init: impl FnOnce() -> Option<T>) -> Option<Arc<T>> {
        if let Some(slot) = self.slot.load_full() {
            return slot.value();
        }

        let computed = Arc::new(match init() {
            Some(value) => Slot::Value(Arc::new(value)),
            None => Slot::Null,
        });

        let empty: Option<Arc<Slot<T>>> = None;
        let previous = self
            .slot
            .compare_and_swap(&empty, Some(Arc::clone(&computed)));
        match &*previous {
            // Lost the race: adopt the winner.
            Some(winner) => winner.value(),
            None => computed.value(),
        }
    }

    /// Replace the cell contents unconditionally.
    pub fn set(&self, value: T) {
        self.slot.store(Some(Arc::new(Slot::Value(Arc::new(value)))));
    }

    /// Empty the cell; the next [`get_or_init`](Self::get_or_init) recomputes.
    pub fn clear(&self) {
        self.slot.store(None);
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            None => f.write_str("LazyCell(<empty>)"),
            Some(None) => f.write_str("LazyCell(<null>)"),
            Some(Some(value)) => f.debug_tuple("LazyCell").field(&value).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_computes_once() {
        let cell = LazyCell::new();
        let calls = AtomicUsize::new(0);

        let first = cell.get_or_init(|| {
            calls.fetch_add(1, Ordering::Relaxed);
            Some(42)
        });
        let second = cell.get_or_init(|| {
            calls.fetch_add(1, Ordering::Relaxed);
            Some(7)
        });

        assert_eq!(first.as_deref(), Some(&42));
        assert_eq!(second.as_deref(), Some(&42));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_null_sentinel_is_memoized() {
        let cell: LazyCell<String> = LazyCell::new();
        assert!(cell.get_or_init(|| None).is_none());
        assert!(cell.is_initialized());
        // Sentinel wins over a later non-null computation.
        assert!(cell.get_or_init(|| Some("late".into())).is_none());
        assert!(matches!(cell.peek(), Some(None)));
    }

    #[test]
    fn test_clear_recomputes() {
        let cell = LazyCell::new();
        cell.get_or_init(|| Some(1));
        cell.clear();
        assert!(cell.peek().is_none());
        assert_eq!(cell.get_or_init(|| Some(2)).as_deref(), Some(&2));
    }

    #[test]
    fn test_racing_initializers_agree() {
        let cell = Arc::new(LazyCell::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || cell.get_or_init(|| Some(i)).map(|v| *v))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let published = cell.peek().flatten().map(|v| *v);
        assert!(results.iter().all(|r| *r == published));
    }
}
