//! Property system for the tiled map view.
//!
//! A [`Property<T>`] wraps a value and reports whether a write actually changed
//! it, so owners emit their change signal only on real mutations.
//!
//! # Example
//!
//! ```
//! use tiledmap_core::{Property, Signal};
//!
//! struct SearchBox {
//!     term: Property<String>,
//!     term_changed: Signal<String>,
//! }
//!
//! impl SearchBox {
//!     fn set_term(&self, term: &str) {
//!         if self.term.set(term.to_string()) {
//!             self.term_changed.emit(term.to_string());
//!         }
//!     }
//! }
//!
//! let search = SearchBox { term: Property::new(String::new()), term_changed: Signal::new() };
//! search.set_term("lion");
//! assert_eq!(search.term.get(), "lion");
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A reactive property that tracks changes.
///
/// `Property<T>` uses interior mutability with `RwLock` and is `Send + Sync`
/// whenever `T` is.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    ///
    /// This clones the value. For large types, consider using `with()` instead.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Set the value without change detection.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }

    /// Mutate the value in place, returning whatever the closure returns.
    ///
    /// The closure decides whether the edit counts as a change.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        f(&mut self.value.write())
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    ///
    /// The caller should emit the associated notification signal when this
    /// returns `true`.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }

    /// Set the value, returning the old value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.write();
        if *current != value {
            Some(std::mem::replace(&mut *current, value))
        } else {
            None
        }
    }
}

impl<T: Clone> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_get_set() {
        let prop = Property::new(42);
        assert_eq!(prop.get(), 42);

        assert!(!prop.set(42));
        assert!(prop.set(100));
        assert_eq!(prop.get(), 100);
    }

    #[test]
    fn test_property_replace() {
        let prop = Property::new("lion".to_string());
        assert_eq!(prop.replace("lion".to_string()), None);
        assert_eq!(prop.replace("tiger".to_string()), Some("lion".to_string()));
        assert_eq!(prop.get(), "tiger");
    }

    #[test]
    fn test_property_update_and_with() {
        let prop = Property::new(vec![1, 2]);
        let changed = prop.update(|items| {
            items.push(3);
            true
        });
        assert!(changed);
        assert_eq!(prop.with(|items| items.len()), 3);
    }

    #[test]
    fn test_property_set_silent() {
        let prop = Property::<Option<String>>::default();
        prop.set_silent(Some("POLYGON EMPTY".into()));
        assert_eq!(prop.get().as_deref(), Some("POLYGON EMPTY"));
    }
}
