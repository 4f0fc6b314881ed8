//! String interner implementation using DashMap for concurrent access.
//!
//! Interned strings are boxed and leaked to obtain `'static` references.
//! The table never shrinks; symbols stay valid for the program lifetime.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::LazyLock;

use ahash::RandomState;
use dashmap::DashMap;

use super::Symbol;

/// Global string table instance.
///
/// Initialized on first use via `LazyLock`.
pub static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::new);

/// Thread-safe string table.
///
/// Two maps are kept in step: `forward` resolves a string to its index during
/// interning, `reverse` resolves an index back to its string for `as_str`.
/// Both use ahash, which is faster than SipHash for short identifier-like
/// keys.
pub struct StringTable {
    /// string -> index
    forward: DashMap<&'static str, u32, RandomState>,
    /// index -> string
    reverse: DashMap<u32, &'static str, RandomState>,
    /// Next unused index
    next_index: AtomicU32,
}

impl StringTable {
    fn new() -> Self {
        Self {
            forward: DashMap::with_capacity_and_hasher(256, RandomState::new()),
            reverse: DashMap::with_capacity_and_hasher(256, RandomState::new()),
            next_index: AtomicU32::new(0),
        }
    }

    /// Intern a string, returning its symbol.
    pub fn intern(&self, string: &str) -> Symbol {
        if let Some(entry) = self.forward.get(string) {
            return Symbol::from_index(*entry.value());
        }

        // Leak to get 'static; the table owns these for the process lifetime.
        let leaked: &'static str = Box::leak(string.to_owned().into_boxed_str());

        // Two threads may race on the same fresh string. The entry API keeps
        // exactly one winner; the loser's leaked copy is a small one-time cost.
        let index = *self
            .forward
            .entry(leaked)
            .or_insert_with(|| self.next_index.fetch_add(1, Ordering::Relaxed));
        self.reverse.entry(index).or_insert(leaked);

        Symbol::from_index(index)
    }

    /// Resolve an index back to its string.
    ///
    /// # Panics
    ///
    /// Panics if the index was not produced by this table.
    pub fn get(&self, index: u32) -> &'static str {
        *self
            .reverse
            .get(&index)
            .expect("symbol index not present in string table")
            .value()
    }

    /// Number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// True if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let a = STRING_TABLE.intern("interner_idempotent");
        let b = STRING_TABLE.intern("interner_idempotent");
        assert_eq!(a, b);
    }

    #[test]
    fn test_get_resolves_interned_index() {
        let s = STRING_TABLE.intern("interner_resolve");
        assert_eq!(STRING_TABLE.get(s.as_u32()), "interner_resolve");
    }
}
