//! Page-based pools for terminal values.
//!
//! More than one stack node can be created for a single input token
//! when several shifts apply, so nodes carry a pointer to the value
//! rather than the value itself. The pool hands out stable references
//! and releases all pages at once when the parse is over.
//!
//! Values are required to be `Copy`: they are interned handles,
//! positions or numbers, never owning allocations, so skipping
//! per-value drops is fine.

use bumpalo::Bump;

const DEFAULT_PAGE_ENTRIES: usize = 512;

/// Pool of token values backing one parser instance.
pub struct Pool<T: Copy> {
    bump: Bump,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Copy> Pool<T> {
    /// Creates a pool with the default page size of 512 entries.
    pub fn new() -> Self {
        Self::with_page_entries(DEFAULT_PAGE_ENTRIES)
    }

    /// Creates a pool whose pages hold `entries` values each.
    pub fn with_page_entries(entries: usize) -> Self {
        assert!(entries > 0, "empty pool page");
        Pool {
            bump: Bump::with_capacity(entries * std::mem::size_of::<T>().max(1)),
            _marker: std::marker::PhantomData,
        }
    }

    /// Stores a value and returns a reference valid until the pool is
    /// dropped.
    pub fn allocate(&self, value: T) -> &T {
        self.bump.alloc(value)
    }
}

impl<T: Copy> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_values_stay_put() {
        let pool: Pool<u64> = Pool::with_page_entries(4);
        let first = pool.allocate(1);
        let mut rest = Vec::new();
        for i in 0..100 {
            rest.push(pool.allocate(i));
        }
        assert_eq!(*first, 1);
        for (i, value) in rest.iter().enumerate() {
            assert_eq!(**value, i as u64);
        }
    }

    #[test]
    fn works_with_composite_copy_values() {
        #[derive(Clone, Copy, PartialEq, Debug)]
        struct TokenValue {
            sym: u32,
            line: u32,
        }

        let pool: Pool<TokenValue> = Pool::new();
        let v = pool.allocate(TokenValue { sym: 7, line: 3 });
        assert_eq!(*v, TokenValue { sym: 7, line: 3 });
    }
}
