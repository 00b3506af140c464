//! # Object Manager
//!
//! A bidirectional table between opaque 64-bit handles and live engine objects.
//!
//! ## Invariants
//! - **Freshness**: Handles come from a strictly increasing counter and are never reissued,
//!   even after they are freed. A stale handle can only ever resolve to `None`.
//! - **Bijection**: An object has at most one live handle. Allocating an object that already
//!   has one returns the existing handle.
//! - **Short Lock**: The table lock covers lookup, insert and remove only. Objects are handed out
//!   as `Arc`s, so no engine code runs while the lock is held.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

struct Table<T> {
    forward: HashMap<u64, Arc<T>>,
    reverse: HashMap<usize, u64>,
    next: u64,
}

pub struct ObjectManager<T> {
    table: Mutex<Table<T>>,
}

/// Identity of an object, stable while the table holds a strong reference to it.
fn key<T>(object: &Arc<T>) -> usize {
    Arc::as_ptr(object) as *const () as usize
}

impl<T> ObjectManager<T> {
    /// Creates an empty table whose first handle will be `first_handle`.
    pub fn new(first_handle: u64) -> Self {
        Self {
            table: Mutex::new(Table {
                forward: HashMap::new(),
                reverse: HashMap::new(),
                next: first_handle,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table<T>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `object` and returns its handle.
    pub fn allocate(&self, object: Arc<T>) -> u64 {
        let mut table = self.lock();
        if let Some(&handle) = table.reverse.get(&key(&object)) {
            return handle;
        }
        let handle = table.next;
        table.next += 1;
        table.reverse.insert(key(&object), handle);
        table.forward.insert(handle, object);
        handle
    }

    /// Resolves a handle. Unknown, freed and never-issued handles all yield `None`.
    pub fn find(&self, handle: u64) -> Option<Arc<T>> {
        self.lock().forward.get(&handle).cloned()
    }

    /// Reverse lookup: the live handle of `object`, if it has one.
    pub fn find_handle(&self, object: &Arc<T>) -> Option<u64> {
        self.lock().reverse.get(&key(object)).copied()
    }

    /// Removes a handle. Freeing an absent handle is a no-op and returns `None`.
    pub fn free(&self, handle: u64) -> Option<Arc<T>> {
        let mut table = self.lock();
        let object = table.forward.remove(&handle)?;
        table.reverse.remove(&key(&object));
        Some(object)
    }

    /// Removes whatever handle `object` has. Returns the freed handle, if there was one.
    pub fn free_object(&self, object: &Arc<T>) -> Option<u64> {
        let mut table = self.lock();
        let handle = table.reverse.remove(&key(object))?;
        table.forward.remove(&handle);
        Some(handle)
    }

    pub fn len(&self) -> usize {
        self.lock().forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
