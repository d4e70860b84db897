//! Observable state cells.
//!
//! A [`Store`] is the single source of truth for one cached value. Writers
//! publish synchronously; readers either take a snapshot or hold a
//! [`watch::Receiver`] and wait for changes. Derived views are functions of
//! the cell and are recomputed on every read.
//!
//! Optimistic writes go through [`Store::begin`], which serializes them per
//! store: the returned [`Transaction`] owns the store's mutation lock until it
//! is committed, rolled back or dropped. A rollback therefore always restores
//! the value the same transaction replaced.
//!
//! Plain [`Store::set`] and [`Store::update`] calls do not wait for that lock.
//! Every such write bumps the store's write count, and a transaction that sees
//! the count moved since it began leaves the newer value in place.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};

struct Inner<T> {
    tx: watch::Sender<T>,
    mutations: Arc<Mutex<()>>,
    writes: AtomicU64,
}

impl<T> Inner<T> {
    // Only called while the watch channel's write lock is held.
    fn bump(&self) -> u64 { self.writes.fetch_add(1, Ordering::Relaxed) + 1 }
}

pub struct Store<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("value", &*self.inner.tx.borrow()).finish()
    }
}

impl<T: Default> Default for Store<T> {
    fn default() -> Self { Self::new(T::default()) }
}

impl<T> Store<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { inner: Arc::new(Inner { tx, mutations: Arc::new(Mutex::new(())), writes: AtomicU64::new(0) }) }
    }

    /// Reads the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R { f(&self.inner.tx.borrow()) }

    /// Publishes a value. Subscribers are notified even if it equals the old one.
    pub fn set(&self, value: T) {
        self.inner.tx.send_modify(|current| {
            *current = value;
            self.inner.bump();
        });
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.tx.send_modify(|current| {
            f(current);
            self.inner.bump();
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<T> { self.inner.tx.subscribe() }

    pub fn derive<U, F>(&self, f: F) -> Derived<T, F>
    where
        F: Fn(&T) -> U,
    {
        Derived { rx: self.subscribe(), f }
    }
}

impl<T: Clone> Store<T> {
    pub fn get(&self) -> T { self.inner.tx.borrow().clone() }

    /// Starts an optimistic mutation: waits for any mutation already in
    /// flight on this store, snapshots the value, then publishes
    /// `transform(&snapshot)` before returning.
    pub async fn begin(&self, transform: impl FnOnce(&T) -> T) -> Transaction<T> {
        let guard = Arc::clone(&self.inner.mutations).lock_owned().await;
        let mut previous = None;
        let mut generation = 0;
        self.inner.tx.send_modify(|current| {
            let next = transform(current);
            previous = Some(std::mem::replace(current, next));
            generation = self.inner.bump();
        });
        Transaction { store: self.clone(), previous, generation, _guard: guard }
    }
}

/// An optimistic value awaiting server confirmation.
///
/// Dropping an unfinished transaction rolls it back.
#[must_use = "an unfinished transaction rolls back when dropped"]
pub struct Transaction<T> {
    store: Store<T>,
    previous: Option<T>,
    /// Write count right after the optimistic publish.
    generation: u64,
    _guard: OwnedMutexGuard<()>,
}

impl<T> Transaction<T> {
    /// The value that was current when the transaction began.
    pub fn previous(&self) -> Option<&T> { self.previous.as_ref() }

    /// Replaces the optimistic value with the authoritative one. Returns
    /// `false` when the store was written since `begin` and kept that value.
    pub fn commit(mut self, value: T) -> bool {
        self.previous = None;
        self.write_back(value)
    }

    /// Keeps the optimistic value as final.
    pub fn confirm(mut self) { self.previous = None; }

    /// Restores the snapshot exactly, unless the store was written since
    /// `begin`. Returns whether the snapshot was restored.
    pub fn rollback(mut self) -> bool { self.restore() }

    fn restore(&mut self) -> bool {
        match self.previous.take() {
            Some(previous) => self.write_back(previous),
            None => false,
        }
    }

    fn write_back(&self, value: T) -> bool {
        let inner = &self.store.inner;
        inner.tx.send_if_modified(|current| {
            if inner.writes.load(Ordering::Relaxed) != self.generation {
                return false;
            }
            *current = value;
            true
        })
    }
}

impl<T> Drop for Transaction<T> {
    fn drop(&mut self) {
        self.restore();
    }
}

impl<T: fmt::Debug> fmt::Debug for Transaction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction").field("previous", &self.previous).finish()
    }
}

/// A read-only view computed from a store.
pub struct Derived<T, F> {
    rx: watch::Receiver<T>,
    f: F,
}

impl<T, U, F> Derived<T, F>
where
    F: Fn(&T) -> U,
{
    pub fn get(&mut self) -> U {
        let value = self.rx.borrow_and_update();
        (self.f)(&value)
    }

    /// Waits for the source to change, then returns the recomputed value.
    /// `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<U> {
        self.rx.changed().await.ok()?;
        Some(self.get())
    }
}

impl<T, F> fmt::Debug for Derived<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("Derived") }
}
