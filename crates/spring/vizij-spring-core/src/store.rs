//! Observable cells used to publish spring output and accept targets.
//!
//! A [`Writable`] holds a value plus a list of subscribers. Subscribing calls
//! the callback immediately with the current value and again on every change.
//! Callbacks run after the cell's lock is released, so a subscriber may read
//! or write the same cell (or drive a spring) from inside its callback.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Call to stop receiving updates.
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

struct Cell<T> {
    value: T,
    subscribers: Vec<(u64, Subscriber<T>)>,
    next_id: u64,
}

/// A shared value that can be read, written and observed.
pub struct Writable<T> {
    cell: Arc<Mutex<Cell<T>>>,
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Writable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self.lock();
        f.debug_struct("Writable")
            .field("value", &cell.value)
            .field("subscribers", &cell.subscribers.len())
            .finish()
    }
}

impl<T> Writable<T> {
    fn lock(&self) -> MutexGuard<'_, Cell<T>> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Writable<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Cell {
                value,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Replace the value and notify subscribers if it changed.
    pub fn set(&self, value: T) {
        let (value, subscribers) = {
            let mut cell = self.lock();
            if cell.value == value {
                return;
            }
            cell.value = value.clone();
            let subscribers: Vec<Subscriber<T>> =
                cell.subscribers.iter().map(|(_, f)| Arc::clone(f)).collect();
            (value, subscribers)
        };
        for subscriber in subscribers {
            subscriber(&value);
        }
    }

    /// Set the value computed from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.get());
        self.set(next);
    }

    /// Observe the value. `f` runs immediately with the current value.
    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Unsubscribe {
        let f: Subscriber<T> = Arc::new(f);
        let (id, current) = {
            let mut cell = self.lock();
            let id = cell.next_id;
            cell.next_id += 1;
            cell.subscribers.push((id, Arc::clone(&f)));
            (id, cell.value.clone())
        };
        f(&current);

        let cell = Arc::downgrade(&self.cell);
        Box::new(move || {
            if let Some(cell) = cell.upgrade() {
                let mut cell = cell.lock().unwrap_or_else(PoisonError::into_inner);
                cell.subscribers.retain(|(sid, _)| *sid != id);
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Read-only view sharing this cell.
    pub fn readable(&self) -> Readable<T> {
        Readable {
            inner: self.clone(),
        }
    }
}

/// Read-only view of a [`Writable`].
pub struct Readable<T> {
    inner: Writable<T>,
}

impl<T> Clone for Readable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Readable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Readable").field(&self.inner).finish()
    }
}

impl<T> Readable<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn get(&self) -> T {
        self.inner.get()
    }

    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Unsubscribe {
        self.inner.subscribe(f)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }
}
