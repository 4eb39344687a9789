//! Observable state cells.
//!
//! A [`StateCell`] stores the latest value and pushes every change to its
//! observers. New observers are called synchronously with the current value
//! at registration time, so nobody has to wait for the next transition to
//! learn where things stand.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct CellInner<T> {
    value: T,
    next_id: u64,
    observers: Vec<(u64, Observer<T>)>,
    /// Changes not yet delivered, oldest first
    pending: VecDeque<T>,
    dispatching: bool,
}

/// Hands the dispatcher role back if an observer panics mid-delivery.
struct Dispatcher<'a, T> {
    inner: &'a Mutex<CellInner<T>>,
    armed: bool,
}

impl<T> Drop for Dispatcher<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.dispatching = false;
        inner.pending.clear();
    }
}

/// A value with replay-latest subscription semantics.
pub struct StateCell<T> {
    inner: Arc<Mutex<CellInner<T>>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> StateCell<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CellInner {
                value,
                next_id: 0,
                observers: Vec::new(),
                pending: VecDeque::new(),
                dispatching: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CellInner<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Store a new value and notify observers if it changed.
    ///
    /// Changes are delivered in the order they were made: a `set` issued
    /// from inside an observer is queued and reaches every observer only
    /// after the value being delivered has reached all of them.
    pub fn set(&self, value: T) -> bool {
        {
            let mut inner = self.lock();
            if inner.value == value {
                return false;
            }
            inner.value = value.clone();
            inner.pending.push_back(value);
            if inner.dispatching {
                return true;
            }
            inner.dispatching = true;
        }

        let mut dispatcher = Dispatcher {
            inner: &self.inner,
            armed: true,
        };
        loop {
            let (value, observers): (T, Vec<Observer<T>>) = {
                let mut inner = self.lock();
                let Some(value) = inner.pending.pop_front() else {
                    inner.dispatching = false;
                    dispatcher.armed = false;
                    break;
                };
                let observers = inner.observers.iter().map(|(_, f)| f.clone()).collect();
                (value, observers)
            };
            for observer in observers {
                observer(&value);
            }
        }
        true
    }

    /// Register an observer, replaying the current value to it immediately.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let observer: Observer<T> = Arc::new(observer);
        let (id, current) = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push((id, observer.clone()));
            (id, inner.value.clone())
        };
        observer(&current);

        let weak: Weak<Mutex<CellInner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
                    inner.observers.retain(|(oid, _)| *oid != id);
                }
            })),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }
}

/// Handle returned by [`StateCell::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
