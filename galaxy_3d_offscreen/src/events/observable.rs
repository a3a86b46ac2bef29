/// Ordered, synchronous listener list.
///
/// Listeners run in registration order on the calling thread, inside
/// `notify()`. There is no queue and no global dispatcher.

use std::fmt;

/// Opaque handle returned by `Observable::add`, consumed by `Observable::remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

type Listener<T> = Box<dyn FnMut(&T) + Send>;

/// Ordered list of listeners receiving `&T`.
pub struct Observable<T: ?Sized> {
    observers: Vec<(ObserverToken, Listener<T>)>,
    next_id: u64,
}

impl<T: ?Sized> Observable<T> {
    /// Create an empty observable
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
            next_id: 0,
        }
    }

    /// Append a listener, returning its token
    pub fn add<F>(&mut self, callback: F) -> ObserverToken
    where
        F: FnMut(&T) + Send + 'static,
    {
        let token = ObserverToken(self.next_id);
        self.next_id += 1;
        self.observers.push((token, Box::new(callback)));
        token
    }

    /// Remove the listener registered under `token`
    ///
    /// Returns false if the token is unknown (already removed, or issued by
    /// another observable).
    pub fn remove(&mut self, token: ObserverToken) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(t, _)| *t != token);
        self.observers.len() != before
    }

    /// Remove `previous` (if any) and register `callback` in its place
    ///
    /// Backs the single-callback `set_on_*` convenience setters.
    pub fn replace<F>(&mut self, previous: Option<ObserverToken>, callback: F) -> ObserverToken
    where
        F: FnMut(&T) + Send + 'static,
    {
        if let Some(token) = previous {
            self.remove(token);
        }
        self.add(callback)
    }

    /// Call every listener in registration order
    pub fn notify(&mut self, value: &T) {
        for (_, observer) in self.observers.iter_mut() {
            observer(value);
        }
    }

    /// Whether at least one listener is registered
    pub fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    /// Number of registered listeners
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Remove every listener
    pub fn clear(&mut self) {
        self.observers.clear();
    }
}

impl<T: ?Sized> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "observable_tests.rs"]
mod tests;
