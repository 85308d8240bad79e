//! # Lifecycle Caches
//!
//! Memo tables whose lifetime is bounded by debugger lifecycle events.
//!
//! A value read from the target is only trustworthy until the inferior runs
//! again (or the user pokes at it). Each [`LifecycleCache`] is registered
//! with the [`CacheRegistry`] together with the events that invalidate it;
//! when one of those events is dispatched the whole table is cleared, never
//! merged or partially updated.
//!
//! ## Usage
//!
//! ```rust
//! use vantage_core::cache::CacheRegistry;
//! use vantage_core::dbg::EventType;
//!
//! let registry = CacheRegistry::new();
//! let cache = registry.register::<u64, bool>("readable", &[EventType::Stop]);
//!
//! assert!(cache.get_or_insert_with(0x1000, || true));
//! assert_eq!(cache.get(&0x1000), Some(true));
//!
//! registry.on_event(EventType::Stop);
//! assert!(cache.get(&0x1000).is_none());
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use tracing::trace;

use crate::dbg::EventType;

/// A cache that can be wiped by the registry.
pub trait Invalidate
{
    /// Name used in log output.
    fn name(&self) -> &str;

    /// Drop every entry.
    fn invalidate(&self);

    /// Number of live entries.
    fn entries(&self) -> usize;
}

/// Memo table cleared wholesale at lifecycle boundaries
///
/// Values are cloned out, so the table is never borrowed while user code
/// runs. A computation that itself consults the same cache (the i8086
/// program counter needs `cs`) is therefore fine.
pub struct LifecycleCache<K, V>
{
    name: String,
    entries: RefCell<HashMap<K, V>>,
}

impl<K, V> LifecycleCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty, unregistered cache.
    pub fn new(name: impl Into<String>) -> Self
    {
        Self {
            name: name.into(),
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Cached value for `key`.
    pub fn get(&self, key: &K) -> Option<V>
    {
        self.entries.borrow().get(key).cloned()
    }

    /// Store `value` under `key`.
    pub fn insert(&self, key: K, value: V)
    {
        self.entries.borrow_mut().insert(key, value);
    }

    /// Return the cached value, computing and storing it on a miss.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Drop every entry.
    pub fn clear(&self)
    {
        self.entries.borrow_mut().clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize
    {
        self.entries.borrow().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool
    {
        self.entries.borrow().is_empty()
    }
}

impl<K, V> Invalidate for LifecycleCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn name(&self) -> &str
    {
        &self.name
    }

    fn invalidate(&self)
    {
        self.clear();
    }

    fn entries(&self) -> usize
    {
        self.len()
    }
}

/// All lifecycle caches of one attached debugger, keyed by the events that
/// clear them.
#[derive(Default)]
pub struct CacheRegistry
{
    caches: RefCell<Vec<(Vec<EventType>, Rc<dyn Invalidate>)>>,
}

impl CacheRegistry
{
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Create a cache cleared by any of `events`.
    pub fn register<K, V>(&self, name: &str, events: &[EventType]) -> Rc<LifecycleCache<K, V>>
    where
        K: Eq + Hash + 'static,
        V: Clone + 'static,
    {
        let cache = Rc::new(LifecycleCache::new(name));
        self.caches
            .borrow_mut()
            .push((events.to_vec(), cache.clone() as Rc<dyn Invalidate>));
        cache
    }

    /// Clear every cache subscribed to `event`.
    pub fn on_event(&self, event: EventType)
    {
        for (events, cache) in self.caches.borrow().iter() {
            if events.contains(&event) {
                trace!(cache = cache.name(), entries = cache.entries(), %event, "Invalidating cache");
                cache.invalidate();
            }
        }
    }

    /// Clear every cache regardless of events.
    pub fn clear_all(&self)
    {
        for (_, cache) in self.caches.borrow().iter() {
            cache.invalidate();
        }
    }

    /// Number of registered caches.
    pub fn len(&self) -> usize
    {
        self.caches.borrow().len()
    }

    /// Whether no cache is registered.
    pub fn is_empty(&self) -> bool
    {
        self.caches.borrow().is_empty()
    }
}
