//! The auxiliary expiring cache provider (`spec.md` §1, §5): a conventional
//! TTL map with a purge timer. Explicitly *not* part of the analyzer core -
//! "not the hard part" - but specified in enough detail (§5) that a host
//! embedding this analyzer may reuse it, so it's carried here the way the
//! teacher carries `parser::header_cache::HeaderCache` alongside the core
//! checker: a conventional, separately testable utility.
//!
//! Model (`spec.md` §5): scoped acquisition of a mutex protecting two maps
//! (value map, slide-metadata map) with try-acquire semantics and timeouts
//! of 1000ms (most operations) and 500ms (sliding-expiry touch). A periodic
//! timer fires every `interval` to remove entries whose slide deadline has
//! passed; on failure to acquire the mutex the purge tick is skipped and
//! retried next interval.
//!
//! `spec.md` §9 names a probable source bug: a list of keys-to-remove is
//! built during the purge scan but never iterated, because removal happens
//! by calling `Remove` directly inside the probing loop. That dead list is
//! deliberately not reproduced here.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(1000);
const TOUCH_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(500);

struct SlideMetadata {
    deadline: Instant,
    sliding_duration: Duration,
}

struct Inner<K, V> {
    values: HashMap<K, V>,
    slides: HashMap<K, SlideMetadata>,
}

/// A TTL map with sliding expiry, guarded by a single mutex protecting both
/// the value map and the slide-metadata map (`spec.md` §5).
pub struct ExpiringCache<K, V> {
    inner: Mutex<Inner<K, V>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    Timeout,
}

impl<K: Eq + Hash + Clone, V: Clone> ExpiringCache<K, V> {
    pub fn new() -> Self {
        ExpiringCache { inner: Mutex::new(Inner { values: HashMap::new(), slides: HashMap::new() }) }
    }

    /// Inserts `value` under `key` with a sliding expiry of `ttl`: every
    /// successful `get` or `touch` pushes the deadline forward by `ttl`
    /// again from the access time.
    pub fn insert(&self, key: K, value: V, ttl: Duration) -> Result<(), AcquireError> {
        let mut guard = try_lock(&self.inner, DEFAULT_ACQUIRE_TIMEOUT)?;
        guard.values.insert(key.clone(), value);
        guard.slides.insert(key, SlideMetadata { deadline: Instant::now() + ttl, sliding_duration: ttl });
        Ok(())
    }

    /// Reads `key`, sliding its expiry forward if present and not expired.
    /// Returns `Ok(None)` for an absent or already-expired key (expired
    /// entries are lazily dropped here rather than waiting for the purge
    /// timer).
    pub fn get(&self, key: &K) -> Result<Option<V>, AcquireError> {
        let mut guard = try_lock(&self.inner, DEFAULT_ACQUIRE_TIMEOUT)?;
        let now = Instant::now();
        let expired = guard.slides.get(key).map(|s| s.deadline <= now).unwrap_or(true);
        if expired {
            guard.values.remove(key);
            guard.slides.remove(key);
            return Ok(None);
        }
        if let Some(slide) = guard.slides.get_mut(key) {
            slide.deadline = now + slide.sliding_duration;
        }
        Ok(guard.values.get(key).cloned())
    }

    /// Slides `key`'s expiry without reading its value, under the tighter
    /// 500ms touch timeout (`spec.md` §5).
    pub fn touch(&self, key: &K) -> Result<bool, AcquireError> {
        let mut guard = try_lock(&self.inner, TOUCH_ACQUIRE_TIMEOUT)?;
        let now = Instant::now();
        match guard.slides.get_mut(key) {
            Some(slide) if slide.deadline > now => {
                slide.deadline = now + slide.sliding_duration;
                Ok(true)
            }
            Some(_) => {
                guard.slides.remove(key);
                guard.values.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    pub fn remove(&self, key: &K) -> Result<(), AcquireError> {
        let mut guard = try_lock(&self.inner, DEFAULT_ACQUIRE_TIMEOUT)?;
        guard.values.remove(key);
        guard.slides.remove(key);
        Ok(())
    }

    /// One purge tick: removes every entry whose slide deadline has
    /// passed. Unlike the source this is grounded on, this does not build
    /// an unused list of keys first - it removes directly while scanning,
    /// per `spec.md` §9's instruction not to carry that dead code forward.
    /// If the mutex can't be acquired within the timeout, the tick is
    /// skipped entirely and retried on the next timer fire.
    pub fn purge_expired(&self) -> Result<usize, AcquireError> {
        let mut guard = try_lock(&self.inner, DEFAULT_ACQUIRE_TIMEOUT)?;
        let now = Instant::now();
        let expired_keys: Vec<K> = guard.slides.iter().filter(|(_, s)| s.deadline <= now).map(|(k, _)| k.clone()).collect();
        let count = expired_keys.len();
        for key in expired_keys {
            guard.values.remove(&key);
            guard.slides.remove(&key);
        }
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|g| g.values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for ExpiringCache<K, V> {
    fn default() -> Self {
        ExpiringCache::new()
    }
}

fn try_lock<T>(mutex: &Mutex<T>, timeout: Duration) -> Result<MutexGuard<'_, T>, AcquireError> {
    // std::sync::Mutex has no native try_lock_for; poll try_lock within the
    // timeout budget, which is adequate for the short critical sections
    // this cache uses (a handful of HashMap operations).
    let deadline = Instant::now() + timeout;
    loop {
        match mutex.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(std::sync::TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
            Err(std::sync::TryLockError::WouldBlock) => {
                if Instant::now() >= deadline {
                    return Err(AcquireError::Timeout);
                }
                std::thread::yield_now();
            }
        }
    }
}

/// Drives periodic `purge_expired` calls every `interval` (`spec.md` §5:
/// "a periodic timer fires every `interval` to remove entries whose slider
/// deadline has passed"). This is a cooperative driver, not a background
/// thread: a host embedding the cache calls `tick()` on its own schedule
/// (e.g. from an event loop or a dedicated timer thread it owns), since the
/// analyzer core itself performs no I/O or background spawning (`spec.md`
/// §5).
pub struct PurgeTimer<K, V> {
    cache: Arc<ExpiringCache<K, V>>,
    pub interval: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> PurgeTimer<K, V> {
    pub fn new(cache: Arc<ExpiringCache<K, V>>, interval: Duration) -> Self {
        PurgeTimer { cache, interval }
    }

    /// One tick: attempts a purge, silently skipping on a lock timeout so
    /// the caller's loop just waits for the next `interval`.
    pub fn tick(&self) -> usize {
        self.cache.purge_expired().unwrap_or(0)
    }
}
