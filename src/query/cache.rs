//! Thread-safe LRU cache of validation verdicts.
//!
//! Only expressions that passed validation are cached, keyed by their
//! literal text. The cache and its [`ValidationConfig`] share one mutex so
//! that capacity holds at every observable instant; the validator itself
//! runs outside the lock.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, warn};

use super::config::{check_limit, ConfigError, ValidationConfig};
use super::validate::{ValidationError, Validator};

/// A bounded, thread-safe LRU cache of accepted expressions.
///
/// ```
/// use xmlguard::query::{ValidationCache, ValidationConfig};
///
/// let cache = ValidationCache::with_config(ValidationConfig::new().cache_max_size(2));
/// cache.check_and_cache("//a").unwrap();
/// cache.check_and_cache("//a").unwrap();
/// assert_eq!(cache.size(), 1);
/// assert!(cache.check_and_cache("").is_err());
/// assert_eq!(cache.size(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ValidationCache {
    state: Mutex<CacheState>,
    validator: Validator,
}

#[derive(Debug, Default)]
struct CacheState {
    config: ValidationConfig,
    lru: Lru,
}

impl ValidationCache {
    /// Creates a cache with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache with the given configuration.
    #[must_use]
    pub fn with_config(config: ValidationConfig) -> Self {
        Self::with_validator(config, Validator::default())
    }

    /// Creates a cache using a custom validator.
    #[must_use]
    pub fn with_validator(config: ValidationConfig, validator: Validator) -> Self {
        Self {
            state: Mutex::new(CacheState {
                config,
                lru: Lru::default(),
            }),
            validator,
        }
    }

    /// The process-wide cache used by the `Document` and `Node` query
    /// methods.
    #[must_use]
    pub fn global() -> &'static ValidationCache {
        static GLOBAL: OnceLock<ValidationCache> = OnceLock::new();
        GLOBAL.get_or_init(ValidationCache::new)
    }

    /// The validator this cache runs on a miss.
    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates `expr`, consulting and updating the cache.
    ///
    /// A hit marks the entry most recently used and skips validation. A
    /// miss validates and, on success, inserts the expression, evicting the
    /// least recently used entry when full.
    ///
    /// # Errors
    ///
    /// Returns the validator's [`ValidationError`]; rejected expressions
    /// are never cached.
    pub fn check_and_cache(&self, expr: &str) -> Result<(), ValidationError> {
        let config = {
            let mut state = self.lock();
            if state.config.caching_enabled && state.lru.touch(expr) {
                debug!(expression = expr, "validation cache hit");
                return Ok(());
            }
            state.config
        };

        if let Err(err) = self.validator.validate(expr, config.max_expression_length) {
            warn!(rule = %err.rule(), error = %err, "rejected xpath expression");
            return Err(err);
        }
        if !config.caching_enabled {
            return Ok(());
        }

        let mut state = self.lock();
        // Skip the insert if the limits changed while validating.
        if state.config != config {
            return Ok(());
        }
        let max = state.config.cache_max_size;
        if max == 0 {
            return Ok(());
        }
        if !state.lru.touch(expr) {
            while state.lru.len() >= max {
                let Some(evicted) = state.lru.pop_lru() else {
                    break;
                };
                debug!(expression = %evicted, "validation cache evicted");
            }
            state.lru.push_front(expr.to_owned());
            debug!(expression = expr, size = state.lru.len(), "validation cache miss");
        }
        Ok(())
    }

    /// Whether `expr` is cached. Does not affect recency.
    #[must_use]
    pub fn contains(&self, expr: &str) -> bool {
        self.lock().lru.index.contains_key(expr)
    }

    /// Cached expressions from most to least recently used.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.lock().lru.iter().map(str::to_owned).collect()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.lock().lru.clear();
        debug!("validation cache cleared");
    }

    /// The number of cached expressions.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lock().lru.len()
    }

    /// A snapshot of the current configuration.
    #[must_use]
    pub fn config(&self) -> ValidationConfig {
        self.lock().config
    }

    #[must_use]
    pub fn caching_enabled(&self) -> bool {
        self.lock().config.caching_enabled
    }

    /// Enables or disables caching. Existing entries are kept.
    pub fn set_caching_enabled(&self, enabled: bool) {
        self.lock().config.caching_enabled = enabled;
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.lock().config.cache_max_size
    }

    /// Sets the capacity, evicting least recently used entries down to the
    /// new bound.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Negative`] for negative values.
    pub fn set_max_size(&self, size: i64) -> Result<(), ConfigError> {
        let size = check_limit("cache_max_size", size)?;
        let mut state = self.lock();
        state.config.cache_max_size = size;
        while state.lru.len() > size {
            let Some(evicted) = state.lru.pop_lru() else {
                break;
            };
            debug!(expression = %evicted, "validation cache evicted");
        }
        Ok(())
    }

    #[must_use]
    pub fn max_expression_length(&self) -> usize {
        self.lock().config.max_expression_length
    }

    /// Sets the maximum expression length (0 disables the limit). A
    /// changed limit clears the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Negative`] for negative values.
    pub fn set_max_expression_length(&self, length: i64) -> Result<(), ConfigError> {
        let length = check_limit("max_expression_length", length)?;
        let mut state = self.lock();
        if state.config.max_expression_length != length {
            state.config.max_expression_length = length;
            state.lru.clear();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LRU list
// ---------------------------------------------------------------------------

/// Slot arena threaded with a doubly linked recency list. `head` is the most
/// recently used entry, `tail` the least.
#[derive(Debug, Default)]
struct Lru {
    slots: Vec<Slot>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

#[derive(Debug)]
struct Slot {
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

impl Lru {
    fn len(&self) -> usize {
        self.index.len()
    }

    /// Moves `key` to the front if present.
    fn touch(&mut self, key: &str) -> bool {
        let Some(&slot) = self.index.get(key) else {
            return false;
        };
        if self.head != Some(slot) {
            self.unlink(slot);
            self.link_front(slot);
        }
        true
    }

    fn push_front(&mut self, key: String) {
        let slot = Slot {
            key: key.clone(),
            prev: None,
            next: None,
        };
        let id = if let Some(id) = self.free.pop() {
            self.slots[id] = slot;
            id
        } else {
            self.slots.push(slot);
            self.slots.len() - 1
        };
        self.link_front(id);
        self.index.insert(key, id);
    }

    fn pop_lru(&mut self) -> Option<String> {
        let tail = self.tail?;
        self.unlink(tail);
        let key = std::mem::take(&mut self.slots[tail].key);
        self.index.remove(&key);
        self.free.push(tail);
        Some(key)
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    fn unlink(&mut self, id: usize) {
        let (prev, next) = (self.slots[id].prev, self.slots[id].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[id].prev = None;
        self.slots[id].next = None;
    }

    fn link_front(&mut self, id: usize) {
        self.slots[id].prev = None;
        self.slots[id].next = self.head;
        if let Some(head) = self.head {
            self.slots[head].prev = Some(id);
        }
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        std::iter::successors(self.head, |&id| self.slots[id].next)
            .map(|id| self.slots[id].key.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cache(max: usize) -> ValidationCache {
        ValidationCache::with_config(ValidationConfig::new().cache_max_size(max))
    }

    #[test]
    fn test_hit_does_not_grow() {
        let cache = cache(10);
        cache.check_and_cache("//a").unwrap();
        assert_eq!(cache.size(), 1);
        cache.check_and_cache("//a").unwrap();
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_rejections_are_not_cached() {
        let cache = cache(10);
        assert!(cache.check_and_cache("//a[").is_err());
        assert!(cache.check_and_cache("").is_err());
        assert_eq!(cache.size(), 0);
        assert!(!cache.contains("//a["));
    }

    #[test]
    fn test_lru_eviction_order() {
        let cache = cache(3);
        for expr in ["//a", "//b", "//c"] {
            cache.check_and_cache(expr).unwrap();
        }
        assert_eq!(cache.size(), 3);

        cache.check_and_cache("//a").unwrap();
        cache.check_and_cache("//d").unwrap();
        assert_eq!(cache.entries(), vec!["//d", "//a", "//c"]);

        cache.check_and_cache("//b").unwrap();
        assert_eq!(cache.entries(), vec!["//b", "//d", "//a"]);
    }

    #[test]
    fn test_keying_is_literal() {
        let cache = cache(10);
        cache.check_and_cache("//a").unwrap();
        cache.check_and_cache("//a ").unwrap();
        cache.check_and_cache("/descendant-or-self::node()/a").unwrap();
        assert_eq!(cache.size(), 3);
    }

    #[test]
    fn test_zero_capacity() {
        let cache = cache(0);
        cache.check_and_cache("//a").unwrap();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_disabled_caching_leaves_cache_untouched() {
        let cache = cache(10);
        cache.check_and_cache("//a").unwrap();
        cache.set_caching_enabled(false);
        cache.check_and_cache("//b").unwrap();
        assert_eq!(cache.entries(), vec!["//a"]);
        assert!(cache.check_and_cache("").is_err());
        cache.set_caching_enabled(true);
        cache.check_and_cache("//b").unwrap();
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_clear() {
        let cache = cache(10);
        cache.check_and_cache("//a").unwrap();
        cache.clear();
        assert_eq!(cache.size(), 0);
        cache.clear();
        assert_eq!(cache.size(), 0);
        cache.check_and_cache("//b").unwrap();
        assert_eq!(cache.entries(), vec!["//b"]);
    }

    #[test]
    fn test_lowering_max_size_evicts() {
        let cache = cache(5);
        for expr in ["//a", "//b", "//c", "//d"] {
            cache.check_and_cache(expr).unwrap();
        }
        cache.set_max_size(2).unwrap();
        assert_eq!(cache.entries(), vec!["//d", "//c"]);
        assert_eq!(cache.max_size(), 2);
        assert!(cache.set_max_size(-1).is_err());
        assert_eq!(cache.max_size(), 2);
    }

    #[test]
    fn test_length_change_clears() {
        let cache = cache(5);
        cache.check_and_cache("//abcdef").unwrap();
        cache.set_max_expression_length(10_000).unwrap();
        assert_eq!(cache.size(), 1);
        cache.set_max_expression_length(4).unwrap();
        assert_eq!(cache.size(), 0);
        assert!(cache.check_and_cache("//abcdef").is_err());
        assert!(cache.set_max_expression_length(-4).is_err());
        assert_eq!(cache.max_expression_length(), 4);
    }

    #[test]
    fn test_slot_reuse_after_eviction() {
        let cache = cache(2);
        for i in 0..50 {
            cache.check_and_cache(&format!("//e{i}")).unwrap();
        }
        assert_eq!(cache.entries(), vec!["//e49", "//e48"]);
        assert!(cache.lock().lru.slots.len() <= 2);
    }
}
