//! LRU cache for access decisions
//!
//! Caches evaluation outcomes keyed by a canonical fingerprint of the
//! request. Decisions depend only on the action and the rendered string
//! form of each attribute, so two requests with the same fingerprint
//! always evaluate to the same outcome against the same policy list.
//! The facade clears the cache whenever a policy is created; a generation
//! counter keeps outcomes computed before a clear from being recorded
//! after it.

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::core::attrs::Attributes;
use crate::core::engine::Evaluation;
use crate::core::error::Result;

/// LRU cache mapping request fingerprints to evaluation outcomes
pub struct DecisionCache {
    cache: LruCache<String, Evaluation>,
    generation: u64,
}

impl DecisionCache {
    /// Create a cache with the given capacity (minimum 1)
    pub fn new(capacity: usize) -> Self {
        DecisionCache {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            generation: 0,
        }
    }

    /// Canonical fingerprint of a request
    ///
    /// JSON of `(action, subject, resource)` with both attribute maps in
    /// rendered string form. Attribute maps iterate in name order, so the
    /// fingerprint is insensitive to insertion order, and JSON escaping
    /// keeps arbitrary attribute values from colliding.
    pub fn fingerprint(
        subject: &Attributes,
        resource: &Attributes,
        action: &str,
    ) -> Result<String> {
        let key = serde_json::to_string(&(action, subject.rendered(), resource.rendered()))?;
        Ok(key)
    }

    /// Get a cached outcome
    pub fn get(&mut self, key: &str) -> Option<Evaluation> {
        self.cache.get(key).cloned()
    }

    /// Current invalidation generation
    ///
    /// Snapshot this together with a missed lookup; [`put`](Self::put)
    /// requires it back.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record an outcome computed while `generation` was current
    ///
    /// A clear between the generation snapshot and this call means the
    /// outcome may predate the policy change that forced the clear, so
    /// the entry is dropped instead of recorded.
    pub fn put(&mut self, generation: u64, key: String, evaluation: Evaluation) {
        if generation == self.generation {
            self.cache.put(key, evaluation);
        }
    }

    /// Drop all cached outcomes
    ///
    /// Also advances the generation, so an outcome still being computed
    /// against the pre-clear policy list can no longer be recorded.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::Decision;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn key(subject: &Attributes, resource: &Attributes, action: &str) -> String {
        DecisionCache::fingerprint(subject, resource, action).unwrap()
    }

    fn allowed_by(name: &str) -> Evaluation {
        Evaluation {
            decision: Decision::Allow,
            matched: Some(name.to_string()),
        }
    }

    const DEFAULT_DENY: Evaluation = Evaluation {
        decision: Decision::Deny,
        matched: None,
    };

    #[test]
    fn test_cache_basic() {
        let mut cache = DecisionCache::new(10);
        let k = key(&attrs(&[("role", "admin")]), &attrs(&[("type", "doc")]), "read");

        assert!(cache.get(&k).is_none());

        cache.put(cache.generation(), k.clone(), allowed_by("admin-read"));
        let hit = cache.get(&k).unwrap();
        assert_eq!(hit.decision, Decision::Allow);
        assert_eq!(hit.matched.as_deref(), Some("admin-read"));
    }

    #[test]
    fn test_cache_lru_eviction() {
        let mut cache = DecisionCache::new(2);
        let subject = attrs(&[("role", "admin")]);
        let a = key(&subject, &attrs(&[("id", "a")]), "read");
        let b = key(&subject, &attrs(&[("id", "b")]), "read");
        let c = key(&subject, &attrs(&[("id", "c")]), "read");

        cache.put(cache.generation(), a.clone(), allowed_by("pa"));
        cache.put(cache.generation(), b.clone(), allowed_by("pb"));
        cache.put(cache.generation(), c.clone(), DEFAULT_DENY); // evicts a

        assert!(cache.get(&a).is_none());
        assert_eq!(cache.get(&b).unwrap().matched.as_deref(), Some("pb"));
        assert_eq!(cache.get(&c).unwrap().decision, Decision::Deny);
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = DecisionCache::new(10);
        let k = key(&attrs(&[("role", "admin")]), &attrs(&[]), "read");

        cache.put(cache.generation(), k, DEFAULT_DENY);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_from_before_clear_is_dropped() {
        let mut cache = DecisionCache::new(10);
        let k = key(&attrs(&[("role", "admin")]), &attrs(&[("type", "doc")]), "read");

        // Outcome computed against the pre-clear policy list arrives late.
        let stale_generation = cache.generation();
        cache.clear();
        cache.put(stale_generation, k.clone(), DEFAULT_DENY);

        assert!(cache.get(&k).is_none());

        // At the current generation the same entry is accepted.
        cache.put(cache.generation(), k.clone(), DEFAULT_DENY);
        assert_eq!(cache.get(&k).unwrap().decision, Decision::Deny);
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let ab: Attributes = [("a", "1"), ("b", "2")].into();
        let ba: Attributes = [("b", "2"), ("a", "1")].into();
        let resource = attrs(&[("type", "doc")]);

        assert_eq!(key(&ab, &resource, "read"), key(&ba, &resource, "read"));
    }

    #[test]
    fn test_fingerprint_separates_subject_from_resource() {
        let x = attrs(&[("k", "v")]);
        let y = attrs(&[("t", "doc")]);

        assert_ne!(key(&x, &y, "read"), key(&y, &x, "read"));
    }

    #[test]
    fn test_fingerprint_uses_rendered_values() {
        // Int 3 and string "3" render identically, and outcomes can only
        // depend on the rendered form, so sharing a slot is correct.
        let typed = Attributes::from([("level", 3i64)]);
        let text = attrs(&[("level", "3")]);
        let resource = attrs(&[("type", "doc")]);

        assert_eq!(key(&typed, &resource, "read"), key(&text, &resource, "read"));
    }

    #[test]
    fn test_fingerprint_distinguishes_actions() {
        let subject = attrs(&[("role", "admin")]);
        let resource = attrs(&[("type", "doc")]);

        assert_ne!(key(&subject, &resource, "read"), key(&subject, &resource, "write"));
    }
}
