//! Per-instance render cache (§4.E): a cache hit skips re-deriving a widget's
//! draw projection, but the draw ops are still walked every frame so
//! dirty-subtree and clip-balance rules never depend on caching.

use ahash::AHashMap;
use rezi_layout::Rect;

/// The identity a cached projection is keyed by: the prop bag's structural
/// hash (cheap stand-in for pointer identity, since `Props` has no interior
/// mutability to compare by address) plus the resolved rect it was drawn
/// into. Either changing invalidates the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub props_hash: u64,
    pub rect: Rect,
}

/// A cached projection. Only text leaves produce one today (a pre-measured,
/// pre-styled run); other widget kinds have no expensive derivation to
/// amortize and always recompute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedProjection {
    pub text: String,
    pub visual_width: u16,
}

#[derive(Debug, Default)]
pub struct RenderCache {
    entries: AHashMap<u32, (CacheKey, CachedProjection)>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached projection for `instance_id` if its key still
    /// matches, else `None` (caller recomputes and calls `put`).
    pub fn get(&self, instance_id: u32, key: CacheKey) -> Option<&CachedProjection> {
        let (cached_key, projection) = self.entries.get(&instance_id)?;
        (*cached_key == key).then_some(projection)
    }

    pub fn put(&mut self, instance_id: u32, key: CacheKey, projection: CachedProjection) {
        self.entries.insert(instance_id, (key, projection));
    }

    /// Drops entries for instances no longer present, so a long-lived cache
    /// doesn't grow unbounded across a changing tree.
    pub fn retain_live(&mut self, live_ids: &ahash::AHashSet<u32>) {
        self.entries.retain(|id, _| live_ids.contains(id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A cheap structural hash of a prop bag, used as the cache key's identity
/// component. Not cryptographic; collisions only cost an unnecessary
/// recompute, never correctness, since the rect half of the key still has to
/// match too and a false cache hit would just reuse an identical projection.
pub fn hash_props(props: &rezi_view::Props) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = ahash::AHasher::default();
    for (name, value) in props.iter() {
        name.hash(&mut hasher);
        format!("{value:?}").hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rezi_view::Props;

    #[test]
    fn hit_requires_matching_key() {
        let mut cache = RenderCache::new();
        let key = CacheKey { props_hash: 1, rect: Rect::new(0, 0, 10, 1) };
        cache.put(7, key, CachedProjection { text: "hi".into(), visual_width: 2 });
        assert!(cache.get(7, key).is_some());
        let other = CacheKey { props_hash: 2, rect: Rect::new(0, 0, 10, 1) };
        assert!(cache.get(7, other).is_none());
    }

    #[test]
    fn hash_props_is_stable_for_equal_bags() {
        let a = Props::new().with("content", "hi");
        let b = Props::new().with("content", "hi");
        assert_eq!(hash_props(&a), hash_props(&b));
    }

    #[test]
    fn retain_live_drops_stale_entries() {
        let mut cache = RenderCache::new();
        let key = CacheKey { props_hash: 1, rect: Rect::new(0, 0, 1, 1) };
        cache.put(1, key, CachedProjection { text: "a".into(), visual_width: 1 });
        cache.put(2, key, CachedProjection { text: "b".into(), visual_width: 1 });
        let live: ahash::AHashSet<u32> = [1].into_iter().collect();
        cache.retain_live(&live);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(1, key).is_some());
    }
}
