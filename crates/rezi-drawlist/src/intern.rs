use ahash::AHashMap;

/// One frame's interned byte table: every distinct `(bytes, len)` occupies a
/// single span, in first-seen order. A bounded LRU speeds up the common case
/// of repeated identical content (e.g. a label redrawn every frame) without
/// changing the table's contents — eviction from the lookup cache only means
/// a future duplicate is re-appended as a fresh span rather than being
/// rejected outright; the stated invariants never depend on the cache
/// actually catching every duplicate, only on distinct spans being valid.
pub struct InternTable {
    spans: Vec<(u32, u32)>,
    bytes: Vec<u8>,
    // Maps content -> span index, used for fast dedup. Bounded by `cap`;
    // insertion past capacity evicts the least-recently-used entry.
    lookup: AHashMap<Vec<u8>, usize>,
    lru: Vec<Vec<u8>>,
    cap: usize,
}

impl InternTable {
    pub fn new(cap: usize) -> Self {
        Self {
            spans: Vec::new(),
            bytes: Vec::new(),
            lookup: AHashMap::default(),
            lru: Vec::new(),
            cap: cap.max(1),
        }
    }

    pub fn clear(&mut self) {
        self.spans.clear();
        self.bytes.clear();
        self.lookup.clear();
        self.lru.clear();
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[(u32, u32)] {
        &self.spans
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the span index `content` would reuse without mutating
    /// anything, so callers can cap growth before committing to an insert.
    pub fn peek(&self, content: &[u8]) -> Option<u32> {
        self.lookup.get(content).map(|&idx| idx as u32)
    }

    /// Interns `content`, returning its span index. Dedupes against the
    /// lookup cache; a cache miss always appends a fresh span.
    pub fn intern(&mut self, content: &[u8]) -> u32 {
        if let Some(&idx) = self.lookup.get(content) {
            self.touch(content);
            return idx as u32;
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(content);
        let idx = self.spans.len();
        self.spans.push((offset, content.len() as u32));

        if self.lru.len() >= self.cap {
            let evicted = self.lru.remove(0);
            self.lookup.remove(&evicted);
        }
        self.lookup.insert(content.to_vec(), idx);
        self.lru.push(content.to_vec());
        idx as u32
    }

    fn touch(&mut self, content: &[u8]) {
        if let Some(pos) = self.lru.iter().position(|c| c.as_slice() == content) {
            let entry = self.lru.remove(pos);
            self.lru.push(entry);
        }
    }

    /// Total byte length padded to a 4-byte boundary, matching the wire
    /// format's packed-bytes-region alignment.
    pub fn padded_byte_len(&self) -> usize {
        (self.bytes.len() + 3) & !3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_content_gets_distinct_spans() {
        let mut t = InternTable::new(8);
        let a = t.intern(b"hello");
        let b = t.intern(b"world");
        assert_ne!(a, b);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn repeated_content_within_cache_dedupes() {
        let mut t = InternTable::new(8);
        let a = t.intern(b"hello");
        let b = t.intern(b"hello");
        assert_eq!(a, b);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut t = InternTable::new(8);
        t.intern(b"x");
        t.clear();
        assert_eq!(t.len(), 0);
        assert!(t.bytes().is_empty());
    }
}
