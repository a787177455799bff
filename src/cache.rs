use std::collections::{HashMap, VecDeque};

pub const DEFAULT_CAPACITY: usize = 500;

/// Source text -> translated text, bounded by `capacity`.
///
/// Eviction is by insertion order: a lookup never refreshes an entry.
/// Not `Sync`-shared; the UI-thread controller owns it.
pub struct TranslationCache {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn lookup(&self, text: &str) -> Option<&str> {
        self.entries.get(text).map(String::as_str)
    }

    pub fn insert(&mut self, text: String, translation: String) {
        if self.capacity == 0 {
            return;
        }
        if let Some(existing) = self.entries.get_mut(&text) {
            *existing = translation;
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(text.clone());
        self.entries.insert(text, translation);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_evicts_only_the_oldest_key() {
        let mut cache = TranslationCache::new(3);
        for i in 0..4 {
            cache.insert(format!("k{}", i), format!("v{}", i));
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.lookup("k0"), None);
        assert_eq!(cache.lookup("k1"), Some("v1"));
        assert_eq!(cache.lookup("k3"), Some("v3"));
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let mut cache = TranslationCache::new(DEFAULT_CAPACITY);
        for i in 0..(DEFAULT_CAPACITY * 2 + 7) {
            cache.insert(i.to_string(), i.to_string());
            assert!(cache.len() <= DEFAULT_CAPACITY);
        }
        assert_eq!(cache.len(), DEFAULT_CAPACITY);
    }

    #[test]
    fn unknown_key_is_absent() {
        let mut cache = TranslationCache::new(4);
        cache.insert("hello".into(), "merhaba".into());
        assert_eq!(cache.lookup("goodbye"), None);
        assert_eq!(TranslationCache::default().lookup("anything"), None);
    }

    #[test]
    fn reads_do_not_protect_from_eviction() {
        let mut cache = TranslationCache::new(2);
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        assert_eq!(cache.lookup("a"), Some("1"));
        cache.insert("c".into(), "3".into());
        assert_eq!(cache.lookup("a"), None);
        assert_eq!(cache.lookup("b"), Some("2"));
    }

    #[test]
    fn reinsert_replaces_value_without_eviction() {
        let mut cache = TranslationCache::new(2);
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        cache.insert("a".into(), "uno".into());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("a"), Some("uno"));
        assert_eq!(cache.lookup("b"), Some("2"));

        // "a" keeps its original age and goes first.
        cache.insert("c".into(), "3".into());
        assert_eq!(cache.lookup("a"), None);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut cache = TranslationCache::new(0);
        cache.insert("a".into(), "1".into());
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_resets_eviction_order() {
        let mut cache = TranslationCache::new(2);
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        cache.clear();
        cache.insert("c".into(), "3".into());
        cache.insert("d".into(), "4".into());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("c"), Some("3"));
    }
}
