use dashmap::DashMap;
use std::borrow::Borrow;
use std::hash::Hash;

/// Read helpers for `DashMap` that never hand out a shard guard.
///
/// Guards from `get()` and `iter()` hold a shard lock, so they must not live
/// across an `.await`. These helpers clone and drop the guard at once.
pub trait DashMapExt<K, V> {
    /// Clone the value for `key`.
    fn get_cloned<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone;

    /// Clone every entry, sorted by key.
    fn sorted_entries(&self) -> Vec<(K, V)>
    where
        K: Clone + Ord,
        V: Clone;
}

impl<K, V> DashMapExt<K, V> for DashMap<K, V>
where
    K: Eq + Hash,
{
    fn get_cloned<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get(key).map(|r| r.value().clone())
    }

    fn sorted_entries(&self) -> Vec<(K, V)>
    where
        K: Clone + Ord,
        V: Clone,
    {
        let mut entries: Vec<_> = self
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_entries() {
        let map = DashMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        map.insert("c", 3);
        assert_eq!(map.sorted_entries(), vec![("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(map.get_cloned("b"), Some(2));
        assert_eq!(map.get_cloned("z"), None);
    }
}
