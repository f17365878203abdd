use crate::{ShardsMap, SimpleAction, UpdateAction};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::OnceLock;

/// Returns the default number of shards to use for a `ConcurrentScoreMap`.
fn default_shard_amount() -> usize {
    static DEFAULT_SHARD_AMOUNT: OnceLock<usize> = OnceLock::new();
    *DEFAULT_SHARD_AMOUNT.get_or_init(|| {
        (std::thread::available_parallelism().map_or(1, usize::from) * 4).next_power_of_two()
    })
}

/// A thread-safe map from keys to integer scores.
///
/// Keys are spread over independently locked shards, so updates to keys in
/// different shards never wait on each other, while every read-modify-write
/// on a single key is indivisible.
///
/// Updates to absent keys are no-ops: only [`put`](Self::put) creates entries
/// and only [`remove`](Self::remove) deletes them.
///
/// # Examples
/// ```
/// use contention::ConcurrentScoreMap;
///
/// let scores = ConcurrentScoreMap::new();
/// scores.put("User1".to_string(), 10);
/// assert_eq!(scores.update_if_present("User1", 5), Some(15));
/// assert_eq!(scores.update_if_present("Nobody", 5), None);
/// assert_eq!(scores.get("User1"), Some(15));
/// assert_eq!(scores.get("Nobody"), None);
/// ```
pub struct ConcurrentScoreMap<K = String> {
    map: ShardsMap<K, i64>,
}

impl<K: Eq + Hash> Default for ConcurrentScoreMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> ConcurrentScoreMap<K> {
    /// Creates an empty map with the default number of shards.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty map with the specified initial capacity and the default number of shards.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_shard_amount(capacity, default_shard_amount())
    }

    /// Creates an empty map with the specified initial capacity and number of shards.
    pub fn with_capacity_and_shard_amount(capacity: usize, shard_amount: usize) -> Self {
        Self {
            map: ShardsMap::with_capacity_and_shard_amount(capacity, shard_amount),
        }
    }

    /// Inserts or overwrites the score for `key`, returning the previous one.
    pub fn put(&self, key: K, value: i64) -> Option<i64> {
        self.map.update(key, |current| {
            let previous = current.map(|v| *v);
            (UpdateAction::Replace(value), previous)
        })
    }

    /// Inserts `value` only if `key` is absent.
    ///
    /// Returns the score already stored, leaving it untouched, or `None` when
    /// `value` was inserted.
    pub fn put_if_absent(&self, key: K, value: i64) -> Option<i64> {
        self.map.update(key, |current| match current {
            Some(existing) => (UpdateAction::Keep, Some(*existing)),
            None => (UpdateAction::Replace(value), None),
        })
    }

    /// Adds `delta` to the score for `key` if it is present.
    ///
    /// Returns the new score, or `None` without inserting anything when the
    /// key is absent. The sum saturates at the bounds of `i64`.
    pub fn update_if_present<Q>(&self, key: &Q, delta: i64) -> Option<i64>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.compute_if_present(key, |current| current.saturating_add(delta))
    }

    /// Replaces the score for `key` with `func(current)` if it is present.
    ///
    /// `func` runs while the key's shard is locked, so it must not touch this
    /// map. Returns the new score, or `None` when the key is absent.
    pub fn compute_if_present<Q, F>(&self, key: &Q, func: F) -> Option<i64>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        F: FnOnce(i64) -> i64,
    {
        self.map.simple_update(key, |value| match value {
            Some(value) => {
                *value = func(*value);
                (SimpleAction::Keep, Some(*value))
            }
            None => (SimpleAction::Keep, None),
        })
    }

    /// Returns the score for `key`, if present.
    pub fn get<Q>(&self, key: &Q) -> Option<i64>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map
            .simple_update(key, |value| (SimpleAction::Keep, value.map(|v| *v)))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Removes `key`, returning its score if it was present.
    pub fn remove<Q>(&self, key: &Q) -> Option<i64>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map
            .simple_update(key, |value| (SimpleAction::Remove, value.map(|v| *v)))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of independently locked shards.
    pub fn shard_amount(&self) -> usize {
        self.map.shard_amount()
    }

    /// Copies the current contents into a plain `HashMap`.
    ///
    /// Shards are copied one at a time; concurrent writers may be partially
    /// reflected. Call it after workers have joined for a settled view.
    pub fn snapshot(&self) -> HashMap<K, i64>
    where
        K: Clone,
    {
        let mut out = HashMap::with_capacity(self.len());
        self.map.for_each(|key, value| {
            out.insert(key.clone(), *value);
        });
        out
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> std::fmt::Debug for ConcurrentScoreMap<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}

impl<K: Eq + Hash> FromIterator<(K, i64)> for ConcurrentScoreMap<K> {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        let map = Self::new();
        for (key, value) in iter {
            map.put(key, value);
        }
        map
    }
}
