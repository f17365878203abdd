use crate::Mutex;
use foldhash::fast::{FixedState, RandomState};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// Represents the action to be taken on an existing value in the `ShardMap`.
pub enum SimpleAction {
    /// Keep the current value unchanged.
    Keep,
    /// Remove the value from the map.
    Remove,
}

/// Represents the action to be taken on a value in the `ShardMap`.
pub enum UpdateAction<V> {
    /// Keep the current value unchanged.
    Keep,
    /// Insert or overwrite with the provided new value.
    Replace(V),
}

/// A thread-safe hashmap shard.
///
/// This struct wraps a `HashMap` protected by a futex `Mutex`.
pub struct ShardMap<K, V> {
    map: Mutex<HashMap<K, V, RandomState>>,
}

impl<K, V> ShardMap<K, V>
where
    K: Eq + Hash,
{
    /// Creates a new `ShardMap` with the specified initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: Mutex::new(HashMap::with_capacity_and_hasher(
                capacity,
                RandomState::default(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }

    /// Runs `func` on the value stored for `key`, if any, while the shard is
    /// locked. Never inserts.
    pub fn simple_update<Q, F, R>(&self, key: &Q, func: F) -> R
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        F: FnOnce(Option<&mut V>) -> (SimpleAction, R),
    {
        let mut map = self.map.lock();
        let value = map.get_mut(key);
        let has_value = value.is_some();
        let (action, ret) = func(value);
        if has_value && matches!(action, SimpleAction::Remove) {
            let _ = map.remove_entry(key);
        }
        ret
    }

    /// Runs `func` on the value stored for `key` while the shard is locked,
    /// inserting or overwriting when it answers `Replace`.
    pub fn update<F, R>(&self, key: K, func: F) -> R
    where
        F: FnOnce(Option<&mut V>) -> (UpdateAction<V>, R),
    {
        let mut map = self.map.lock();
        match map.get_mut(&key) {
            Some(value) => {
                let (action, ret) = func(Some(value));
                if let UpdateAction::Replace(v) = action {
                    *value = v;
                }
                ret
            }
            None => {
                let (action, ret) = func(None);
                if let UpdateAction::Replace(value) = action {
                    map.insert(key, value);
                }
                ret
            }
        }
    }

    /// Visits every entry of this shard while it is locked.
    pub fn for_each<F>(&self, mut func: F)
    where
        F: FnMut(&K, &V),
    {
        let map = self.map.lock();
        for (key, value) in map.iter() {
            func(key, value);
        }
    }
}

/// A collection of `ShardMap` instances, providing sharded access to a hashmap.
pub struct ShardsMap<K, V> {
    shards: Vec<ShardMap<K, V>>,
}

impl<K, V> ShardsMap<K, V>
where
    K: Eq + Hash,
{
    /// Creates a new `ShardsMap` with the specified capacity and number of shards.
    ///
    /// A `shard_amount` of zero is treated as one.
    pub fn with_capacity_and_shard_amount(capacity: usize, shard_amount: usize) -> Self {
        let shard_amount = shard_amount.max(1);
        let shard_capacity = capacity / shard_amount;
        Self {
            shards: (0..shard_amount)
                .map(|_| ShardMap::with_capacity(shard_capacity))
                .collect::<Vec<_>>(),
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.is_empty())
    }

    pub fn shard_amount(&self) -> usize {
        self.shards.len()
    }

    /// See [`ShardMap::simple_update`].
    pub fn simple_update<Q, F, R>(&self, key: &Q, func: F) -> R
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        F: FnOnce(Option<&mut V>) -> (SimpleAction, R),
    {
        self.shard(key).simple_update(key, func)
    }

    /// See [`ShardMap::update`].
    pub fn update<F, R>(&self, key: K, func: F) -> R
    where
        F: FnOnce(Option<&mut V>) -> (UpdateAction<V>, R),
    {
        self.shard(&key).update(key, func)
    }

    /// Visits every entry, one shard at a time.
    ///
    /// Each shard is locked only while it is visited, so the result is not an
    /// atomic snapshot of the whole map.
    pub fn for_each<F>(&self, mut func: F)
    where
        F: FnMut(&K, &V),
    {
        for shard in &self.shards {
            shard.for_each(&mut func);
        }
    }

    #[inline(always)]
    fn shard<Q>(&self, key: &Q) -> &ShardMap<K, V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        &self.shards[self.shard_index(key)]
    }

    /// Index of the shard that owns `key`.
    #[inline(always)]
    pub fn shard_index<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        FixedState::default().hash_one(key) as usize % self.shards.len()
    }
}
