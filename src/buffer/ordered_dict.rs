use {
    crate::{
        buffer::vec::ObservableList,
        error::{Result, ViewError},
        view::{
            observer::{SharedObserver, Subscription},
            sequence::ObservableSequence,
        },
    },
    std::{
        collections::HashMap,
        fmt::Debug,
        hash::Hash,
        sync::{Arc, PoisonError, RwLock},
    },
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Insertion-ordered map, observable as a sequence of `(key, value)` pairs.
///
/// New keys are appended; overwriting an existing key replaces its slot in
/// place. Cloning yields another handle onto the same dictionary.
#[derive(Clone)]
pub struct ObservableOrderedDictionary<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    entries: ObservableList<(K, V)>,
    positions: Arc<RwLock<HashMap<K, usize>>>,
}

impl<K, V> Default for ObservableOrderedDictionary<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        ObservableOrderedDictionary::new()
    }
}

impl<K, V> ObservableOrderedDictionary<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        ObservableOrderedDictionary {
            entries: ObservableList::new(),
            positions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn positions(&self) -> std::sync::RwLockReadGuard<'_, HashMap<K, usize>> {
        self.positions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn positions_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<K, usize>> {
        self.positions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-derive the key index from the entries.
    fn reindex(&self) {
        let index = self.entries.with_items(|items| {
            items
                .iter()
                .enumerate()
                .map(|(i, (k, _))| (k.clone(), i))
                .collect()
        });
        *self.positions_mut() = index;
    }

    pub fn len(&self) -> usize {
        self.positions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions().is_empty()
    }

    pub fn index_of(&self, key: &K) -> Option<usize> {
        self.positions().get(key).copied()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.positions().contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let idx = self.index_of(key)?;
        self.entries.get(idx).map(|(_, v)| v)
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries
            .with_items(|items| items.iter().map(|(k, _)| k.clone()).collect())
    }

    pub fn values(&self) -> Vec<V> {
        self.entries
            .with_items(|items| items.iter().map(|(_, v)| v.clone()).collect())
    }

    /// Set `key` to `value`, returning the previous value if there was one.
    ///
    /// An existing key emits `Replace` at its slot, a new key `Add` at the end.
    pub fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        match self.index_of(&key) {
            Some(idx) => {
                let (_, old) = self.entries.set(idx, (key, value))?;
                Ok(Some(old))
            }
            None => {
                self.append(key, value)?;
                Ok(None)
            }
        }
    }

    /// Add a new key. Fails with `InvalidArgument` if the key is present.
    pub fn try_add(&self, key: K, value: V) -> Result<()>
    where
        K: Debug,
    {
        if self.contains_key(&key) {
            return Err(ViewError::InvalidArgument(format!("duplicate key {key:?}")));
        }
        self.append(key, value)
    }

    fn append(&self, key: K, value: V) -> Result<()> {
        let idx = self.entries.len();
        self.positions_mut().insert(key.clone(), idx);

        self.entries.push((key, value)).map_err(|err| {
            self.reindex();
            err
        })
    }

    /// Remove `key`, returning its value. Emits `Remove` at the key's slot.
    pub fn remove(&self, key: &K) -> Result<Option<V>> {
        let Some(idx) = self.index_of(key) else {
            return Ok(None);
        };

        {
            let mut positions = self.positions_mut();
            positions.remove(key);
            for p in positions.values_mut() {
                if *p > idx {
                    *p -= 1;
                }
            }
        }

        match self.entries.remove_at(idx) {
            Ok((_, v)) => Ok(Some(v)),
            Err(err) => {
                self.reindex();
                Err(err)
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.positions_mut().clear();
        self.entries.clear().map_err(|err| {
            self.reindex();
            err
        })
    }
}

impl<K, V> ObservableSequence<(K, V)> for ObservableOrderedDictionary<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, idx: usize) -> Option<(K, V)> {
        self.entries.get(idx)
    }

    fn version(&self) -> u64 {
        self.entries.version()
    }

    fn snapshot(&self) -> Vec<(K, V)> {
        self.entries.snapshot()
    }

    fn subscribe(&self, observer: SharedObserver<(K, V)>) -> Subscription<(K, V)> {
        self.entries.subscribe(observer)
    }

    fn observer_count(&self) -> usize {
        self.entries.observer_count()
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
