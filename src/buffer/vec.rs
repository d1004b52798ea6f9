use {
    crate::{
        buffer::array_edit,
        error::{check_index, Result, ViewError},
        view::{
            change::{ChangeEvent, ChangeRecord},
            observer::{broadcast, ObserverBroadcast, SharedObserver, Subscription},
            sequence::ObservableSequence,
        },
    },
    std::sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

struct ListCore<T> {
    data: RwLock<Vec<T>>,
    version: AtomicU64,
    notifying: AtomicBool,
    cast: Arc<RwLock<ObserverBroadcast<T>>>,
}

/// Mutable, observable list.
///
/// Cloning yields another handle onto the same list.
pub struct ObservableList<T>
where
    T: Clone + Send + Sync + 'static,
{
    core: Arc<ListCore<T>>,
}

impl<T> Clone for ObservableList<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        ObservableList {
            core: self.core.clone(),
        }
    }
}

impl<T> Default for ObservableList<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        ObservableList::new()
    }
}

/// Clears the notification flag when the mutation scope ends.
struct NotifyGuard<'a>(&'a AtomicBool);

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T> ObservableList<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        ObservableList::with_data(Vec::new())
    }

    /// Wrap existing items. No event is emitted for the initial contents.
    pub fn with_data(data: Vec<T>) -> Self {
        ObservableList {
            core: Arc::new(ListCore {
                data: RwLock::new(data),
                version: AtomicU64::new(0),
                notifying: AtomicBool::new(false),
                cast: Arc::new(RwLock::new(ObserverBroadcast::new())),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.core.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.core.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter a mutation. Fails if this list is currently notifying.
    fn begin(&self) -> Result<NotifyGuard<'_>> {
        if self.core.notifying.swap(true, Ordering::AcqRel) {
            tracing::warn!("rejected mutation issued from inside a change notification");
            return Err(ViewError::ReentrancyViolation);
        }
        Ok(NotifyGuard(&self.core.notifying))
    }

    fn commit(&self, event: &ChangeEvent<'_, T>) -> Result<()> {
        let version = self.core.version.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(version, delta = event.len_delta(), "list changed");
        broadcast(&self.core.cast, event)
    }

    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.read())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.read().clone()
    }

    //<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

    pub fn push(&self, item: T) -> Result<()> {
        self.push_range(std::slice::from_ref(&item))
    }

    pub fn push_range(&self, items: &[T]) -> Result<()> {
        let _guard = self.begin()?;
        if items.is_empty() {
            return Ok(());
        }
        let index = {
            let mut data = self.write();
            let index = data.len();
            array_edit::insert_range(&mut data, items, index)?;
            index
        };
        self.commit(&ChangeEvent::add(items, index))
    }

    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        self.insert_range(index, std::slice::from_ref(&item))
    }

    pub fn insert_range(&self, index: usize, items: &[T]) -> Result<()> {
        let _guard = self.begin()?;
        array_edit::insert_range(&mut self.write(), items, index)?;
        if items.is_empty() {
            return Ok(());
        }
        self.commit(&ChangeEvent::add(items, index))
    }

    pub fn remove_at(&self, index: usize) -> Result<T> {
        let mut removed = self.remove_range(index, 1)?;
        removed
            .pop()
            .ok_or_else(|| ViewError::InconsistentState("empty removal".into()))
    }

    /// Remove `count` items starting at `index` and return them.
    pub fn remove_range(&self, index: usize, count: usize) -> Result<Vec<T>> {
        let _guard = self.begin()?;
        let removed = {
            let mut data = self.write();
            let end = index.checked_add(count).ok_or_else(|| {
                ViewError::InvalidArgument(format!("range {index}+{count} overflows"))
            })?;
            let removed = data
                .get(index..end)
                .ok_or(ViewError::IndexOutOfRange {
                    index: end,
                    len: data.len(),
                })?
                .to_vec();
            array_edit::remove_range(&mut data, index, count)?;
            removed
        };
        if removed.is_empty() {
            return Ok(removed);
        }
        self.commit(&ChangeEvent::remove(&removed, index))?;
        Ok(removed)
    }

    /// Remove the first item equal to `item`. Returns whether one was found.
    pub fn remove(&self, item: &T) -> Result<bool>
    where
        T: PartialEq,
    {
        let position = self.read().iter().position(|x| x == item);
        match position {
            Some(index) => self.remove_at(index).map(|_| true),
            None => Ok(false),
        }
    }

    /// Overwrite the slot at `index`, returning the previous item.
    pub fn set(&self, index: usize, item: T) -> Result<T> {
        let _guard = self.begin()?;
        let old = {
            let mut data = self.write();
            check_index(index, data.len())?;
            std::mem::replace(&mut data[index], item.clone())
        };
        self.commit(&ChangeEvent::replace(&item, &old, index))?;
        Ok(old)
    }

    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        let _guard = self.begin()?;
        let item = {
            let mut data = self.write();
            array_edit::shift_move(&mut data, from, to)?;
            data[to].clone()
        };
        self.commit(&ChangeEvent::moved(&item, to, from))
    }

    /// Replace the whole contents. Always emits, even if nothing changed.
    pub fn reset(&self, items: &[T]) -> Result<()> {
        let _guard = self.begin()?;
        let old = {
            let mut data = self.write();
            let old = std::mem::take(&mut *data);
            array_edit::insert_range(&mut data, items, 0)?;
            old
        };
        self.commit(&ChangeEvent::reset(items, &old))
    }

    /// Remove everything. Emits a `Reset` unless the list was already empty.
    pub fn clear(&self) -> Result<()> {
        if self.read().is_empty() {
            return Ok(());
        }
        self.reset(&[])
    }

    /// Apply an event produced elsewhere (e.g. by a pipeline) to this list.
    pub fn apply(&self, event: &ChangeEvent<'_, T>) -> Result<()> {
        match *event {
            ChangeEvent::Add { items, index } => self.insert_range(index, items),
            ChangeEvent::Remove { items, index } => {
                self.remove_range(index, items.len()).map(|_| ())
            }
            ChangeEvent::Replace {
                new_item, index, ..
            } => self.set(index, new_item.clone()).map(|_| ()),
            ChangeEvent::Move {
                new_index,
                old_index,
                ..
            } => self.move_item(old_index, new_index),
            ChangeEvent::Reset { new_items, .. } => self.reset(new_items),
        }
    }

    pub fn apply_record(&self, record: &ChangeRecord<T>) -> Result<()> {
        self.apply(&record.as_event())
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

impl<T> ObservableSequence<T> for ObservableList<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn len(&self) -> usize {
        self.read().len()
    }

    fn get(&self, idx: usize) -> Option<T> {
        self.read().get(idx).cloned()
    }

    fn version(&self) -> u64 {
        self.core.version.load(Ordering::Acquire)
    }

    fn snapshot(&self) -> Vec<T> {
        self.to_vec()
    }

    fn subscribe(&self, observer: SharedObserver<T>) -> Subscription<T> {
        Subscription::attach(&self.core.cast, observer)
    }

    fn observer_count(&self) -> usize {
        self.core
            .cast
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T> FromIterator<T> for ObservableList<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        ObservableList::with_data(iter.into_iter().collect())
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
