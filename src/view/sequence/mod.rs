use {
    crate::view::{
        change::ChangeEvent,
        observer::{NotifyFnObserver, SharedObserver, Subscription},
    },
    std::sync::{Arc, RwLock},
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// An ordered collection that reports every mutation as a [`ChangeEvent`].
///
/// Each mutation bumps `version` by exactly one and notifies all current
/// subscribers synchronously, in registration order, before returning.
pub trait ObservableSequence<T>: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, idx: usize) -> Option<T>;

    fn version(&self) -> u64;

    /// Copy of the current contents.
    fn snapshot(&self) -> Vec<T>;

    fn subscribe(&self, observer: SharedObserver<T>) -> Subscription<T>;

    fn observer_count(&self) -> usize;
}

impl<T, S: ObservableSequence<T> + ?Sized> ObservableSequence<T> for Arc<S> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, idx: usize) -> Option<T> {
        (**self).get(idx)
    }

    fn version(&self) -> u64 {
        (**self).version()
    }

    fn snapshot(&self) -> Vec<T> {
        (**self).snapshot()
    }

    fn subscribe(&self, observer: SharedObserver<T>) -> Subscription<T> {
        (**self).subscribe(observer)
    }

    fn observer_count(&self) -> usize {
        (**self).observer_count()
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub trait ObservableSequenceExt<T>: ObservableSequence<T> {
    fn iter(&self) -> SequenceIter<'_, T, Self> {
        SequenceIter {
            seq: self,
            cur: 0,
            _phantom: std::marker::PhantomData,
        }
    }

    fn add_notify_fn<F>(&self, notify: F) -> Subscription<T>
    where
        T: 'static,
        F: Fn(&ChangeEvent<'_, T>) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(RwLock::new(NotifyFnObserver::new(notify))))
    }
}

impl<T, S: ObservableSequence<T> + ?Sized> ObservableSequenceExt<T> for S {}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub struct SequenceIter<'a, T, S>
where
    S: ObservableSequence<T> + ?Sized,
{
    seq: &'a S,
    cur: usize,
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<'a, T, S> Iterator for SequenceIter<'a, T, S>
where
    S: ObservableSequence<T> + ?Sized,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let i = self.cur;
        self.cur += 1;
        self.seq.get(i)
    }
}
