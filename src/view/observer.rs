use {
    crate::{
        error::{try_read, try_write, Result},
        view::change::ChangeEvent,
    },
    std::{
        any::Any,
        sync::{Arc, PoisonError, RwLock, Weak},
    },
};

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                 Observer
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/
pub trait Observer<T>: Send + Sync {
    fn notify(&mut self, event: &ChangeEvent<'_, T>) -> Result<()>;
}

pub type SharedObserver<T> = Arc<RwLock<dyn Observer<T>>>;

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                 Broadcast
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/
/// Observers of one sequence, in registration order.
pub struct ObserverBroadcast<T> {
    next_id: u64,
    observers: Vec<(u64, SharedObserver<T>)>,
}

impl<T> ObserverBroadcast<T> {
    pub fn new() -> Self {
        ObserverBroadcast {
            next_id: 0,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: SharedObserver<T>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn remove_observer(&mut self, id: u64) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(i, _)| *i != id);
        self.observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    fn snapshot(&self) -> Vec<SharedObserver<T>> {
        self.observers.iter().map(|(_, o)| o.clone()).collect()
    }
}

impl<T> Default for ObserverBroadcast<T> {
    fn default() -> Self {
        ObserverBroadcast::new()
    }
}

/// Notify everything registered on `cast` at the time of the call.
///
/// Iterates a snapshot, so observers may subscribe or unsubscribe from
/// inside their callbacks. Stops at the first failing observer.
pub fn broadcast<T>(cast: &RwLock<ObserverBroadcast<T>>, event: &ChangeEvent<'_, T>) -> Result<()> {
    let observers = try_read(cast)?.snapshot();
    for observer in observers {
        try_write(&*observer)?.notify(event)?;
    }
    Ok(())
}

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
               Subscription
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/
/// Registration handle. The observer stays attached until this is dropped.
#[must_use = "dropping a Subscription detaches the observer"]
pub struct Subscription<T> {
    id: u64,
    cast: Weak<RwLock<ObserverBroadcast<T>>>,
    guards: Vec<Box<dyn Any + Send + Sync>>,
}

impl<T> Subscription<T> {
    pub fn attach(cast: &Arc<RwLock<ObserverBroadcast<T>>>, observer: SharedObserver<T>) -> Self {
        let id = cast
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add_observer(observer);

        Subscription {
            id,
            cast: Arc::downgrade(cast),
            guards: Vec::new(),
        }
    }

    /// Keep `guard` alive until the observer has been detached.
    pub fn hold<G: Any + Send + Sync>(mut self, guard: G) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(cast) = self.cast.upgrade() {
            cast.write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove_observer(self.id);
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub struct NotifyFnObserver<T, F>
where
    F: Fn(&ChangeEvent<'_, T>) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T, F> NotifyFnObserver<T, F>
where
    F: Fn(&ChangeEvent<'_, T>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        NotifyFnObserver {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> Observer<T> for NotifyFnObserver<T, F>
where
    F: Fn(&ChangeEvent<'_, T>) + Send + Sync,
{
    fn notify(&mut self, event: &ChangeEvent<'_, T>) -> Result<()> {
        (self.f)(event);
        Ok(())
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

#[cfg(test)]
mod tests {
    use {
        crate::view::{change::ChangeEvent, observer::*},
        std::sync::Mutex,
    };

    #[test]
    fn notifies_in_registration_order() {
        let cast = Arc::new(RwLock::new(ObserverBroadcast::<i32>::new()));
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = log.clone();
        let _s1 = Subscription::attach(
            &cast,
            Arc::new(RwLock::new(NotifyFnObserver::new(move |_: &ChangeEvent<'_, i32>| {
                l1.lock().unwrap().push(1)
            }))),
        );
        let l2 = log.clone();
        let _s2 = Subscription::attach(
            &cast,
            Arc::new(RwLock::new(NotifyFnObserver::new(move |_: &ChangeEvent<'_, i32>| {
                l2.lock().unwrap().push(2)
            }))),
        );

        broadcast(&cast, &ChangeEvent::add(&[7], 0)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn dropping_subscription_detaches() {
        let cast = Arc::new(RwLock::new(ObserverBroadcast::<i32>::new()));
        let sub = Subscription::attach(
            &cast,
            Arc::new(RwLock::new(NotifyFnObserver::new(|_: &ChangeEvent<'_, i32>| {}))),
        );
        assert_eq!(cast.read().unwrap().len(), 1);

        drop(sub);
        assert!(cast.read().unwrap().is_empty());
    }

    #[test]
    fn held_guard_outlives_the_registration() {
        struct Flag(Arc<Mutex<Vec<&'static str>>>, Arc<RwLock<ObserverBroadcast<i32>>>);
        impl Drop for Flag {
            fn drop(&mut self) {
                let attached = self.1.read().unwrap().len();
                self.0.lock().unwrap().push(if attached == 0 { "after" } else { "before" });
            }
        }

        let cast = Arc::new(RwLock::new(ObserverBroadcast::<i32>::new()));
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = Subscription::attach(
            &cast,
            Arc::new(RwLock::new(NotifyFnObserver::new(|_: &ChangeEvent<'_, i32>| {}))),
        )
        .hold(Flag(log.clone(), cast.clone()));

        assert!(log.lock().unwrap().is_empty());
        drop(sub);
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn observer_may_unsubscribe_a_sibling_mid_broadcast() {
        let cast = Arc::new(RwLock::new(ObserverBroadcast::<i32>::new()));
        let hits = Arc::new(Mutex::new(0));
        let victim: Arc<Mutex<Option<Subscription<i32>>>> = Arc::new(Mutex::new(None));

        let v = victim.clone();
        let _killer = Subscription::attach(
            &cast,
            Arc::new(RwLock::new(NotifyFnObserver::new(move |_: &ChangeEvent<'_, i32>| {
                v.lock().unwrap().take();
            }))),
        );
        let h = hits.clone();
        *victim.lock().unwrap() = Some(Subscription::attach(
            &cast,
            Arc::new(RwLock::new(NotifyFnObserver::new(move |_: &ChangeEvent<'_, i32>| {
                *h.lock().unwrap() += 1;
            }))),
        ));

        // the snapshot still contains the victim for this round
        broadcast(&cast, &ChangeEvent::add(&[1], 0)).unwrap();
        assert_eq!(*hits.lock().unwrap(), 1);
        assert_eq!(cast.read().unwrap().len(), 1);

        broadcast(&cast, &ChangeEvent::add(&[2], 1)).unwrap();
        assert_eq!(*hits.lock().unwrap(), 1);
    }
}
