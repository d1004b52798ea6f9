use {
    crate::{
        buffer::vec::ObservableList,
        error::{try_write, Result},
        projection::emitter::Emitter,
        view::{
            change::ChangeEvent,
            observer::{NotifyFnObserver, Observer, SharedObserver, Subscription},
            sequence::ObservableSequence,
        },
    },
    std::sync::{Arc, PoisonError, RwLock, Weak},
};

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
              Materialized View
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/
/// Derived list kept in sync with a source through an emitter pipeline.
///
/// While at least one listener is attached the view is *live*: it holds one
/// subscription on the source and applies every event as it arrives. Without
/// listeners it is *lazy*: reads compare the last synchronized source version
/// against the current one and rebuild through the `Reset` path if they differ.
///
/// A view is itself an [`ObservableSequence`], so it can be the source of
/// another view. Cloning yields another handle onto the same view.
pub struct MaterializedView<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    shared: Arc<ViewShared<S, D>>,
}

struct ViewShared<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    source: Arc<dyn ObservableSequence<S>>,
    pipeline: RwLock<Box<dyn Emitter<S, D>>>,
    storage: ObservableList<D>,
    link: RwLock<ViewLink<S>>,
    watermark: RwLock<Option<u64>>,
}

/// Upstream side of the listener lifecycle.
struct ViewLink<S> {
    listeners: usize,
    upstream: Option<Subscription<S>>,
}

/// The single observer a live view registers on its source.
struct UpstreamObserver<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    view: Weak<ViewShared<S, D>>,
}

impl<S, D> Observer<S> for UpstreamObserver<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    fn notify(&mut self, event: &ChangeEvent<'_, S>) -> Result<()> {
        match self.view.upgrade() {
            Some(view) => view.on_source_event(event),
            None => Ok(()),
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

impl<S, D> ViewShared<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    fn on_source_event(&self, event: &ChangeEvent<'_, S>) -> Result<()> {
        if self.watermark().is_none() {
            return self.refresh();
        }
        let mut pipeline = try_write(&self.pipeline)?;
        let storage = &self.storage;
        pipeline.emit(event, &mut |out| storage.apply(out))?;
        self.mark(self.source.version());
        Ok(())
    }

    fn refresh(&self) -> Result<()> {
        let mut pipeline = try_write(&self.pipeline)?;
        let version = self.source.version();
        let items = self.source.snapshot();

        let storage = &self.storage;
        pipeline.emit(&ChangeEvent::reset(&items, &[]), &mut |out| storage.apply(out))?;
        self.mark(version);

        tracing::debug!(version, len = storage.len(), "view refreshed");
        Ok(())
    }

    fn watermark(&self) -> Option<u64> {
        *self.watermark.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark(&self, version: u64) {
        *self.watermark.write().unwrap_or_else(PoisonError::into_inner) = Some(version);
    }

    fn is_live(&self) -> bool {
        self.link
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .upstream
            .is_some()
    }

    /// Bring a lazy view up to date before a read.
    ///
    /// A live view is only rebuilt here if its baseline refresh failed.
    fn sync(&self) -> Result<()> {
        let seen = self.watermark();
        if self.is_live() && seen.is_some() {
            return Ok(());
        }
        if seen != Some(self.source.version()) {
            self.refresh()?;
        }
        Ok(())
    }

    fn subscribe_upstream(self: &Arc<Self>) -> Subscription<S> {
        tracing::debug!("view attached upstream");
        self.source.subscribe(Arc::new(RwLock::new(UpstreamObserver {
            view: Arc::downgrade(self),
        })))
    }

    /// Subscribe upstream and take the baseline. On failure nothing stays attached.
    fn go_live(self: &Arc<Self>, link: &mut ViewLink<S>) -> Result<()> {
        let upstream = self.subscribe_upstream();
        self.refresh()?;
        link.upstream = Some(upstream);
        Ok(())
    }

    /// Register a listener, going live on the first one.
    fn attach_listener(self: &Arc<Self>, observer: SharedObserver<D>) -> Result<Subscription<D>> {
        let mut link = self.link.write().unwrap_or_else(PoisonError::into_inner);
        if link.listeners == 0 {
            self.go_live(&mut link)?;
        }
        link.listeners += 1;
        Ok(self.storage.subscribe(observer))
    }

    /// Like `attach_listener`, but a failed baseline leaves the view live
    /// with an unset watermark. The next source event or read rebuilds it.
    fn attach_listener_dirty(self: &Arc<Self>, observer: SharedObserver<D>) -> Subscription<D> {
        let mut link = self.link.write().unwrap_or_else(PoisonError::into_inner);
        if link.listeners == 0 {
            if let Err(err) = self.go_live(&mut link) {
                tracing::warn!(%err, "baseline refresh failed, view left dirty");
                *self.watermark.write().unwrap_or_else(PoisonError::into_inner) = None;
                link.upstream = Some(self.subscribe_upstream());
            }
        }
        link.listeners += 1;
        self.storage.subscribe(observer)
    }

    fn detach_listener(&self) {
        let upstream = {
            let mut link = self.link.write().unwrap_or_else(PoisonError::into_inner);
            link.listeners = link.listeners.saturating_sub(1);
            if link.listeners == 0 {
                link.upstream.take()
            } else {
                None
            }
        };

        if upstream.is_some() {
            tracing::debug!("view detached upstream");
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

impl<S, D> Clone for MaterializedView<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        MaterializedView {
            shared: self.shared.clone(),
        }
    }
}

impl<S, D> MaterializedView<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    /// Bind `emitter` to `source`. Nothing is computed until the first read
    /// or the first listener.
    pub fn new(source: Arc<dyn ObservableSequence<S>>, emitter: Box<dyn Emitter<S, D>>) -> Self {
        MaterializedView {
            shared: Arc::new(ViewShared {
                source,
                pipeline: RwLock::new(emitter),
                storage: ObservableList::new(),
                link: RwLock::new(ViewLink {
                    listeners: 0,
                    upstream: None,
                }),
                watermark: RwLock::new(None),
            }),
        }
    }

    pub fn len(&self) -> Result<usize> {
        self.shared.sync()?;
        Ok(self.shared.storage.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    pub fn get(&self, idx: usize) -> Result<Option<D>> {
        self.shared.sync()?;
        Ok(self.shared.storage.get(idx))
    }

    pub fn to_vec(&self) -> Result<Vec<D>> {
        self.shared.sync()?;
        Ok(self.shared.storage.to_vec())
    }

    /// Version of the derived contents; bumps once per applied event.
    pub fn version(&self) -> u64 {
        self.shared.storage.version()
    }

    /// Whether the view currently holds a subscription on its source.
    pub fn is_live(&self) -> bool {
        self.shared.is_live()
    }

    pub fn listener_count(&self) -> usize {
        self.shared
            .link
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
    }

    /// Rebuild from the current source contents regardless of the watermark.
    pub fn refresh(&self) -> Result<()> {
        self.shared.refresh()
    }

    /// Attach a listener. The first listener makes the view live.
    pub fn subscribe(&self, observer: SharedObserver<D>) -> Result<ViewSubscription<S, D>> {
        let inner = self.shared.attach_listener(observer)?;
        Ok(ViewSubscription {
            _inner: inner,
            _listener: ListenerGuard {
                view: Arc::downgrade(&self.shared),
            },
        })
    }

    pub fn add_notify_fn<F>(&self, notify: F) -> Result<ViewSubscription<S, D>>
    where
        F: Fn(&ChangeEvent<'_, D>) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(RwLock::new(NotifyFnObserver::new(notify))))
    }

    fn synced(&self) -> &ObservableList<D> {
        if let Err(err) = self.shared.sync() {
            tracing::warn!(%err, "serving stale view contents");
        }
        &self.shared.storage
    }

    /// Detach from the source and clear the derived contents.
    ///
    /// Listeners still attached observe the final clearing `Reset`.
    pub fn dispose(self) -> Result<()> {
        let upstream = {
            let mut link = self.shared.link.write().unwrap_or_else(PoisonError::into_inner);
            link.listeners = 0;
            link.upstream.take()
        };
        drop(upstream);

        *self.shared.watermark.write().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::debug!("view disposed");
        self.shared.storage.clear()
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Listener registration on a [`MaterializedView`].
///
/// Dropping the last one puts the view back into lazy mode.
#[must_use = "dropping a ViewSubscription detaches the listener"]
pub struct ViewSubscription<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    _inner: Subscription<D>,
    _listener: ListenerGuard<S, D>,
}

impl<S, D> ViewSubscription<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    pub fn unsubscribe(self) {}
}

/// Counts one listener; released after its observer is detached.
struct ListenerGuard<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    view: Weak<ViewShared<S, D>>,
}

impl<S, D> Drop for ListenerGuard<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(view) = self.view.upgrade() {
            view.detach_listener();
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

impl<S, D> ObservableSequence<D> for MaterializedView<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    fn len(&self) -> usize {
        self.synced().len()
    }

    fn get(&self, idx: usize) -> Option<D> {
        self.synced().get(idx)
    }

    fn version(&self) -> u64 {
        self.synced().version()
    }

    fn snapshot(&self) -> Vec<D> {
        self.synced().to_vec()
    }

    fn subscribe(&self, observer: SharedObserver<D>) -> Subscription<D> {
        self.shared
            .attach_listener_dirty(observer)
            .hold(ListenerGuard {
                view: Arc::downgrade(&self.shared),
            })
    }

    fn observer_count(&self) -> usize {
        self.listener_count()
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

#[cfg(test)]
mod tests {
    use {
        crate::{
            buffer::vec::ObservableList,
            error::ViewError,
            projection::pipeline::Pipeline,
            view::{change::ChangeRecord, materialized::*},
        },
        std::sync::Mutex,
    };

    type Log = Arc<Mutex<Vec<ChangeRecord<i32>>>>;

    fn recorder() -> (Log, impl Fn(&ChangeEvent<'_, i32>) + Send + Sync + 'static) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        (log, move |e: &ChangeEvent<'_, i32>| l.lock().unwrap().push(e.to_record()))
    }

    #[test]
    fn filter_then_sort_scenario() {
        let source: ObservableList<i32> = vec![5, 3, 3, 1].into_iter().collect();
        let view = source
            .build_view(|p| p.filter(|x: &i32| *x != 3).sort(false));

        let (log, notify) = recorder();
        let _sub = view.add_notify_fn(notify).unwrap();
        assert_eq!(view.to_vec().unwrap(), vec![1, 5]);

        source.insert(1, 2).unwrap();
        assert_eq!(view.to_vec().unwrap(), vec![1, 2, 5]);

        source.remove(&5).unwrap();
        assert_eq!(view.to_vec().unwrap(), vec![1, 2]);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ChangeRecord::Add { items: vec![2], index: 1 },
                ChangeRecord::Remove { items: vec![5], index: 2 },
            ]
        );
    }

    #[test]
    fn lazy_view_resyncs_on_read() {
        let source: ObservableList<i32> = vec![3, 1, 2].into_iter().collect();
        let view = source.build_view(|p| p.sort(false));

        assert!(!view.is_live());
        assert_eq!(view.to_vec().unwrap(), vec![1, 2, 3]);

        source.push(0).unwrap();
        assert_eq!(source.observer_count(), 0);
        assert_eq!(view.len().unwrap(), 4);
        assert_eq!(view.get(0).unwrap(), Some(0));

        // an unchanged source does not trigger another rebuild
        let version = view.version();
        assert_eq!(view.to_vec().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(view.version(), version);

        // explicit refresh always rebuilds
        view.refresh().unwrap();
        assert_eq!(view.version(), version + 1);
    }

    #[test]
    fn one_upstream_subscription_for_many_listeners() {
        let source: ObservableList<i32> = ObservableList::new();
        let view = Pipeline::new().reverse().build(source.clone());
        assert_eq!(source.observer_count(), 0);

        let a = view.add_notify_fn(|_| {}).unwrap();
        assert_eq!(source.observer_count(), 1);
        let b = view.add_notify_fn(|_| {}).unwrap();
        let c = view.add_notify_fn(|_| {}).unwrap();
        assert_eq!(source.observer_count(), 1);
        assert_eq!(view.listener_count(), 3);

        drop(a);
        b.unsubscribe();
        assert!(view.is_live());
        drop(c);
        assert!(!view.is_live());
        assert_eq!(source.observer_count(), 0);

        // lazy again, but still correct
        source.push_range(&[1, 2]).unwrap();
        assert_eq!(view.to_vec().unwrap(), vec![2, 1]);
    }

    #[test]
    fn live_view_tracks_every_mutation_kind() {
        let source: ObservableList<i32> = vec![4, 9, 2].into_iter().collect();
        let view = source
            .build_view(|p| p.map(|x: &i32| x + 1).filter(|x: &i32| x % 2 == 1).reverse());
        let _sub = view.add_notify_fn(|_| {}).unwrap();
        let expect = |src: Vec<i32>| -> Vec<i32> {
            src.iter().map(|x| x + 1).filter(|x| x % 2 == 1).rev().collect()
        };

        source.push_range(&[6, 7, 8]).unwrap();
        assert_eq!(view.to_vec().unwrap(), expect(source.to_vec()));
        source.set(1, 10).unwrap();
        assert_eq!(view.to_vec().unwrap(), expect(source.to_vec()));
        source.move_item(0, 4).unwrap();
        assert_eq!(view.to_vec().unwrap(), expect(source.to_vec()));
        source.remove_range(1, 3).unwrap();
        assert_eq!(view.to_vec().unwrap(), expect(source.to_vec()));
        source.reset(&[2, 4, 6]).unwrap();
        assert_eq!(view.to_vec().unwrap(), expect(source.to_vec()));
        source.clear().unwrap();
        assert!(view.is_empty().unwrap());
    }

    #[test]
    fn refresh_from_listener_is_rejected() {
        let source: ObservableList<i32> = vec![1].into_iter().collect();
        let view = Arc::new(source.build_view(|p| p.map(|x: &i32| *x)));
        let seen: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));

        let v = Arc::downgrade(&view);
        let s = seen.clone();
        let _sub = view
            .add_notify_fn(move |_| {
                if let Some(v) = v.upgrade() {
                    *s.lock().unwrap() = Some(v.refresh());
                }
            })
            .unwrap();

        source.push(2).unwrap();
        assert!(matches!(
            *seen.lock().unwrap(),
            Some(Err(ViewError::ReentrancyViolation))
        ));
    }

    #[test]
    fn source_mutation_from_view_listener_is_rejected() {
        let source: ObservableList<i32> = ObservableList::new();
        let view = source.build_view(|p| p);

        let src = source.clone();
        let _sub = view
            .add_notify_fn(move |_| {
                let _ = src.push(0);
            })
            .unwrap();

        assert!(matches!(source.push(1), Ok(())));
        // the nested push was refused, so only one item arrived
        assert_eq!(source.to_vec(), vec![1]);
        assert_eq!(view.to_vec().unwrap(), vec![1]);
    }

    #[test]
    fn view_feeds_another_view() {
        let source: ObservableList<i32> = vec![4, 7, 1, 8].into_iter().collect();
        let odd = source.build_view(|p| p.filter(|x: &i32| x % 2 == 1));
        let sorted = Pipeline::new().sort(true).build(odd.clone());

        // both lazy
        assert_eq!(sorted.to_vec().unwrap(), vec![7, 1]);
        source.push_range(&[9, 3]).unwrap();
        assert_eq!(sorted.to_vec().unwrap(), vec![9, 7, 3, 1]);
        assert_eq!(odd.to_vec().unwrap(), vec![7, 1, 9, 3]);

        // a listener on the outer view makes the whole chain live
        let (log, notify) = recorder();
        let sub = sorted.add_notify_fn(notify).unwrap();
        assert!(odd.is_live());
        assert_eq!(odd.listener_count(), 1);
        assert_eq!(source.observer_count(), 1);

        source.insert(0, 5).unwrap();
        source.set(2, 2).unwrap();
        source.remove(&9).unwrap();
        assert_eq!(odd.to_vec().unwrap(), vec![5, 1, 3]);
        assert_eq!(sorted.to_vec().unwrap(), vec![5, 3, 1]);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ChangeRecord::Add { items: vec![5], index: 2 },
                ChangeRecord::Remove { items: vec![7], index: 1 },
                ChangeRecord::Remove { items: vec![9], index: 0 },
            ]
        );

        drop(sub);
        assert!(!odd.is_live());
        assert_eq!(source.observer_count(), 0);
    }

    #[test]
    fn view_iterates_as_a_sequence() {
        use crate::view::sequence::ObservableSequenceExt;

        let source: ObservableList<i32> = vec![3, 1, 2].into_iter().collect();
        let view = source.build_view(|p| p.sort(false));
        source.push(0).unwrap();

        assert_eq!(view.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(ObservableSequence::len(&view), 4);
        assert_eq!(ObservableSequence::snapshot(&view), vec![0, 1, 2, 3]);
    }

    #[test]
    fn dispose_detaches_and_clears() {
        let source: ObservableList<i32> = vec![1, 2].into_iter().collect();
        let view = source.build_view(|p| p);
        let (log, notify) = recorder();
        let sub = view.add_notify_fn(notify).unwrap();
        assert_eq!(source.observer_count(), 1);

        view.dispose().unwrap();
        assert_eq!(source.observer_count(), 0);
        assert_eq!(
            *log.lock().unwrap(),
            vec![ChangeRecord::Reset { new_items: vec![], old_items: vec![1, 2] }]
        );
        drop(sub);
    }
}
