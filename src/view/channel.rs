use {
    crate::{
        error::Result,
        view::{
            change::{ChangeEvent, ChangeRecord},
            materialized::MaterializedView,
            observer::Observer,
            sequence::ObservableSequence,
        },
    },
    async_std::stream::Stream,
    core::{
        pin::Pin,
        task::{Context, Poll, Waker},
    },
    std::{
        any::Any,
        sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
    },
};

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
               Queue Channel
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/
struct ChannelState<T> {
    send_buf: Vec<T>,
    recv_iter: Option<std::vec::IntoIter<T>>,
    num_senders: usize,
    waker: Option<Waker>,
}

type SharedState<T> = Arc<Mutex<ChannelState<T>>>;

fn lock<T>(state: &SharedState<T>) -> MutexGuard<'_, ChannelState<T>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub struct ChannelSender<T>(SharedState<T>);
pub struct ChannelReceiver<T>(SharedState<T>);

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

impl<T> ChannelSender<T> {
    pub fn send(&self, msg: T) {
        let mut state = lock(&self.0);
        state.send_buf.push(msg);

        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
    }
}

/// Every event is copied into the queue as an owned record.
impl<T> Observer<T> for ChannelSender<ChangeRecord<T>>
where
    T: Clone + Send + Sync,
{
    fn notify(&mut self, event: &ChangeEvent<'_, T>) -> Result<()> {
        self.send(event.to_record());
        Ok(())
    }
}

impl<T> Clone for ChannelSender<T> {
    fn clone(&self) -> Self {
        lock(&self.0).num_senders += 1;
        ChannelSender(self.0.clone())
    }
}

impl<T> Drop for ChannelSender<T> {
    fn drop(&mut self) {
        let mut state = lock(&self.0);
        state.num_senders -= 1;
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

impl<T> ChannelReceiver<T> {
    /// Wait for the next batch of queued messages.
    pub async fn recv(&self) -> Option<Vec<T>> {
        ChannelRead(self.0.clone()).await
    }

    pub fn try_recv(&self) -> Option<Vec<T>> {
        let mut state = lock(&self.0);
        if state.send_buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut state.send_buf))
        }
    }
}

struct ChannelRead<T>(SharedState<T>);

impl<T> std::future::Future for ChannelRead<T> {
    type Output = Option<Vec<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let mut state = lock(&self.0);
        if !state.send_buf.is_empty() {
            Poll::Ready(Some(std::mem::take(&mut state.send_buf)))
        } else if state.num_senders == 0 {
            Poll::Ready(None)
        } else {
            state.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl<T> Stream for ChannelReceiver<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut state = lock(&self.0);

        if let Some(recv_iter) = state.recv_iter.as_mut() {
            if let Some(val) = recv_iter.next() {
                return Poll::Ready(Some(val));
            }
            state.recv_iter = None;
        }

        if !state.send_buf.is_empty() {
            let mut batch = std::mem::take(&mut state.send_buf).into_iter();
            let first = batch.next();
            state.recv_iter = Some(batch);
            Poll::Ready(first)
        } else if state.num_senders == 0 {
            Poll::Ready(None)
        } else {
            state.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

pub fn queue_channel<T>() -> (ChannelSender<T>, ChannelReceiver<T>) {
    let state = Arc::new(Mutex::new(ChannelState {
        send_buf: Vec::new(),
        recv_iter: None,
        num_senders: 1,
        waker: None,
    }));

    (ChannelSender(state.clone()), ChannelReceiver(state))
}

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
               Change Stream
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/
/// Owned change records of one sequence or view, as an async stream.
///
/// Holds the registration; dropping the stream detaches it. The stream ends
/// once the observed sequence is gone.
pub struct ChangeStream<T> {
    rx: ChannelReceiver<ChangeRecord<T>>,
    _registration: Box<dyn Any + Send + Sync>,
}

impl<T> Stream for ChangeStream<T> {
    type Item = ChangeRecord<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

pub trait ChangeStreamExt<T>: ObservableSequence<T> {
    fn change_stream(&self) -> ChangeStream<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let (tx, rx) = queue_channel();
        let sub = self.subscribe(Arc::new(RwLock::new(tx)));
        ChangeStream {
            rx,
            _registration: Box::new(sub),
        }
    }
}

impl<T, S: ObservableSequence<T> + ?Sized> ChangeStreamExt<T> for S {}

impl<S, D> MaterializedView<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    /// Change stream of the derived contents. Keeps the view live while open.
    pub fn change_stream(&self) -> Result<ChangeStream<D>> {
        let (tx, rx) = queue_channel();
        let sub = self.subscribe(Arc::new(RwLock::new(tx)))?;
        Ok(ChangeStream {
            rx,
            _registration: Box::new(sub),
        })
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
