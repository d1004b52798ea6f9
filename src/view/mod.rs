pub mod change;
pub mod observer;
pub mod sequence;

pub mod channel;
pub mod legacy;
pub mod materialized;

pub use {
    change::{ChangeEvent, ChangeRecord},
    channel::{queue_channel, ChangeStream, ChangeStreamExt, ChannelReceiver, ChannelSender},
    legacy::{LegacyAdapter, LegacyChange, LegacyConfig},
    materialized::{MaterializedView, ViewSubscription},
    observer::{NotifyFnObserver, Observer, ObserverBroadcast, SharedObserver, Subscription},
    sequence::{ObservableSequence, ObservableSequenceExt},
};
