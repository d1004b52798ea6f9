pub mod emitter;

pub mod chain;
pub mod filter;
pub mod map;
pub mod reverse;
pub mod sort;

pub mod pipeline;

pub mod vec2bin;
pub mod vec2json;

pub use {
    chain::Chain,
    emitter::{Emitter, Identity, Sink},
    filter::FilterEmitter,
    map::MapEmitter,
    pipeline::Pipeline,
    reverse::ReverseEmitter,
    sort::SortEmitter,
};
