use crate::{
    error::Result,
    projection::emitter::{Emitter, Sink},
    view::change::ChangeEvent,
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Two emitters glued end to end.
///
/// Every event the upstream stage produces is pushed through the downstream
/// stage before the upstream stage continues, so one inbound event may fan
/// out into any number of outbound events within a single `emit` call.
pub struct Chain<S, M, D> {
    upstream: Box<dyn Emitter<S, M>>,
    downstream: Box<dyn Emitter<M, D>>,
}

impl<S, M, D> Chain<S, M, D> {
    pub fn new(upstream: Box<dyn Emitter<S, M>>, downstream: Box<dyn Emitter<M, D>>) -> Self {
        Chain {
            upstream,
            downstream,
        }
    }
}

impl<S, M, D> Emitter<S, D> for Chain<S, M, D> {
    fn emit(&mut self, event: &ChangeEvent<'_, S>, sink: &mut Sink<'_, D>) -> Result<()> {
        let downstream = &mut self.downstream;
        self.upstream
            .emit(event, &mut |relay| downstream.emit(relay, &mut *sink))
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
