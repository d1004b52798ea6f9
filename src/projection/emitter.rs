use crate::{error::Result, view::change::ChangeEvent};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Downstream callback of an [`Emitter`].
pub type Sink<'s, D> = dyn FnMut(&ChangeEvent<'_, D>) -> Result<()> + 's;

/// One stage of a view pipeline.
///
/// Translates an inbound event over `S` items into zero or more events over
/// `D` items, pushing each one into `sink` before returning. Stages that keep
/// auxiliary state update it as part of the call.
pub trait Emitter<S, D>: Send + Sync {
    fn emit(&mut self, event: &ChangeEvent<'_, S>, sink: &mut Sink<'_, D>) -> Result<()>;
}

impl<S, D, E: Emitter<S, D> + ?Sized> Emitter<S, D> for Box<E> {
    fn emit(&mut self, event: &ChangeEvent<'_, S>, sink: &mut Sink<'_, D>) -> Result<()> {
        (**self).emit(event, sink)
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Passes every event through untouched. Root of every pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<T> Emitter<T, T> for Identity {
    fn emit(&mut self, event: &ChangeEvent<'_, T>, sink: &mut Sink<'_, T>) -> Result<()> {
        sink(event)
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Run `emitter` once and collect its output as owned records.
#[cfg(test)]
pub(crate) fn collect<S, D: Clone>(
    emitter: &mut impl Emitter<S, D>,
    event: &ChangeEvent<'_, S>,
) -> Vec<crate::view::change::ChangeRecord<D>> {
    let mut out = Vec::new();
    emitter
        .emit(event, &mut |e| {
            out.push(e.to_record());
            Ok(())
        })
        .unwrap();
    out
}
