use crate::{
    error::{check_index, Result, ViewError},
    projection::emitter::{Emitter, Sink},
    view::change::ChangeEvent,
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Mirrors the upstream order. Only the upstream length is tracked.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReverseEmitter {
    len: usize,
}

impl ReverseEmitter {
    pub fn new() -> Self {
        ReverseEmitter::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn mirror(&self, index: usize) -> usize {
        self.len - 1 - index
    }
}

impl<T: Clone> Emitter<T, T> for ReverseEmitter {
    fn emit(&mut self, event: &ChangeEvent<'_, T>, sink: &mut Sink<'_, T>) -> Result<()> {
        match *event {
            ChangeEvent::Add { items, index } => {
                if index > self.len {
                    return Err(ViewError::IndexOutOfRange { index, len: self.len });
                }
                // a block inserted before upstream slot `index` ends up right
                // after the mirrored slot, in reversed order
                let at = self.len - index;
                self.len += items.len();
                let reversed: Vec<T> = items.iter().rev().cloned().collect();
                sink(&ChangeEvent::add(&reversed, at))
            }
            ChangeEvent::Remove { items, index } => {
                let end = index
                    .checked_add(items.len())
                    .ok_or_else(|| ViewError::InvalidArgument("remove range overflows".into()))?;
                if end > self.len {
                    return Err(ViewError::IndexOutOfRange { index: end, len: self.len });
                }
                let at = self.len - end;
                self.len -= items.len();
                let reversed: Vec<T> = items.iter().rev().cloned().collect();
                sink(&ChangeEvent::remove(&reversed, at))
            }
            ChangeEvent::Replace {
                new_item,
                old_item,
                index,
            } => {
                check_index(index, self.len)?;
                sink(&ChangeEvent::replace(new_item, old_item, self.mirror(index)))
            }
            ChangeEvent::Move {
                item,
                new_index,
                old_index,
            } => {
                check_index(new_index, self.len)?;
                check_index(old_index, self.len)?;
                sink(&ChangeEvent::moved(
                    item,
                    self.mirror(new_index),
                    self.mirror(old_index),
                ))
            }
            ChangeEvent::Reset {
                new_items,
                old_items,
            } => {
                self.len = new_items.len();
                let new_items: Vec<T> = new_items.iter().rev().cloned().collect();
                let old_items: Vec<T> = old_items.iter().rev().cloned().collect();
                sink(&ChangeEvent::reset(&new_items, &old_items))
            }
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
