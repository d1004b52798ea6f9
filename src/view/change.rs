use serde::{Deserialize, Serialize};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// One structural edit of an ordered sequence.
///
/// Item spans borrow from the emitter and are only valid for the duration
/// of the notification call. Anything that must outlive the call has to be
/// copied, e.g. with [`ChangeEvent::to_record`].
#[derive(Debug)]
pub enum ChangeEvent<'a, T> {
    /// `items` were inserted so that the first of them is at `index`.
    Add { items: &'a [T], index: usize },
    /// `items` were removed; the first of them used to be at `index`.
    Remove { items: &'a [T], index: usize },
    Replace {
        new_item: &'a T,
        old_item: &'a T,
        index: usize,
    },
    Move {
        item: &'a T,
        new_index: usize,
        old_index: usize,
    },
    /// Contents replaced wholesale. Positional assumptions must be dropped.
    Reset {
        new_items: &'a [T],
        old_items: &'a [T],
    },
}

impl<'a, T> Clone for ChangeEvent<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for ChangeEvent<'a, T> {}

impl<'a, T> ChangeEvent<'a, T> {
    pub fn add(items: &'a [T], index: usize) -> Self {
        ChangeEvent::Add { items, index }
    }

    pub fn remove(items: &'a [T], index: usize) -> Self {
        ChangeEvent::Remove { items, index }
    }

    pub fn replace(new_item: &'a T, old_item: &'a T, index: usize) -> Self {
        ChangeEvent::Replace {
            new_item,
            old_item,
            index,
        }
    }

    pub fn moved(item: &'a T, new_index: usize, old_index: usize) -> Self {
        ChangeEvent::Move {
            item,
            new_index,
            old_index,
        }
    }

    pub fn reset(new_items: &'a [T], old_items: &'a [T]) -> Self {
        ChangeEvent::Reset {
            new_items,
            old_items,
        }
    }

    /// Net change in length caused by this event.
    pub fn len_delta(&self) -> isize {
        match self {
            ChangeEvent::Add { items, .. } => items.len() as isize,
            ChangeEvent::Remove { items, .. } => -(items.len() as isize),
            ChangeEvent::Replace { .. } | ChangeEvent::Move { .. } => 0,
            ChangeEvent::Reset {
                new_items,
                old_items,
            } => new_items.len() as isize - old_items.len() as isize,
        }
    }

    pub fn to_record(&self) -> ChangeRecord<T>
    where
        T: Clone,
    {
        match *self {
            ChangeEvent::Add { items, index } => ChangeRecord::Add {
                items: items.to_vec(),
                index,
            },
            ChangeEvent::Remove { items, index } => ChangeRecord::Remove {
                items: items.to_vec(),
                index,
            },
            ChangeEvent::Replace {
                new_item,
                old_item,
                index,
            } => ChangeRecord::Replace {
                new_item: new_item.clone(),
                old_item: old_item.clone(),
                index,
            },
            ChangeEvent::Move {
                item,
                new_index,
                old_index,
            } => ChangeRecord::Move {
                item: item.clone(),
                new_index,
                old_index,
            },
            ChangeEvent::Reset {
                new_items,
                old_items,
            } => ChangeRecord::Reset {
                new_items: new_items.to_vec(),
                old_items: old_items.to_vec(),
            },
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Owned copy of a [`ChangeEvent`], used by change logs and change streams.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeRecord<T> {
    Add {
        items: Vec<T>,
        index: usize,
    },
    Remove {
        items: Vec<T>,
        index: usize,
    },
    Replace {
        new_item: T,
        old_item: T,
        index: usize,
    },
    Move {
        item: T,
        new_index: usize,
        old_index: usize,
    },
    Reset {
        new_items: Vec<T>,
        old_items: Vec<T>,
    },
}

impl<T> ChangeRecord<T> {
    pub fn as_event(&self) -> ChangeEvent<'_, T> {
        match self {
            ChangeRecord::Add { items, index } => ChangeEvent::add(items, *index),
            ChangeRecord::Remove { items, index } => ChangeEvent::remove(items, *index),
            ChangeRecord::Replace {
                new_item,
                old_item,
                index,
            } => ChangeEvent::replace(new_item, old_item, *index),
            ChangeRecord::Move {
                item,
                new_index,
                old_index,
            } => ChangeEvent::moved(item, *new_index, *old_index),
            ChangeRecord::Reset {
                new_items,
                old_items,
            } => ChangeEvent::reset(new_items, old_items),
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
