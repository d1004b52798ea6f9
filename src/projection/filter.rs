use {
    crate::{
        buffer::array_edit,
        error::{check_index, Result, ViewError},
        projection::emitter::{Emitter, Sink},
        view::change::ChangeEvent,
    },
    std::marker::PhantomData,
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Keeps the items satisfying a predicate.
///
/// `passes[i]` records whether source slot `i` currently passes; the filtered
/// index of a source slot is the number of passing slots before it. Passing
/// items of one contiguous source block are always contiguous in filtered
/// space, so every inbound event maps to at most one outbound event.
pub struct FilterEmitter<T, P>
where
    P: Fn(&T) -> bool + Send + Sync,
{
    pred: P,
    passes: Vec<bool>,
    _phantom: PhantomData<fn(&T)>,
}

impl<T, P> FilterEmitter<T, P>
where
    P: Fn(&T) -> bool + Send + Sync,
{
    pub fn new(pred: P) -> Self {
        FilterEmitter {
            pred,
            passes: Vec::new(),
            _phantom: PhantomData,
        }
    }

    fn filtered_index(&self, source_index: usize) -> usize {
        self.passes[..source_index].iter().filter(|p| **p).count()
    }

    fn on_add(&mut self, items: &[T], index: usize, sink: &mut Sink<'_, T>) -> Result<()>
    where
        T: Clone,
    {
        if index > self.passes.len() {
            return Err(ViewError::IndexOutOfRange {
                index,
                len: self.passes.len(),
            });
        }

        let flags: Vec<bool> = items.iter().map(|x| (self.pred)(x)).collect();
        let at = self.filtered_index(index);
        array_edit::insert_range(&mut self.passes, &flags, index)?;

        let passing: Vec<T> = items
            .iter()
            .zip(&flags)
            .filter(|(_, p)| **p)
            .map(|(x, _)| x.clone())
            .collect();

        if passing.is_empty() {
            Ok(())
        } else {
            sink(&ChangeEvent::add(&passing, at))
        }
    }

    fn on_remove(&mut self, items: &[T], index: usize, sink: &mut Sink<'_, T>) -> Result<()>
    where
        T: Clone,
    {
        let end = index + items.len();
        let flags = self.passes.get(index..end).ok_or(ViewError::IndexOutOfRange {
            index: end,
            len: self.passes.len(),
        })?;

        let passing: Vec<T> = items
            .iter()
            .zip(flags)
            .filter(|(_, p)| **p)
            .map(|(x, _)| x.clone())
            .collect();
        let at = self.filtered_index(index);

        array_edit::remove_range(&mut self.passes, index, items.len())?;

        if passing.is_empty() {
            Ok(())
        } else {
            sink(&ChangeEvent::remove(&passing, at))
        }
    }

    fn on_replace(
        &mut self,
        new_item: &T,
        old_item: &T,
        index: usize,
        sink: &mut Sink<'_, T>,
    ) -> Result<()> {
        check_index(index, self.passes.len())?;

        let was = self.passes[index];
        let now = (self.pred)(new_item);
        self.passes[index] = now;
        let at = self.filtered_index(index);

        match (was, now) {
            (true, true) => sink(&ChangeEvent::replace(new_item, old_item, at)),
            (true, false) => sink(&ChangeEvent::remove(std::slice::from_ref(old_item), at)),
            (false, true) => sink(&ChangeEvent::add(std::slice::from_ref(new_item), at)),
            (false, false) => Ok(()),
        }
    }

    fn on_move(
        &mut self,
        item: &T,
        new_index: usize,
        old_index: usize,
        sink: &mut Sink<'_, T>,
    ) -> Result<()> {
        check_index(old_index, self.passes.len())?;
        check_index(new_index, self.passes.len())?;

        let passing = self.passes[old_index];
        let old_at = self.filtered_index(old_index);
        array_edit::shift_move(&mut self.passes, old_index, new_index)?;

        if !passing {
            return Ok(());
        }
        let new_at = self.filtered_index(new_index);
        if new_at == old_at {
            Ok(())
        } else {
            sink(&ChangeEvent::moved(item, new_at, old_at))
        }
    }

    fn on_reset(&mut self, new_items: &[T], old_items: &[T], sink: &mut Sink<'_, T>) -> Result<()>
    where
        T: Clone,
    {
        // Trust the bitmap for the old side when it lines up, the predicate otherwise.
        let old_passing: Vec<T> = if old_items.len() == self.passes.len() {
            old_items
                .iter()
                .zip(&self.passes)
                .filter(|(_, p)| **p)
                .map(|(x, _)| x.clone())
                .collect()
        } else {
            old_items.iter().filter(|x| (self.pred)(x)).cloned().collect()
        };

        self.passes = new_items.iter().map(|x| (self.pred)(x)).collect();
        let new_passing: Vec<T> = new_items
            .iter()
            .zip(&self.passes)
            .filter(|(_, p)| **p)
            .map(|(x, _)| x.clone())
            .collect();

        sink(&ChangeEvent::reset(&new_passing, &old_passing))
    }
}

impl<T, P> Emitter<T, T> for FilterEmitter<T, P>
where
    T: Clone,
    P: Fn(&T) -> bool + Send + Sync,
{
    fn emit(&mut self, event: &ChangeEvent<'_, T>, sink: &mut Sink<'_, T>) -> Result<()> {
        match *event {
            ChangeEvent::Add { items, index } => self.on_add(items, index, sink),
            ChangeEvent::Remove { items, index } => self.on_remove(items, index, sink),
            ChangeEvent::Replace {
                new_item,
                old_item,
                index,
            } => self.on_replace(new_item, old_item, index, sink),
            ChangeEvent::Move {
                item,
                new_index,
                old_index,
            } => self.on_move(item, new_index, old_index, sink),
            ChangeEvent::Reset {
                new_items,
                old_items,
            } => self.on_reset(new_items, old_items, sink),
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
