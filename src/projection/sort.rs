use {
    crate::{
        buffer::array_edit,
        error::{check_index, Result, ViewError},
        projection::emitter::{Emitter, Sink},
        view::change::ChangeEvent,
    },
    std::cmp::Ordering,
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Incrementally maintained stable sort.
///
/// `items` is the sorted sequence. `positions[source_index]` is where a
/// source item sits in `items`, `origins[sorted_index]` is the inverse.
/// Items comparing equal are ordered by ascending source index.
pub struct SortEmitter<T, C>
where
    C: Fn(&T, &T) -> Ordering + Send + Sync,
{
    cmp: C,
    items: Vec<T>,
    positions: Vec<usize>,
    origins: Vec<usize>,
}

impl<T, C> SortEmitter<T, C>
where
    T: Clone,
    C: Fn(&T, &T) -> Ordering + Send + Sync,
{
    pub fn new(cmp: C) -> Self {
        SortEmitter {
            cmp,
            items: Vec::new(),
            positions: Vec::new(),
            origins: Vec::new(),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Where a new item belonging at `source_index` has to go.
    ///
    /// Binary search by value; on hitting a run of equal items, walk from the
    /// landing point through the run comparing source indices.
    fn find_insert_position(&self, source_index: usize, item: &T) -> usize {
        let mut lo = 0;
        let mut hi = self.items.len();

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match (self.cmp)(item, &self.items[mid]) {
                Ordering::Greater => lo = mid + 1,
                Ordering::Less => hi = mid,
                Ordering::Equal => {
                    // Existing items at `>= source_index` get shifted up by
                    // the insertion, so the new item goes in front of them.
                    return if source_index > self.origins[mid] {
                        let mut i = mid + 1;
                        while i < self.items.len()
                            && (self.cmp)(item, &self.items[i]) == Ordering::Equal
                            && self.origins[i] < source_index
                        {
                            i += 1;
                        }
                        i
                    } else {
                        let mut i = mid;
                        while i > 0
                            && (self.cmp)(item, &self.items[i - 1]) == Ordering::Equal
                            && self.origins[i - 1] >= source_index
                        {
                            i -= 1;
                        }
                        i
                    };
                }
            }
        }

        lo
    }

    /// Insert without emitting. Returns the sorted position.
    fn attach(&mut self, source_index: usize, item: &T) -> Result<usize> {
        if source_index > self.positions.len() {
            return Err(ViewError::IndexOutOfRange {
                index: source_index,
                len: self.positions.len(),
            });
        }

        let pos = self.find_insert_position(source_index, item);

        for origin in self.origins.iter_mut() {
            if *origin >= source_index {
                *origin += 1;
            }
        }
        for position in self.positions.iter_mut() {
            if *position >= pos {
                *position += 1;
            }
        }

        array_edit::insert_range(&mut self.items, std::slice::from_ref(item), pos)?;
        array_edit::insert_range(&mut self.origins, &[source_index], pos)?;
        array_edit::insert_range(&mut self.positions, &[pos], source_index)?;
        Ok(pos)
    }

    /// Remove without emitting. Returns the sorted position and the item.
    fn detach(&mut self, source_index: usize) -> Result<(usize, T)> {
        check_index(source_index, self.positions.len())?;

        let pos = self.positions[source_index];
        if self.origins.get(pos) != Some(&source_index) {
            return Err(ViewError::InconsistentState(format!(
                "sort index maps disagree: positions[{source_index}] = {pos}, origins[{pos}] = {:?}",
                self.origins.get(pos)
            )));
        }

        let item = self.items[pos].clone();
        array_edit::remove_range(&mut self.items, pos, 1)?;
        array_edit::remove_range(&mut self.origins, pos, 1)?;
        array_edit::remove_range(&mut self.positions, source_index, 1)?;

        for position in self.positions.iter_mut() {
            if *position > pos {
                *position -= 1;
            }
        }
        for origin in self.origins.iter_mut() {
            if *origin > source_index {
                *origin -= 1;
            }
        }
        Ok((pos, item))
    }

    fn insert(&mut self, source_index: usize, item: &T, sink: &mut Sink<'_, T>) -> Result<()> {
        let pos = self.attach(source_index, item)?;
        sink(&ChangeEvent::add(std::slice::from_ref(item), pos))
    }

    fn remove(&mut self, source_index: usize, sink: &mut Sink<'_, T>) -> Result<()> {
        let (pos, item) = self.detach(source_index)?;
        sink(&ChangeEvent::remove(std::slice::from_ref(&item), pos))
    }

    /// Re-attach at the new source index so equal items keep following
    /// source order. Emits a single `Move` if the sorted slot changed.
    fn relocate(&mut self, new_index: usize, old_index: usize, sink: &mut Sink<'_, T>) -> Result<()> {
        check_index(new_index, self.positions.len())?;
        let (old_pos, item) = self.detach(old_index)?;
        let new_pos = self.attach(new_index, &item)?;

        if old_pos == new_pos {
            Ok(())
        } else {
            sink(&ChangeEvent::moved(&item, new_pos, old_pos))
        }
    }

    fn rebuild(&mut self, new_items: &[T], sink: &mut Sink<'_, T>) -> Result<()> {
        let mut decorated: Vec<(usize, &T)> = new_items.iter().enumerate().collect();
        // slice::sort_by is stable; the index tie-break keeps that explicit
        decorated.sort_by(|(i, x), (j, y)| (self.cmp)(x, y).then(i.cmp(j)));

        let old_items = std::mem::take(&mut self.items);
        self.items = decorated.iter().map(|(_, x)| (*x).clone()).collect();
        self.origins = decorated.iter().map(|(i, _)| *i).collect();

        array_edit::resize(&mut self.positions, new_items.len());
        for (pos, origin) in self.origins.iter().enumerate() {
            self.positions[*origin] = pos;
        }

        tracing::debug!(len = self.items.len(), "sort stage rebuilt");
        sink(&ChangeEvent::reset(&self.items, &old_items))
    }

    /// Check `positions` / `origins` against each other and `items` against the comparison.
    pub fn verify(&self) -> Result<()> {
        if self.positions.len() != self.items.len() || self.origins.len() != self.items.len() {
            return Err(ViewError::InconsistentState("sort index maps out of step".into()));
        }
        for (source_index, pos) in self.positions.iter().enumerate() {
            if self.origins.get(*pos) != Some(&source_index) {
                return Err(ViewError::InconsistentState(format!(
                    "positions[{source_index}] = {pos} not mirrored by origins"
                )));
            }
        }
        for i in 1..self.items.len() {
            let order = (self.cmp)(&self.items[i - 1], &self.items[i])
                .then(self.origins[i - 1].cmp(&self.origins[i]));
            if order != Ordering::Less {
                return Err(ViewError::InconsistentState(format!(
                    "sorted items out of order at {i}"
                )));
            }
        }
        Ok(())
    }
}

impl<T, C> Emitter<T, T> for SortEmitter<T, C>
where
    T: Clone + Send + Sync,
    C: Fn(&T, &T) -> Ordering + Send + Sync,
{
    fn emit(&mut self, event: &ChangeEvent<'_, T>, sink: &mut Sink<'_, T>) -> Result<()> {
        match *event {
            ChangeEvent::Add { items, index } => {
                for (i, item) in items.iter().enumerate() {
                    self.insert(index + i, item, sink)?;
                }
                Ok(())
            }
            ChangeEvent::Remove { items, index } => {
                for i in (0..items.len()).rev() {
                    self.remove(index + i, sink)?;
                }
                Ok(())
            }
            ChangeEvent::Replace {
                new_item, index, ..
            } => {
                self.remove(index, sink)?;
                self.insert(index, new_item, sink)
            }
            ChangeEvent::Move {
                new_index,
                old_index,
                ..
            } => self.relocate(new_index, old_index, sink),
            ChangeEvent::Reset { new_items, .. } => self.rebuild(new_items, sink),
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

#[cfg(test)]
mod tests {
    use crate::{
        projection::{emitter::collect, sort::*},
        view::change::ChangeRecord,
    };

    /// Orders by the number only; the tag shows which item is which.
    fn by_num() -> SortEmitter<(u32, char), impl Fn(&(u32, char), &(u32, char)) -> Ordering + Send + Sync> {
        SortEmitter::new(|a: &(u32, char), b: &(u32, char)| a.0.cmp(&b.0))
    }

    fn reference(source: &[(u32, char)]) -> Vec<(u32, char)> {
        let mut v = source.to_vec();
        v.sort_by(|a, b| a.0.cmp(&b.0));
        v
    }

    #[test]
    fn reset_is_stable_and_idempotent() {
        let mut s = by_num();
        let src = [(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')];
        collect(&mut s, &ChangeEvent::reset(&src, &[]));
        assert_eq!(s.items(), &reference(&src)[..]);
        s.verify().unwrap();

        let again = collect(&mut s, &ChangeEvent::reset(&src, &src));
        assert_eq!(
            again,
            vec![ChangeRecord::Reset { new_items: reference(&src), old_items: reference(&src) }]
        );
    }

    #[test]
    fn insert_lands_inside_tie_run_by_source_index() {
        let mut s = by_num();
        let mut src = vec![(1, 'a'), (1, 'b'), (1, 'c'), (0, 'z')];
        collect(&mut s, &ChangeEvent::reset(&src, &[]));

        // equal key inserted between 'a' and 'b' in source order
        let out = collect(&mut s, &ChangeEvent::add(&[(1, 'x')], 1));
        src.insert(1, (1, 'x'));
        assert_eq!(out, vec![ChangeRecord::Add { items: vec![(1, 'x')], index: 2 }]);
        assert_eq!(s.items(), &reference(&src)[..]);
        s.verify().unwrap();

        // in front of the whole run
        collect(&mut s, &ChangeEvent::add(&[(1, 'y')], 0));
        src.insert(0, (1, 'y'));
        assert_eq!(s.items(), &reference(&src)[..]);

        // behind the whole run
        collect(&mut s, &ChangeEvent::add(&[(1, 'w')], 6));
        src.push((1, 'w'));
        assert_eq!(s.items(), &reference(&src)[..]);
        s.verify().unwrap();
    }

    #[test]
    fn remove_and_replace_keep_maps_consistent() {
        let mut s = by_num();
        let mut src = vec![(3, 'a'), (1, 'b'), (2, 'c'), (1, 'd'), (3, 'e')];
        collect(&mut s, &ChangeEvent::reset(&src, &[]));

        let removed: Vec<_> = src.drain(1..3).collect();
        let out = collect(&mut s, &ChangeEvent::remove(&removed, 1));
        assert_eq!(
            out,
            vec![
                ChangeRecord::Remove { items: vec![(2, 'c')], index: 2 },
                ChangeRecord::Remove { items: vec![(1, 'b')], index: 0 },
            ]
        );
        assert_eq!(s.items(), &reference(&src)[..]);
        s.verify().unwrap();

        // src = [(3,a), (1,d), (3,e)]; replacing with an equal key still goes through remove + add
        let out = collect(&mut s, &ChangeEvent::replace(&(3, 'q'), &(3, 'a'), 0));
        src[0] = (3, 'q');
        assert_eq!(
            out,
            vec![
                ChangeRecord::Remove { items: vec![(3, 'a')], index: 1 },
                ChangeRecord::Add { items: vec![(3, 'q')], index: 1 },
            ]
        );
        assert_eq!(s.items(), &reference(&src)[..]);
        s.verify().unwrap();
    }

    #[test]
    fn move_reorders_ties_and_ignores_distinct_keys() {
        let mut s = by_num();
        let mut src = vec![(1, 'a'), (5, 'b'), (1, 'c')];
        collect(&mut s, &ChangeEvent::reset(&src, &[]));

        // moving a unique key changes nothing in sorted space
        let out = collect(&mut s, &ChangeEvent::moved(&(5, 'b'), 0, 1));
        let b = src.remove(1);
        src.insert(0, b);
        assert!(out.is_empty());
        assert_eq!(s.items(), &reference(&src)[..]);
        s.verify().unwrap();

        // src = [b, a, c]; move c in front of a: tie order flips
        let out = collect(&mut s, &ChangeEvent::moved(&(1, 'c'), 1, 2));
        let c = src.remove(2);
        src.insert(1, c);
        assert_eq!(
            out,
            vec![ChangeRecord::Move { item: (1, 'c'), new_index: 0, old_index: 1 }]
        );
        assert_eq!(s.items(), &reference(&src)[..]);
        s.verify().unwrap();
    }

    #[test]
    fn verify_catches_corruption() {
        let mut s = by_num();
        collect(&mut s, &ChangeEvent::reset(&[(1, 'a'), (2, 'b')], &[]));
        s.positions.swap(0, 1);
        assert!(matches!(s.verify(), Err(ViewError::InconsistentState(_))));
        assert!(matches!(
            s.emit(&ChangeEvent::remove(&[(1, 'a')], 0), &mut |_| Ok(())),
            Err(ViewError::InconsistentState(_))
        ));
    }
}
