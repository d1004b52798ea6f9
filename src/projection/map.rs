use {
    crate::{
        error::Result,
        projection::emitter::{Emitter, Sink},
        view::change::ChangeEvent,
    },
    std::marker::PhantomData,
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Rewrites item payloads; variant and indices pass through unchanged.
pub struct MapEmitter<S, D, F>
where
    F: Fn(&S) -> D + Send + Sync,
{
    f: F,
    _phantom: PhantomData<fn(&S) -> D>,
}

impl<S, D, F> MapEmitter<S, D, F>
where
    F: Fn(&S) -> D + Send + Sync,
{
    pub fn new(f: F) -> Self {
        MapEmitter {
            f,
            _phantom: PhantomData,
        }
    }

    fn map_all(&self, items: &[S]) -> Vec<D> {
        items.iter().map(&self.f).collect()
    }
}

impl<S, D, F> Emitter<S, D> for MapEmitter<S, D, F>
where
    F: Fn(&S) -> D + Send + Sync,
{
    fn emit(&mut self, event: &ChangeEvent<'_, S>, sink: &mut Sink<'_, D>) -> Result<()> {
        match *event {
            ChangeEvent::Add { items, index } => sink(&ChangeEvent::add(&self.map_all(items), index)),
            ChangeEvent::Remove { items, index } => {
                sink(&ChangeEvent::remove(&self.map_all(items), index))
            }
            ChangeEvent::Replace {
                new_item,
                old_item,
                index,
            } => {
                let new_item = (self.f)(new_item);
                let old_item = (self.f)(old_item);
                sink(&ChangeEvent::replace(&new_item, &old_item, index))
            }
            ChangeEvent::Move {
                item,
                new_index,
                old_index,
            } => sink(&ChangeEvent::moved(&(self.f)(item), new_index, old_index)),
            ChangeEvent::Reset {
                new_items,
                old_items,
            } => sink(&ChangeEvent::reset(
                &self.map_all(new_items),
                &self.map_all(old_items),
            )),
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

#[cfg(test)]
mod tests {
    use crate::{
        projection::{emitter::collect, map::*},
        view::change::ChangeRecord,
    };

    #[test]
    fn map_keeps_shape() {
        let mut map = MapEmitter::new(|x: &i32| x * 10);

        assert_eq!(
            collect(&mut map, &ChangeEvent::add(&[1, 2], 4)),
            vec![ChangeRecord::Add { items: vec![10, 20], index: 4 }]
        );
        assert_eq!(
            collect(&mut map, &ChangeEvent::replace(&3, &1, 0)),
            vec![ChangeRecord::Replace { new_item: 30, old_item: 10, index: 0 }]
        );
        assert_eq!(
            collect(&mut map, &ChangeEvent::moved(&7, 0, 5)),
            vec![ChangeRecord::Move { item: 70, new_index: 0, old_index: 5 }]
        );
        assert_eq!(
            collect(&mut map, &ChangeEvent::reset(&[1], &[2, 3])),
            vec![ChangeRecord::Reset { new_items: vec![10], old_items: vec![20, 30] }]
        );
    }

    #[test]
    fn map_changes_item_type() {
        let mut map = MapEmitter::new(|x: &u8| format!("#{x}"));
        assert_eq!(
            collect(&mut map, &ChangeEvent::remove(&[1, 2], 0)),
            vec![ChangeRecord::Remove { items: vec!["#1".to_string(), "#2".to_string()], index: 0 }]
        );
    }
}
