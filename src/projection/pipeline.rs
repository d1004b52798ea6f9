use {
    crate::{
        buffer::vec::ObservableList,
        projection::{
            chain::Chain,
            emitter::{Emitter, Identity},
            filter::FilterEmitter,
            map::MapEmitter,
            reverse::ReverseEmitter,
            sort::SortEmitter,
        },
        view::{materialized::MaterializedView, sequence::ObservableSequence},
    },
    std::{cmp::Ordering, sync::Arc},
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Builder for a chain of emitters from `S` items to `D` items.
///
/// ```
/// use obsview::{buffer::vec::ObservableList, projection::pipeline::Pipeline};
///
/// let source: ObservableList<i32> = vec![5, 3, 3, 1].into_iter().collect();
/// let view = Pipeline::new()
///     .filter(|x: &i32| *x != 3)
///     .sort(false)
///     .build(source.clone());
///
/// assert_eq!(view.to_vec().unwrap(), vec![1, 5]);
/// ```
pub struct Pipeline<S, D> {
    emitter: Box<dyn Emitter<S, D>>,
}

impl<T> Pipeline<T, T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Pipeline {
            emitter: Box::new(Identity),
        }
    }
}

impl<T> Default for Pipeline<T, T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Pipeline::new()
    }
}

impl<S, D> Pipeline<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    /// Append an arbitrary stage.
    pub fn then<E>(self, stage: impl Emitter<D, E> + 'static) -> Pipeline<S, E>
    where
        E: Clone + Send + Sync + 'static,
    {
        Pipeline {
            emitter: Box::new(Chain::new(self.emitter, Box::new(stage))),
        }
    }

    pub fn map<E, F>(self, f: F) -> Pipeline<S, E>
    where
        E: Clone + Send + Sync + 'static,
        F: Fn(&D) -> E + Send + Sync + 'static,
    {
        self.then(MapEmitter::new(f))
    }

    pub fn filter<P>(self, pred: P) -> Pipeline<S, D>
    where
        P: Fn(&D) -> bool + Send + Sync + 'static,
    {
        self.then(FilterEmitter::new(pred))
    }

    /// Stable sort by `cmp`. With `reverse` set, the comparison is inverted
    /// while equal items keep their source order.
    pub fn sort_by<C>(self, cmp: C, reverse: bool) -> Pipeline<S, D>
    where
        C: Fn(&D, &D) -> Ordering + Send + Sync + 'static,
    {
        self.then(SortEmitter::new(move |a: &D, b: &D| {
            let order = cmp(a, b);
            if reverse {
                order.reverse()
            } else {
                order
            }
        }))
    }

    pub fn sort(self, reverse: bool) -> Pipeline<S, D>
    where
        D: Ord,
    {
        self.sort_by(|a: &D, b: &D| a.cmp(b), reverse)
    }

    pub fn reverse(self) -> Pipeline<S, D> {
        self.then(ReverseEmitter::new())
    }

    pub fn into_emitter(self) -> Box<dyn Emitter<S, D>> {
        self.emitter
    }

    /// Bind to `source`. The view starts out lazy.
    pub fn build(self, source: impl ObservableSequence<S> + 'static) -> MaterializedView<S, D> {
        MaterializedView::new(Arc::new(source), self.emitter)
    }
}

impl<T> ObservableList<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Shorthand for `configure(Pipeline::new()).build(self.clone())`.
    pub fn build_view<D, F>(&self, configure: F) -> MaterializedView<T, D>
    where
        D: Clone + Send + Sync + 'static,
        F: FnOnce(Pipeline<T, T>) -> Pipeline<T, D>,
    {
        configure(Pipeline::new()).build(self.clone())
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
