use {
    crate::{
        error::Result,
        view::{
            change::ChangeEvent,
            materialized::{MaterializedView, ViewSubscription},
        },
    },
    serde::{Deserialize, Serialize},
    std::sync::Arc,
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Notification shape for consumers that predate batched changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyChange<T> {
    Add { items: Vec<T>, index: usize },
    Remove { items: Vec<T>, index: usize },
    Replace { new_item: T, old_item: T, index: usize },
    Move { item: T, new_index: usize, old_index: usize },
    /// Carries no items; consumers re-read everything.
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    /// When unset, every multi-item `Add`/`Remove` is split into one
    /// notification per item.
    pub supports_batched: bool,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        LegacyConfig {
            supports_batched: true,
        }
    }
}

/// Translate one event into legacy notifications.
///
/// Unbatched removals go out highest index first so the indices of the
/// items still to be reported stay valid.
pub fn relay<T: Clone>(event: &ChangeEvent<'_, T>, supports_batched: bool, handler: &mut dyn FnMut(LegacyChange<T>)) {
    match *event {
        ChangeEvent::Add { items, index } => {
            if supports_batched {
                handler(LegacyChange::Add {
                    items: items.to_vec(),
                    index,
                });
            } else {
                for (i, item) in items.iter().enumerate() {
                    handler(LegacyChange::Add {
                        items: vec![item.clone()],
                        index: index + i,
                    });
                }
            }
        }
        ChangeEvent::Remove { items, index } => {
            if supports_batched {
                handler(LegacyChange::Remove {
                    items: items.to_vec(),
                    index,
                });
            } else {
                for (i, item) in items.iter().enumerate().rev() {
                    handler(LegacyChange::Remove {
                        items: vec![item.clone()],
                        index: index + i,
                    });
                }
            }
        }
        ChangeEvent::Replace {
            new_item,
            old_item,
            index,
        } => handler(LegacyChange::Replace {
            new_item: new_item.clone(),
            old_item: old_item.clone(),
            index,
        }),
        ChangeEvent::Move {
            item,
            new_index,
            old_index,
        } => handler(LegacyChange::Move {
            item: item.clone(),
            new_index,
            old_index,
        }),
        ChangeEvent::Reset { .. } => handler(LegacyChange::Reset),
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Read access plus legacy-shaped notifications over a [`MaterializedView`].
pub struct LegacyAdapter<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    view: Arc<MaterializedView<S, D>>,
    config: LegacyConfig,
}

impl<S, D> LegacyAdapter<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    pub fn new(view: Arc<MaterializedView<S, D>>, config: LegacyConfig) -> Self {
        LegacyAdapter { view, config }
    }

    pub fn config(&self) -> LegacyConfig {
        self.config
    }

    pub fn view(&self) -> &Arc<MaterializedView<S, D>> {
        &self.view
    }

    pub fn len(&self) -> Result<usize> {
        self.view.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.view.is_empty()
    }

    pub fn get(&self, idx: usize) -> Result<Option<D>> {
        self.view.get(idx)
    }

    /// Register a legacy handler. Each handler gets its own relay.
    pub fn subscribe<F>(&self, handler: F) -> Result<ViewSubscription<S, D>>
    where
        F: Fn(LegacyChange<D>) + Send + Sync + 'static,
    {
        let supports_batched = self.config.supports_batched;
        self.view.add_notify_fn(move |event| {
            relay(event, supports_batched, &mut |change| handler(change))
        })
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

#[cfg(test)]
mod tests {
    use {
        crate::{buffer::vec::ObservableList, view::legacy::*},
        std::sync::Mutex,
    };

    fn relayed(event: &ChangeEvent<'_, char>, supports_batched: bool) -> Vec<LegacyChange<char>> {
        let mut out = Vec::new();
        relay(event, supports_batched, &mut |c| out.push(c));
        out
    }

    #[test]
    fn batched_passes_through() {
        assert_eq!(
            relayed(&ChangeEvent::add(&['a', 'b'], 3), true),
            vec![LegacyChange::Add { items: vec!['a', 'b'], index: 3 }]
        );
    }

    #[test]
    fn unbatched_add_goes_front_to_back() {
        assert_eq!(
            relayed(&ChangeEvent::add(&['a', 'b'], 3), false),
            vec![
                LegacyChange::Add { items: vec!['a'], index: 3 },
                LegacyChange::Add { items: vec!['b'], index: 4 },
            ]
        );
    }

    #[test]
    fn unbatched_remove_goes_back_to_front() {
        assert_eq!(
            relayed(&ChangeEvent::remove(&['x', 'y', 'z'], 1), false),
            vec![
                LegacyChange::Remove { items: vec!['z'], index: 3 },
                LegacyChange::Remove { items: vec!['y'], index: 2 },
                LegacyChange::Remove { items: vec!['x'], index: 1 },
            ]
        );
    }

    #[test]
    fn reset_drops_items() {
        assert_eq!(
            relayed(&ChangeEvent::reset(&['a'], &['b']), false),
            vec![LegacyChange::Reset]
        );
    }

    #[test]
    fn config_defaults_to_batched() {
        let config: LegacyConfig = serde_json::from_str("{}").unwrap();
        assert!(config.supports_batched);
        assert_eq!(config, LegacyConfig::default());
    }

    #[test]
    fn adapter_over_a_live_view() {
        let source: ObservableList<i32> = vec![1, 2].into_iter().collect();
        let adapter = LegacyAdapter::new(
            Arc::new(source.build_view(|p| p.map(|x: &i32| x * 10))),
            LegacyConfig {
                supports_batched: false,
            },
        );

        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        let _sub = adapter.subscribe(move |c| l.lock().unwrap().push(c)).unwrap();

        source.push_range(&[3, 4]).unwrap();
        assert_eq!(adapter.len().unwrap(), 4);
        assert_eq!(adapter.get(3).unwrap(), Some(40));
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                LegacyChange::Add { items: vec![30], index: 2 },
                LegacyChange::Add { items: vec![40], index: 3 },
            ]
        );
    }
}
