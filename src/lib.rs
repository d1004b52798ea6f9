//! Incremental views over observable sequences
//!
//! Using **obsview** you can declare *derived lists*, e.g. "the source, filtered,
//! sorted, then reversed", that stay in sync with a mutable source without
//! re-scanning it on every change.
//!
//! *Observable sequences* report each mutation as a fine-grained *change event*
//! (items added, removed, replaced, moved, or a full reset).
//! *Emitters* translate such an event into the equivalent event(s) in a transformed
//! item space, keeping only the bookkeeping they need to do so.
//! A *materialized view* drives an emitter pipeline from a source and stores the
//! result. It subscribes to the source only while somebody listens to the view,
//! otherwise it recomputes on demand.
//!
//!
//!# Examples
//!
//! ```
//! use obsview::{buffer::vec::ObservableList, view::ChangeRecord};
//! use std::sync::{Arc, Mutex};
//!
//! let source: ObservableList<i32> = vec![5, 3, 3, 1].into_iter().collect();
//!
//! let view = source.build_view(|p| p
//!                       .filter(|x: &i32| *x != 3)
//!                       .sort(false));
//!
//! assert_eq!(view.to_vec().unwrap(), vec![1, 5]);
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let l = log.clone();
//! let _sub = view.add_notify_fn(move |e| l.lock().unwrap().push(e.to_record())).unwrap();
//!
//! source.insert(1, 2).unwrap();  // lands between 1 and 5
//! source.remove(&5).unwrap();
//!
//! assert_eq!(view.to_vec().unwrap(), vec![1, 2]);
//! assert_eq!(
//!     *log.lock().unwrap(),
//!     vec![
//!         ChangeRecord::Add { items: vec![2], index: 1 },
//!         ChangeRecord::Remove { items: vec![5], index: 2 },
//!     ]
//! );
//! ```

pub mod error;

pub mod buffer;
pub mod projection;
pub mod view;

pub use error::{Result, ViewError};
