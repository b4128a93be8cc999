//! Timeline model store keyed by `TimelineId`.

use hashbrown::HashMap;

use crate::ids::{IdAllocator, TimelineId};
use crate::model::TimelineModel;
use crate::options::TimelineOptions;

#[derive(Debug, Default)]
pub struct Store {
    models: HashMap<TimelineId, TimelineModel>,
    ids: IdAllocator,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh Idle model and return its id.
    pub fn create(&mut self, opts: TimelineOptions) -> TimelineId {
        let id = self.ids.alloc_timeline();
        self.models
            .insert(id, TimelineModel::new(id, opts.name, opts.references));
        log::debug!("timeline {id} created");
        id
    }

    pub fn get(&self, id: TimelineId) -> Option<&TimelineModel> {
        self.models.get(&id)
    }

    pub fn get_mut(&mut self, id: TimelineId) -> Option<&mut TimelineModel> {
        self.models.get_mut(&id)
    }

    /// Remove the model; later lookups report it missing.
    pub fn destroy(&mut self, id: TimelineId) -> Option<TimelineModel> {
        let removed = self.models.remove(&id);
        if removed.is_some() {
            log::debug!("timeline {id} removed from store");
        }
        removed
    }

    pub fn contains(&self, id: TimelineId) -> bool {
        self.models.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TimelineId> + '_ {
        self.models.keys().copied()
    }

    pub(crate) fn alloc_listener(&mut self) -> crate::ids::ListenerId {
        self.ids.alloc_listener()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimelineState;

    #[test]
    fn create_get_destroy() {
        let mut store = Store::new();
        let a = store.create(TimelineOptions::default());
        let b = store.create(TimelineOptions {
            name: Some("intro".into()),
            ..Default::default()
        });
        assert_ne!(a, b);
        assert_eq!(store.get(a).unwrap().state, TimelineState::Idle);
        assert_eq!(store.get(b).unwrap().name.as_deref(), Some("intro"));

        assert!(store.destroy(a).is_some());
        assert!(!store.contains(a));
        assert!(store.get(a).is_none());
        assert!(store.destroy(a).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn ids_are_not_reused() {
        let mut store = Store::new();
        let a = store.create(TimelineOptions::default());
        store.destroy(a);
        let b = store.create(TimelineOptions::default());
        assert_ne!(a, b);
    }
}
