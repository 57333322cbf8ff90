use std::collections::{BTreeMap, BTreeSet};

use crate::authority::EntityId;
use crate::property::{PropertyStore, PropertyValue};

/// External presentation layer fed by [`Reconciler::run`].
pub trait Presenter {
    fn present(&mut self, entity: EntityId, key: &'static str, value: PropertyValue);

    /// Called once when every property of `entity` has disappeared.
    fn forget(&mut self, _entity: EntityId) {}
}

/// Mirrors committed property values into a [`Presenter`], skipping values
/// that were already applied.
#[derive(Debug, Default)]
pub struct Reconciler {
    last_applied: BTreeMap<(EntityId, &'static str), PropertyValue>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_applied(&self, entity: EntityId, key: &'static str) -> Option<PropertyValue> {
        self.last_applied.get(&(entity, key)).copied()
    }

    /// Returns how many values were handed to the presenter.
    pub fn run<R: Presenter + ?Sized>(&mut self, store: &PropertyStore, presenter: &mut R) -> usize {
        let mut applied = 0;
        let mut seen = BTreeSet::new();

        for (entity, key, value) in store.iter_committed() {
            seen.insert((entity, key));
            if self.last_applied.get(&(entity, key)) == Some(&value) {
                continue;
            }
            presenter.present(entity, key, value);
            self.last_applied.insert((entity, key), value);
            applied += 1;
        }

        let stale: BTreeSet<EntityId> = self
            .last_applied
            .keys()
            .filter(|k| !seen.contains(*k))
            .map(|(entity, _)| *entity)
            .collect();
        self.last_applied.retain(|k, _| seen.contains(k));
        for entity in stale {
            if !self.last_applied.keys().any(|(e, _)| *e == entity) {
                presenter.forget(entity);
            }
        }

        applied
    }
}
